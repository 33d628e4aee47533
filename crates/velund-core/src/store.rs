//! PostgreSQL marketplace store
//!
//! Provides all persistence for the request handlers using SQLx and
//! PostgreSQL, behind the `MarketStore` trait so handlers can be tested
//! against an in-memory mock.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{FromRow, Postgres, QueryBuilder};

use crate::{
    AiReport, CategoryStat, CityStat, NewSubmission, NewUser, ProductHit, Result, Role,
    SearchFilters, SubmissionStatus, User, UserSupplier, VelundError,
};

/// Rating assigned to a supplier created through moderation approval
const APPROVED_SUPPLIER_RATING: f64 = 5.0;

/// Result cap for natural-language product search
const SEARCH_RESULT_LIMIT: i64 = 50;

/// PostgreSQL marketplace store
pub struct PgMarketStore {
    pool: PgPool,
}

impl PgMarketStore {
    /// Create a new store connection
    pub async fn new(database_url: &str, pool_size: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(pool_size)
            .connect(database_url)
            .await
            .map_err(|e| VelundError::DatabaseError(format!("PostgreSQL connection failed: {e}")))?;

        Ok(Self { pool })
    }

    /// Create from an existing pool
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// User row with credential hash, for the auth service only
#[derive(Debug, Clone, FromRow)]
pub struct UserAuth {
    pub id: i32,
    pub email: String,
    pub password_hash: String,
    pub full_name: String,
    pub role: String,
    pub subscription: String,
    pub company_name: Option<String>,
    pub city: Option<String>,
}

impl From<UserAuth> for User {
    fn from(row: UserAuth) -> Self {
        User {
            id: row.id,
            email: row.email,
            full_name: row.full_name,
            role: row.role.parse().unwrap_or_default(),
            subscription: row.subscription,
            company_name: row.company_name,
            city: row.city,
        }
    }
}

/// User row without the credential hash
#[derive(Debug, FromRow)]
struct UserRow {
    id: i32,
    email: String,
    full_name: String,
    role: String,
    subscription: String,
    company_name: Option<String>,
    city: Option<String>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            email: row.email,
            full_name: row.full_name,
            role: row.role.parse().unwrap_or_default(),
            subscription: row.subscription,
            company_name: row.company_name,
            city: row.city,
        }
    }
}

/// Supplier submission row, with owner columns for the moderation queue
#[derive(Debug, FromRow)]
struct UserSupplierRow {
    id: i32,
    user_id: i32,
    company_name: String,
    city: Option<String>,
    phone: Option<String>,
    email: Option<String>,
    website_url: Option<String>,
    description: Option<String>,
    status: String,
    moderated_by: Option<i32>,
    moderated_at: Option<DateTime<Utc>>,
    rejection_reason: Option<String>,
    created_at: DateTime<Utc>,
    user_name: Option<String>,
    user_email: Option<String>,
}

impl From<UserSupplierRow> for UserSupplier {
    fn from(row: UserSupplierRow) -> Self {
        UserSupplier {
            id: row.id,
            user_id: row.user_id,
            company_name: row.company_name,
            city: row.city,
            phone: row.phone,
            email: row.email,
            website_url: row.website_url,
            description: row.description,
            status: row.status.parse().unwrap_or_default(),
            moderated_by: row.moderated_by,
            moderated_at: row.moderated_at,
            rejection_reason: row.rejection_reason,
            created_at: row.created_at,
            user_name: row.user_name,
            user_email: row.user_email,
        }
    }
}

/// Product search hit row
#[derive(Debug, FromRow)]
struct ProductHitRow {
    id: i32,
    name: String,
    category: Option<String>,
    price: f64,
    city: Option<String>,
    supplier_id: i32,
    company_name: String,
    supplier_city: Option<String>,
    phone: Option<String>,
    email: Option<String>,
    rating: Option<f64>,
}

impl From<ProductHitRow> for ProductHit {
    fn from(row: ProductHitRow) -> Self {
        ProductHit {
            id: row.id,
            name: row.name,
            category: row.category,
            price: row.price,
            city: row.city,
            supplier_id: row.supplier_id,
            company_name: row.company_name,
            supplier_city: row.supplier_city,
            phone: row.phone,
            email: row.email,
            rating: row.rating,
        }
    }
}

/// Build the product search query from whatever filters are present.
///
/// Predicates are appended only for present filters and every value is
/// bound, never interpolated into the SQL text. `min_quantity` is carried
/// in the parsed filter for logging but has no predicate (products carry
/// no stock column).
fn build_search_query(filters: &SearchFilters) -> QueryBuilder<'static, Postgres> {
    let mut qb: QueryBuilder<'static, Postgres> = QueryBuilder::new(
        "SELECT p.id, p.name, p.category, p.price, p.city, p.supplier_id, \
         s.company_name, s.city AS supplier_city, s.phone, s.email, s.rating \
         FROM products p \
         JOIN suppliers s ON p.supplier_id = s.id \
         WHERE 1=1",
    );

    if let Some(product) = &filters.product {
        qb.push(" AND p.name ILIKE ");
        qb.push_bind(format!("%{product}%"));
    }

    if let Some(city) = &filters.city {
        let pattern = format!("%{city}%");
        qb.push(" AND (p.city ILIKE ");
        qb.push_bind(pattern.clone());
        qb.push(" OR s.city ILIKE ");
        qb.push_bind(pattern);
        qb.push(")");
    }

    if let Some(max_price) = filters.max_price {
        qb.push(" AND p.price <= ");
        qb.push_bind(max_price);
    }

    qb.push(" ORDER BY p.price ASC LIMIT ");
    qb.push_bind(SEARCH_RESULT_LIMIT);

    qb
}

/// Trait for marketplace persistence operations
#[async_trait]
pub trait MarketStore: Send + Sync {
    // --- market statistics (chat context) ---

    /// Per-category product counts and average prices
    async fn category_stats(&self) -> Result<Vec<CategoryStat>>;

    /// Cities ordered by supplier count
    async fn top_cities(&self) -> Result<Vec<CityStat>>;

    // --- chat and search logs ---

    /// Append one chat exchange to the history
    async fn insert_chat_turn(
        &self,
        user_id: i32,
        message: &str,
        response: &str,
        context: &serde_json::Value,
    ) -> Result<()>;

    /// Append one search query to the log
    async fn log_search(&self, user_id: i32, query: &str, results_count: i32) -> Result<()>;

    // --- product search ---

    /// Run the filtered product search (price ascending, capped)
    async fn search_products(&self, filters: &SearchFilters) -> Result<Vec<ProductHit>>;

    // --- users ---

    /// Fetch a user with credential hash by email
    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserAuth>>;

    /// Insert a new user; maps a unique-email violation to a validation error
    async fn insert_user(&self, new_user: &NewUser) -> Result<User>;

    /// Look up a user's role
    async fn user_role(&self, user_id: i32) -> Result<Option<Role>>;

    // --- supplier submissions ---

    /// Submissions owned by a user, newest first
    async fn submissions_for_user(&self, user_id: i32) -> Result<Vec<UserSupplier>>;

    /// Moderation queue filtered by status, joined with owner name/email
    async fn moderation_queue(&self, status: SubmissionStatus) -> Result<Vec<UserSupplier>>;

    /// Create a new pending submission
    async fn insert_submission(
        &self,
        user_id: i32,
        submission: &NewSubmission,
    ) -> Result<UserSupplier>;

    /// Approve a pending submission: copy it into the live suppliers table
    /// and stamp moderation metadata, atomically. Returns false when no
    /// pending row matched.
    async fn approve_submission(&self, submission_id: i32, moderator_id: i32) -> Result<bool>;

    /// Reject a pending submission. Returns false when no pending row matched.
    async fn reject_submission(
        &self,
        submission_id: i32,
        moderator_id: i32,
        reason: Option<&str>,
    ) -> Result<bool>;

    /// Delete a submission owned by the caller. Returns false when no row matched.
    async fn delete_submission(&self, submission_id: i32, user_id: i32) -> Result<bool>;

    // --- file intake ---

    /// Record a price-list upload with its AI report; returns the upload id
    async fn insert_upload(
        &self,
        user_id: Option<i32>,
        file_name: &str,
        file_url: Option<&str>,
        report: &AiReport,
    ) -> Result<i32>;

    /// Record a notification for a user
    async fn insert_notification(
        &self,
        user_id: Option<i32>,
        kind: &str,
        title: &str,
        message: &str,
    ) -> Result<()>;
}

#[async_trait]
impl MarketStore for PgMarketStore {
    async fn category_stats(&self) -> Result<Vec<CategoryStat>> {
        let rows: Vec<(Option<String>, i64, Option<f64>)> = sqlx::query_as(
            r#"
            SELECT category, COUNT(*) AS count, AVG(price) AS avg_price
            FROM products
            GROUP BY category
            LIMIT 10
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| VelundError::DatabaseError(format!("Failed to load category stats: {e}")))?;

        Ok(rows
            .into_iter()
            .map(|(category, count, avg_price)| CategoryStat {
                category,
                count,
                avg_price,
            })
            .collect())
    }

    async fn top_cities(&self) -> Result<Vec<CityStat>> {
        let rows: Vec<(Option<String>, i64)> = sqlx::query_as(
            r#"
            SELECT city, COUNT(*) AS suppliers_count
            FROM suppliers
            GROUP BY city
            ORDER BY suppliers_count DESC
            LIMIT 10
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| VelundError::DatabaseError(format!("Failed to load city stats: {e}")))?;

        Ok(rows
            .into_iter()
            .map(|(city, suppliers_count)| CityStat {
                city,
                suppliers_count,
            })
            .collect())
    }

    async fn insert_chat_turn(
        &self,
        user_id: i32,
        message: &str,
        response: &str,
        context: &serde_json::Value,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO chat_history (user_id, message, response, context) VALUES ($1, $2, $3, $4)",
        )
        .bind(user_id)
        .bind(message)
        .bind(response)
        .bind(context)
        .execute(&self.pool)
        .await
        .map_err(|e| VelundError::DatabaseError(format!("Failed to store chat turn: {e}")))?;

        Ok(())
    }

    async fn log_search(&self, user_id: i32, query: &str, results_count: i32) -> Result<()> {
        sqlx::query(
            "INSERT INTO search_queries (user_id, query, results_count) VALUES ($1, $2, $3)",
        )
        .bind(user_id)
        .bind(query)
        .bind(results_count)
        .execute(&self.pool)
        .await
        .map_err(|e| VelundError::DatabaseError(format!("Failed to log search: {e}")))?;

        Ok(())
    }

    async fn search_products(&self, filters: &SearchFilters) -> Result<Vec<ProductHit>> {
        let mut query = build_search_query(filters);

        let rows: Vec<ProductHitRow> = query
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| VelundError::DatabaseError(format!("Product search failed: {e}")))?;

        Ok(rows.into_iter().map(ProductHit::from).collect())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserAuth>> {
        let row: Option<UserAuth> = sqlx::query_as(
            r#"
            SELECT id, email, password_hash, full_name, role, subscription, company_name, city
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| VelundError::DatabaseError(format!("Failed to fetch user: {e}")))?;

        Ok(row)
    }

    async fn insert_user(&self, new_user: &NewUser) -> Result<User> {
        let row: UserRow = sqlx::query_as(
            r#"
            INSERT INTO users (email, password_hash, full_name, company_name, city, role, subscription)
            VALUES ($1, $2, $3, $4, $5, 'user', 'free')
            RETURNING id, email, full_name, role, subscription, company_name, city
            "#,
        )
        .bind(&new_user.email)
        .bind(&new_user.password_hash)
        .bind(&new_user.full_name)
        .bind(&new_user.company_name)
        .bind(&new_user.city)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                VelundError::ValidationError("Email already exists".to_string())
            }
            _ => VelundError::DatabaseError(format!("Failed to create user: {e}")),
        })?;

        Ok(row.into())
    }

    async fn user_role(&self, user_id: i32) -> Result<Option<Role>> {
        let role: Option<String> = sqlx::query_scalar("SELECT role FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| VelundError::DatabaseError(format!("Failed to fetch user role: {e}")))?;

        Ok(role.map(|r| r.parse().unwrap_or_default()))
    }

    async fn submissions_for_user(&self, user_id: i32) -> Result<Vec<UserSupplier>> {
        let rows: Vec<UserSupplierRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, company_name, city, phone, email, website_url, description,
                   status, moderated_by, moderated_at, rejection_reason, created_at,
                   NULL::text AS user_name, NULL::text AS user_email
            FROM user_suppliers
            WHERE user_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| VelundError::DatabaseError(format!("Failed to list submissions: {e}")))?;

        Ok(rows.into_iter().map(UserSupplier::from).collect())
    }

    async fn moderation_queue(&self, status: SubmissionStatus) -> Result<Vec<UserSupplier>> {
        let rows: Vec<UserSupplierRow> = sqlx::query_as(
            r#"
            SELECT us.id, us.user_id, us.company_name, us.city, us.phone, us.email,
                   us.website_url, us.description, us.status, us.moderated_by,
                   us.moderated_at, us.rejection_reason, us.created_at,
                   u.full_name AS user_name, u.email AS user_email
            FROM user_suppliers us
            JOIN users u ON us.user_id = u.id
            WHERE us.status = $1
            ORDER BY us.created_at DESC
            "#,
        )
        .bind(status.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| VelundError::DatabaseError(format!("Failed to load moderation queue: {e}")))?;

        Ok(rows.into_iter().map(UserSupplier::from).collect())
    }

    async fn insert_submission(
        &self,
        user_id: i32,
        submission: &NewSubmission,
    ) -> Result<UserSupplier> {
        let row: UserSupplierRow = sqlx::query_as(
            r#"
            INSERT INTO user_suppliers (user_id, company_name, city, phone, email, website_url, description)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, user_id, company_name, city, phone, email, website_url, description,
                      status, moderated_by, moderated_at, rejection_reason, created_at,
                      NULL::text AS user_name, NULL::text AS user_email
            "#,
        )
        .bind(user_id)
        .bind(&submission.company_name)
        .bind(&submission.city)
        .bind(&submission.phone)
        .bind(&submission.email)
        .bind(&submission.website_url)
        .bind(&submission.description)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| VelundError::DatabaseError(format!("Failed to create submission: {e}")))?;

        Ok(row.into())
    }

    async fn approve_submission(&self, submission_id: i32, moderator_id: i32) -> Result<bool> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| VelundError::DatabaseError(format!("Failed to begin transaction: {e}")))?;

        // Lock the pending row so approval happens exactly once
        let submission: Option<UserSupplierRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, company_name, city, phone, email, website_url, description,
                   status, moderated_by, moderated_at, rejection_reason, created_at,
                   NULL::text AS user_name, NULL::text AS user_email
            FROM user_suppliers
            WHERE id = $1 AND status = 'pending'
            FOR UPDATE
            "#,
        )
        .bind(submission_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| VelundError::DatabaseError(format!("Failed to fetch submission: {e}")))?;

        let Some(submission) = submission else {
            return Ok(false);
        };

        sqlx::query(
            r#"
            INSERT INTO suppliers
            (company_name, city, phone, email, rating, status, created_by_user_id, website_url)
            VALUES ($1, $2, $3, $4, $5, 'approved', $6, $7)
            "#,
        )
        .bind(&submission.company_name)
        .bind(&submission.city)
        .bind(&submission.phone)
        .bind(&submission.email)
        .bind(APPROVED_SUPPLIER_RATING)
        .bind(submission.user_id)
        .bind(&submission.website_url)
        .execute(&mut *tx)
        .await
        .map_err(|e| VelundError::DatabaseError(format!("Failed to create supplier: {e}")))?;

        sqlx::query(
            r#"
            UPDATE user_suppliers
            SET status = 'approved', moderated_at = CURRENT_TIMESTAMP, moderated_by = $2
            WHERE id = $1
            "#,
        )
        .bind(submission_id)
        .bind(moderator_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| VelundError::DatabaseError(format!("Failed to update submission: {e}")))?;

        tx.commit()
            .await
            .map_err(|e| VelundError::DatabaseError(format!("Failed to commit approval: {e}")))?;

        Ok(true)
    }

    async fn reject_submission(
        &self,
        submission_id: i32,
        moderator_id: i32,
        reason: Option<&str>,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE user_suppliers
            SET status = 'rejected', moderated_at = CURRENT_TIMESTAMP,
                moderated_by = $2, rejection_reason = $3
            WHERE id = $1 AND status = 'pending'
            "#,
        )
        .bind(submission_id)
        .bind(moderator_id)
        .bind(reason)
        .execute(&self.pool)
        .await
        .map_err(|e| VelundError::DatabaseError(format!("Failed to reject submission: {e}")))?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_submission(&self, submission_id: i32, user_id: i32) -> Result<bool> {
        let result = sqlx::query("DELETE FROM user_suppliers WHERE id = $1 AND user_id = $2")
            .bind(submission_id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| VelundError::DatabaseError(format!("Failed to delete submission: {e}")))?;

        Ok(result.rows_affected() > 0)
    }

    async fn insert_upload(
        &self,
        user_id: Option<i32>,
        file_name: &str,
        file_url: Option<&str>,
        report: &AiReport,
    ) -> Result<i32> {
        let report_json = serde_json::to_value(report)
            .map_err(|e| VelundError::DatabaseError(format!("Failed to serialize report: {e}")))?;

        let row: (i32,) = sqlx::query_as(
            r#"
            INSERT INTO price_uploads
            (user_id, file_name, file_url, status, ai_score, ai_report, items_found)
            VALUES ($1, $2, $3, 'pending', $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(user_id)
        .bind(file_name)
        .bind(file_url)
        .bind(report.score)
        .bind(&report_json)
        .bind(report.items_found)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| VelundError::DatabaseError(format!("Failed to record upload: {e}")))?;

        Ok(row.0)
    }

    async fn insert_notification(
        &self,
        user_id: Option<i32>,
        kind: &str,
        title: &str,
        message: &str,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO notifications (user_id, type, title, message) VALUES ($1, $2, $3, $4)",
        )
        .bind(user_id)
        .bind(kind)
        .bind(title)
        .bind(message)
        .execute(&self.pool)
        .await
        .map_err(|e| VelundError::DatabaseError(format!("Failed to record notification: {e}")))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_query_with_no_filters_has_no_predicates() {
        let qb = build_search_query(&SearchFilters::default());
        let sql = qb.sql();
        assert!(!sql.contains("ILIKE"));
        assert!(!sql.contains("p.price <="));
        assert!(sql.contains("ORDER BY p.price ASC LIMIT"));
    }

    #[test]
    fn search_query_appends_only_present_predicates() {
        let filters = SearchFilters {
            product: Some("труба".to_string()),
            max_price: Some(1000.0),
            ..SearchFilters::default()
        };
        let qb = build_search_query(&filters);
        let sql = qb.sql();
        assert!(sql.contains("p.name ILIKE"));
        assert!(sql.contains("p.price <="));
        assert!(!sql.contains("s.city ILIKE"));
    }

    #[test]
    fn search_query_city_matches_product_or_supplier_city() {
        let filters = SearchFilters {
            city: Some("Москва".to_string()),
            ..SearchFilters::default()
        };
        let qb = build_search_query(&filters);
        let sql = qb.sql();
        assert!(sql.contains("p.city ILIKE"));
        assert!(sql.contains("s.city ILIKE"));
    }

    #[test]
    fn search_query_never_interpolates_values() {
        let filters = SearchFilters {
            product: Some("'; DROP TABLE products; --".to_string()),
            city: Some("Москва".to_string()),
            max_price: Some(500.0),
            ..SearchFilters::default()
        };
        let qb = build_search_query(&filters);
        let sql = qb.sql();
        // Values go through bind placeholders, never into the text
        assert!(!sql.contains("DROP TABLE"));
        assert!(!sql.contains("Москва"));
        assert!(sql.contains("$1"));
        assert!(sql.contains("$4"));
    }
}
