//! Velund Core - Domain models, traits, and shared types
//!
//! This crate defines the core abstractions used throughout the Velund
//! marketplace backend:
//! - Marketplace models (users, suppliers, submissions, products)
//! - Common error types
//! - Shared traits for persistence and LLM access
//! - Configuration management

pub mod config;
pub mod store;

pub use config::{AppConfig, ConfigError, DatabaseConfig, LlmConfig, ServerConfig};
pub use store::{MarketStore, PgMarketStore};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Core error types for Velund operations
#[derive(Error, Debug)]
pub enum VelundError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("Access denied: {reason}")]
    AccessDenied { reason: String },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("LLM error: {0}")]
    LlmError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, VelundError>;

// ============================================================================
// Users
// ============================================================================

/// Account role stored on the `users` table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Admin => write!(f, "admin"),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = VelundError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "user" => Ok(Self::User),
            "admin" => Ok(Self::Admin),
            other => Err(VelundError::ValidationError(format!(
                "Unknown role: {other}"
            ))),
        }
    }
}

/// Public view of a user account (never carries the credential hash)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i32,
    pub email: String,
    pub full_name: String,
    pub role: Role,
    pub subscription: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Registration payload as accepted by the store layer
///
/// `password_hash` is an Argon2id PHC string; the raw secret never
/// reaches this crate.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub full_name: String,
    pub company_name: Option<String>,
    pub city: Option<String>,
}

// ============================================================================
// Suppliers and Submissions
// ============================================================================

/// Moderation state of a user-submitted supplier
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl std::fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Approved => write!(f, "approved"),
            Self::Rejected => write!(f, "rejected"),
        }
    }
}

impl std::str::FromStr for SubmissionStatus {
    type Err = VelundError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            other => Err(VelundError::ValidationError(format!(
                "Unknown submission status: {other}"
            ))),
        }
    }
}

/// A supplier submitted by a user, awaiting or past moderation
///
/// `user_name`/`user_email` are populated only by the moderation-queue
/// query, which joins the owning account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSupplier {
    pub id: i32,
    pub user_id: i32,
    pub company_name: String,
    pub city: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub website_url: Option<String>,
    pub description: Option<String>,
    pub status: SubmissionStatus,
    pub moderated_by: Option<i32>,
    pub moderated_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_email: Option<String>,
}

/// Payload for creating a new supplier submission
#[derive(Debug, Clone, Deserialize)]
pub struct NewSubmission {
    pub company_name: String,
    pub city: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub website_url: Option<String>,
    pub description: Option<String>,
}

// ============================================================================
// Search
// ============================================================================

/// Structured filters extracted from a natural-language query
///
/// Every field is optional: the SQL builder only appends a predicate for
/// filters that are present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchFilters {
    pub product: Option<String>,
    pub city: Option<String>,
    pub max_price: Option<f64>,
    pub min_quantity: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl SearchFilters {
    /// Degraded filter used when the LLM call or its JSON output fails:
    /// the raw query becomes the product name, everything else is null.
    pub fn fallback(query: &str) -> Self {
        Self {
            product: Some(query.to_string()),
            ..Self::default()
        }
    }
}

/// A product row joined with its supplier, as returned by search
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductHit {
    pub id: i32,
    pub name: String,
    pub category: Option<String>,
    pub price: f64,
    pub city: Option<String>,
    pub supplier_id: i32,
    pub company_name: String,
    pub supplier_city: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub rating: Option<f64>,
}

// ============================================================================
// Market Statistics
// ============================================================================

/// Per-category product count and average price
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryStat {
    pub category: Option<String>,
    pub count: i64,
    pub avg_price: Option<f64>,
}

/// Supplier count per city
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CityStat {
    pub city: Option<String>,
    pub suppliers_count: i64,
}

// ============================================================================
// File Intake
// ============================================================================

/// Structured report the LLM produces for an uploaded price list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiReport {
    #[serde(rename = "type")]
    pub doc_type: String,
    pub category: String,
    pub items_found: i32,
    pub quality: String,
    pub recommendation: String,
    pub details: String,
    pub score: i32,
}

impl AiReport {
    /// Placeholder report substituted when the LLM call or its JSON
    /// output fails. Deterministic for a given file name.
    pub fn placeholder(file_name: &str) -> Self {
        Self {
            doc_type: "Прайс-лист".to_string(),
            category: "Металлопрокат".to_string(),
            items_found: 50,
            quality: "Хорошее".to_string(),
            recommendation: "Добавить в базу".to_string(),
            details: format!("Документ {file_name} ожидает проверки модератором"),
            score: 75,
        }
    }
}

// ============================================================================
// LLM Client Trait
// ============================================================================

/// One chat-completion request to the external model
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// System prompt, if any
    pub system: Option<String>,
    /// User message
    pub user: String,
    /// Sampling temperature
    pub temperature: f32,
    /// Output token cap
    pub max_tokens: u32,
}

impl CompletionRequest {
    pub fn new(user: impl Into<String>) -> Self {
        Self {
            system: None,
            user: user.into(),
            temperature: 0.7,
            max_tokens: 1024,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// Narrow interface to the external language model
///
/// Keeping this a single-method trait makes every handler testable with a
/// scripted mock instead of a real API.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Run one completion and return the model's text output
    async fn complete(&self, request: CompletionRequest) -> Result<String>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn role_round_trips_through_display() {
        assert_eq!(Role::from_str("admin").unwrap(), Role::Admin);
        assert_eq!(Role::Admin.to_string(), "admin");
        assert_eq!(Role::from_str("user").unwrap(), Role::User);
        assert!(Role::from_str("superuser").is_err());
    }

    #[test]
    fn submission_status_parses_known_values() {
        assert_eq!(
            SubmissionStatus::from_str("pending").unwrap(),
            SubmissionStatus::Pending
        );
        assert_eq!(SubmissionStatus::Rejected.to_string(), "rejected");
        assert!(SubmissionStatus::from_str("archived").is_err());
    }

    #[test]
    fn fallback_filter_uses_raw_query_as_product() {
        let filters = SearchFilters::fallback("труба 57х3.5");
        assert_eq!(filters.product.as_deref(), Some("труба 57х3.5"));
        assert!(filters.city.is_none());
        assert!(filters.max_price.is_none());
        assert!(filters.min_quantity.is_none());
        // Same failure, same fallback
        assert_eq!(filters, SearchFilters::fallback("труба 57х3.5"));
    }

    #[test]
    fn placeholder_report_mentions_file_name() {
        let report = AiReport::placeholder("прайс_май.xlsx");
        assert!(report.details.contains("прайс_май.xlsx"));
        assert_eq!(report.score, 75);
    }

    #[test]
    fn ai_report_serializes_type_field() {
        let report = AiReport::placeholder("a.xlsx");
        let json = serde_json::to_value(&report).unwrap();
        assert!(json.get("type").is_some());
        assert!(json.get("doc_type").is_none());
    }
}
