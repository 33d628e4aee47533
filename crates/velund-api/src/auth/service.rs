//! Authentication service layer
//!
//! Registration and login against the marketplace store. Secrets are
//! hashed with Argon2id before they reach storage; successful auth issues
//! a signed JWT tied to the user id.

use super::jwt::{generate_access_token, JwtConfig};
use super::password::{hash_password, verify_password};
use crate::error::AppError;
use std::sync::Arc;
use velund_core::{MarketStore, NewUser, User};

/// Authenticated user plus their freshly issued token
pub struct AuthOutcome {
    pub user: User,
    pub token: String,
}

/// Authentication service
pub struct AuthService {
    store: Arc<dyn MarketStore>,
    jwt_config: JwtConfig,
}

impl AuthService {
    pub fn new(store: Arc<dyn MarketStore>, jwt_config: JwtConfig) -> Self {
        Self { store, jwt_config }
    }

    /// Register a new user
    ///
    /// New accounts always start with role `user` and subscription `free`.
    /// The email pre-check gives the friendly duplicate message; the
    /// store additionally maps a unique-constraint violation to the same
    /// error, so two racing registrations cannot both succeed.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        full_name: &str,
        company_name: Option<String>,
        city: Option<String>,
    ) -> Result<AuthOutcome, AppError> {
        if self.store.find_user_by_email(email).await?.is_some() {
            return Err(AppError::BadRequest("Email already exists".to_string()));
        }

        let password_hash = hash_password(password)
            .map_err(|e| AppError::Internal(format!("Failed to hash password: {e}")))?;

        let user = self
            .store
            .insert_user(&NewUser {
                email: email.to_string(),
                password_hash,
                full_name: full_name.to_string(),
                company_name,
                city,
            })
            .await?;

        let token = generate_access_token(&self.jwt_config, &user)
            .map_err(|e| AppError::Internal(format!("Failed to issue token: {e}")))?;

        tracing::info!(user_id = user.id, "user registered");
        Ok(AuthOutcome { user, token })
    }

    /// Login with email and password
    ///
    /// Unknown email and wrong password are indistinguishable to the
    /// caller: both return 401.
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthOutcome, AppError> {
        let record = self
            .store
            .find_user_by_email(email)
            .await?
            .ok_or_else(|| AppError::Unauthorized("Invalid credentials".to_string()))?;

        let valid = verify_password(password, &record.password_hash)
            .map_err(|e| AppError::Internal(format!("Failed to verify password: {e}")))?;

        if !valid {
            return Err(AppError::Unauthorized("Invalid credentials".to_string()));
        }

        let user: User = record.into();
        let token = generate_access_token(&self.jwt_config, &user)
            .map_err(|e| AppError::Internal(format!("Failed to issue token: {e}")))?;

        Ok(AuthOutcome { user, token })
    }
}
