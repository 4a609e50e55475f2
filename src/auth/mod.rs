//! Authentication Module
//!
//! Registration, login and bearer-token resolution on top of the user store.

pub mod password;
pub mod token;

pub use password::{hash_password, verify_password};
pub use token::{Claims, TokenError, TokenIssuer};

use std::sync::{Arc, OnceLock};

use argon2::Params;
use regex::Regex;
use serde::Deserialize;
use tokio::task;
use tracing::{info, warn};

use crate::error::{ApiError, FieldError};
use crate::storage::{NewUser, StoreError, User, UserStore};

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

fn email_pattern() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("static email regex"))
}

impl RegisterRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        let mut errors = Vec::new();
        if !email_pattern().is_match(&self.email) {
            errors.push(FieldError::new("email", "value is not a valid email address"));
        }
        let name_len = self.username.chars().count();
        if !(3..=50).contains(&name_len) {
            errors.push(FieldError::new("username", "length must be between 3 and 50 characters"));
        }
        if self.password.chars().count() < 8 {
            errors.push(FieldError::new("password", "length must be at least 8 characters"));
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ApiError::Validation(errors))
        }
    }
}

#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserStore>,
    tokens: TokenIssuer,
    hash_params: Params,
}

impl AuthService {
    pub fn new(users: Arc<dyn UserStore>, tokens: TokenIssuer) -> Self {
        Self {
            users,
            tokens,
            hash_params: password::default_params(),
        }
    }

    /// Override the Argon2 cost, e.g. [`password::low_cost_params`] in tests.
    pub fn with_hash_params(mut self, params: Params) -> Self {
        self.hash_params = params;
        self
    }

    pub async fn register(&self, req: RegisterRequest) -> Result<User, ApiError> {
        req.validate()?;
        let params = self.hash_params.clone();
        let plain = req.password;
        let hashed_password = task::spawn_blocking(move || password::hash_with_params(&plain, params))
            .await
            .map_err(ApiError::internal)?
            .map_err(|e| ApiError::internal(anyhow::anyhow!("password hashing failed: {}", e)))?;
        let user = self
            .users
            .create_user(NewUser {
                email: req.email,
                username: req.username,
                hashed_password,
            })
            .await
            .map_err(|e| match e {
                StoreError::Conflict(msg) => ApiError::Conflict(msg),
                other => ApiError::internal(other),
            })?;
        info!("👤 Registered user {} ({})", user.id, user.username);
        Ok(user)
    }

    pub async fn authenticate(&self, email: &str, password: &str) -> Result<User, ApiError> {
        let user = self
            .users
            .get_user_by_email(email)
            .await
            .map_err(ApiError::internal)?
            .ok_or_else(|| ApiError::Unauthorized("Invalid email or password".to_string()))?;

        let plain = password.to_string();
        let stored = user.hashed_password.clone();
        let valid = task::spawn_blocking(move || verify_password(&plain, &stored))
            .await
            .map_err(ApiError::internal)?;
        if !valid {
            warn!("Failed login for {}", email);
            return Err(ApiError::Unauthorized("Invalid email or password".to_string()));
        }
        if !user.is_active {
            return Err(ApiError::Unauthorized("User account is inactive".to_string()));
        }
        Ok(user)
    }

    pub fn create_token(&self, user: &User) -> Result<String, ApiError> {
        self.tokens.issue(user.id, &user.email).map_err(ApiError::internal)
    }

    /// Resolve a bearer token to its user.
    pub async fn current_user(&self, token: &str) -> Result<User, ApiError> {
        let claims = self.tokens.decode(token).map_err(|e| {
            warn!("Rejected token: {}", e);
            ApiError::unauthorized()
        })?;
        let user_id: i64 = claims.sub.parse().map_err(|_| ApiError::unauthorized())?;

        self.users
            .get_user_by_id(user_id)
            .await
            .map_err(ApiError::internal)?
            .ok_or_else(|| ApiError::NotFound("User not found".to_string()))
    }
}
