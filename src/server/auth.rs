use axum::extract::State;
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use super::{ApiResponse, AppState, CurrentUser, ValidJson};
use crate::auth::{LoginRequest, RegisterRequest};
use crate::error::ApiError;
use crate::storage::User;

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: i64,
    pub email: String,
    pub username: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            username: user.username,
            is_active: user.is_active,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
}

pub async fn register(
    State(state): State<AppState>,
    ValidJson(req): ValidJson<RegisterRequest>,
) -> Result<(StatusCode, ApiResponse<UserResponse>), ApiError> {
    let user = state.auth.register(req).await?;
    Ok((
        StatusCode::CREATED,
        ApiResponse::ok("User registered successfully", UserResponse::from(user)),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    ValidJson(req): ValidJson<LoginRequest>,
) -> Result<ApiResponse<TokenResponse>, ApiError> {
    let user = state.auth.authenticate(&req.email, &req.password).await?;
    let access_token = state.auth.create_token(&user)?;
    info!("🔑 User {} logged in", user.id);
    Ok(ApiResponse::ok(
        "Login successful",
        TokenResponse {
            access_token,
            token_type: "bearer",
        },
    ))
}

pub async fn me(CurrentUser(user): CurrentUser) -> ApiResponse<UserResponse> {
    ApiResponse::ok("User info retrieved successfully", UserResponse::from(user))
}
