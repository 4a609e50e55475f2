use axum::extract::State;
use serde_json::{json, Value};

use super::{ApiResponse, AppState};

pub async fn root(State(state): State<AppState>) -> ApiResponse<Value> {
    ApiResponse::ok(
        format!("Welcome to {} API", state.settings.app_name),
        json!({
            "symptoms": format!("{}/diagnosis/symptoms", state.settings.api_prefix),
            "health": "/health",
            "version": state.settings.app_version,
        }),
    )
}

pub async fn health(State(state): State<AppState>) -> ApiResponse<Value> {
    ApiResponse::ok(
        "Service is healthy",
        json!({
            "app_name": state.settings.app_name,
            "version": state.settings.app_version,
            "status": "running",
            "model_loaded": state.predictor.model_loaded(),
        }),
    )
}
