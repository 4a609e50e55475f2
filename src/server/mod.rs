//! HTTP Server
//!
//! axum router over the auth, diagnosis and system handlers. Every response
//! body is the `{success, message, data, errors}` envelope.

mod auth;
mod diagnosis;
mod extract;
mod system;

pub use extract::{CurrentUser, ValidJson, ValidPath, ValidQuery};

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::State;
use axum::http::HeaderValue;
use axum::middleware;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use tower_http::cors::{AllowHeaders, AllowMethods, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::auth::{AuthService, TokenIssuer};
use crate::config::Settings;
use crate::error::{self, InternalErrorDetail};
use crate::predictor::PredictionService;
use crate::storage::{DiagnosisStore, SqliteStore, UserStore};

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub predictor: Arc<PredictionService>,
    pub auth: AuthService,
    pub diagnoses: Arc<dyn DiagnosisStore>,
}

impl AppState {
    pub fn new(settings: Settings, store: SqliteStore, predictor: PredictionService) -> Self {
        let store = Arc::new(store);
        let users: Arc<dyn UserStore> = store.clone();
        let tokens = TokenIssuer::new(&settings.secret_key, settings.access_token_expire_minutes);
        Self {
            auth: AuthService::new(users, tokens),
            diagnoses: store,
            predictor: Arc::new(predictor),
            settings: Arc::new(settings),
        }
    }
}

/// The success envelope.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    pub data: Option<T>,
    pub errors: Option<serde_json::Value>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
            errors: None,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

pub fn router(state: AppState) -> Router {
    let prefix = state.settings.api_prefix.clone();
    let api = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/me", get(auth::me))
        .route("/diagnosis/check", post(diagnosis::check_symptoms))
        .route("/diagnosis/history", get(diagnosis::history))
        .route("/diagnosis/history/{id}", get(diagnosis::history_item))
        .route("/diagnosis/symptoms", get(diagnosis::available_symptoms));

    let app = Router::new()
        .route("/", get(system::root))
        .route("/health", get(system::health));
    let app = if prefix.is_empty() { app.merge(api) } else { app.nest(&prefix, api) };

    app.layer(middleware::map_response_with_state(state.clone(), expose_internal_detail))
        .layer(cors_layer(&state.settings.cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// With `DEBUG` on, 500 envelopes carry the error text in `errors`.
async fn expose_internal_detail(State(state): State<AppState>, mut response: Response) -> Response {
    let Some(InternalErrorDetail(detail)) = response.extensions_mut().remove::<InternalErrorDetail>() else {
        return response;
    };
    if !state.settings.debug {
        return response;
    }
    let body = error::envelope("Internal server error", serde_json::Value::String(detail));
    (response.status(), Json(body)).into_response()
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        return CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

pub async fn run_server(state: AppState) -> Result<()> {
    let addr = state.settings.bind_addr.clone();
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("🚀 Rose Symptom Checker ready: http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("👋 Shutting down Rose Symptom Checker");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
