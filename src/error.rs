//! API error model
//!
//! Every failure leaves the server as the standard envelope
//! `{success: false, message, data: null, errors}`.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::json;
use tracing::error;

/// Text of an internal error, attached to the 500 response as an extension.
/// The router copies it into `errors` when running with `DEBUG`.
#[derive(Debug, Clone)]
pub struct InternalErrorDetail(pub String);

pub fn envelope(message: &str, errors: serde_json::Value) -> serde_json::Value {
    json!({
        "success": false,
        "message": message,
        "data": null,
        "errors": errors,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self { field: field.into(), message: message.into() }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("Validation error")]
    Validation(Vec<FieldError>),
    #[error("Validation error: {0}")]
    MalformedBody(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn internal<E: Into<anyhow::Error>>(err: E) -> Self {
        ApiError::Internal(err.into())
    }

    pub fn unauthorized() -> Self {
        ApiError::Unauthorized("Could not validate credentials".to_string())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Validation(_) | ApiError::MalformedBody(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::MalformedBody(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::MalformedBody(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::MalformedBody(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (message, errors) = match &self {
            ApiError::Validation(fields) => ("Validation error".to_string(), json!(fields)),
            ApiError::MalformedBody(detail) => ("Validation error".to_string(), json!([detail])),
            ApiError::Internal(err) => {
                error!("Unhandled exception: {:#}", err);
                let mut response =
                    (status, Json(envelope("Internal server error", serde_json::Value::Null))).into_response();
                response.extensions_mut().insert(InternalErrorDetail(format!("{:#}", err)));
                return response;
            }
            other => (other.to_string(), serde_json::Value::Null),
        };

        (status, Json(envelope(&message, errors))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ApiError::BadRequest("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::unauthorized().status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::NotFound("x".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::Conflict("x".into()).status(), StatusCode::CONFLICT);
        assert_eq!(ApiError::Validation(vec![]).status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(ApiError::internal(anyhow::anyhow!("boom")).status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_message_is_the_detail() {
        assert_eq!(ApiError::unauthorized().to_string(), "Could not validate credentials");
        assert_eq!(ApiError::Conflict("Email already registered".into()).to_string(), "Email already registered");
    }

    #[test]
    fn test_internal_detail_travels_as_extension() {
        let response = ApiError::internal(anyhow::anyhow!("disk on fire")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let detail = response.extensions().get::<InternalErrorDetail>().unwrap();
        assert_eq!(detail.0, "disk on fire");

        let response = ApiError::NotFound("x".into()).into_response();
        assert!(response.extensions().get::<InternalErrorDetail>().is_none());
    }
}
