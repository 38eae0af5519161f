use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use esfinteres_core::{AccessError, StoreError};
use serde_json::json;

/// API error type mapped to `{"error": {type, message, statusCode}}` bodies.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    /// A domain rule refused the request; `code` is the machine-readable type.
    #[error("{code}: {message}")]
    Rejected {
        code: &'static str,
        message: String,
    },

    #[error("unauthorized")]
    Unauthorized,

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("monthly limit reached ({monthly_count}/{limit})")]
    LimitReached { monthly_count: usize, limit: usize },

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match &err {
            StoreError::UserNotFound(_) | StoreError::ActivityNotFound { .. } => {
                ApiError::NotFound(err.to_string())
            }
            StoreError::InviteeNotRegistered(_)
            | StoreError::AlreadyMember(_)
            | StoreError::InvalidInput(_)
            | StoreError::Encoding(_) => ApiError::Rejected {
                code: err.code(),
                message: err.to_string(),
            },
            StoreError::Backend(_) => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<AccessError> for ApiError {
    fn from(err: AccessError) -> Self {
        match err {
            AccessError::Unauthorized => ApiError::Unauthorized,
            AccessError::PremiumRequired { feature } => {
                ApiError::Forbidden(format!("{feature} requires a premium account"))
            }
            AccessError::LimitReached {
                monthly_count,
                limit,
            } => ApiError::LimitReached {
                monthly_count,
                limit,
            },
            AccessError::Store(err) => err.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "notFound", msg.clone()),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "badRequest", msg.clone()),
            ApiError::Rejected { code, message } => {
                (StatusCode::BAD_REQUEST, *code, message.clone())
            }
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                "Authentication required".to_string(),
            ),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", msg.clone()),
            ApiError::LimitReached {
                monthly_count,
                limit,
            } => {
                let body = json!({
                    "error": {
                        "type": "limitReached",
                        "message": format!("Monthly limit of {limit} records reached"),
                        "statusCode": StatusCode::FORBIDDEN.as_u16(),
                    },
                    "limitReached": true,
                    "monthlyCount": monthly_count,
                    "monthlyLimit": limit,
                });
                return (StatusCode::FORBIDDEN, Json(body)).into_response();
            }
            ApiError::Internal(msg) => {
                tracing::error!("Internal error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internalError",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = json!({
            "error": {
                "type": error_type,
                "message": message,
                "statusCode": status.as_u16(),
            }
        });

        (status, Json(body)).into_response()
    }
}

/// Convenience type alias for route handlers.
pub type ApiResult<T> = Result<T, ApiError>;
