use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

/// Stable code for field-level validation failures.
pub const VALIDATION_ERROR_CODE: i32 = 100;

/// Business error body: `{code, message}`, plus field errors for validation
/// failures.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation_errors: Option<Vec<FieldError>>,
}

#[derive(Debug, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum AppError {
    /// Business failure with a stable machine-readable code. The status is
    /// chosen by the service that raised it (4xx for client faults).
    #[error("{message}")]
    Business {
        status: StatusCode,
        code: i32,
        message: String,
    },

    #[error("Validation error: {0}")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Unauthorized: {0}")]
    Unauthorized(anyhow::Error),

    #[error("Internal server error: {0}")]
    InternalError(#[from] anyhow::Error),

    #[error("Database error: {0}")]
    DatabaseError(anyhow::Error),

    #[error("Bad Gateway: {0}")]
    BadGateway(String),

    #[error("Configuration error: {0}")]
    ConfigError(anyhow::Error),
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::ConfigError(anyhow::Error::new(err))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::InternalError(anyhow::Error::new(err))
    }
}

impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        AppError::Unauthorized(anyhow::Error::new(err))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message, validation_errors) = match self {
            AppError::Business {
                status,
                code,
                message,
            } => (status, code, message, None),
            AppError::ValidationError(errors) => {
                let fields = errors
                    .field_errors()
                    .into_iter()
                    .flat_map(|(field, errs)| {
                        errs.iter().map(move |e| FieldError {
                            field: field.to_string(),
                            message: e
                                .message
                                .as_ref()
                                .map(|m| m.to_string())
                                .unwrap_or_else(|| "Validation error".to_string()),
                        })
                    })
                    .collect();
                (
                    StatusCode::BAD_REQUEST,
                    VALIDATION_ERROR_CODE,
                    "Validation error".to_string(),
                    Some(fields),
                )
            }
            AppError::Unauthorized(err) => (
                StatusCode::UNAUTHORIZED,
                StatusCode::UNAUTHORIZED.as_u16() as i32,
                err.to_string(),
                None,
            ),
            AppError::InternalError(err) => {
                tracing::error!(error = ?err, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    StatusCode::INTERNAL_SERVER_ERROR.as_u16() as i32,
                    "Internal server error".to_string(),
                    None,
                )
            }
            AppError::DatabaseError(err) => {
                tracing::error!(error = ?err, "Database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    StatusCode::INTERNAL_SERVER_ERROR.as_u16() as i32,
                    "Database error".to_string(),
                    None,
                )
            }
            AppError::BadGateway(msg) => (
                StatusCode::BAD_GATEWAY,
                StatusCode::BAD_GATEWAY.as_u16() as i32,
                msg,
                None,
            ),
            AppError::ConfigError(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                StatusCode::INTERNAL_SERVER_ERROR.as_u16() as i32,
                format!("Configuration error: {}", err),
                None,
            ),
        };

        (
            status,
            Json(ErrorResponse {
                code,
                message,
                validation_errors,
            }),
        )
            .into_response()
    }
}
