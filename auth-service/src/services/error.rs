use axum::http::StatusCode;
use service_core::error::AppError;
use thiserror::Error;

use crate::models::GrantType;

// Stable business codes surfaced in error bodies. Token-issuance codes
// live in the 1xxx range, CRUD-surface codes in the 2xxx range.
pub const INVALID_CLIENT: i32 = 1001;
pub const UNSUPPORTED_GRANT_TYPE: i32 = 1002;
pub const INVALID_CREDENTIALS: i32 = 1003;
pub const CLIENT_NOT_AUTHORIZED_FOR_GRANT: i32 = 1004;
pub const INVALID_GRANT: i32 = 1005;
pub const TOKEN_GENERATION_FAILED: i32 = 1006;
pub const PERSISTENCE_FAILED: i32 = 1007;
pub const USER_NOT_FOUND: i32 = 2001;
pub const ROLE_NOT_FOUND: i32 = 2002;
pub const PHONE_NUMBER_ALREADY_EXISTS: i32 = 2003;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),

    #[error("Invalid client")]
    InvalidClient,

    #[error("Unsupported grant type: {0}")]
    UnsupportedGrantType(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Client is not authorized for grant type: {0}")]
    ClientNotAuthorizedForGrant(GrantType),

    #[error("Invalid or expired grant")]
    InvalidGrant,

    #[error("Token generation failed: {0}")]
    TokenGenerationFailed(String),

    #[error("Failed to persist authorization: {0}")]
    PersistenceFailed(String),

    #[error("User not found")]
    UserNotFound,

    #[error("Role not found")]
    RoleNotFound,

    #[error("Phone number already taken")]
    PhoneNumberAlreadyTaken,
}

impl ServiceError {
    fn business(status: StatusCode, code: i32, message: String) -> AppError {
        AppError::Business {
            status,
            code,
            message,
        }
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        let message = err.to_string();
        match err {
            ServiceError::Database(e) => AppError::DatabaseError(anyhow::anyhow!(e)),
            ServiceError::Internal(e) => AppError::InternalError(e),
            ServiceError::InvalidClient => {
                ServiceError::business(StatusCode::UNAUTHORIZED, INVALID_CLIENT, message)
            }
            ServiceError::UnsupportedGrantType(_) => {
                ServiceError::business(StatusCode::BAD_REQUEST, UNSUPPORTED_GRANT_TYPE, message)
            }
            ServiceError::InvalidCredentials => {
                ServiceError::business(StatusCode::UNAUTHORIZED, INVALID_CREDENTIALS, message)
            }
            ServiceError::ClientNotAuthorizedForGrant(_) => ServiceError::business(
                StatusCode::BAD_REQUEST,
                CLIENT_NOT_AUTHORIZED_FOR_GRANT,
                message,
            ),
            ServiceError::InvalidGrant => {
                ServiceError::business(StatusCode::BAD_REQUEST, INVALID_GRANT, message)
            }
            // Generation and persistence failures indicate internal
            // inconsistency and surface as 5xx, never retried.
            ServiceError::TokenGenerationFailed(_) => ServiceError::business(
                StatusCode::INTERNAL_SERVER_ERROR,
                TOKEN_GENERATION_FAILED,
                message,
            ),
            ServiceError::PersistenceFailed(_) => ServiceError::business(
                StatusCode::INTERNAL_SERVER_ERROR,
                PERSISTENCE_FAILED,
                message,
            ),
            ServiceError::UserNotFound => {
                ServiceError::business(StatusCode::NOT_FOUND, USER_NOT_FOUND, message)
            }
            ServiceError::RoleNotFound => {
                ServiceError::business(StatusCode::NOT_FOUND, ROLE_NOT_FOUND, message)
            }
            ServiceError::PhoneNumberAlreadyTaken => ServiceError::business(
                StatusCode::CONFLICT,
                PHONE_NUMBER_ALREADY_EXISTS,
                message,
            ),
        }
    }
}
