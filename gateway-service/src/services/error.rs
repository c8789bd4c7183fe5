use axum::http::StatusCode;
use service_core::error::AppError;
use thiserror::Error;

/// Business code for requests that match no forwarding rule.
pub const NO_ROUTE: i32 = 3001;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Missing bearer token")]
    MissingBearer,

    #[error("Invalid access token")]
    InvalidToken(#[source] anyhow::Error),

    #[error("Token accepted but required claim missing: {0}")]
    MissingRequiredClaim(&'static str),

    #[error("Claims resolution failed")]
    ClaimsResolution(#[source] anyhow::Error),

    #[error("No route configured for path: {0}")]
    NoRoute(String),

    #[error("Upstream request failed")]
    Upstream(#[source] anyhow::Error),
}

impl From<GatewayError> for AppError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::MissingBearer => {
                AppError::Unauthorized(anyhow::anyhow!("Missing bearer token"))
            }
            GatewayError::InvalidToken(e) => AppError::Unauthorized(e.context("Invalid token")),
            // A verified signature with an incomplete claim set is still an
            // authentication failure from the caller's point of view.
            GatewayError::MissingRequiredClaim(claim) => {
                AppError::Unauthorized(anyhow::anyhow!("Required claim missing: {}", claim))
            }
            GatewayError::ClaimsResolution(e) => {
                AppError::Unauthorized(e.context("Claims resolution failed"))
            }
            GatewayError::NoRoute(path) => AppError::Business {
                status: StatusCode::NOT_FOUND,
                code: NO_ROUTE,
                message: format!("No route for {}", path),
            },
            GatewayError::Upstream(e) => AppError::BadGateway(e.to_string()),
        }
    }
}
