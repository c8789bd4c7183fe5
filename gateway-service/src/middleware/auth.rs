use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::IntoResponse,
};
use service_core::error::AppError;

use crate::services::{AuthenticatedPrincipal, GatewayError};
use crate::AppState;

/// Middleware verifying the bearer token on every forwarded request and
/// attaching the authenticated principal for the proxy layer.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<impl IntoResponse, AppError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or(GatewayError::MissingBearer)?
        .to_string();

    let principal = state.verifier.verify(&token).await?;

    tracing::debug!(username = %principal.username, "Request authenticated");
    req.extensions_mut().insert(principal);

    Ok(next.run(req).await)
}

pub struct GatewayPrincipal(pub AuthenticatedPrincipal);

#[axum::async_trait]
impl<S> FromRequestParts<S> for GatewayPrincipal
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let principal = parts
            .extensions
            .get::<AuthenticatedPrincipal>()
            .cloned()
            .ok_or_else(|| {
                AppError::InternalError(anyhow::anyhow!(
                    "Principal missing from request extensions"
                ))
            })?;

        Ok(GatewayPrincipal(principal))
    }
}
