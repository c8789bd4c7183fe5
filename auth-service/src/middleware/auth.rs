use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::IntoResponse,
};
use service_core::error::AppError;

use crate::models::UserPrincipal;
use crate::AppState;

/// Middleware requiring a valid bearer access token. Validates signature
/// and expiry locally, then loads the credential so handlers receive a
/// fresh principal rather than claims alone.
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
        .ok_or_else(|| {
            AppError::Unauthorized(anyhow::anyhow!("Missing or invalid Authorization header"))
        })?;

    let claims = state
        .jwt
        .validate(token)
        .map_err(|_| AppError::Unauthorized(anyhow::anyhow!("Invalid or expired token")))?;

    let username = claims
        .get("sub")
        .and_then(|v| v.as_str())
        .ok_or_else(|| AppError::Unauthorized(anyhow::anyhow!("Token has no subject")))?;

    let user = state
        .db
        .find_user_by_phone(username)
        .await
        .map_err(AppError::from)?
        .filter(|u| u.active)
        .ok_or_else(|| AppError::Unauthorized(anyhow::anyhow!("Unknown or disabled user")))?;

    let role = state
        .db
        .find_role_by_id(user.role_id)
        .await
        .map_err(AppError::from)?
        .ok_or_else(|| AppError::Unauthorized(anyhow::anyhow!("User role missing")))?;

    let principal = UserPrincipal::from_user(&user, &role.code);
    req.extensions_mut().insert(principal);

    Ok(next.run(req).await)
}

/// Extractor handing the authenticated principal to handlers explicitly.
pub struct AuthPrincipal(pub UserPrincipal);

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthPrincipal
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let principal = parts.extensions.get::<UserPrincipal>().cloned().ok_or_else(|| {
            AppError::InternalError(anyhow::anyhow!(
                "Principal missing from request extensions"
            ))
        })?;

        Ok(AuthPrincipal(principal))
    }
}
