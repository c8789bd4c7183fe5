//! Role management endpoints.

use axum::{extract::State, http::StatusCode, Json};
use service_core::error::AppError;

use crate::models::role::{Role, RoleCreateRequest};
use crate::utils::validation::ValidatedJson;
use crate::AppState;

/// Create a role
#[utoipa::path(
    post,
    path = "/api/roles",
    request_body = RoleCreateRequest,
    responses(
        (status = 201, description = "Role created", body = Role),
        (status = 200, description = "Role already existed", body = Role),
        (status = 400, description = "Validation failure")
    ),
    security(("bearer_auth" = [])),
    tag = "Roles"
)]
pub async fn create_role(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<RoleCreateRequest>,
) -> Result<(StatusCode, Json<Role>), AppError> {
    // Role creation is idempotent by code.
    if let Some(existing) = state.db.find_role_by_code(&req.code).await? {
        return Ok((StatusCode::OK, Json(existing)));
    }

    let role = state.db.insert_role(&req.code, &req.name).await?;
    tracing::info!(role_id = role.id, code = %role.code, "Role created");

    Ok((StatusCode::CREATED, Json(role)))
}

/// List roles
#[utoipa::path(
    get,
    path = "/api/roles",
    responses((status = 200, description = "All roles", body = [Role])),
    security(("bearer_auth" = [])),
    tag = "Roles"
)]
pub async fn list_roles(State(state): State<AppState>) -> Result<Json<Vec<Role>>, AppError> {
    let roles = state.db.list_roles().await?;
    Ok(Json(roles))
}
