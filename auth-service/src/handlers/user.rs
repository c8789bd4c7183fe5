//! User CRUD surface plus the internal claims-resolution endpoint.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use service_core::error::AppError;

use crate::middleware::AuthPrincipal;
use crate::models::user::{UserCreateRequest, UserInfoResponse, UserResponse, UserUpdateRequest};
use crate::services::ServiceError;
use crate::utils::password::{hash_password, Password};
use crate::utils::validation::ValidatedJson;
use crate::AppState;

/// Register a new user
#[utoipa::path(
    post,
    path = "/api/users",
    request_body = UserCreateRequest,
    responses(
        (status = 201, description = "User created", body = UserResponse),
        (status = 400, description = "Validation failure"),
        (status = 404, description = "Role not found"),
        (status = 409, description = "Phone number already taken")
    ),
    tag = "Users"
)]
pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<UserCreateRequest>,
) -> Result<(StatusCode, Json<UserResponse>), AppError> {
    if state.db.phone_exists(&req.phone_num).await? {
        return Err(ServiceError::PhoneNumberAlreadyTaken.into());
    }

    state
        .db
        .find_role_by_id(req.role_id)
        .await?
        .ok_or(ServiceError::RoleNotFound)?;

    let hash = hash_password(&Password::new(req.password.clone()))
        .map_err(AppError::InternalError)?;

    let user = state
        .db
        .insert_user(
            &req.first_name,
            req.last_name.as_deref(),
            &req.phone_num,
            hash.as_str(),
            req.role_id,
            req.org_id,
        )
        .await?;

    tracing::info!(user_id = user.id, "User registered");

    Ok((StatusCode::CREATED, Json(user.into())))
}

/// Current authenticated user
#[utoipa::path(
    get,
    path = "/api/users/me",
    responses(
        (status = 200, description = "Current user", body = UserResponse),
        (status = 401, description = "Missing or invalid token")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn me(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
) -> Result<Json<UserResponse>, AppError> {
    let user = state
        .db
        .find_user_by_id(principal.user_id)
        .await?
        .ok_or(ServiceError::UserNotFound)?;

    Ok(Json(user.into()))
}

/// Claims-resolution payload for the gateway. Served from the same
/// bearer-token middleware as the public surface; the response field
/// names are the inter-service contract.
pub async fn user_info(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
) -> Result<Json<UserInfoResponse>, AppError> {
    let role = principal
        .authorities
        .first()
        .cloned()
        .ok_or(ServiceError::RoleNotFound)?;

    Ok(Json(UserInfoResponse {
        user_id: principal.user_id,
        username: principal.username.clone(),
        phone_num: principal.username,
        role,
        organization_id: principal.organization_id,
    }))
}

/// Fetch a user by id
#[utoipa::path(
    get,
    path = "/api/users/{id}",
    params(("id" = i64, Path, description = "User id")),
    responses(
        (status = 200, description = "User found", body = UserResponse),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<UserResponse>, AppError> {
    let user = state
        .db
        .find_user_by_id(id)
        .await?
        .ok_or(ServiceError::UserNotFound)?;

    Ok(Json(user.into()))
}

/// List users
#[utoipa::path(
    get,
    path = "/api/users",
    responses((status = 200, description = "All active users", body = [UserResponse])),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn list_users(
    State(state): State<AppState>,
) -> Result<Json<Vec<UserResponse>>, AppError> {
    let users = state.db.list_users().await?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

/// Update a user
#[utoipa::path(
    put,
    path = "/api/users/{id}",
    params(("id" = i64, Path, description = "User id")),
    request_body = UserUpdateRequest,
    responses(
        (status = 200, description = "User updated", body = UserResponse),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    ValidatedJson(req): ValidatedJson<UserUpdateRequest>,
) -> Result<Json<UserResponse>, AppError> {
    let user = state
        .db
        .update_user(id, &req)
        .await?
        .ok_or(ServiceError::UserNotFound)?;

    Ok(Json(user.into()))
}

/// Soft-delete a user
#[utoipa::path(
    delete,
    path = "/api/users/{id}",
    params(("id" = i64, Path, description = "User id")),
    responses(
        (status = 204, description = "User deleted"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    if !state.db.soft_delete_user(id).await? {
        return Err(ServiceError::UserNotFound.into());
    }

    tracing::info!(user_id = id, "User soft-deleted");

    Ok(StatusCode::NO_CONTENT)
}
