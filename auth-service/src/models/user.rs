//! User model - credentials with role and organization affiliation.
//!
//! Users are soft-deleted only; a deleted row stays in place with the
//! `deleted` flag set so issued tokens remain attributable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

/// User entity.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i64,
    pub first_name: String,
    pub last_name: Option<String>,
    pub phone_num: String,
    pub password_hash: String,
    pub org_id: Option<i64>,
    pub role_id: i64,
    pub active: bool,
    pub deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UserCreateRequest {
    #[validate(length(min = 1, max = 72, message = "First name must be 1-72 characters"))]
    #[schema(example = "Jasur")]
    pub first_name: String,

    #[validate(length(max = 60, message = "Last name must be at most 60 characters"))]
    #[schema(example = "Karimov")]
    pub last_name: Option<String>,

    #[validate(length(min = 7, max = 32, message = "Phone number must be 7-32 characters"))]
    #[schema(example = "+998901234567")]
    pub phone_num: String,

    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    #[schema(example = "password123", min_length = 8)]
    pub password: String,

    #[schema(example = 1)]
    pub role_id: i64,

    #[schema(example = 42)]
    pub org_id: Option<i64>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UserUpdateRequest {
    #[validate(length(min = 1, max = 72, message = "First name must be 1-72 characters"))]
    pub first_name: Option<String>,

    #[validate(length(max = 60, message = "Last name must be at most 60 characters"))]
    pub last_name: Option<String>,

    pub org_id: Option<i64>,
}

/// User response for the API (no credential material).
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserResponse {
    pub id: i64,
    pub first_name: String,
    pub last_name: Option<String>,
    pub phone_num: String,
    pub org_id: Option<i64>,
    pub role_id: i64,
    pub active: bool,
}

impl From<User> for UserResponse {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            first_name: u.first_name,
            last_name: u.last_name,
            phone_num: u.phone_num,
            org_id: u.org_id,
            role_id: u.role_id,
            active: u.active,
        }
    }
}

/// Claims-resolution payload served to the gateway. Field names are part
/// of the inter-service contract: the gateway requires `username` (or
/// `phoneNum`) and `role`.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserInfoResponse {
    pub user_id: i64,
    pub username: String,
    pub phone_num: String,
    pub role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<i64>,
}
