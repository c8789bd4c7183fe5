//! Role model - immutable role codes assigned to users.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

/// Role entity. Created at bootstrap or on demand, never mutated.
#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
pub struct Role {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RoleCreateRequest {
    #[validate(length(min = 1, max = 20, message = "Role code must be 1-20 characters"))]
    #[schema(example = "ROLE_ADMIN")]
    pub code: String,

    #[validate(length(min = 1, max = 50, message = "Role name must be 1-50 characters"))]
    #[schema(example = "Administrator")]
    pub name: String,
}
