//! PostgreSQL store implementations.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::postgres::PgPool;
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::{Authorization, GrantType, RegisteredClient, Role, TokenRecord, User};
use crate::models::user::UserUpdateRequest;
use crate::services::store::{AuthorizationStore, ClientStore, CredentialStore};
use crate::services::ServiceError;

/// PostgreSQL database wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Health check - ping the database.
    pub async fn health_check(&self) -> Result<(), ServiceError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    // ==================== User Operations ====================

    pub async fn find_user_by_id(&self, id: i64) -> Result<Option<User>, ServiceError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE id = $1 AND deleted = FALSE",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    pub async fn find_user_by_phone(&self, phone_num: &str) -> Result<Option<User>, ServiceError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE phone_num = $1 AND deleted = FALSE",
        )
        .bind(phone_num)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    pub async fn phone_exists(&self, phone_num: &str) -> Result<bool, ServiceError> {
        let row: (bool,) =
            sqlx::query_as("SELECT EXISTS (SELECT 1 FROM users WHERE phone_num = $1)")
                .bind(phone_num)
                .fetch_one(&self.pool)
                .await?;
        Ok(row.0)
    }

    pub async fn insert_user(
        &self,
        first_name: &str,
        last_name: Option<&str>,
        phone_num: &str,
        password_hash: &str,
        role_id: i64,
        org_id: Option<i64>,
    ) -> Result<User, ServiceError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (first_name, last_name, phone_num, password_hash, role_id, org_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(first_name)
        .bind(last_name)
        .bind(phone_num)
        .bind(password_hash)
        .bind(role_id)
        .bind(org_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(user)
    }

    pub async fn update_user(
        &self,
        id: i64,
        req: &UserUpdateRequest,
    ) -> Result<Option<User>, ServiceError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET first_name = COALESCE($2, first_name),
                last_name = COALESCE($3, last_name),
                org_id = COALESCE($4, org_id),
                updated_at = now()
            WHERE id = $1 AND deleted = FALSE
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(req.first_name.as_deref())
        .bind(req.last_name.as_deref())
        .bind(req.org_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    /// Soft delete - the row stays, flagged deleted and deactivated.
    pub async fn soft_delete_user(&self, id: i64) -> Result<bool, ServiceError> {
        let result = sqlx::query(
            "UPDATE users SET deleted = TRUE, active = FALSE, updated_at = now() \
             WHERE id = $1 AND deleted = FALSE",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn list_users(&self) -> Result<Vec<User>, ServiceError> {
        let users =
            sqlx::query_as::<_, User>("SELECT * FROM users WHERE deleted = FALSE ORDER BY id")
                .fetch_all(&self.pool)
                .await?;
        Ok(users)
    }

    // ==================== Role Operations ====================

    pub async fn find_role_by_id(&self, id: i64) -> Result<Option<Role>, ServiceError> {
        let role = sqlx::query_as::<_, Role>("SELECT * FROM roles WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(role)
    }

    pub async fn find_role_by_code(&self, code: &str) -> Result<Option<Role>, ServiceError> {
        let role = sqlx::query_as::<_, Role>("SELECT * FROM roles WHERE code = $1")
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;
        Ok(role)
    }

    pub async fn insert_role(&self, code: &str, name: &str) -> Result<Role, ServiceError> {
        let role = sqlx::query_as::<_, Role>(
            "INSERT INTO roles (code, name) VALUES ($1, $2) RETURNING *",
        )
        .bind(code)
        .bind(name)
        .fetch_one(&self.pool)
        .await?;
        Ok(role)
    }

    pub async fn list_roles(&self) -> Result<Vec<Role>, ServiceError> {
        let roles = sqlx::query_as::<_, Role>("SELECT * FROM roles ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(roles)
    }
}

#[async_trait]
impl CredentialStore for Database {
    async fn find_active_by_phone(&self, phone_num: &str) -> Result<Option<User>, ServiceError> {
        self.find_user_by_phone(phone_num).await
    }

    async fn find_role(&self, role_id: i64) -> Result<Option<Role>, ServiceError> {
        self.find_role_by_id(role_id).await
    }
}

#[async_trait]
impl ClientStore for Database {
    async fn find_by_client_id(
        &self,
        client_id: &str,
    ) -> Result<Option<RegisteredClient>, ServiceError> {
        let client = sqlx::query_as::<_, RegisteredClient>(
            "SELECT * FROM auth_clients WHERE client_id = $1 AND active = TRUE",
        )
        .bind(client_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(client)
    }
}

/// Row shape for `auth_authorizations`. The free-form maps are stored as
/// serialized JSON text; conversion to the rich model happens below.
#[derive(Debug, FromRow)]
struct AuthorizationRow {
    id: Uuid,
    registered_client_id: Uuid,
    principal_name: String,
    grant_type: String,
    authorized_scopes: Vec<String>,
    attributes: Option<String>,
    access_token_value: String,
    access_token_issued_at: DateTime<Utc>,
    access_token_expires_at: DateTime<Utc>,
    access_token_metadata: Option<String>,
    access_token_scopes: Vec<String>,
    refresh_token_value: Option<String>,
    refresh_token_issued_at: Option<DateTime<Utc>>,
    refresh_token_expires_at: Option<DateTime<Utc>>,
    refresh_token_metadata: Option<String>,
}

fn parse_map(raw: Option<&str>) -> HashMap<String, Value> {
    raw.and_then(|s| serde_json::from_str(s).ok())
        .unwrap_or_default()
}

fn serialize_map(map: &HashMap<String, Value>) -> Result<String, ServiceError> {
    serde_json::to_string(map)
        .map_err(|e| ServiceError::Internal(anyhow::anyhow!("Serializing attribute map: {}", e)))
}

impl TryFrom<AuthorizationRow> for Authorization {
    type Error = ServiceError;

    fn try_from(row: AuthorizationRow) -> Result<Self, ServiceError> {
        let grant_type = GrantType::parse(&row.grant_type).ok_or_else(|| {
            ServiceError::Internal(anyhow::anyhow!(
                "Stored authorization {} has unknown grant type {}",
                row.id,
                row.grant_type
            ))
        })?;

        let access_token = TokenRecord {
            value: row.access_token_value,
            issued_at: row.access_token_issued_at,
            expires_at: row.access_token_expires_at,
            metadata: parse_map(row.access_token_metadata.as_deref()),
            scopes: row.access_token_scopes,
        };

        let refresh_token = match (
            row.refresh_token_value,
            row.refresh_token_issued_at,
            row.refresh_token_expires_at,
        ) {
            (Some(value), Some(issued_at), Some(expires_at)) => Some(TokenRecord {
                value,
                issued_at,
                expires_at,
                metadata: parse_map(row.refresh_token_metadata.as_deref()),
                scopes: Vec::new(),
            }),
            _ => None,
        };

        Ok(Authorization {
            id: row.id,
            registered_client_id: row.registered_client_id,
            principal_name: row.principal_name,
            grant_type,
            authorized_scopes: row.authorized_scopes,
            attributes: parse_map(row.attributes.as_deref()),
            access_token: Some(access_token),
            refresh_token,
        })
    }
}

#[async_trait]
impl AuthorizationStore for Database {
    async fn save(&self, authorization: &Authorization) -> Result<(), ServiceError> {
        let access = authorization.access_token.as_ref().ok_or_else(|| {
            ServiceError::Internal(anyhow::anyhow!(
                "Authorization {} has no access token to persist",
                authorization.id
            ))
        })?;

        let attributes = serialize_map(&authorization.attributes)?;
        let access_metadata = serialize_map(&access.metadata)?;
        let refresh = authorization.refresh_token.as_ref();
        let refresh_metadata = refresh.map(|t| serialize_map(&t.metadata)).transpose()?;

        sqlx::query(
            r#"
            INSERT INTO auth_authorizations (
                id, registered_client_id, principal_name, grant_type,
                authorized_scopes, attributes,
                access_token_value, access_token_issued_at, access_token_expires_at,
                access_token_metadata, access_token_scopes,
                refresh_token_value, refresh_token_issued_at, refresh_token_expires_at,
                refresh_token_metadata
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            "#,
        )
        .bind(authorization.id)
        .bind(authorization.registered_client_id)
        .bind(&authorization.principal_name)
        .bind(authorization.grant_type.as_str())
        .bind(&authorization.authorized_scopes)
        .bind(attributes)
        .bind(&access.value)
        .bind(access.issued_at)
        .bind(access.expires_at)
        .bind(access_metadata)
        .bind(&access.scopes)
        .bind(refresh.map(|t| t.value.clone()))
        .bind(refresh.map(|t| t.issued_at))
        .bind(refresh.map(|t| t.expires_at))
        .bind(refresh_metadata)
        .execute(&self.pool)
        .await
        .map_err(|e| ServiceError::PersistenceFailed(e.to_string()))?;

        Ok(())
    }

    async fn find_by_access_token(
        &self,
        token_value: &str,
    ) -> Result<Option<Authorization>, ServiceError> {
        let row = sqlx::query_as::<_, AuthorizationRow>(
            "SELECT * FROM auth_authorizations WHERE access_token_value = $1",
        )
        .bind(token_value)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Authorization::try_from).transpose()
    }

    async fn find_by_refresh_token(
        &self,
        token_value: &str,
    ) -> Result<Option<Authorization>, ServiceError> {
        let row = sqlx::query_as::<_, AuthorizationRow>(
            "SELECT * FROM auth_authorizations WHERE refresh_token_value = $1",
        )
        .bind(token_value)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Authorization::try_from).transpose()
    }

    async fn find_by_client_and_principal(
        &self,
        registered_client_id: Uuid,
        principal_name: &str,
    ) -> Result<Vec<Authorization>, ServiceError> {
        let rows = sqlx::query_as::<_, AuthorizationRow>(
            "SELECT * FROM auth_authorizations \
             WHERE registered_client_id = $1 AND principal_name = $2 \
             ORDER BY created_at DESC",
        )
        .bind(registered_client_id)
        .bind(principal_name)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Authorization::try_from).collect()
    }
}
