//! Registered OAuth2 client model.

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use super::authorization::GrantType;

/// Registered client definition. Static configuration, rarely mutated;
/// token lifetimes for every issuance come from here, never from code.
#[derive(Debug, Clone, FromRow)]
pub struct RegisteredClient {
    pub id: Uuid,
    pub client_id: String,
    pub client_secret: String,
    pub auth_methods: Vec<String>,
    pub grant_types: Vec<String>,
    pub scopes: Vec<String>,
    pub access_token_ttl_secs: i64,
    pub refresh_token_ttl_secs: i64,
    pub token_format: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl RegisteredClient {
    /// Whether this client may use the given grant type.
    pub fn allows_grant(&self, grant_type: GrantType) -> bool {
        self.grant_types.iter().any(|g| g == grant_type.as_str())
    }
}
