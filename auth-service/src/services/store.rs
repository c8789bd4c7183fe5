//! Store traits behind the token issuance pipeline.
//!
//! The pipeline only depends on these traits; Postgres implementations
//! live in [`crate::services::database`], in-memory implementations below
//! back the tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{Authorization, RegisteredClient, Role, User};
use crate::services::ServiceError;

/// Credential store: user identity and role lookups for grant providers.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Non-deleted user by phone number (the unique username).
    async fn find_active_by_phone(&self, phone_num: &str) -> Result<Option<User>, ServiceError>;

    async fn find_role(&self, role_id: i64) -> Result<Option<Role>, ServiceError>;
}

/// Registered client registry.
#[async_trait]
pub trait ClientStore: Send + Sync {
    /// Active client by its public client id.
    async fn find_by_client_id(
        &self,
        client_id: &str,
    ) -> Result<Option<RegisteredClient>, ServiceError>;
}

/// Durable store of authorization records. One write per issuance; all
/// lookups are keyed (indexed) so token resolution stays O(1).
#[async_trait]
pub trait AuthorizationStore: Send + Sync {
    async fn save(&self, authorization: &Authorization) -> Result<(), ServiceError>;

    async fn find_by_access_token(
        &self,
        token_value: &str,
    ) -> Result<Option<Authorization>, ServiceError>;

    async fn find_by_refresh_token(
        &self,
        token_value: &str,
    ) -> Result<Option<Authorization>, ServiceError>;

    async fn find_by_client_and_principal(
        &self,
        registered_client_id: Uuid,
        principal_name: &str,
    ) -> Result<Vec<Authorization>, ServiceError>;
}

/// Organization-resolution collaborator: resolves a user's currently
/// active organization. The issuance pipeline swallows failures here and
/// omits the claim; every other store failure is surfaced.
#[async_trait]
pub trait OrganizationResolver: Send + Sync {
    async fn active_organization(&self, user_id: i64) -> Result<Option<i64>, ServiceError>;
}

/// In-memory authorization store used by tests.
#[derive(Default)]
pub struct InMemoryAuthorizationStore {
    records: Mutex<HashMap<Uuid, Authorization>>,
}

impl InMemoryAuthorizationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl AuthorizationStore for InMemoryAuthorizationStore {
    async fn save(&self, authorization: &Authorization) -> Result<(), ServiceError> {
        self.records
            .lock()
            .unwrap()
            .insert(authorization.id, authorization.clone());
        Ok(())
    }

    async fn find_by_access_token(
        &self,
        token_value: &str,
    ) -> Result<Option<Authorization>, ServiceError> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .values()
            .find(|a| {
                a.access_token
                    .as_ref()
                    .is_some_and(|t| t.value == token_value)
            })
            .cloned())
    }

    async fn find_by_refresh_token(
        &self,
        token_value: &str,
    ) -> Result<Option<Authorization>, ServiceError> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .values()
            .find(|a| {
                a.refresh_token
                    .as_ref()
                    .is_some_and(|t| t.value == token_value)
            })
            .cloned())
    }

    async fn find_by_client_and_principal(
        &self,
        registered_client_id: Uuid,
        principal_name: &str,
    ) -> Result<Vec<Authorization>, ServiceError> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .values()
            .filter(|a| {
                a.registered_client_id == registered_client_id
                    && a.principal_name == principal_name
            })
            .cloned()
            .collect())
    }
}
