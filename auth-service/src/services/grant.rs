//! Grant provider registry: explicit dispatch from grant type to the
//! strategy that authenticates the request and produces an interim
//! authorization record. No persistence happens here.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use crate::models::{Authorization, GrantType, RegisteredClient, UserPrincipal};
use crate::services::store::{AuthorizationStore, CredentialStore};
use crate::services::ServiceError;
use crate::utils::{verify_password, Password, PasswordHashString};

/// Parsed token-endpoint request: the grant type plus its raw parameters
/// and the optional explicit organization context.
#[derive(Debug, Clone)]
pub struct TokenRequest {
    pub grant_type: GrantType,
    pub params: HashMap<String, String>,
    pub organization_id: Option<i64>,
}

impl TokenRequest {
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }
}

/// One grant-type strategy. Implementations authenticate the request
/// themselves and return an in-memory authorization, not yet persisted.
#[async_trait]
pub trait GrantProvider: Send + Sync {
    fn grant_type(&self) -> GrantType;

    async fn provide(
        &self,
        client: &RegisteredClient,
        request: &TokenRequest,
    ) -> Result<Authorization, ServiceError>;
}

/// Explicit grant-type -> provider mapping.
pub struct GrantProviderRegistry {
    providers: HashMap<GrantType, Arc<dyn GrantProvider>>,
}

impl GrantProviderRegistry {
    pub fn new(providers: Vec<Arc<dyn GrantProvider>>) -> Self {
        let providers = providers
            .into_iter()
            .map(|p| (p.grant_type(), p))
            .collect();
        Self { providers }
    }

    /// Dispatch to the provider registered for the request's grant type.
    pub async fn provide(
        &self,
        client: &RegisteredClient,
        request: &TokenRequest,
    ) -> Result<Authorization, ServiceError> {
        let provider = self.providers.get(&request.grant_type).ok_or_else(|| {
            ServiceError::UnsupportedGrantType(request.grant_type.to_string())
        })?;
        provider.provide(client, request).await
    }
}

/// Password grant: verifies the credential against the credential store.
pub struct PasswordGrantProvider {
    credentials: Arc<dyn CredentialStore>,
}

impl PasswordGrantProvider {
    pub fn new(credentials: Arc<dyn CredentialStore>) -> Self {
        Self { credentials }
    }
}

#[async_trait]
impl GrantProvider for PasswordGrantProvider {
    fn grant_type(&self) -> GrantType {
        GrantType::Password
    }

    async fn provide(
        &self,
        client: &RegisteredClient,
        request: &TokenRequest,
    ) -> Result<Authorization, ServiceError> {
        if !client.allows_grant(GrantType::Password) {
            return Err(ServiceError::ClientNotAuthorizedForGrant(GrantType::Password));
        }

        let username = request
            .param("username")
            .ok_or(ServiceError::InvalidCredentials)?;
        let password = request
            .param("password")
            .ok_or(ServiceError::InvalidCredentials)?;

        let user = self
            .credentials
            .find_active_by_phone(username)
            .await?
            .ok_or(ServiceError::InvalidCredentials)?;

        verify_password(
            &Password::new(password.to_string()),
            &PasswordHashString::new(user.password_hash.clone()),
        )
        .map_err(|_| ServiceError::InvalidCredentials)?;

        if !user.active {
            return Err(ServiceError::InvalidCredentials);
        }

        let role = self
            .credentials
            .find_role(user.role_id)
            .await?
            .ok_or(ServiceError::RoleNotFound)?;

        let principal = UserPrincipal::from_user(&user, &role.code);

        tracing::debug!(user_id = user.id, "Password grant authenticated");

        Ok(Authorization::interim(
            client.id,
            GrantType::Password,
            client.scopes.clone(),
            &principal,
        ))
    }
}

/// Refresh-token grant: validates a presented refresh token against the
/// stored authorization and rebuilds an interim record for re-issuance.
/// A new authorization record is created; the old one is left in place.
pub struct RefreshTokenGrantProvider {
    authorizations: Arc<dyn AuthorizationStore>,
}

impl RefreshTokenGrantProvider {
    pub fn new(authorizations: Arc<dyn AuthorizationStore>) -> Self {
        Self { authorizations }
    }
}

#[async_trait]
impl GrantProvider for RefreshTokenGrantProvider {
    fn grant_type(&self) -> GrantType {
        GrantType::RefreshToken
    }

    async fn provide(
        &self,
        client: &RegisteredClient,
        request: &TokenRequest,
    ) -> Result<Authorization, ServiceError> {
        if !client.allows_grant(GrantType::RefreshToken) {
            return Err(ServiceError::ClientNotAuthorizedForGrant(
                GrantType::RefreshToken,
            ));
        }

        let token_value = request
            .param("refresh_token")
            .ok_or(ServiceError::InvalidGrant)?;

        let stored = self
            .authorizations
            .find_by_refresh_token(token_value)
            .await?
            .ok_or(ServiceError::InvalidGrant)?;

        if stored.registered_client_id != client.id {
            return Err(ServiceError::InvalidGrant);
        }

        let refresh = stored.refresh_token.as_ref().ok_or(ServiceError::InvalidGrant)?;
        if refresh.is_expired(Utc::now()) || refresh.is_invalidated() {
            return Err(ServiceError::InvalidGrant);
        }

        let principal = stored.principal().ok_or(ServiceError::InvalidGrant)?;

        Ok(Authorization::interim(
            client.id,
            GrantType::RefreshToken,
            stored.authorized_scopes.clone(),
            &principal,
        ))
    }
}
