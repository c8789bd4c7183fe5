//! Token issuance pipeline.
//!
//! Takes an authenticated grant (an interim authorization record), merges
//! the explicit organization context, generates access and refresh
//! tokens with customized claims, persists exactly one authorization
//! record and returns the token response.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use base64::Engine;
use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::Serialize;
use serde_json::{json, Map, Value};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::constants::{
    CLAIMS_METADATA_KEY, INVALIDATED_METADATA_KEY, ORGANIZATION_ID_KEY, ROLE_KEY, USER_ID_KEY,
};
use crate::models::{Authorization, GrantType, RegisteredClient, TokenRecord, UserPrincipal};
use crate::services::store::{AuthorizationStore, OrganizationResolver};
use crate::services::{JwtService, ServiceError};

/// Token-generation context. Constructed only after the authorization's
/// attribute map is final; it holds shared borrows, so the record cannot
/// be edited while generation is in flight.
pub struct TokenContext<'a> {
    pub registered_client: &'a RegisteredClient,
    pub principal: &'a UserPrincipal,
    pub grant_type: GrantType,
    pub authorization: &'a Authorization,
    pub authorized_scopes: &'a [String],
}

/// A generated token value with its timestamps, computed once at
/// generation and reused verbatim for persistence.
#[derive(Debug, Clone)]
pub struct GeneratedToken {
    pub value: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub claims: Option<Map<String, Value>>,
}

/// Token generator: one family per token type, both fed from the same
/// context.
pub trait TokenGenerator: Send + Sync {
    fn generate_access(
        &self,
        context: &TokenContext<'_>,
        custom_claims: &Map<String, Value>,
    ) -> Result<GeneratedToken, ServiceError>;

    fn generate_refresh(&self, context: &TokenContext<'_>)
        -> Result<GeneratedToken, ServiceError>;
}

/// Default generator: self-contained RS256 JWT access tokens, opaque
/// random refresh tokens. Lifetimes come from the registered client.
pub struct JwtTokenGenerator {
    jwt: JwtService,
}

impl JwtTokenGenerator {
    pub fn new(jwt: JwtService) -> Self {
        Self { jwt }
    }
}

impl TokenGenerator for JwtTokenGenerator {
    fn generate_access(
        &self,
        context: &TokenContext<'_>,
        custom_claims: &Map<String, Value>,
    ) -> Result<GeneratedToken, ServiceError> {
        let issued_at = Utc::now();
        let expires_at =
            issued_at + chrono::Duration::seconds(context.registered_client.access_token_ttl_secs);

        let mut claims = Map::new();
        claims.insert("iss".to_string(), json!(self.jwt.issuer()));
        claims.insert(
            "sub".to_string(),
            json!(context.authorization.principal_name),
        );
        claims.insert(
            "aud".to_string(),
            json!(context.registered_client.client_id),
        );
        claims.insert("iat".to_string(), json!(issued_at.timestamp()));
        claims.insert("exp".to_string(), json!(expires_at.timestamp()));
        claims.insert("jti".to_string(), json!(Uuid::new_v4().to_string()));
        claims.insert(
            "scope".to_string(),
            json!(context.authorized_scopes.join(" ")),
        );
        for (key, value) in custom_claims {
            claims.insert(key.clone(), value.clone());
        }

        let value = self
            .jwt
            .sign(&claims)
            .map_err(|e| ServiceError::TokenGenerationFailed(e.to_string()))?;

        Ok(GeneratedToken {
            value,
            issued_at,
            expires_at,
            claims: Some(claims),
        })
    }

    fn generate_refresh(
        &self,
        context: &TokenContext<'_>,
    ) -> Result<GeneratedToken, ServiceError> {
        let issued_at = Utc::now();
        let expires_at =
            issued_at + chrono::Duration::seconds(context.registered_client.refresh_token_ttl_secs);

        let mut bytes = [0u8; 48];
        rand::thread_rng().fill_bytes(&mut bytes);
        let value = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes);

        Ok(GeneratedToken {
            value,
            issued_at,
            expires_at,
            claims: None,
        })
    }
}

/// Token response returned to the client.
#[derive(Debug, Serialize, ToSchema)]
pub struct TokenResponse {
    pub access_token: String,
    #[schema(example = "bearer")]
    pub token_type: String,
    pub expires_in: i64,
    pub scope: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

/// The issuance pipeline itself.
pub struct TokenIssuer {
    generator: Arc<dyn TokenGenerator>,
    store: Arc<dyn AuthorizationStore>,
    organizations: Arc<dyn OrganizationResolver>,
    org_lookup_timeout: Duration,
}

impl TokenIssuer {
    pub fn new(
        generator: Arc<dyn TokenGenerator>,
        store: Arc<dyn AuthorizationStore>,
        organizations: Arc<dyn OrganizationResolver>,
        org_lookup_timeout: Duration,
    ) -> Self {
        Self {
            generator,
            store,
            organizations,
            org_lookup_timeout,
        }
    }

    /// Issue tokens for an authenticated grant.
    ///
    /// The explicit organization id is merged into the authorization's
    /// attributes before the token context exists; the claims step only
    /// sees attributes present at context-build time.
    pub async fn issue(
        &self,
        client: &RegisteredClient,
        principal: &UserPrincipal,
        mut authorization: Authorization,
        requested_org_id: Option<i64>,
    ) -> Result<TokenResponse, ServiceError> {
        if let Some(org_id) = requested_org_id {
            authorization
                .attributes
                .insert(ORGANIZATION_ID_KEY.to_string(), json!(org_id));
        }

        let grant_type = authorization.grant_type;
        let scopes = authorization.authorized_scopes.clone();
        let context = TokenContext {
            registered_client: client,
            principal,
            grant_type,
            authorization: &authorization,
            authorized_scopes: &scopes,
        };

        let custom_claims = self.customize_claims(&context).await;

        let access = self.generator.generate_access(&context, &custom_claims)?;

        let refresh = if client.allows_grant(GrantType::RefreshToken) {
            match self.generator.generate_refresh(&context) {
                Ok(token) => Some(token),
                // The access token is already generated and stays valid;
                // the response simply carries no refresh token.
                Err(e) => {
                    tracing::warn!(
                        client_id = %client.client_id,
                        error = %e,
                        "Refresh token generation failed"
                    );
                    None
                }
            }
        } else {
            None
        };

        let mut access_metadata = HashMap::new();
        access_metadata.insert(INVALIDATED_METADATA_KEY.to_string(), json!(false));
        if let Some(claims) = &access.claims {
            access_metadata.insert(
                CLAIMS_METADATA_KEY.to_string(),
                Value::Object(claims.clone()),
            );
        }
        authorization.access_token = Some(TokenRecord {
            value: access.value.clone(),
            issued_at: access.issued_at,
            expires_at: access.expires_at,
            metadata: access_metadata,
            scopes: scopes.clone(),
        });

        if let Some(refresh) = &refresh {
            let mut metadata = HashMap::new();
            metadata.insert(INVALIDATED_METADATA_KEY.to_string(), json!(false));
            authorization.refresh_token = Some(TokenRecord {
                value: refresh.value.clone(),
                issued_at: refresh.issued_at,
                expires_at: refresh.expires_at,
                metadata,
                scopes: Vec::new(),
            });
        }

        // The single write of the pipeline. On failure the generated
        // token values must not reach the caller.
        self.store.save(&authorization).await.map_err(|e| match e {
            ServiceError::PersistenceFailed(_) => e,
            other => ServiceError::PersistenceFailed(other.to_string()),
        })?;

        tracing::info!(
            user_id = principal.user_id,
            client_id = %client.client_id,
            grant_type = %grant_type,
            "Token issued"
        );

        Ok(TokenResponse {
            access_token: access.value,
            token_type: "bearer".to_string(),
            expires_in: (access.expires_at - access.issued_at).num_seconds(),
            scope: scopes.join(" "),
            refresh_token: refresh.map(|t| t.value),
        })
    }

    /// Claims customization: numeric user-id claim and role-list claim,
    /// plus the organization-context claim when resolvable.
    ///
    /// Precedence: the explicit attribute merged before context build
    /// wins; otherwise the active organization is looked up with a
    /// bounded external call. Lookup failure or timeout means the claim
    /// is absent, never an issuance error.
    async fn customize_claims(&self, context: &TokenContext<'_>) -> Map<String, Value> {
        let mut claims = Map::new();
        claims.insert(USER_ID_KEY.to_string(), json!(context.principal.user_id));
        claims.insert(ROLE_KEY.to_string(), json!(context.principal.authorities));

        let org_id = match context.authorization.organization_attribute() {
            Some(explicit) => Some(explicit),
            None => {
                let lookup = self
                    .organizations
                    .active_organization(context.principal.user_id);
                match tokio::time::timeout(self.org_lookup_timeout, lookup).await {
                    Ok(Ok(found)) => found,
                    Ok(Err(e)) => {
                        tracing::warn!(
                            user_id = context.principal.user_id,
                            error = %e,
                            "Active-organization lookup failed; omitting organization claim"
                        );
                        None
                    }
                    Err(_) => {
                        tracing::warn!(
                            user_id = context.principal.user_id,
                            "Active-organization lookup timed out; omitting organization claim"
                        );
                        None
                    }
                }
            }
        };

        if let Some(org_id) = org_id {
            claims.insert(ORGANIZATION_ID_KEY.to_string(), json!(org_id));
        }

        claims
    }
}
