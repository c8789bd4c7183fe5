//! Grant provider behavior: credential verification, client grant
//! authorization and refresh-token validation.

mod common;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;

use auth_service::models::{Authorization, GrantType, Role, TokenRecord, User};
use auth_service::services::{
    AuthorizationStore, CredentialStore, GrantProvider, GrantProviderRegistry,
    InMemoryAuthorizationStore, PasswordGrantProvider, RefreshTokenGrantProvider, ServiceError,
    TokenRequest,
};
use auth_service::utils::{hash_password, Password};

use common::{principal, registered_client};

const PHONE: &str = "+998901234567";
const PASSWORD: &str = "correct-horse-battery";

struct SingleUserStore {
    user: User,
    role: Role,
}

impl SingleUserStore {
    fn new() -> Self {
        let hash = hash_password(&Password::new(PASSWORD.to_string())).expect("hash");
        let now = Utc::now();
        Self {
            user: User {
                id: 11,
                first_name: "Jasur".to_string(),
                last_name: None,
                phone_num: PHONE.to_string(),
                password_hash: hash.into_string(),
                org_id: None,
                role_id: 1,
                active: true,
                deleted: false,
                created_at: now,
                updated_at: now,
            },
            role: Role {
                id: 1,
                code: "ROLE_USER".to_string(),
                name: "User".to_string(),
                created_at: now,
            },
        }
    }
}

#[async_trait]
impl CredentialStore for SingleUserStore {
    async fn find_active_by_phone(&self, phone_num: &str) -> Result<Option<User>, ServiceError> {
        if phone_num == self.user.phone_num && !self.user.deleted {
            Ok(Some(self.user.clone()))
        } else {
            Ok(None)
        }
    }

    async fn find_role(&self, role_id: i64) -> Result<Option<Role>, ServiceError> {
        if role_id == self.role.id {
            Ok(Some(self.role.clone()))
        } else {
            Ok(None)
        }
    }
}

fn password_request(username: &str, password: &str) -> TokenRequest {
    let mut params = HashMap::new();
    params.insert("grant_type".to_string(), "password".to_string());
    params.insert("username".to_string(), username.to_string());
    params.insert("password".to_string(), password.to_string());
    TokenRequest {
        grant_type: GrantType::Password,
        params,
        organization_id: None,
    }
}

fn refresh_request(token: &str) -> TokenRequest {
    let mut params = HashMap::new();
    params.insert("grant_type".to_string(), "refresh_token".to_string());
    params.insert("refresh_token".to_string(), token.to_string());
    TokenRequest {
        grant_type: GrantType::RefreshToken,
        params,
        organization_id: None,
    }
}

#[tokio::test]
async fn password_grant_authenticates_and_builds_interim_record() {
    let provider = PasswordGrantProvider::new(Arc::new(SingleUserStore::new()));
    let client = registered_client();

    let authorization = provider
        .provide(&client, &password_request(PHONE, PASSWORD))
        .await
        .expect("grant");

    assert_eq!(authorization.grant_type, GrantType::Password);
    assert_eq!(authorization.registered_client_id, client.id);
    assert_eq!(authorization.principal_name, PHONE);
    assert_eq!(authorization.authorized_scopes, client.scopes);
    assert!(authorization.access_token.is_none());

    let restored = authorization.principal().expect("principal");
    assert_eq!(restored.user_id, 11);
    assert_eq!(restored.authorities, vec!["ROLE_USER".to_string()]);
}

#[tokio::test]
async fn password_grant_rejects_wrong_password() {
    let provider = PasswordGrantProvider::new(Arc::new(SingleUserStore::new()));
    let client = registered_client();

    let result = provider
        .provide(&client, &password_request(PHONE, "wrong-password"))
        .await;
    assert!(matches!(result, Err(ServiceError::InvalidCredentials)));
}

#[tokio::test]
async fn password_grant_rejects_unknown_user() {
    let provider = PasswordGrantProvider::new(Arc::new(SingleUserStore::new()));
    let client = registered_client();

    let result = provider
        .provide(&client, &password_request("+998000000000", PASSWORD))
        .await;
    assert!(matches!(result, Err(ServiceError::InvalidCredentials)));
}

#[tokio::test]
async fn password_grant_rejects_disabled_user() {
    let mut store = SingleUserStore::new();
    store.user.active = false;
    let provider = PasswordGrantProvider::new(Arc::new(store));
    let client = registered_client();

    let result = provider
        .provide(&client, &password_request(PHONE, PASSWORD))
        .await;
    assert!(matches!(result, Err(ServiceError::InvalidCredentials)));
}

#[tokio::test]
async fn password_grant_requires_client_authorization() {
    let provider = PasswordGrantProvider::new(Arc::new(SingleUserStore::new()));
    let mut client = registered_client();
    client.grant_types = vec!["refresh_token".to_string()];

    let result = provider
        .provide(&client, &password_request(PHONE, PASSWORD))
        .await;
    assert!(matches!(
        result,
        Err(ServiceError::ClientNotAuthorizedForGrant(GrantType::Password))
    ));
}

#[tokio::test]
async fn registry_dispatches_by_grant_type() {
    let registry = GrantProviderRegistry::new(vec![Arc::new(PasswordGrantProvider::new(
        Arc::new(SingleUserStore::new()),
    )) as Arc<dyn GrantProvider>]);
    let client = registered_client();

    let authorization = registry
        .provide(&client, &password_request(PHONE, PASSWORD))
        .await
        .expect("grant");
    assert_eq!(authorization.grant_type, GrantType::Password);

    // No provider registered for refresh_token in this registry.
    let result = registry.provide(&client, &refresh_request("whatever")).await;
    assert!(matches!(result, Err(ServiceError::UnsupportedGrantType(_))));
}

fn stored_authorization_with_refresh(
    client_id: uuid::Uuid,
    refresh_value: &str,
    expires_in_secs: i64,
    invalidated: bool,
) -> Authorization {
    let user = principal(11);
    let mut authorization =
        Authorization::interim(client_id, GrantType::Password, vec!["api".to_string()], &user);

    let now = Utc::now();
    let mut metadata = HashMap::new();
    metadata.insert("invalidated".to_string(), json!(invalidated));
    authorization.access_token = Some(TokenRecord {
        value: "access-token-value".to_string(),
        issued_at: now,
        expires_at: now + chrono::Duration::seconds(300),
        metadata: HashMap::new(),
        scopes: vec!["api".to_string()],
    });
    authorization.refresh_token = Some(TokenRecord {
        value: refresh_value.to_string(),
        issued_at: now,
        expires_at: now + chrono::Duration::seconds(expires_in_secs),
        metadata,
        scopes: Vec::new(),
    });
    authorization
}

#[tokio::test]
async fn refresh_grant_rebuilds_interim_record() {
    let store = Arc::new(InMemoryAuthorizationStore::new());
    let client = registered_client();
    store
        .save(&stored_authorization_with_refresh(
            client.id, "refresh-1", 3600, false,
        ))
        .await
        .expect("seed");

    let provider = RefreshTokenGrantProvider::new(store);
    let authorization = provider
        .provide(&client, &refresh_request("refresh-1"))
        .await
        .expect("grant");

    assert_eq!(authorization.grant_type, GrantType::RefreshToken);
    assert_eq!(authorization.authorized_scopes, vec!["api".to_string()]);
    assert!(authorization.access_token.is_none());
    assert_eq!(authorization.principal().expect("principal").user_id, 11);
}

#[tokio::test]
async fn refresh_grant_rejects_unknown_token() {
    let provider = RefreshTokenGrantProvider::new(Arc::new(InMemoryAuthorizationStore::new()));
    let client = registered_client();

    let result = provider.provide(&client, &refresh_request("missing")).await;
    assert!(matches!(result, Err(ServiceError::InvalidGrant)));
}

#[tokio::test]
async fn refresh_grant_rejects_expired_token() {
    let store = Arc::new(InMemoryAuthorizationStore::new());
    let client = registered_client();
    store
        .save(&stored_authorization_with_refresh(
            client.id, "refresh-2", -60, false,
        ))
        .await
        .expect("seed");

    let provider = RefreshTokenGrantProvider::new(store);
    let result = provider.provide(&client, &refresh_request("refresh-2")).await;
    assert!(matches!(result, Err(ServiceError::InvalidGrant)));
}

#[tokio::test]
async fn refresh_grant_rejects_invalidated_token() {
    let store = Arc::new(InMemoryAuthorizationStore::new());
    let client = registered_client();
    store
        .save(&stored_authorization_with_refresh(
            client.id, "refresh-3", 3600, true,
        ))
        .await
        .expect("seed");

    let provider = RefreshTokenGrantProvider::new(store);
    let result = provider.provide(&client, &refresh_request("refresh-3")).await;
    assert!(matches!(result, Err(ServiceError::InvalidGrant)));
}

#[tokio::test]
async fn refresh_grant_rejects_other_clients_token() {
    let store = Arc::new(InMemoryAuthorizationStore::new());
    let owner = registered_client();
    store
        .save(&stored_authorization_with_refresh(
            owner.id, "refresh-4", 3600, false,
        ))
        .await
        .expect("seed");

    let mut other = registered_client();
    other.id = uuid::Uuid::new_v4();
    let provider = RefreshTokenGrantProvider::new(store);
    let result = provider.provide(&other, &refresh_request("refresh-4")).await;
    assert!(matches!(result, Err(ServiceError::InvalidGrant)));
}
