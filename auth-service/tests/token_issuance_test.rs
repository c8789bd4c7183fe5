//! Issuance pipeline behavior: organization-context precedence, claim
//! customization, refresh-token degradation and the single persisted
//! authorization record.

mod common;

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use auth_service::models::{Authorization, GrantType};
use auth_service::services::{
    AuthorizationStore, InMemoryAuthorizationStore, JwtTokenGenerator, ServiceError, TokenIssuer,
};

use common::{
    jwt_service, principal, registered_client, BrokenRefreshGenerator,
    FailingAuthorizationStore, FailingOrganizationResolver, FixedOrganizationResolver,
    HangingOrganizationResolver,
};

fn issuer_with(
    jwt: auth_service::services::JwtService,
    store: Arc<InMemoryAuthorizationStore>,
    resolver: Arc<dyn auth_service::services::OrganizationResolver>,
) -> TokenIssuer {
    TokenIssuer::new(
        Arc::new(JwtTokenGenerator::new(jwt)),
        store,
        resolver,
        Duration::from_millis(100),
    )
}

#[tokio::test]
async fn explicit_organization_wins_over_resolver() {
    let (jwt, _k1, _k2) = jwt_service();
    let store = Arc::new(InMemoryAuthorizationStore::new());
    let issuer = issuer_with(
        jwt.clone(),
        store.clone(),
        Arc::new(FixedOrganizationResolver(Some(7))),
    );

    let client = registered_client();
    let user = principal(11);
    let authorization =
        Authorization::interim(client.id, GrantType::Password, client.scopes.clone(), &user);

    let response = issuer
        .issue(&client, &user, authorization, Some(42))
        .await
        .expect("issuance");

    let claims = jwt.validate(&response.access_token).expect("valid jwt");
    assert_eq!(claims.get("org_id"), Some(&json!(42)));
    assert_eq!(claims.get("user_id"), Some(&json!(11)));
    assert_eq!(claims.get("role"), Some(&json!(["ROLE_USER"])));

    // The explicit context is also recorded on the persisted authorization.
    let stored = store
        .find_by_access_token(&response.access_token)
        .await
        .expect("lookup")
        .expect("stored record");
    assert_eq!(stored.organization_attribute(), Some(42));
}

#[tokio::test]
async fn resolver_fallback_supplies_organization_claim() {
    let (jwt, _k1, _k2) = jwt_service();
    let store = Arc::new(InMemoryAuthorizationStore::new());
    let issuer = issuer_with(
        jwt.clone(),
        store.clone(),
        Arc::new(FixedOrganizationResolver(Some(7))),
    );

    let client = registered_client();
    let user = principal(11);
    let authorization =
        Authorization::interim(client.id, GrantType::Password, client.scopes.clone(), &user);

    let response = issuer
        .issue(&client, &user, authorization, None)
        .await
        .expect("issuance");

    let claims = jwt.validate(&response.access_token).expect("valid jwt");
    assert_eq!(claims.get("org_id"), Some(&json!(7)));

    // Nothing was merged into the attribute map; the claim came from the
    // resolver alone.
    let stored = store
        .find_by_access_token(&response.access_token)
        .await
        .expect("lookup")
        .expect("stored record");
    assert_eq!(stored.organization_attribute(), None);
}

#[tokio::test]
async fn resolver_failure_omits_claim_without_failing_issuance() {
    let (jwt, _k1, _k2) = jwt_service();
    let store = Arc::new(InMemoryAuthorizationStore::new());
    let issuer = issuer_with(jwt.clone(), store.clone(), Arc::new(FailingOrganizationResolver));

    let client = registered_client();
    let user = principal(11);
    let authorization =
        Authorization::interim(client.id, GrantType::Password, client.scopes.clone(), &user);

    let response = issuer
        .issue(&client, &user, authorization, None)
        .await
        .expect("issuance must survive resolver failure");

    let claims = jwt.validate(&response.access_token).expect("valid jwt");
    assert!(claims.get("org_id").is_none());
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn resolver_timeout_omits_claim_without_failing_issuance() {
    let (jwt, _k1, _k2) = jwt_service();
    let store = Arc::new(InMemoryAuthorizationStore::new());
    let issuer = issuer_with(jwt.clone(), store.clone(), Arc::new(HangingOrganizationResolver));

    let client = registered_client();
    let user = principal(11);
    let authorization =
        Authorization::interim(client.id, GrantType::Password, client.scopes.clone(), &user);

    let response = issuer
        .issue(&client, &user, authorization, None)
        .await
        .expect("issuance must survive resolver timeout");

    let claims = jwt.validate(&response.access_token).expect("valid jwt");
    assert!(claims.get("org_id").is_none());
}

#[tokio::test]
async fn response_shape_and_single_persisted_record() {
    let (jwt, _k1, _k2) = jwt_service();
    let store = Arc::new(InMemoryAuthorizationStore::new());
    let issuer = issuer_with(
        jwt.clone(),
        store.clone(),
        Arc::new(FixedOrganizationResolver(None)),
    );

    let client = registered_client();
    let user = principal(5);
    let authorization =
        Authorization::interim(client.id, GrantType::Password, client.scopes.clone(), &user);

    let response = issuer
        .issue(&client, &user, authorization, None)
        .await
        .expect("issuance");

    assert_eq!(response.token_type, "bearer");
    assert_eq!(response.expires_in, client.access_token_ttl_secs);
    assert_eq!(response.scope, "api");
    assert!(response.refresh_token.is_some());
    assert_eq!(store.len(), 1);

    let stored = store
        .find_by_access_token(&response.access_token)
        .await
        .expect("lookup")
        .expect("stored record");
    assert_eq!(stored.principal_name, user.username);
    assert!(stored.refresh_token.is_some());

    let refresh_value = response.refresh_token.expect("refresh token");
    let by_refresh = store
        .find_by_refresh_token(&refresh_value)
        .await
        .expect("lookup")
        .expect("stored record");
    assert_eq!(by_refresh.id, stored.id);
}

#[tokio::test]
async fn refresh_generation_failure_keeps_access_token() {
    let (jwt, _k1, _k2) = jwt_service();
    let store = Arc::new(InMemoryAuthorizationStore::new());
    let issuer = TokenIssuer::new(
        Arc::new(BrokenRefreshGenerator {
            inner: Arc::new(JwtTokenGenerator::new(jwt.clone())),
        }),
        store.clone(),
        Arc::new(FixedOrganizationResolver(None)),
        Duration::from_millis(100),
    );

    let client = registered_client();
    let user = principal(5);
    let authorization =
        Authorization::interim(client.id, GrantType::Password, client.scopes.clone(), &user);

    let response = issuer
        .issue(&client, &user, authorization, None)
        .await
        .expect("issuance must survive refresh generation failure");

    assert!(response.refresh_token.is_none());
    assert!(jwt.validate(&response.access_token).is_ok());

    let stored = store
        .find_by_access_token(&response.access_token)
        .await
        .expect("lookup")
        .expect("stored record");
    assert!(stored.refresh_token.is_none());
}

#[tokio::test]
async fn client_without_refresh_grant_gets_no_refresh_token() {
    let (jwt, _k1, _k2) = jwt_service();
    let store = Arc::new(InMemoryAuthorizationStore::new());
    let issuer = issuer_with(
        jwt.clone(),
        store.clone(),
        Arc::new(FixedOrganizationResolver(None)),
    );

    let mut client = registered_client();
    client.grant_types = vec!["password".to_string()];
    let user = principal(5);
    let authorization =
        Authorization::interim(client.id, GrantType::Password, client.scopes.clone(), &user);

    let response = issuer
        .issue(&client, &user, authorization, None)
        .await
        .expect("issuance");

    assert!(response.refresh_token.is_none());
}

#[tokio::test]
async fn persistence_failure_returns_error_and_no_tokens() {
    let (jwt, _k1, _k2) = jwt_service();
    let issuer = TokenIssuer::new(
        Arc::new(JwtTokenGenerator::new(jwt.clone())),
        Arc::new(FailingAuthorizationStore),
        Arc::new(FixedOrganizationResolver(None)),
        Duration::from_millis(100),
    );

    let client = registered_client();
    let user = principal(5);
    let authorization =
        Authorization::interim(client.id, GrantType::Password, client.scopes.clone(), &user);

    let result = issuer.issue(&client, &user, authorization, None).await;
    assert!(matches!(result, Err(ServiceError::PersistenceFailed(_))));
}
