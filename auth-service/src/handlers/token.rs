//! The token endpoint: client authentication, grant dispatch and token
//! issuance.

use std::collections::HashMap;

use axum::{
    extract::State,
    http::{header, HeaderMap},
    Form, Json,
};
use base64::Engine;
use service_core::error::AppError;
use subtle::ConstantTimeEq;

use crate::models::{GrantType, RegisteredClient};
use crate::services::{ClientStore, ServiceError, TokenRequest, TokenResponse};
use crate::AppState;

/// How the client authenticated itself, matched against the client's
/// allowed authentication methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClientAuthMethod {
    Basic,
    Post,
}

impl ClientAuthMethod {
    fn as_str(&self) -> &'static str {
        match self {
            ClientAuthMethod::Basic => "client_secret_basic",
            ClientAuthMethod::Post => "client_secret_post",
        }
    }
}

/// Issue tokens for a grant request
#[utoipa::path(
    post,
    path = "/oauth2/token",
    request_body(content = String, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Tokens issued", body = TokenResponse),
        (status = 400, description = "Unsupported grant type or invalid grant"),
        (status = 401, description = "Invalid client or credentials"),
        (status = 500, description = "Token generation or persistence failure")
    ),
    tag = "OAuth2"
)]
pub async fn token(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(params): Form<HashMap<String, String>>,
) -> Result<Json<TokenResponse>, AppError> {
    let client = authenticate_client(&state, &headers, &params).await?;

    let grant_type_param = params
        .get("grant_type")
        .ok_or_else(|| ServiceError::UnsupportedGrantType("<missing>".to_string()))?;
    let grant_type = GrantType::parse(grant_type_param)
        .ok_or_else(|| ServiceError::UnsupportedGrantType(grant_type_param.clone()))?;

    // Explicit organization context. Unparseable values are treated as
    // absent, not as an error.
    let organization_id = params
        .get("organization_id")
        .and_then(|v| v.parse::<i64>().ok());

    let request = TokenRequest {
        grant_type,
        params: params.clone(),
        organization_id,
    };

    let authorization = state.registry.provide(&client, &request).await?;
    let principal = authorization.principal().ok_or_else(|| {
        ServiceError::Internal(anyhow::anyhow!(
            "Grant provider returned authorization without principal"
        ))
    })?;

    let response = state
        .issuer
        .issue(&client, &principal, authorization, organization_id)
        .await?;

    Ok(Json(response))
}

/// Resolve and verify the requesting client from HTTP Basic credentials
/// or `client_id`/`client_secret` form parameters.
async fn authenticate_client(
    state: &AppState,
    headers: &HeaderMap,
    params: &HashMap<String, String>,
) -> Result<RegisteredClient, ServiceError> {
    let (client_id, client_secret, method) = extract_client_credentials(headers, params)
        .ok_or(ServiceError::InvalidClient)?;

    let client = state
        .db
        .find_by_client_id(&client_id)
        .await?
        .ok_or(ServiceError::InvalidClient)?;

    if !client.auth_methods.iter().any(|m| m == method.as_str()) {
        return Err(ServiceError::InvalidClient);
    }

    if !secrets_match(client.client_secret.as_bytes(), client_secret.as_bytes()) {
        return Err(ServiceError::InvalidClient);
    }

    Ok(client)
}

fn extract_client_credentials(
    headers: &HeaderMap,
    params: &HashMap<String, String>,
) -> Option<(String, String, ClientAuthMethod)> {
    if let Some(value) = headers.get(header::AUTHORIZATION) {
        let encoded = value.to_str().ok()?.strip_prefix("Basic ")?;
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .ok()?;
        let decoded = String::from_utf8(decoded).ok()?;
        let (id, secret) = decoded.split_once(':')?;
        return Some((id.to_string(), secret.to_string(), ClientAuthMethod::Basic));
    }

    let id = params.get("client_id")?;
    let secret = params.get("client_secret")?;
    Some((id.clone(), secret.clone(), ClientAuthMethod::Post))
}

fn secrets_match(expected: &[u8], presented: &[u8]) -> bool {
    expected.len() == presented.len() && expected.ct_eq(presented).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_header_credentials_win_over_params() {
        let mut headers = HeaderMap::new();
        let encoded = base64::engine::general_purpose::STANDARD.encode("web-client:s3cret");
        headers.insert(
            header::AUTHORIZATION,
            format!("Basic {}", encoded).parse().unwrap(),
        );
        let mut params = HashMap::new();
        params.insert("client_id".to_string(), "other".to_string());
        params.insert("client_secret".to_string(), "other".to_string());

        let (id, secret, method) = extract_client_credentials(&headers, &params).unwrap();
        assert_eq!(id, "web-client");
        assert_eq!(secret, "s3cret");
        assert_eq!(method, ClientAuthMethod::Basic);
    }

    #[test]
    fn form_credentials_used_without_header() {
        let headers = HeaderMap::new();
        let mut params = HashMap::new();
        params.insert("client_id".to_string(), "web-client".to_string());
        params.insert("client_secret".to_string(), "s3cret".to_string());

        let (id, _, method) = extract_client_credentials(&headers, &params).unwrap();
        assert_eq!(id, "web-client");
        assert_eq!(method, ClientAuthMethod::Post);
    }

    #[test]
    fn missing_credentials_yield_none() {
        assert!(extract_client_credentials(&HeaderMap::new(), &HashMap::new()).is_none());
    }

    #[test]
    fn secret_comparison_is_length_aware() {
        assert!(secrets_match(b"s3cret", b"s3cret"));
        assert!(!secrets_match(b"s3cret", b"s3cre"));
        assert!(!secrets_match(b"s3cret", b"s3creX"));
    }
}
