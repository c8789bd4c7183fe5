//! HTTP claims resolver backed by the auth service's internal
//! user-info endpoint.

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::config::AuthServiceConfig;
use crate::services::error::GatewayError;
use crate::services::verifier::ClaimsResolver;

pub struct AuthServiceClient {
    client: reqwest::Client,
    base_url: String,
}

impl AuthServiceClient {
    pub fn new(config: &AuthServiceConfig) -> Result<Self, anyhow::Error> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build auth client: {}", e))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl ClaimsResolver for AuthServiceClient {
    async fn resolve(&self, access_token: &str) -> Result<Map<String, Value>, GatewayError> {
        let url = format!("{}/internal/user-info", self.base_url);

        let response = self
            .client
            .get(&url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| GatewayError::ClaimsResolution(anyhow::anyhow!("GET {}: {}", url, e)))?;

        if !response.status().is_success() {
            return Err(GatewayError::ClaimsResolution(anyhow::anyhow!(
                "GET {}: status {}",
                url,
                response.status()
            )));
        }

        let claims: Map<String, Value> = response
            .json()
            .await
            .map_err(|e| GatewayError::ClaimsResolution(anyhow::anyhow!("GET {}: {}", url, e)))?;

        Ok(claims)
    }
}
