//! HTTP client for the organization service's active-organization lookup.

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::OrganizationServiceConfig;
use crate::services::store::OrganizationResolver;
use crate::services::ServiceError;

pub struct OrganizationClient {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ActiveOrganizationResponse {
    #[allow(dead_code)]
    employee_id: i64,
    organization_id: i64,
}

impl OrganizationClient {
    pub fn new(config: &OrganizationServiceConfig) -> Result<Self, anyhow::Error> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build organization client: {}", e))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl OrganizationResolver for OrganizationClient {
    async fn active_organization(&self, user_id: i64) -> Result<Option<i64>, ServiceError> {
        let url = format!(
            "{}/api/employees/{}/active-organization",
            self.base_url, user_id
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ServiceError::Internal(anyhow::anyhow!("GET {}: {}", url, e)))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(ServiceError::Internal(anyhow::anyhow!(
                "GET {}: status {}",
                url,
                response.status()
            )));
        }

        let body: ActiveOrganizationResponse = response
            .json()
            .await
            .map_err(|e| ServiceError::Internal(anyhow::anyhow!("GET {}: {}", url, e)))?;

        Ok(Some(body.organization_id))
    }
}
