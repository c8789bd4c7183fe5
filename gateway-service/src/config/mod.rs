use serde::Deserialize;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    #[serde(flatten)]
    pub common: core_config::Config,
    pub environment: Environment,
    pub service_name: String,
    pub service_version: String,
    pub log_level: String,
    pub verifier: VerifierConfig,
    pub auth_service: AuthServiceConfig,
    pub routes: Vec<RouteTarget>,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Dev,
    Prod,
}

impl std::str::FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "dev" => Ok(Environment::Dev),
            "prod" => Ok(Environment::Prod),
            other => Err(format!("Unknown environment: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct VerifierConfig {
    pub public_key_path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthServiceConfig {
    pub base_url: String,
    pub timeout_ms: u64,
}

/// One forwarding rule: requests whose path starts with `prefix` are
/// proxied to `target`.
#[derive(Debug, Clone, Deserialize)]
pub struct RouteTarget {
    pub prefix: String,
    pub target: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SecurityConfig {
    pub allowed_origins: Vec<String>,
}

impl GatewayConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let common_config = core_config::Config::load()?;

        let env_str = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string());
        let environment: Environment = env_str
            .parse()
            .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?;

        let is_prod = environment == Environment::Prod;

        let config = GatewayConfig {
            common: common_config,
            environment,
            service_name: get_env("SERVICE_NAME", Some("gateway-service"), is_prod)?,
            service_version: get_env("SERVICE_VERSION", Some(env!("CARGO_PKG_VERSION")), is_prod)?,
            log_level: get_env("LOG_LEVEL", Some("info"), is_prod)?,
            verifier: VerifierConfig {
                public_key_path: get_env("JWT_PUBLIC_KEY_PATH", None, is_prod)?,
            },
            auth_service: AuthServiceConfig {
                base_url: get_env(
                    "AUTH_SERVICE_URL",
                    Some("http://auth-service:8080"),
                    is_prod,
                )?,
                timeout_ms: parse_env("AUTH_SERVICE_TIMEOUT_MS", Some("2000"), is_prod)?,
            },
            routes: parse_routes(&get_env("ROUTES", Some(""), is_prod)?)?,
            security: SecurityConfig {
                allowed_origins: get_env("ALLOWED_ORIGINS", Some("*"), is_prod)?
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
            },
        };

        Ok(config)
    }
}

/// Parse `ROUTES` of the form
/// `/api/employees=http://organization-service:8080,/api/invoices=http://billing:8080`.
fn parse_routes(raw: &str) -> Result<Vec<RouteTarget>, AppError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|entry| {
            let (prefix, target) = entry.split_once('=').ok_or_else(|| {
                AppError::ConfigError(anyhow::anyhow!(
                    "Invalid route entry (expected prefix=target): {}",
                    entry
                ))
            })?;
            Ok(RouteTarget {
                prefix: prefix.trim().to_string(),
                target: target.trim().trim_end_matches('/').to_string(),
            })
        })
        .collect()
}

fn get_env(name: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(name) {
        Ok(value) => Ok(value),
        Err(_) => match default {
            Some(default) if !is_prod => Ok(default.to_string()),
            _ => Err(AppError::ConfigError(anyhow::anyhow!(
                "Missing required environment variable: {}",
                name
            ))),
        },
    }
}

fn parse_env<T>(name: &str, default: Option<&str>, is_prod: bool) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_env(name, default, is_prod)?.parse().map_err(|e| {
        AppError::ConfigError(anyhow::anyhow!("Invalid value for {}: {}", name, e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_routes_handles_multiple_entries() {
        let routes = parse_routes(
            "/api/employees=http://organization-service:8080/, /api/invoices=http://billing:8080",
        )
        .expect("routes");

        assert_eq!(routes.len(), 2);
        assert_eq!(routes[0].prefix, "/api/employees");
        assert_eq!(routes[0].target, "http://organization-service:8080");
        assert_eq!(routes[1].prefix, "/api/invoices");
    }

    #[test]
    fn parse_routes_rejects_malformed_entry() {
        assert!(parse_routes("no-equals-sign").is_err());
    }

    #[test]
    fn parse_routes_empty_is_ok() {
        assert!(parse_routes("").expect("routes").is_empty());
    }
}
