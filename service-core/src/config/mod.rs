//! Settings every service shares. Each service layers its own config
//! struct on top of this one (see the per-service `config` modules);
//! only the listen port lives here.
//!
//! Values come from an optional `configuration` file, overridden by
//! `APP_*` environment variables. A `.env` file is loaded first so
//! local runs need no exported variables.

use crate::error::AppError;
use config::{Config as Cfg, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_port() -> u16 {
    8080
}

impl Config {
    pub fn load() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let config = Cfg::builder()
            .add_source(File::with_name("configuration").required(false))
            .add_source(config::Environment::with_prefix("APP").separator("__"))
            .build()?;

        Ok(config.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_defaults_when_absent() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn explicit_port_is_kept() {
        let config: Config = serde_json::from_str(r#"{"port": 9005}"#).unwrap();
        assert_eq!(config.port, 9005);
    }
}
