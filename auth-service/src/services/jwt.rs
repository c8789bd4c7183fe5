use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde_json::{Map, Value};
use std::fs;

use crate::config::JwtConfig;

/// JWT signing/validation service. Claims are dynamic maps because the
/// issuance pipeline customizes them per token; every signed token must
/// carry `exp` and `iat` set by the caller.
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
}

impl JwtService {
    /// Create a new JWT service by loading RSA keys from files.
    pub fn new(config: &JwtConfig) -> Result<Self, anyhow::Error> {
        let private_key_pem = fs::read_to_string(&config.private_key_path).map_err(|e| {
            anyhow::anyhow!(
                "Failed to read private key from {}: {}",
                config.private_key_path,
                e
            )
        })?;

        let encoding_key = EncodingKey::from_rsa_pem(private_key_pem.as_bytes())
            .map_err(|e| anyhow::anyhow!("Failed to parse private key: {}", e))?;

        let public_key_pem = fs::read_to_string(&config.public_key_path).map_err(|e| {
            anyhow::anyhow!(
                "Failed to read public key from {}: {}",
                config.public_key_path,
                e
            )
        })?;

        let decoding_key = DecodingKey::from_rsa_pem(public_key_pem.as_bytes())
            .map_err(|e| anyhow::anyhow!("Failed to parse public key: {}", e))?;

        tracing::info!("JWT service initialized with RS256 keys");

        Ok(Self {
            encoding_key,
            decoding_key,
            issuer: config.issuer.clone(),
        })
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Sign a claims map as an RS256 JWT.
    pub fn sign(&self, claims: &Map<String, Value>) -> Result<String, anyhow::Error> {
        let header = Header::new(Algorithm::RS256);
        encode(&header, claims, &self.encoding_key)
            .map_err(|e| anyhow::anyhow!("Failed to encode token: {}", e))
    }

    /// Validate signature and expiry, returning the claims map.
    pub fn validate(&self, token: &str) -> Result<Map<String, Value>, anyhow::Error> {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.validate_exp = true;
        validation.validate_aud = false;

        let token_data = decode::<Map<String, Value>>(token, &self.decoding_key, &validation)
            .map_err(|e| anyhow::anyhow!("Invalid access token: {}", e))?;

        Ok(token_data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::test_keys::write_test_keys;
    use chrono::Utc;
    use serde_json::json;

    fn service() -> (JwtService, tempfile::NamedTempFile, tempfile::NamedTempFile) {
        let (private_file, public_file) = write_test_keys();
        let config = JwtConfig {
            private_key_path: private_file.path().to_str().unwrap().to_string(),
            public_key_path: public_file.path().to_str().unwrap().to_string(),
            issuer: "http://auth-service".to_string(),
        };
        (
            JwtService::new(&config).expect("jwt service"),
            private_file,
            public_file,
        )
    }

    #[test]
    fn sign_and_validate_roundtrip() {
        let (jwt, _k1, _k2) = service();

        let now = Utc::now().timestamp();
        let mut claims = Map::new();
        claims.insert("sub".to_string(), json!("+998901234567"));
        claims.insert("iat".to_string(), json!(now));
        claims.insert("exp".to_string(), json!(now + 300));
        claims.insert("org_id".to_string(), json!(42));

        let token = jwt.sign(&claims).expect("sign");
        let decoded = jwt.validate(&token).expect("validate");

        assert_eq!(decoded.get("sub"), Some(&json!("+998901234567")));
        assert_eq!(decoded.get("org_id"), Some(&json!(42)));
    }

    #[test]
    fn validate_rejects_expired_token() {
        let (jwt, _k1, _k2) = service();

        let now = Utc::now().timestamp();
        let mut claims = Map::new();
        claims.insert("sub".to_string(), json!("u"));
        claims.insert("iat".to_string(), json!(now - 600));
        claims.insert("exp".to_string(), json!(now - 300));

        let token = jwt.sign(&claims).expect("sign");
        assert!(jwt.validate(&token).is_err());
    }

    #[test]
    fn validate_rejects_garbage() {
        let (jwt, _k1, _k2) = service();
        assert!(jwt.validate("not-a-jwt").is_err());
    }
}
