//! Authorization record - the durable trace of one token issuance.
//!
//! A new record is created for every grant; records are never updated in
//! place. Invalidation is a metadata flag on the token, not a delete.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

use crate::constants::{INVALIDATED_METADATA_KEY, ORGANIZATION_ID_KEY, PRINCIPAL_KEY};
use crate::models::UserPrincipal;

/// Supported OAuth2 grant types, parsed from the wire identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GrantType {
    Password,
    RefreshToken,
}

impl GrantType {
    pub fn as_str(&self) -> &'static str {
        match self {
            GrantType::Password => "password",
            GrantType::RefreshToken => "refresh_token",
        }
    }

    /// Parse a `grant_type` parameter. Unknown identifiers yield `None`;
    /// the caller maps that to `UnsupportedGrantType`.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "password" => Some(GrantType::Password),
            "refresh_token" => Some(GrantType::RefreshToken),
            _ => None,
        }
    }
}

impl std::fmt::Display for GrantType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One issued token inside an Authorization: value plus the timestamps and
/// metadata computed at generation time.
#[derive(Debug, Clone)]
pub struct TokenRecord {
    pub value: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub metadata: HashMap<String, Value>,
    pub scopes: Vec<String>,
}

impl TokenRecord {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    pub fn is_invalidated(&self) -> bool {
        self.metadata
            .get(INVALIDATED_METADATA_KEY)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }
}

/// Authorization record. Providers return it without tokens; the issuance
/// pipeline attaches the generated tokens and persists it exactly once.
#[derive(Debug, Clone)]
pub struct Authorization {
    pub id: Uuid,
    pub registered_client_id: Uuid,
    pub principal_name: String,
    pub grant_type: GrantType,
    pub authorized_scopes: Vec<String>,
    pub attributes: HashMap<String, Value>,
    pub access_token: Option<TokenRecord>,
    pub refresh_token: Option<TokenRecord>,
}

impl Authorization {
    /// Interim record for a freshly authenticated grant. The principal is
    /// carried in the attribute map under the reserved key, mirroring how
    /// issuance later reads it.
    pub fn interim(
        registered_client_id: Uuid,
        grant_type: GrantType,
        authorized_scopes: Vec<String>,
        principal: &UserPrincipal,
    ) -> Self {
        let mut attributes = HashMap::new();
        if let Ok(value) = serde_json::to_value(principal) {
            attributes.insert(PRINCIPAL_KEY.to_string(), value);
        }
        Self {
            id: Uuid::new_v4(),
            registered_client_id,
            principal_name: principal.username.clone(),
            grant_type,
            authorized_scopes,
            attributes,
            access_token: None,
            refresh_token: None,
        }
    }

    /// The principal stored in the attribute map, if present.
    pub fn principal(&self) -> Option<UserPrincipal> {
        self.attributes
            .get(PRINCIPAL_KEY)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Explicit organization-context attribute, if one was merged in.
    pub fn organization_attribute(&self) -> Option<i64> {
        self.attributes
            .get(ORGANIZATION_ID_KEY)
            .and_then(Value::as_i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn principal() -> UserPrincipal {
        UserPrincipal {
            user_id: 7,
            username: "+998901112233".to_string(),
            organization_id: Some(3),
            authorities: vec!["ROLE_USER".to_string()],
            enabled: true,
        }
    }

    #[test]
    fn interim_carries_principal_in_attributes() {
        let auth = Authorization::interim(
            Uuid::new_v4(),
            GrantType::Password,
            vec!["api".to_string()],
            &principal(),
        );

        assert_eq!(auth.principal_name, "+998901112233");
        let restored = auth.principal().expect("principal attribute");
        assert_eq!(restored.user_id, 7);
        assert_eq!(restored.authorities, vec!["ROLE_USER".to_string()]);
        assert!(auth.access_token.is_none());
    }

    #[test]
    fn organization_attribute_reads_reserved_key() {
        let mut auth = Authorization::interim(
            Uuid::new_v4(),
            GrantType::Password,
            vec![],
            &principal(),
        );
        assert_eq!(auth.organization_attribute(), None);

        auth.attributes
            .insert(ORGANIZATION_ID_KEY.to_string(), json!(42));
        assert_eq!(auth.organization_attribute(), Some(42));
    }

    #[test]
    fn token_record_invalidated_flag() {
        let mut metadata = HashMap::new();
        metadata.insert(INVALIDATED_METADATA_KEY.to_string(), json!(false));
        let record = TokenRecord {
            value: "tok".to_string(),
            issued_at: Utc::now(),
            expires_at: Utc::now() + chrono::Duration::seconds(60),
            metadata,
            scopes: vec![],
        };
        assert!(!record.is_invalidated());
        assert!(!record.is_expired(Utc::now()));
    }

    #[test]
    fn grant_type_parse_rejects_unknown() {
        assert_eq!(GrantType::parse("password"), Some(GrantType::Password));
        assert_eq!(
            GrantType::parse("refresh_token"),
            Some(GrantType::RefreshToken)
        );
        assert_eq!(GrantType::parse("client_credentials"), None);
    }
}
