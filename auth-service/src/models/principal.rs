//! Runtime principal - a transient view over User + Role.
//!
//! Never persisted as its own entity and never fetched from ambient
//! context: every function that needs the current principal receives it
//! as an argument.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserPrincipal {
    pub user_id: i64,
    pub username: String,
    pub organization_id: Option<i64>,
    pub authorities: Vec<String>,
    pub enabled: bool,
}

impl UserPrincipal {
    pub fn from_user(user: &crate::models::User, role_code: &str) -> Self {
        Self {
            user_id: user.id,
            username: user.phone_num.clone(),
            organization_id: user.org_id,
            authorities: vec![role_code.to_string()],
            enabled: user.active,
        }
    }
}
