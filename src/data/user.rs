use crate::data::listing::UserId;
use serde::{Deserialize, Serialize};

/// Account as reported by the auth provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub uid: UserId,
    pub email: String,
    pub email_verified: bool,
}

impl User {
    pub fn new(uid: impl Into<UserId>, email: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            email: email.into(),
            email_verified: false,
        }
    }
}

/// Federated identity providers offered next to email and password
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IdentityProvider {
    Google,
}

impl std::fmt::Display for IdentityProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IdentityProvider::Google => write!(f, "Google"),
        }
    }
}
