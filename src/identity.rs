// src/identity.rs
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::errors::{ForgeError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Coder,
    Creator,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Coder => "coder",
            Role::Creator => "creator",
        }
    }
}

impl FromStr for Role {
    type Err = ForgeError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "coder" => Ok(Role::Coder),
            "creator" => Ok(Role::Creator),
            other => Err(ForgeError::Auth(format!("unknown role '{}'", other))),
        }
    }
}

/// The signed-in user behind a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub user_id: String,
    pub role: Role,
}

impl Identity {
    /// Coders reach coder pages only, creators creator pages only.
    pub fn require(&self, role: Role) -> Result<()> {
        if self.role == role {
            Ok(())
        } else {
            Err(ForgeError::Forbidden(format!(
                "{} accounts cannot use {} features",
                self.role.as_str(),
                role.as_str()
            )))
        }
    }
}

/// Looks up the user for a session token.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn resolve(&self, token: &str) -> Result<Identity>;
}

/// Pull the token out of an `Authorization: Bearer ...` header value.
pub fn bearer_token(header: Option<&str>) -> Result<&str> {
    let value = header.ok_or_else(|| ForgeError::Auth("missing Authorization header".to_string()))?;
    let token = value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("bearer "))
        .map(str::trim)
        .ok_or_else(|| ForgeError::Auth("Authorization header is not a bearer token".to_string()))?;
    if token.is_empty() {
        return Err(ForgeError::Auth("empty bearer token".to_string()));
    }
    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_token_parsing() {
        assert_eq!(bearer_token(Some("Bearer abc")).unwrap(), "abc");
        assert!(matches!(bearer_token(None), Err(ForgeError::Auth(_))));
        assert!(matches!(bearer_token(Some("Basic abc")), Err(ForgeError::Auth(_))));
        assert!(matches!(bearer_token(Some("Bearer  ")), Err(ForgeError::Auth(_))));
    }

    #[test]
    fn roles_gate_each_other() {
        let coder = Identity {
            user_id: "u1".to_string(),
            role: Role::Coder,
        };
        assert!(coder.require(Role::Coder).is_ok());
        assert!(matches!(coder.require(Role::Creator), Err(ForgeError::Forbidden(_))));
    }
}
