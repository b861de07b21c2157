//! Access token claims.
//!
//! The payload is decoded without signature verification. Claims drive
//! display and scheduling only; the backend remains the authority.

use crate::error::{Result, TaskdeskError};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RealmAccess {
    #[serde(default)]
    pub roles: Vec<String>,
}

/// Subset of OpenID Connect claims the client reads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    #[serde(default)]
    pub sub: Option<String>,
    /// Expiration (unix seconds)
    #[serde(default)]
    pub exp: Option<i64>,
    /// Issued at (unix seconds)
    #[serde(default)]
    pub iat: Option<i64>,
    #[serde(default)]
    pub preferred_username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub given_name: Option<String>,
    #[serde(default)]
    pub family_name: Option<String>,
    #[serde(default)]
    pub realm_access: Option<RealmAccess>,
}

/// Profile of the signed-in user, derived from the claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserInfo {
    pub id: Option<String>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub roles: Vec<String>,
}

impl TokenClaims {
    /// Decodes the payload segment of a compact JWT.
    pub fn decode(token: &str) -> Result<Self> {
        let mut segments = token.split('.');
        let payload = match (segments.next(), segments.next(), segments.next()) {
            (Some(_), Some(payload), Some(_)) => payload,
            _ => {
                return Err(TaskdeskError::Serialization {
                    format: "JWT".to_string(),
                    message: "token is not a three-part JWT".to_string(),
                });
            }
        };

        let bytes = URL_SAFE_NO_PAD
            .decode(payload.trim_end_matches('='))
            .map_err(|e| TaskdeskError::Serialization {
                format: "JWT".to_string(),
                message: format!("invalid base64 payload: {e}"),
            })?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub fn roles(&self) -> &[String] {
        self.realm_access
            .as_ref()
            .map(|access| access.roles.as_slice())
            .unwrap_or(&[])
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles().iter().any(|r| r == role)
    }

    /// Whether the token is expired at `now` (unix seconds). Unknown expiry counts as expired.
    pub fn is_expired_at(&self, now: i64) -> bool {
        self.exp.is_none_or(|exp| exp <= now)
    }

    pub fn user_info(&self) -> UserInfo {
        UserInfo {
            id: self.sub.clone(),
            username: self.preferred_username.clone(),
            email: self.email.clone(),
            first_name: self.given_name.clone(),
            last_name: self.family_name.clone(),
            roles: self.roles().to_vec(),
        }
    }
}
