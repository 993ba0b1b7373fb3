//! Signed-in identity derived from the backend's login token
//!
//! The token is JWT-shaped: `header.payload.signature`, payload being
//! base64url-encoded JSON. The signature is the backend's business; only the
//! claims needed for display and expiry are read here.

use crate::time::epoch_seconds;
use crate::{Error, Result};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};

/// Identity and token as persisted between runs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub name: String,
    pub email: String,
    /// Token expiry, seconds since the Unix epoch
    pub token_expiry: i64,
    #[serde(skip_serializing, default)]
    pub token: String,
}

#[derive(Debug, Deserialize)]
struct Claims {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    preferred_username: Option<String>,
    #[serde(default)]
    upn: Option<String>,
    #[serde(default)]
    exp: Option<i64>,
}

impl Session {
    /// Read name, email and expiry from a token's payload
    pub fn from_token(token: &str) -> Result<Self> {
        let token = token.trim();
        let payload = token
            .split('.')
            .nth(1)
            .filter(|p| !p.is_empty())
            .ok_or_else(|| Error::InvalidInput("Malformed token".to_string()))?;

        let bytes = URL_SAFE_NO_PAD
            .decode(payload.trim_end_matches('='))
            .map_err(|e| Error::InvalidInput(format!("Token payload is not base64url: {}", e)))?;
        let claims: Claims = serde_json::from_slice(&bytes)?;

        let token_expiry = claims
            .exp
            .ok_or_else(|| Error::InvalidInput("Token has no expiry".to_string()))?;

        let email = claims
            .email
            .or(claims.preferred_username)
            .or(claims.upn)
            .unwrap_or_default();

        Ok(Self {
            name: claims.name.unwrap_or_default(),
            email,
            token_expiry,
            token: token.to_string(),
        })
    }

    pub fn is_expired_at(&self, now_epoch_seconds: i64) -> bool {
        self.token_expiry < now_epoch_seconds
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(epoch_seconds())
    }
}

/// Where the user goes to sign in (again)
pub fn login_url(backend_url: &str) -> String {
    format!("{}/auth/init", backend_url.trim_end_matches('/'))
}

#[cfg(test)]
pub(crate) fn test_token(claims: &serde_json::Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{}.{}.sig", header, payload)
}
