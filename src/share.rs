//! Public share links
//!
//! Share state sits on a node next to, not inside, the permission model: a
//! valid link exposes that single node to anyone holding the token.

use crate::error::ApiError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Share link settings of a node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareState {
    pub enabled: bool,
    pub token: String,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    /// Hash of the link password as produced by the auth layer
    #[serde(default)]
    pub password_hash: Option<String>,
}

impl ShareState {
    /// Enable sharing with a token derived from `seed`
    pub fn enable(
        seed: &[u8],
        expires_at: Option<DateTime<Utc>>,
        password_hash: Option<String>,
    ) -> Self {
        Self {
            enabled: true,
            token: derive_token(seed),
            expires_at,
            password_hash,
        }
    }

    pub fn disable(&mut self) {
        self.enabled = false;
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map(|exp| exp <= now).unwrap_or(false)
    }

    /// Check a presented token (and password hash, when one is set)
    pub fn check(
        &self,
        token: &str,
        now: DateTime<Utc>,
        password_hash: Option<&str>,
    ) -> Result<(), ApiError> {
        if !self.enabled {
            return Err(ApiError::ShareDenied("sharing is disabled".to_string()));
        }
        if self.token != token {
            return Err(ApiError::ShareDenied("unknown token".to_string()));
        }
        if self.is_expired(now) {
            return Err(ApiError::ShareDenied("link has expired".to_string()));
        }
        if let Some(expected) = &self.password_hash {
            if password_hash != Some(expected.as_str()) {
                return Err(ApiError::ShareDenied("password required".to_string()));
            }
        }
        Ok(())
    }
}

/// Hex-encoded blake3 digest of `seed`, truncated to 32 characters
pub fn derive_token(seed: &[u8]) -> String {
    let digest = blake3::hash(seed);
    let mut token = hex::encode(digest.as_bytes());
    token.truncate(32);
    token
}
