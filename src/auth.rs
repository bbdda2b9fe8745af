//! Admin login and session tokens
//!
//! A single administrator credential comes from configuration. A successful
//! login issues an opaque bearer token that mutating requests must present;
//! tokens expire after the configured TTL and can be revoked by logout.

use std::collections::HashMap;
use std::time::Duration;

use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::error::{DirectoryError, Result};

/// Admin credential and session lifetime
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub username: String,
    /// Empty disables login entirely
    #[serde(skip_serializing)]
    pub password: String,
    pub session_ttl: Duration,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            username: "admin".to_string(),
            password: String::new(),
            session_ttl: Duration::from_secs(12 * 3600),
        }
    }
}

impl AuthConfig {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            ..Default::default()
        }
    }

    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }
}

/// An authenticated admin session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub token: String,
    pub username: String,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}

/// Issues and validates session tokens
pub struct SessionManager {
    username: String,
    password_digest: Option<[u8; 32]>,
    ttl: chrono::Duration,
    sessions: RwLock<HashMap<String, Session>>,
}

impl SessionManager {
    pub fn new(config: &AuthConfig) -> Result<Self> {
        let ttl = chrono::Duration::from_std(config.session_ttl)
            .map_err(|e| DirectoryError::Config(format!("session TTL: {}", e)))?;
        if Utc::now().checked_add_signed(ttl).is_none() {
            return Err(DirectoryError::Config(
                "session TTL: expiry is out of range".to_string(),
            ));
        }

        let password_digest = if config.password.is_empty() {
            warn!("No admin password configured; login is disabled");
            None
        } else {
            Some(digest(&config.password))
        };

        Ok(Self {
            username: config.username.clone(),
            password_digest,
            ttl,
            sessions: RwLock::new(HashMap::new()),
        })
    }

    /// Check the credential and open a session
    pub async fn login(&self, username: &str, password: &str) -> Result<Session> {
        let accepted = match self.password_digest {
            Some(expected) => username == self.username && digest(password) == expected,
            None => false,
        };

        if !accepted {
            warn!("Rejected login for user {:?}", username);
            return Err(DirectoryError::Unauthorized("Invalid credentials".to_string()));
        }

        let expires_at = Utc::now()
            .checked_add_signed(self.ttl)
            .ok_or_else(|| DirectoryError::Internal("session expiry out of range".to_string()))?;
        let session = Session {
            token: new_token(),
            username: username.to_string(),
            expires_at,
        };

        let mut sessions = self.sessions.write().await;
        sessions.retain(|_, s| !s.is_expired());
        sessions.insert(session.token.clone(), session.clone());

        info!("Admin {} logged in", username);
        Ok(session)
    }

    /// Resolve a bearer token to its live session
    pub async fn validate(&self, token: &str) -> Result<Session> {
        let session = self.sessions.read().await.get(token).cloned();
        match session {
            Some(s) if !s.is_expired() => Ok(s),
            Some(_) => {
                self.sessions.write().await.remove(token);
                debug!("Session token expired");
                Err(DirectoryError::Unauthorized("Session expired".to_string()))
            }
            None => Err(DirectoryError::Unauthorized(
                "Invalid session token".to_string(),
            )),
        }
    }

    /// Revoke a token; returns whether it was live
    pub async fn logout(&self, token: &str) -> bool {
        self.sessions.write().await.remove(token).is_some()
    }

    /// Number of unexpired sessions
    pub async fn active_sessions(&self) -> usize {
        self.sessions
            .read()
            .await
            .values()
            .filter(|s| !s.is_expired())
            .count()
    }
}

fn digest(secret: &str) -> [u8; 32] {
    Sha256::digest(secret.as_bytes()).into()
}

fn new_token() -> String {
    let bytes: [u8; 32] = rand::random();
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}
