//! Session Entity
//!
//! Ephemeral record binding a server-generated session id to a user.
//! Lives only in the session store (JSON value under a TTL key), never in
//! the user record. Deleting the store entry revokes every token that
//! references the session.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::value_object::UserId;

/// Key prefix for session records
pub const SESSION_KEY_PREFIX: &str = "auth:session:";

/// Key prefix for stored refresh tokens
pub const REFRESH_KEY_PREFIX: &str = "auth:refresh:";

/// Store key for a session record
pub fn session_key(session_id: &Uuid) -> String {
    format!("{SESSION_KEY_PREFIX}{session_id}")
}

/// Store key for the refresh token bound to a session
pub fn refresh_key(session_id: &Uuid) -> String {
    format!("{REFRESH_KEY_PREFIX}{session_id}")
}

/// Session entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Session ID (UUID v4, server generated)
    pub session_id: Uuid,
    /// Owning user
    pub user_id: UserId,
    /// Created timestamp
    pub created_at: DateTime<Utc>,
    /// Last activity timestamp (best-effort, updated on validation/refresh)
    pub last_activity_at: DateTime<Utc>,
    /// Session expiration; mirrors the store key's TTL
    pub expires_at: DateTime<Utc>,
    /// Originating address (audit only, not a credential)
    pub client_ip: Option<String>,
    /// User agent string (for session management display)
    pub user_agent: Option<String>,
}

impl Session {
    /// Create a new session
    ///
    /// TTL is provided by the application layer (config), not hard-coded
    /// here.
    pub fn new(
        user_id: UserId,
        ttl: Duration,
        client_ip: Option<String>,
        user_agent: Option<String>,
    ) -> Self {
        let now = Utc::now();

        Self {
            session_id: Uuid::new_v4(),
            user_id,
            created_at: now,
            last_activity_at: now,
            expires_at: now + ttl,
            client_ip,
            user_agent,
        }
    }

    /// Check if session has expired
    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }

    /// Update last activity timestamp
    pub fn touch(&mut self) {
        self.last_activity_at = Utc::now();
    }

    /// Remaining lifetime, floored at zero
    pub fn remaining_ttl(&self) -> std::time::Duration {
        (self.expires_at - Utc::now())
            .to_std()
            .unwrap_or(std::time::Duration::ZERO)
    }

    /// Store key for this session's record
    pub fn key(&self) -> String {
        session_key(&self.session_id)
    }

    /// Store key for this session's refresh token
    pub fn refresh_key(&self) -> String {
        refresh_key(&self.session_id)
    }
}
