//! Logout Use Case
//!
//! Revokes sessions by deleting their store entries. Single-session
//! logout is idempotent; the all-sessions sweep tolerates partial
//! failure per key rather than aborting on one bad entry.

use std::sync::Arc;
use uuid::Uuid;

use crate::domain::entity::Session;
use crate::domain::entity::session::{SESSION_KEY_PREFIX, refresh_key, session_key};
use crate::domain::events::{SecurityEvent, SecurityEventSink};
use crate::domain::repository::SessionStore;
use crate::domain::value_object::UserId;
use crate::error::{AuthError, AuthResult};

/// Keys fetched per scan page
const SCAN_PAGE_SIZE: usize = 100;

/// Logout use case
pub struct LogoutUseCase<S>
where
    S: SessionStore,
{
    store: Arc<S>,
    events: Arc<dyn SecurityEventSink>,
}

impl<S> LogoutUseCase<S>
where
    S: SessionStore,
{
    pub fn new(store: Arc<S>, events: Arc<dyn SecurityEventSink>) -> Self {
        Self { store, events }
    }

    /// Revoke one session
    ///
    /// Deletes both the session record and the refresh-token entry.
    /// Deleting a non-existent key is not an error, so calling this twice
    /// is safe.
    pub async fn execute(&self, session_id: Uuid) -> AuthResult<()> {
        let keys = [session_key(&session_id), refresh_key(&session_id)];
        self.store.delete(&keys).await?;

        self.events
            .record(SecurityEvent::success("logout").with_session(session_id));

        tracing::info!(session_id = %session_id, "Session revoked");
        Ok(())
    }

    /// Revoke every session belonging to a user
    ///
    /// Enumerates session keys with the store's native cursor, inspects
    /// each record for ownership, and deletes matching session/token
    /// pairs. A bad or unreadable entry is logged and skipped; the sweep
    /// continues. Returns the number of sessions revoked.
    pub async fn execute_all(&self, user_id: &UserId) -> AuthResult<u64> {
        let pattern = format!("{SESSION_KEY_PREFIX}*");
        let mut cursor = 0u64;
        let mut revoked = 0u64;

        loop {
            let (next_cursor, keys) = self
                .store
                .scan_keys(&pattern, cursor, SCAN_PAGE_SIZE)
                .await?;

            for key in keys {
                match self.revoke_if_owned(&key, user_id).await {
                    Ok(true) => revoked += 1,
                    Ok(false) => {}
                    Err(e) => {
                        tracing::warn!(
                            key = %key,
                            error = %e,
                            "Skipping session entry during logout-all sweep"
                        );
                    }
                }
            }

            if next_cursor == 0 {
                break;
            }
            cursor = next_cursor;
        }

        self.events.record(
            SecurityEvent::success("logout_all").with_user(*user_id),
        );

        tracing::info!(
            user_id = %user_id,
            revoked = revoked,
            "All sessions revoked for user"
        );

        Ok(revoked)
    }

    async fn revoke_if_owned(&self, key: &str, user_id: &UserId) -> AuthResult<bool> {
        let Some(raw) = self.store.get(key).await? else {
            // Expired between scan and get
            return Ok(false);
        };

        let session: Session = serde_json::from_str(&raw)
            .map_err(|e| AuthError::Internal(format!("corrupt session record: {e}")))?;

        if session.user_id != *user_id {
            return Ok(false);
        }

        let keys = [key.to_string(), refresh_key(&session.session_id)];
        self.store.delete(&keys).await?;
        Ok(true)
    }
}
