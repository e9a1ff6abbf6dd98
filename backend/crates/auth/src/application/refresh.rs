//! Refresh Use Case
//!
//! Mints a new access token from a refresh token. The stored copy of the
//! refresh token is the source of truth: a structurally valid token that
//! does not exactly match the store entry is dead. The refresh token and
//! session are left intact (no rotation), so a refresh token keeps
//! working until its own TTL elapses or the session is revoked.

use std::sync::Arc;
use uuid::Uuid;

use crate::application::tokens::TokenCodec;
use crate::domain::entity::session::{refresh_key, session_key};
use crate::domain::events::{SecurityEvent, SecurityEventSink};
use crate::domain::repository::{SessionStore, UserRepository};
use crate::domain::value_object::UserId;
use crate::error::{AuthError, AuthResult};

/// Refresh output
#[derive(Debug)]
pub struct RefreshOutput {
    /// Fresh access token; role and permissions re-derived from the
    /// current user record
    pub access_token: String,
}

/// Refresh use case
pub struct RefreshUseCase<U, S>
where
    U: UserRepository,
    S: SessionStore,
{
    users: Arc<U>,
    store: Arc<S>,
    codec: Arc<TokenCodec>,
    events: Arc<dyn SecurityEventSink>,
}

impl<U, S> RefreshUseCase<U, S>
where
    U: UserRepository,
    S: SessionStore,
{
    pub fn new(
        users: Arc<U>,
        store: Arc<S>,
        codec: Arc<TokenCodec>,
        events: Arc<dyn SecurityEventSink>,
    ) -> Self {
        Self {
            users,
            store,
            codec,
            events,
        }
    }

    pub async fn execute(&self, refresh_token: &str) -> AuthResult<RefreshOutput> {
        let claims = match self.codec.verify_refresh(refresh_token) {
            Ok(claims) => claims,
            Err(rejection) => {
                self.events
                    .record(SecurityEvent::failure("refresh_rejected", rejection.reason()));
                return Err(AuthError::InvalidToken);
            }
        };

        let session_id: Uuid = claims
            .sid
            .parse()
            .map_err(|_| AuthError::InvalidToken)?;
        let user_id = UserId::parse(&claims.sub).map_err(|_| AuthError::InvalidToken)?;

        // Store error propagates: fail closed rather than refreshing
        // against unknown session state.
        let Some(stored) = self.store.get(&refresh_key(&session_id)).await? else {
            self.events.record(
                SecurityEvent::failure("refresh_rejected", "session_not_found")
                    .with_user(user_id)
                    .with_session(session_id),
            );
            return Err(AuthError::SessionNotFound);
        };

        // Exact equality detects store/token desync (e.g. a revoked and
        // re-created session under the same id).
        if !platform::crypto::constant_time_eq(stored.as_bytes(), refresh_token.as_bytes()) {
            self.events.record(
                SecurityEvent::failure("refresh_rejected", "token_mismatch")
                    .with_user(user_id)
                    .with_session(session_id),
            );
            return Err(AuthError::SessionNotFound);
        }

        let user = match self.users.find_by_id(&user_id).await? {
            Some(user) if user.is_active => user,
            missing_or_inactive => {
                // The subject can no longer authenticate; its session must
                // not outlive that fact.
                self.invalidate_session(session_id).await;
                self.events.record(
                    SecurityEvent::failure("refresh_rejected", "user_inactive")
                        .with_user(user_id)
                        .with_session(session_id),
                );
                return Err(match missing_or_inactive {
                    Some(_) => AuthError::AccountInactive,
                    None => AuthError::UserNotFound,
                });
            }
        };

        let access_token = self.codec.sign_access(&user, session_id)?;

        self.events.record(
            SecurityEvent::success("token_refreshed")
                .with_user(user.user_id)
                .with_session(session_id),
        );

        Ok(RefreshOutput { access_token })
    }

    /// Best-effort revocation when the user vanished or was deactivated
    async fn invalidate_session(&self, session_id: Uuid) {
        let keys = [session_key(&session_id), refresh_key(&session_id)];
        if let Err(e) = self.store.delete(&keys).await {
            tracing::warn!(
                session_id = %session_id,
                error = %e,
                "Failed to invalidate session for inactive user"
            );
        }
    }
}
