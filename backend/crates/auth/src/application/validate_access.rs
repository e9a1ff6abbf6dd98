//! Validate Access Use Case
//!
//! Proves an access token against its signature AND its live session.
//! Cryptographic validity alone is never sufficient: a stolen token whose
//! session was revoked must be rejected, so store unavailability fails
//! closed here.

use std::sync::Arc;
use uuid::Uuid;

use crate::application::tokens::TokenCodec;
use crate::domain::entity::{Session, session::session_key};
use crate::domain::events::{SecurityEvent, SecurityEventSink};
use crate::domain::repository::SessionStore;
use crate::domain::value_object::{UserId, UserRole};
use crate::error::{AuthError, AuthResult};

/// The authenticated principal extracted from a validated access token
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user_id: UserId,
    pub role: UserRole,
    pub permissions: Vec<String>,
    pub session_id: Uuid,
}

impl AuthContext {
    /// Check a permission; Admin satisfies every check
    pub fn can(&self, permission: &str) -> bool {
        if self.role.is_admin() {
            return true;
        }
        self.permissions.iter().any(|p| p == permission)
    }

    /// Require a permission, failing with `PermissionDenied`
    pub fn require(&self, permission: &str) -> AuthResult<()> {
        if self.can(permission) {
            Ok(())
        } else {
            Err(AuthError::PermissionDenied {
                permission: permission.to_string(),
            })
        }
    }
}

/// Validate access use case
pub struct ValidateAccessUseCase<S>
where
    S: SessionStore,
{
    store: Arc<S>,
    codec: Arc<TokenCodec>,
    events: Arc<dyn SecurityEventSink>,
}

impl<S> ValidateAccessUseCase<S>
where
    S: SessionStore,
{
    pub fn new(
        store: Arc<S>,
        codec: Arc<TokenCodec>,
        events: Arc<dyn SecurityEventSink>,
    ) -> Self {
        Self {
            store,
            codec,
            events,
        }
    }

    pub async fn execute(&self, token: &str) -> AuthResult<AuthContext> {
        let claims = match self.codec.verify_access(token) {
            Ok(claims) => claims,
            Err(rejection) => {
                self.events
                    .record(SecurityEvent::failure("access_rejected", rejection.reason()));
                return Err(AuthError::InvalidToken);
            }
        };

        let session_id: Uuid = claims
            .sid
            .parse()
            .map_err(|_| AuthError::InvalidToken)?;
        let user_id = UserId::parse(&claims.sub).map_err(|_| AuthError::InvalidToken)?;
        let role = UserRole::from_code(&claims.role).ok_or(AuthError::InvalidToken)?;

        // The session is the revocation handle; a store error here must
        // deny, not trust the signature alone.
        if !self.store.exists(&session_key(&session_id)).await? {
            self.events.record(
                SecurityEvent::failure("access_rejected", "session_not_found")
                    .with_user(user_id)
                    .with_session(session_id),
            );
            return Err(AuthError::SessionNotFound);
        }

        self.touch_session(session_id).await;

        Ok(AuthContext {
            user_id,
            role,
            permissions: claims.perms,
            session_id,
        })
    }

    /// Just check whether a token is acceptable
    pub async fn is_valid(&self, token: &str) -> bool {
        self.execute(token).await.is_ok()
    }

    /// Best-effort update of the session's last-activity timestamp
    ///
    /// A failure here must not fail the validation.
    async fn touch_session(&self, session_id: Uuid) {
        let key = session_key(&session_id);
        let result = async {
            let Some(raw) = self.store.get(&key).await? else {
                return Ok(());
            };
            let mut session: Session = serde_json::from_str(&raw)
                .map_err(|e| AuthError::Internal(format!("corrupt session record: {e}")))?;
            session.touch();
            let ttl = session.remaining_ttl();
            if ttl.is_zero() {
                return Ok(());
            }
            let json = serde_json::to_string(&session)
                .map_err(|e| AuthError::Internal(format!("failed to encode session: {e}")))?;
            self.store.set(&key, &json, ttl).await
        }
        .await;

        if let Err(e) = result {
            tracing::warn!(
                session_id = %session_id,
                error = %e,
                "Failed to update session activity"
            );
        }
    }
}
