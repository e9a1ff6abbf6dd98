//! Password Reset Use Case
//!
//! Issues and consumes one-time reset tokens. Only a SHA-256 digest of
//! the token is ever stored; the plaintext exists once, in the return
//! value of `generate`. Consumption is atomic, so a token validates
//! exactly once even under concurrent attempts. Delivery of the token to
//! the user (email) is a collaborator's concern, not this module's.

use std::sync::Arc;

use platform::crypto;
use platform::password::ClearTextPassword;

use crate::application::config::AuthConfig;
use crate::application::logout::LogoutUseCase;
use crate::domain::events::{SecurityEvent, SecurityEventSink};
use crate::domain::repository::{SessionStore, UserRepository};
use crate::domain::value_object::UserId;
use crate::error::{AuthError, AuthResult};

/// Key prefix for hashed reset tokens
pub const RESET_KEY_PREFIX: &str = "auth:pwreset:";

/// Length of the plaintext token's entropy, in bytes
const RESET_TOKEN_BYTES: usize = 32;

/// Characters of the token safe to put in the audit log
const PREVIEW_LENGTH: usize = 8;

/// Store key for a reset token: hex SHA-256 of the plaintext
fn reset_key(token: &str) -> String {
    format!(
        "{RESET_KEY_PREFIX}{}",
        crypto::to_hex(&crypto::sha256(token.as_bytes()))
    )
}

/// Password reset use case
pub struct PasswordResetUseCase<U, S>
where
    U: UserRepository,
    S: SessionStore,
{
    users: Arc<U>,
    store: Arc<S>,
    config: Arc<AuthConfig>,
    events: Arc<dyn SecurityEventSink>,
}

impl<U, S> PasswordResetUseCase<U, S>
where
    U: UserRepository,
    S: SessionStore,
{
    pub fn new(
        users: Arc<U>,
        store: Arc<S>,
        config: Arc<AuthConfig>,
        events: Arc<dyn SecurityEventSink>,
    ) -> Self {
        Self {
            users,
            store,
            config,
            events,
        }
    }

    /// Issue a one-time reset token for a user
    ///
    /// Returns the plaintext token; this is the only moment it is ever
    /// knowable. The audit log receives a short non-reversible preview.
    pub async fn generate(&self, user_id: &UserId) -> AuthResult<String> {
        let token = crypto::to_base64_url(&crypto::random_bytes(RESET_TOKEN_BYTES));

        self.store
            .set(
                &reset_key(&token),
                &user_id.to_string(),
                self.config.reset_token_ttl,
            )
            .await?;

        self.events
            .record(SecurityEvent::success("reset_token_issued").with_user(*user_id));
        tracing::info!(
            user_id = %user_id,
            token_preview = &token[..PREVIEW_LENGTH],
            "Password reset token issued"
        );

        Ok(token)
    }

    /// Consume a reset token, returning its subject
    ///
    /// The store entry is deleted atomically before the id is returned,
    /// so a second validation with the same token fails even if it races
    /// this one.
    pub async fn validate(&self, token: &str) -> AuthResult<Option<UserId>> {
        let Some(raw) = self.store.take(&reset_key(token)).await? else {
            self.events
                .record(SecurityEvent::failure("reset_token_rejected", "unknown_or_used"));
            return Ok(None);
        };

        let user_id = UserId::parse(&raw)
            .map_err(|e| AuthError::Internal(format!("corrupt reset entry: {e}")))?;

        self.events
            .record(SecurityEvent::success("reset_token_consumed").with_user(user_id));

        Ok(Some(user_id))
    }

    /// Complete a reset: set the new password, clear any lockout, and
    /// revoke every session of the user
    ///
    /// The password policy is checked before the token is consumed, so a
    /// rejected password does not burn the one-time token.
    pub async fn complete(&self, token: &str, new_password: String) -> AuthResult<Option<UserId>> {
        let new_password = ClearTextPassword::new(new_password)?;

        let Some(user_id) = self.validate(token).await? else {
            return Ok(None);
        };

        let password_hash = self.hash_password(new_password).await?;
        self.users.update_password(&user_id, &password_hash).await?;
        self.users.reset_failure_state(&user_id).await?;

        // Old credentials must not keep any session alive
        let logout = LogoutUseCase::new(self.store.clone(), self.events.clone());
        let revoked = logout.execute_all(&user_id).await?;

        self.events
            .record(SecurityEvent::success("password_reset").with_user(user_id));
        tracing::info!(
            user_id = %user_id,
            sessions_revoked = revoked,
            "Password reset completed"
        );

        Ok(Some(user_id))
    }

    /// Hash the new password off the reactor threads
    async fn hash_password(
        &self,
        new_password: ClearTextPassword,
    ) -> AuthResult<platform::password::HashedPassword> {
        let pepper = self.config.password_pepper.clone();
        tokio::task::spawn_blocking(move || {
            new_password
                .hash(pepper.as_deref())
                .map_err(|e| AuthError::Internal(format!("password hashing failed: {e}")))
        })
        .await
        .map_err(|e| AuthError::Internal(format!("password hashing task failed: {e}")))?
    }
}
