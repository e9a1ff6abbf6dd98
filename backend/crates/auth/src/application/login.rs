//! Login Use Case
//!
//! Authenticates a user, creates a session, and mints the token pair.

use std::sync::Arc;

use chrono::Utc;
use platform::client::ClientMeta;
use platform::password::{ClearTextPassword, HashedPassword};
use uuid::Uuid;

use crate::application::config::AuthConfig;
use crate::application::tokens::TokenCodec;
use crate::domain::entity::{Session, User};
use crate::domain::events::{EventSeverity, SecurityEvent, SecurityEventSink};
use crate::domain::repository::{SessionStore, UserRepository};
use crate::domain::value_object::Email;
use crate::error::{AuthError, AuthResult};

/// Login input
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

/// Login output
#[derive(Debug)]
pub struct LoginOutput {
    /// The authenticated user with failure state cleared
    pub user: User,
    /// Short-lived stateless access token
    pub access_token: String,
    /// Long-lived store-backed refresh token
    pub refresh_token: String,
    /// Session id both tokens are bound to
    pub session_id: Uuid,
}

/// Login use case
pub struct LoginUseCase<U, S>
where
    U: UserRepository,
    S: SessionStore,
{
    users: Arc<U>,
    store: Arc<S>,
    codec: Arc<TokenCodec>,
    config: Arc<AuthConfig>,
    events: Arc<dyn SecurityEventSink>,
}

impl<U, S> LoginUseCase<U, S>
where
    U: UserRepository,
    S: SessionStore,
{
    pub fn new(
        users: Arc<U>,
        store: Arc<S>,
        codec: Arc<TokenCodec>,
        config: Arc<AuthConfig>,
        events: Arc<dyn SecurityEventSink>,
    ) -> Self {
        Self {
            users,
            store,
            codec,
            config,
            events,
        }
    }

    pub async fn execute(&self, input: LoginInput, client: ClientMeta) -> AuthResult<LoginOutput> {
        let client_ip = client.ip_string();

        let Ok(email) = Email::new(&input.email) else {
            self.events.record(
                SecurityEvent::failure("login_failed", "invalid_email")
                    .with_ip(client_ip.clone()),
            );
            return Err(AuthError::InvalidCredentials);
        };

        let Some(user) = self.users.find_by_email(&email).await? else {
            self.events.record(
                SecurityEvent::failure("login_failed", "unknown_user")
                    .with_email(email.as_str())
                    .with_ip(client_ip.clone()),
            );
            return Err(AuthError::UserNotFound);
        };

        // Locked accounts fail before the password is verified: no wasted
        // hashing work, no timing side-channel on the lock state.
        if !user.is_eligible() {
            let until = user
                .locked_until
                .ok_or_else(|| AuthError::Internal("ineligible user without lock".to_string()))?;
            self.events.record(
                SecurityEvent::failure("login_failed", "account_locked")
                    .with_user(user.user_id)
                    .with_ip(client_ip.clone()),
            );
            return Err(AuthError::AccountLocked { until });
        }

        if !self.verify_password(&user, input.password).await? {
            return Err(self.handle_wrong_password(&user, client_ip).await?);
        }

        if !user.is_active {
            self.events.record(
                SecurityEvent::failure("login_failed", "user_inactive")
                    .with_user(user.user_id)
                    .with_ip(client_ip.clone()),
            );
            return Err(AuthError::AccountInactive);
        }

        // Success path: clear failure state and stamp the login
        let mut user = user;
        if user.has_failure_state() {
            let was_locked = user.locked_until.is_some();
            self.users.reset_failure_state(&user.user_id).await?;
            user.clear_failure_state();
            if was_locked {
                self.events.record(
                    SecurityEvent::success("account_unlocked").with_user(user.user_id),
                );
            }
        }
        self.users
            .record_login(&user.user_id, client_ip.as_deref())
            .await?;
        user.record_login(client_ip.clone());

        let output = self.open_session(user, client).await?;

        self.events.record(
            SecurityEvent::success("login_succeeded")
                .with_user(output.user.user_id)
                .with_session(output.session_id)
                .with_ip(client_ip),
        );

        Ok(output)
    }

    /// Verify the password off the async runtime's worker threads
    ///
    /// Argon2id costs ~100ms per call; blocking a reactor thread for that
    /// long would stall unrelated request handling.
    async fn verify_password(&self, user: &User, password: String) -> AuthResult<bool> {
        let hash: HashedPassword = user.password_hash.clone();
        let pepper = self.config.password_pepper.clone();

        tokio::task::spawn_blocking(move || {
            let password = ClearTextPassword::unvalidated(password);
            hash.verify(&password, pepper.as_deref())
        })
        .await
        .map_err(|e| AuthError::Internal(format!("password verification task failed: {e}")))
    }

    /// Failure path: atomic counter increment with conditional lock
    async fn handle_wrong_password(
        &self,
        user: &User,
        client_ip: Option<String>,
    ) -> AuthResult<AuthError> {
        let lock_until = Utc::now() + self.config.lockout_duration_chrono();
        let state = self
            .users
            .record_login_failure(&user.user_id, self.config.max_login_failures, lock_until)
            .await?;

        if state.newly_locked(self.config.max_login_failures) {
            self.events.record(
                SecurityEvent::failure("account_locked", "failure_threshold_reached")
                    .with_severity(EventSeverity::Critical)
                    .with_user(user.user_id)
                    .with_ip(client_ip.clone()),
            );
        }

        self.events.record(
            SecurityEvent::failure("login_failed", "wrong_password")
                .with_user(user.user_id)
                .with_ip(client_ip),
        );

        Ok(AuthError::InvalidCredentials)
    }

    /// Write the session record and the refresh token's own store entry
    ///
    /// Both writes must succeed or the login fails: a user must never hold
    /// tokens that cannot later be validated against the store.
    async fn open_session(&self, user: User, client: ClientMeta) -> AuthResult<LoginOutput> {
        let ttl = chrono::Duration::from_std(self.config.refresh_token_ttl)
            .map_err(|e| AuthError::Internal(format!("invalid refresh TTL: {e}")))?;

        let session = Session::new(
            user.user_id,
            ttl,
            client.ip_string(),
            client.user_agent.clone(),
        );
        let session_id = session.session_id;

        let access_token = self.codec.sign_access(&user, session_id)?;
        let refresh_token = self.codec.sign_refresh(&user.user_id, session_id)?;

        let session_json = serde_json::to_string(&session)
            .map_err(|e| AuthError::Internal(format!("failed to encode session: {e}")))?;

        self.store
            .set(&session.key(), &session_json, self.config.refresh_token_ttl)
            .await?;

        if let Err(e) = self
            .store
            .set(
                &session.refresh_key(),
                &refresh_token,
                self.config.refresh_token_ttl,
            )
            .await
        {
            // No silent partial session: roll back the record we already
            // wrote, then fail the login.
            if let Err(cleanup) = self.store.delete(&[session.key()]).await {
                tracing::warn!(
                    session_id = %session_id,
                    error = %cleanup,
                    "Failed to clean up partial session"
                );
            }
            return Err(e);
        }

        tracing::info!(
            user_id = %user.user_id,
            session_id = %session_id,
            "User logged in"
        );

        Ok(LoginOutput {
            user,
            access_token,
            refresh_token,
            session_id,
        })
    }
}
