//! Use-case tests for the auth crate
//!
//! Exercised against the in-memory store and an in-memory user
//! repository; the doubles mirror the production adapters' semantics
//! (atomic lockout update, atomic take).

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use platform::client::ClientMeta;
use platform::password::{ClearTextPassword, HashedPassword};
use uuid::Uuid;

use crate::application::{
    AuthConfig, LoginInput, LoginUseCase, LogoutUseCase, PasswordResetUseCase, RefreshUseCase,
    TokenCodec, ValidateAccessUseCase,
};
use crate::domain::entity::User;
use crate::domain::entity::session::{refresh_key, session_key};
use crate::domain::events::{SecurityEvent, SecurityEventSink};
use crate::domain::repository::{FailureState, SessionStore, UserRepository};
use crate::domain::value_object::{Email, UserId, UserRole};
use crate::error::{AuthError, AuthResult};
use crate::infra::memory::MemorySessionStore;

// ============================================================================
// Test doubles
// ============================================================================

/// In-memory user repository; updates happen under one mutex, matching
/// the atomicity of the SQL implementation
#[derive(Clone, Default)]
struct InMemoryUserRepository {
    users: Arc<Mutex<HashMap<Uuid, User>>>,
    failure_calls: Arc<AtomicUsize>,
}

impl InMemoryUserRepository {
    fn insert(&self, user: User) {
        self.users
            .lock()
            .unwrap()
            .insert(user.user_id.into_uuid(), user);
    }

    fn get(&self, user_id: &UserId) -> Option<User> {
        self.users.lock().unwrap().get(user_id.as_uuid()).cloned()
    }

    fn set_active(&self, user_id: &UserId, active: bool) {
        let mut users = self.users.lock().unwrap();
        users.get_mut(user_id.as_uuid()).unwrap().is_active = active;
    }

    fn set_role(&self, user_id: &UserId, role: UserRole) {
        let mut users = self.users.lock().unwrap();
        users.get_mut(user_id.as_uuid()).unwrap().role = role;
    }

    fn failure_calls(&self) -> usize {
        self.failure_calls.load(Ordering::SeqCst)
    }
}

impl UserRepository for InMemoryUserRepository {
    async fn find_by_email(&self, email: &Email) -> AuthResult<Option<User>> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .values()
            .find(|u| u.email == *email)
            .cloned())
    }

    async fn find_by_id(&self, user_id: &UserId) -> AuthResult<Option<User>> {
        Ok(self.get(user_id))
    }

    async fn record_login_failure(
        &self,
        user_id: &UserId,
        threshold: i16,
        lock_until: DateTime<Utc>,
    ) -> AuthResult<FailureState> {
        self.failure_calls.fetch_add(1, Ordering::SeqCst);
        let mut users = self.users.lock().unwrap();
        let user = users
            .get_mut(user_id.as_uuid())
            .ok_or_else(|| AuthError::Internal("no such user".to_string()))?;

        user.failed_login_count += 1;
        if user.failed_login_count >= threshold {
            user.locked_until = Some(lock_until);
        }

        Ok(FailureState {
            failed_login_count: user.failed_login_count,
            locked_until: user.locked_until,
        })
    }

    async fn reset_failure_state(&self, user_id: &UserId) -> AuthResult<()> {
        let mut users = self.users.lock().unwrap();
        if let Some(user) = users.get_mut(user_id.as_uuid()) {
            user.failed_login_count = 0;
            user.locked_until = None;
        }
        Ok(())
    }

    async fn record_login(&self, user_id: &UserId, address: Option<&str>) -> AuthResult<()> {
        let mut users = self.users.lock().unwrap();
        if let Some(user) = users.get_mut(user_id.as_uuid()) {
            user.last_login_at = Some(Utc::now());
            user.last_login_ip = address.map(str::to_string);
        }
        Ok(())
    }

    async fn update_password(
        &self,
        user_id: &UserId,
        password_hash: &HashedPassword,
    ) -> AuthResult<()> {
        let mut users = self.users.lock().unwrap();
        if let Some(user) = users.get_mut(user_id.as_uuid()) {
            user.password_hash = password_hash.clone();
        }
        Ok(())
    }
}

/// Store double that refuses every call, for fail-closed assertions
#[derive(Clone, Default)]
struct FailingStore;

impl SessionStore for FailingStore {
    async fn set(&self, _key: &str, _value: &str, _ttl: Duration) -> AuthResult<()> {
        Err(AuthError::StoreUnavailable("store offline".to_string()))
    }

    async fn get(&self, _key: &str) -> AuthResult<Option<String>> {
        Err(AuthError::StoreUnavailable("store offline".to_string()))
    }

    async fn delete(&self, _keys: &[String]) -> AuthResult<u64> {
        Err(AuthError::StoreUnavailable("store offline".to_string()))
    }

    async fn exists(&self, _key: &str) -> AuthResult<bool> {
        Err(AuthError::StoreUnavailable("store offline".to_string()))
    }

    async fn take(&self, _key: &str) -> AuthResult<Option<String>> {
        Err(AuthError::StoreUnavailable("store offline".to_string()))
    }

    async fn scan_keys(
        &self,
        _pattern: &str,
        _cursor: u64,
        _count: usize,
    ) -> AuthResult<(u64, Vec<String>)> {
        Err(AuthError::StoreUnavailable("store offline".to_string()))
    }
}

/// Store double whose writes fail only for refresh-token keys, to force
/// a partial session write
#[derive(Clone, Default)]
struct RefreshWriteFailsStore {
    inner: MemorySessionStore,
}

impl SessionStore for RefreshWriteFailsStore {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> AuthResult<()> {
        if key.starts_with("auth:refresh:") {
            return Err(AuthError::StoreUnavailable("refresh write failed".to_string()));
        }
        self.inner.set(key, value, ttl).await
    }

    async fn get(&self, key: &str) -> AuthResult<Option<String>> {
        self.inner.get(key).await
    }

    async fn delete(&self, keys: &[String]) -> AuthResult<u64> {
        self.inner.delete(keys).await
    }

    async fn exists(&self, key: &str) -> AuthResult<bool> {
        self.inner.exists(key).await
    }

    async fn take(&self, key: &str) -> AuthResult<Option<String>> {
        self.inner.take(key).await
    }

    async fn scan_keys(
        &self,
        pattern: &str,
        cursor: u64,
        count: usize,
    ) -> AuthResult<(u64, Vec<String>)> {
        self.inner.scan_keys(pattern, cursor, count).await
    }
}

/// Event sink that records events for assertions
#[derive(Default)]
struct RecordingEventSink {
    events: Mutex<Vec<SecurityEvent>>,
}

impl RecordingEventSink {
    fn names(&self) -> Vec<&'static str> {
        self.events.lock().unwrap().iter().map(|e| e.name).collect()
    }

    fn count(&self, name: &str) -> usize {
        self.names().iter().filter(|&&n| n == name).count()
    }

    fn reasons_for(&self, name: &str) -> Vec<&'static str> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.name == name)
            .filter_map(|e| e.reason)
            .collect()
    }
}

impl SecurityEventSink for RecordingEventSink {
    fn record(&self, event: SecurityEvent) {
        self.events.lock().unwrap().push(event);
    }
}

// ============================================================================
// Environment
// ============================================================================

const PASSWORD: &str = "Correct#Horse7";

struct TestEnv {
    users: Arc<InMemoryUserRepository>,
    store: Arc<MemorySessionStore>,
    codec: Arc<TokenCodec>,
    config: Arc<AuthConfig>,
    events: Arc<RecordingEventSink>,
}

impl TestEnv {
    fn new() -> Self {
        let config = Arc::new(AuthConfig::new(vec![0u8; 32], vec![1u8; 32]).unwrap());
        Self {
            users: Arc::new(InMemoryUserRepository::default()),
            store: Arc::new(MemorySessionStore::new()),
            codec: Arc::new(TokenCodec::new(&config)),
            config,
            events: Arc::new(RecordingEventSink::default()),
        }
    }

    fn sink(&self) -> Arc<dyn SecurityEventSink> {
        self.events.clone()
    }

    fn seed_user(&self, email: &str, password: &str, role: UserRole) -> User {
        let hash = ClearTextPassword::unvalidated(password.to_string())
            .hash(None)
            .unwrap();
        let mut user = User::new(Email::new(email).unwrap(), hash);
        user.role = role;
        self.users.insert(user.clone());
        user
    }

    fn login_use_case(&self) -> LoginUseCase<InMemoryUserRepository, MemorySessionStore> {
        LoginUseCase::new(
            self.users.clone(),
            self.store.clone(),
            self.codec.clone(),
            self.config.clone(),
            self.sink(),
        )
    }

    fn refresh_use_case(&self) -> RefreshUseCase<InMemoryUserRepository, MemorySessionStore> {
        RefreshUseCase::new(
            self.users.clone(),
            self.store.clone(),
            self.codec.clone(),
            self.sink(),
        )
    }

    fn validate_use_case(&self) -> ValidateAccessUseCase<MemorySessionStore> {
        ValidateAccessUseCase::new(self.store.clone(), self.codec.clone(), self.sink())
    }

    fn logout_use_case(&self) -> LogoutUseCase<MemorySessionStore> {
        LogoutUseCase::new(self.store.clone(), self.sink())
    }

    fn reset_use_case(&self) -> PasswordResetUseCase<InMemoryUserRepository, MemorySessionStore> {
        PasswordResetUseCase::new(
            self.users.clone(),
            self.store.clone(),
            self.config.clone(),
            self.sink(),
        )
    }

    async fn login(&self, email: &str, password: &str) -> AuthResult<crate::application::LoginOutput> {
        self.login_use_case()
            .execute(
                LoginInput {
                    email: email.to_string(),
                    password: password.to_string(),
                },
                ClientMeta::default(),
            )
            .await
    }
}

// ============================================================================
// Login
// ============================================================================

mod login_tests {
    use super::*;

    #[tokio::test]
    async fn login_succeeds_and_both_tokens_are_usable() {
        let env = TestEnv::new();
        let seeded = env.seed_user("a@x.com", PASSWORD, UserRole::Cashier);

        let output = env.login("a@x.com", PASSWORD).await.unwrap();
        assert_eq!(output.user.user_id, seeded.user_id);

        // Access token is accepted and carries the seeded role
        let ctx = env.validate_use_case().execute(&output.access_token).await.unwrap();
        assert_eq!(ctx.user_id, seeded.user_id);
        assert_eq!(ctx.role, UserRole::Cashier);
        assert_eq!(ctx.permissions, seeded.permissions());
        assert_eq!(ctx.session_id, output.session_id);

        // Refresh token mints a fresh access token
        let refreshed = env
            .refresh_use_case()
            .execute(&output.refresh_token)
            .await
            .unwrap();
        assert!(
            env.validate_use_case()
                .execute(&refreshed.access_token)
                .await
                .is_ok()
        );

        assert_eq!(env.events.count("login_succeeded"), 1);
    }

    #[tokio::test]
    async fn login_writes_session_and_refresh_entries() {
        let env = TestEnv::new();
        env.seed_user("a@x.com", PASSWORD, UserRole::Viewer);

        let output = env.login("a@x.com", PASSWORD).await.unwrap();

        assert!(env.store.exists(&session_key(&output.session_id)).await.unwrap());
        let stored = env
            .store
            .get(&refresh_key(&output.session_id))
            .await
            .unwrap();
        assert_eq!(stored.as_deref(), Some(output.refresh_token.as_str()));
    }

    #[tokio::test]
    async fn unknown_email_fails_with_generic_shape() {
        let env = TestEnv::new();

        let err = env.login("ghost@x.com", PASSWORD).await.unwrap_err();
        assert!(matches!(err, AuthError::UserNotFound));
        // Collapses to the same body as a wrong password
        assert_eq!(
            err.to_app_error().message(),
            AuthError::InvalidCredentials.to_app_error().message()
        );
        assert_eq!(env.events.reasons_for("login_failed"), vec!["unknown_user"]);
    }

    #[tokio::test]
    async fn wrong_password_fails_and_counts() {
        let env = TestEnv::new();
        let user = env.seed_user("a@x.com", PASSWORD, UserRole::Viewer);

        let err = env.login("a@x.com", "Wrong#Horse7").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
        assert_eq!(env.users.get(&user.user_id).unwrap().failed_login_count, 1);
        assert!(env.store.is_empty());
    }

    #[tokio::test]
    async fn inactive_user_cannot_login() {
        let env = TestEnv::new();
        let user = env.seed_user("a@x.com", PASSWORD, UserRole::Viewer);
        env.users.set_active(&user.user_id, false);

        let err = env.login("a@x.com", PASSWORD).await.unwrap_err();
        assert!(matches!(err, AuthError::AccountInactive));
        assert!(env.store.is_empty());
    }

    #[tokio::test]
    async fn login_fails_closed_when_store_is_down() {
        let env = TestEnv::new();
        let user = env.seed_user("a@x.com", PASSWORD, UserRole::Viewer);

        let use_case = LoginUseCase::new(
            env.users.clone(),
            Arc::new(FailingStore),
            env.codec.clone(),
            env.config.clone(),
            env.sink(),
        );
        let err = use_case
            .execute(
                LoginInput {
                    email: "a@x.com".to_string(),
                    password: PASSWORD.to_string(),
                },
                ClientMeta::default(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AuthError::StoreUnavailable(_)));
        // Credential state was still updated; only the session is withheld
        assert!(env.users.get(&user.user_id).unwrap().last_login_at.is_some());
    }

    #[tokio::test]
    async fn partial_session_write_rolls_back_and_fails() {
        let env = TestEnv::new();
        env.seed_user("a@x.com", PASSWORD, UserRole::Viewer);

        let store = Arc::new(RefreshWriteFailsStore::default());
        let use_case = LoginUseCase::new(
            env.users.clone(),
            store.clone(),
            env.codec.clone(),
            env.config.clone(),
            env.sink(),
        );

        let err = use_case
            .execute(
                LoginInput {
                    email: "a@x.com".to_string(),
                    password: PASSWORD.to_string(),
                },
                ClientMeta::default(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AuthError::StoreUnavailable(_)));
        // No orphaned session record survives the failed login
        assert!(store.inner.is_empty());
    }
}

// ============================================================================
// Lockout
// ============================================================================

mod lockout_tests {
    use super::*;

    #[tokio::test]
    async fn fifth_failure_locks_for_thirty_minutes() {
        let env = TestEnv::new();
        let user = env.seed_user("a@x.com", PASSWORD, UserRole::Viewer);

        for _ in 0..4 {
            let err = env.login("a@x.com", "Wrong#Horse7").await.unwrap_err();
            assert!(matches!(err, AuthError::InvalidCredentials));
        }
        let before = Utc::now();
        let err = env.login("a@x.com", "Wrong#Horse7").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));

        let state = env.users.get(&user.user_id).unwrap();
        assert_eq!(state.failed_login_count, 5);
        let locked_until = state.locked_until.expect("fifth failure sets the lock");
        let lock_span = locked_until - before;
        assert!(lock_span >= chrono::Duration::minutes(29));
        assert!(lock_span <= chrono::Duration::minutes(31));

        assert_eq!(env.events.count("account_locked"), 1);
    }

    #[tokio::test]
    async fn locked_account_short_circuits_before_password_verification() {
        let env = TestEnv::new();
        // The stored hash is garbage: if the verifier ran, it would return
        // false and the failure path would fire. A locked account must
        // fail before either can happen.
        let mut user = User::new(
            Email::new("a@x.com").unwrap(),
            HashedPassword::from_db("garbage"),
        );
        user.locked_until = Some(Utc::now() + chrono::Duration::minutes(30));
        let user_id = user.user_id;
        env.users.insert(user);

        let err = env.login("a@x.com", PASSWORD).await.unwrap_err();
        let AuthError::AccountLocked { until } = err else {
            panic!("expected AccountLocked, got {err:?}");
        };
        assert!(until > Utc::now());
        assert_eq!(env.users.failure_calls(), 0);
        assert_eq!(env.users.get(&user_id).unwrap().failed_login_count, 0);
    }

    #[tokio::test]
    async fn sixth_attempt_with_correct_password_is_still_locked() {
        let env = TestEnv::new();
        env.seed_user("a@x.com", PASSWORD, UserRole::Viewer);

        for _ in 0..5 {
            let err = env.login("a@x.com", "Wrong#Horse7").await.unwrap_err();
            assert!(matches!(err, AuthError::InvalidCredentials));
        }

        // The lock kicked in before this attempt could succeed
        let err = env.login("a@x.com", PASSWORD).await.unwrap_err();
        assert!(matches!(err, AuthError::AccountLocked { .. }));
    }

    #[tokio::test]
    async fn concurrent_failures_lose_no_increments() {
        let env = TestEnv::new();
        let user = env.seed_user("a@x.com", PASSWORD, UserRole::Viewer);

        let (a, b, c, d, e) = tokio::join!(
            env.login("a@x.com", "Wrong#Horse7"),
            env.login("a@x.com", "Wrong#Horse7"),
            env.login("a@x.com", "Wrong#Horse7"),
            env.login("a@x.com", "Wrong#Horse7"),
            env.login("a@x.com", "Wrong#Horse7"),
        );
        for result in [a, b, c, d, e] {
            assert!(result.is_err());
        }

        let state = env.users.get(&user.user_id).unwrap();
        assert_eq!(state.failed_login_count, 5);
        assert!(state.locked_until.is_some());
    }

    #[tokio::test]
    async fn successful_login_resets_counter_without_unlock_event() {
        let env = TestEnv::new();
        let user = env.seed_user("a@x.com", PASSWORD, UserRole::Viewer);

        for _ in 0..3 {
            let _ = env.login("a@x.com", "Wrong#Horse7").await;
        }
        env.login("a@x.com", PASSWORD).await.unwrap();

        let state = env.users.get(&user.user_id).unwrap();
        assert_eq!(state.failed_login_count, 0);
        assert!(state.locked_until.is_none());
        // Counter was nonzero but the account was never locked
        assert_eq!(env.events.count("account_unlocked"), 0);
    }

    #[tokio::test]
    async fn expired_lock_allows_login_and_emits_unlock_event() {
        let env = TestEnv::new();
        let user = env.seed_user("a@x.com", PASSWORD, UserRole::Viewer);
        {
            let mut users = env.users.users.lock().unwrap();
            let entry = users.get_mut(user.user_id.as_uuid()).unwrap();
            entry.failed_login_count = 5;
            entry.locked_until = Some(Utc::now() - chrono::Duration::seconds(1));
        }

        env.login("a@x.com", PASSWORD).await.unwrap();

        let state = env.users.get(&user.user_id).unwrap();
        assert_eq!(state.failed_login_count, 0);
        assert!(state.locked_until.is_none());
        assert_eq!(env.events.count("account_unlocked"), 1);
    }
}

// ============================================================================
// Access validation & revocation
// ============================================================================

mod validate_tests {
    use super::*;

    #[tokio::test]
    async fn revoked_session_kills_valid_access_token() {
        let env = TestEnv::new();
        env.seed_user("a@x.com", PASSWORD, UserRole::Manager);

        let output = env.login("a@x.com", PASSWORD).await.unwrap();
        assert!(env.validate_use_case().execute(&output.access_token).await.is_ok());

        env.logout_use_case().execute(output.session_id).await.unwrap();

        // Cryptographically the token is still perfectly valid
        let err = env
            .validate_use_case()
            .execute(&output.access_token)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::SessionNotFound));
        assert!(
            env.events
                .reasons_for("access_rejected")
                .contains(&"session_not_found")
        );
    }

    #[tokio::test]
    async fn garbage_token_is_rejected() {
        let env = TestEnv::new();
        let err = env
            .validate_use_case()
            .execute("definitely.not.ajwt")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken));
    }

    #[tokio::test]
    async fn validation_fails_closed_when_store_is_down() {
        let env = TestEnv::new();
        env.seed_user("a@x.com", PASSWORD, UserRole::Viewer);
        let output = env.login("a@x.com", PASSWORD).await.unwrap();

        let offline = ValidateAccessUseCase::new(
            Arc::new(FailingStore),
            env.codec.clone(),
            env.sink(),
        );
        let err = offline.execute(&output.access_token).await.unwrap_err();
        assert!(matches!(err, AuthError::StoreUnavailable(_)));
    }

    #[tokio::test]
    async fn admin_context_grants_everything() {
        let env = TestEnv::new();
        env.seed_user("root@x.com", PASSWORD, UserRole::Admin);
        let output = env.login("root@x.com", PASSWORD).await.unwrap();

        let ctx = env.validate_use_case().execute(&output.access_token).await.unwrap();
        assert!(ctx.can("payments:write"));
        assert!(ctx.can("warehouse:transfer"));
        assert!(ctx.require("anything:at-all").is_ok());
    }

    #[tokio::test]
    async fn non_admin_context_enforces_permissions() {
        let env = TestEnv::new();
        env.seed_user("till@x.com", PASSWORD, UserRole::Cashier);
        let output = env.login("till@x.com", PASSWORD).await.unwrap();

        let ctx = env.validate_use_case().execute(&output.access_token).await.unwrap();
        assert!(ctx.can("orders:write"));
        assert!(!ctx.can("inventory:write"));
        assert!(matches!(
            ctx.require("inventory:write"),
            Err(AuthError::PermissionDenied { .. })
        ));
    }
}

// ============================================================================
// Refresh
// ============================================================================

mod refresh_tests {
    use super::*;

    #[tokio::test]
    async fn refresh_is_rejected_after_logout() {
        let env = TestEnv::new();
        env.seed_user("a@x.com", PASSWORD, UserRole::Viewer);
        let output = env.login("a@x.com", PASSWORD).await.unwrap();

        env.logout_use_case().execute(output.session_id).await.unwrap();

        let err = env
            .refresh_use_case()
            .execute(&output.refresh_token)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::SessionNotFound));
    }

    #[tokio::test]
    async fn refresh_requires_exact_match_with_stored_token() {
        let env = TestEnv::new();
        let user = env.seed_user("a@x.com", PASSWORD, UserRole::Viewer);
        let output = env.login("a@x.com", PASSWORD).await.unwrap();

        // Desync the store: a different (even valid) token under this
        // session id must invalidate the presented one
        let other = env
            .codec
            .sign_refresh(&user.user_id, output.session_id)
            .unwrap();
        env.store
            .set(
                &refresh_key(&output.session_id),
                &other,
                Duration::from_secs(60),
            )
            .await
            .unwrap();

        let err = env
            .refresh_use_case()
            .execute(&output.refresh_token)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::SessionNotFound));
        assert!(
            env.events
                .reasons_for("refresh_rejected")
                .contains(&"token_mismatch")
        );
    }

    #[tokio::test]
    async fn refresh_does_not_rotate() {
        let env = TestEnv::new();
        env.seed_user("a@x.com", PASSWORD, UserRole::Viewer);
        let output = env.login("a@x.com", PASSWORD).await.unwrap();

        env.refresh_use_case().execute(&output.refresh_token).await.unwrap();
        // The same refresh token keeps working after use
        env.refresh_use_case().execute(&output.refresh_token).await.unwrap();

        let stored = env
            .store
            .get(&refresh_key(&output.session_id))
            .await
            .unwrap();
        assert_eq!(stored.as_deref(), Some(output.refresh_token.as_str()));
    }

    #[tokio::test]
    async fn refresh_for_deactivated_user_invalidates_the_session() {
        let env = TestEnv::new();
        let user = env.seed_user("a@x.com", PASSWORD, UserRole::Viewer);
        let output = env.login("a@x.com", PASSWORD).await.unwrap();

        env.users.set_active(&user.user_id, false);

        let err = env
            .refresh_use_case()
            .execute(&output.refresh_token)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::AccountInactive));

        // Session and refresh entries are both gone
        assert!(!env.store.exists(&session_key(&output.session_id)).await.unwrap());
        assert!(!env.store.exists(&refresh_key(&output.session_id)).await.unwrap());
        assert!(
            env.events
                .reasons_for("refresh_rejected")
                .contains(&"user_inactive")
        );
    }

    #[tokio::test]
    async fn refresh_rederives_permissions_from_current_role() {
        let env = TestEnv::new();
        let user = env.seed_user("a@x.com", PASSWORD, UserRole::Viewer);
        let output = env.login("a@x.com", PASSWORD).await.unwrap();

        env.users.set_role(&user.user_id, UserRole::Manager);

        let refreshed = env
            .refresh_use_case()
            .execute(&output.refresh_token)
            .await
            .unwrap();
        let claims = env.codec.verify_access(&refreshed.access_token).unwrap();
        assert_eq!(claims.role, "manager");
        assert!(claims.perms.contains(&"inventory:write".to_string()));
    }

    #[tokio::test]
    async fn refresh_fails_closed_when_store_is_down() {
        let env = TestEnv::new();
        env.seed_user("a@x.com", PASSWORD, UserRole::Viewer);
        let output = env.login("a@x.com", PASSWORD).await.unwrap();

        let offline = RefreshUseCase::new(
            env.users.clone(),
            Arc::new(FailingStore),
            env.codec.clone(),
            env.sink(),
        );
        let err = offline.execute(&output.refresh_token).await.unwrap_err();
        assert!(matches!(err, AuthError::StoreUnavailable(_)));
    }
}

// ============================================================================
// Logout
// ============================================================================

mod logout_tests {
    use super::*;

    #[tokio::test]
    async fn logout_is_idempotent() {
        let env = TestEnv::new();
        env.seed_user("a@x.com", PASSWORD, UserRole::Viewer);
        let output = env.login("a@x.com", PASSWORD).await.unwrap();

        env.logout_use_case().execute(output.session_id).await.unwrap();
        // Second revocation of the same session: no error, no effect
        env.logout_use_case().execute(output.session_id).await.unwrap();

        assert!(env.store.is_empty());
    }

    #[tokio::test]
    async fn logout_all_revokes_only_the_users_sessions() {
        let env = TestEnv::new();
        let alice = env.seed_user("alice@x.com", PASSWORD, UserRole::Viewer);
        env.seed_user("bob@x.com", PASSWORD, UserRole::Viewer);

        let a1 = env.login("alice@x.com", PASSWORD).await.unwrap();
        let a2 = env.login("alice@x.com", PASSWORD).await.unwrap();
        let a3 = env.login("alice@x.com", PASSWORD).await.unwrap();
        let b1 = env.login("bob@x.com", PASSWORD).await.unwrap();

        let revoked = env.logout_use_case().execute_all(&alice.user_id).await.unwrap();
        assert_eq!(revoked, 3);

        for gone in [&a1, &a2, &a3] {
            assert!(
                env.validate_use_case().execute(&gone.access_token).await.is_err()
            );
        }
        assert!(env.validate_use_case().execute(&b1.access_token).await.is_ok());
    }

    #[tokio::test]
    async fn logout_all_skips_corrupt_entries_and_continues() {
        let env = TestEnv::new();
        let alice = env.seed_user("alice@x.com", PASSWORD, UserRole::Viewer);
        env.login("alice@x.com", PASSWORD).await.unwrap();
        env.login("alice@x.com", PASSWORD).await.unwrap();

        env.store
            .set("auth:session:not-json", "{{{", Duration::from_secs(60))
            .await
            .unwrap();

        let revoked = env.logout_use_case().execute_all(&alice.user_id).await.unwrap();
        assert_eq!(revoked, 2);
        // The bad entry was skipped, not fatal
        assert!(env.store.exists("auth:session:not-json").await.unwrap());
    }
}

// ============================================================================
// Password reset
// ============================================================================

mod reset_tests {
    use super::*;

    #[tokio::test]
    async fn reset_token_validates_exactly_once() {
        let env = TestEnv::new();
        let user = env.seed_user("a@x.com", PASSWORD, UserRole::Viewer);

        let token = env.reset_use_case().generate(&user.user_id).await.unwrap();

        let first = env.reset_use_case().validate(&token).await.unwrap();
        assert_eq!(first, Some(user.user_id));

        let second = env.reset_use_case().validate(&token).await.unwrap();
        assert_eq!(second, None);
    }

    #[tokio::test]
    async fn concurrent_validations_have_a_single_winner() {
        let env = TestEnv::new();
        let user = env.seed_user("a@x.com", PASSWORD, UserRole::Viewer);
        let token = env.reset_use_case().generate(&user.user_id).await.unwrap();

        let use_case = env.reset_use_case();
        let (a, b) = tokio::join!(use_case.validate(&token), use_case.validate(&token));

        let winners = [a.unwrap(), b.unwrap()].into_iter().flatten().count();
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn unknown_token_is_rejected_without_error() {
        let env = TestEnv::new();
        let result = env.reset_use_case().validate("never-issued").await.unwrap();
        assert_eq!(result, None);
    }

    #[tokio::test]
    async fn complete_changes_password_and_revokes_all_sessions() {
        let env = TestEnv::new();
        let user = env.seed_user("a@x.com", PASSWORD, UserRole::Viewer);
        let session = env.login("a@x.com", PASSWORD).await.unwrap();

        let token = env.reset_use_case().generate(&user.user_id).await.unwrap();
        let result = env
            .reset_use_case()
            .complete(&token, "Brand#New-Pass9".to_string())
            .await
            .unwrap();
        assert_eq!(result, Some(user.user_id));

        // Old password is dead, new one works
        assert!(env.login("a@x.com", PASSWORD).await.is_err());
        env.login("a@x.com", "Brand#New-Pass9").await.unwrap();

        // Every pre-reset session was revoked
        assert!(
            env.validate_use_case().execute(&session.access_token).await.is_err()
        );
    }

    #[tokio::test]
    async fn weak_password_does_not_burn_the_token() {
        let env = TestEnv::new();
        let user = env.seed_user("a@x.com", PASSWORD, UserRole::Viewer);
        let token = env.reset_use_case().generate(&user.user_id).await.unwrap();

        let err = env
            .reset_use_case()
            .complete(&token, "short".to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::PasswordValidation(_)));

        // The token is still consumable with an acceptable password
        let result = env
            .reset_use_case()
            .complete(&token, "Brand#New-Pass9".to_string())
            .await
            .unwrap();
        assert_eq!(result, Some(user.user_id));
    }

    #[tokio::test]
    async fn generate_fails_closed_when_store_is_down() {
        let env = TestEnv::new();
        let user = env.seed_user("a@x.com", PASSWORD, UserRole::Viewer);

        let offline = PasswordResetUseCase::new(
            env.users.clone(),
            Arc::new(FailingStore),
            env.config.clone(),
            env.sink(),
        );
        let err = offline.generate(&user.user_id).await.unwrap_err();
        assert!(matches!(err, AuthError::StoreUnavailable(_)));
    }
}
