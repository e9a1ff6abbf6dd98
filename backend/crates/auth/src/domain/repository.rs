//! Repository and Store Traits
//!
//! Interfaces for data persistence. Implementations are in the
//! infrastructure layer; use cases depend on these contracts only.

use chrono::{DateTime, Utc};
use platform::password::HashedPassword;
use std::time::Duration;

use crate::domain::entity::User;
use crate::domain::value_object::{Email, UserId};
use crate::error::AuthResult;

/// Failure-tracking state returned by the atomic lockout update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailureState {
    /// Counter after the increment
    pub failed_login_count: i16,
    /// Lock expiry, set when the counter reached the threshold
    pub locked_until: Option<DateTime<Utc>>,
}

impl FailureState {
    /// Whether this failure transitioned the account into the locked state
    pub fn newly_locked(&self, threshold: i16) -> bool {
        self.locked_until.is_some() && self.failed_login_count == threshold
    }
}

/// User repository trait
///
/// Every method is a single parameterized round-trip against the backing
/// store.
#[trait_variant::make(UserRepository: Send)]
pub trait LocalUserRepository {
    /// Find user by email
    async fn find_by_email(&self, email: &Email) -> AuthResult<Option<User>>;

    /// Find user by ID
    async fn find_by_id(&self, user_id: &UserId) -> AuthResult<Option<User>>;

    /// Record a failed login attempt
    ///
    /// Must be ONE atomic read-modify-write at the store layer: increment
    /// the counter and, when it reaches `threshold`, set `locked_until` to
    /// `lock_until` in the same statement. Two concurrent failures must
    /// never both observe counter N and both write N+1.
    async fn record_login_failure(
        &self,
        user_id: &UserId,
        threshold: i16,
        lock_until: DateTime<Utc>,
    ) -> AuthResult<FailureState>;

    /// Reset counter and lock in one update (successful login)
    async fn reset_failure_state(&self, user_id: &UserId) -> AuthResult<()>;

    /// Update last-login timestamp and address
    async fn record_login(&self, user_id: &UserId, address: Option<&str>) -> AuthResult<()>;

    /// Replace the stored password hash (password reset)
    async fn update_password(
        &self,
        user_id: &UserId,
        password_hash: &HashedPassword,
    ) -> AuthResult<()>;
}

/// Session key-value store trait
///
/// Narrow contract over a networked store with per-key expiration. The
/// store is shared across server instances and is the single source of
/// truth for session state; implementations must bound every call with a
/// timeout and surface failures as `AuthError::StoreUnavailable` so
/// callers fail closed.
#[trait_variant::make(SessionStore: Send)]
pub trait LocalSessionStore {
    /// Set a key with a TTL
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> AuthResult<()>;

    /// Get a key's value
    async fn get(&self, key: &str) -> AuthResult<Option<String>>;

    /// Delete keys; returns how many existed. Deleting a missing key is
    /// not an error.
    async fn delete(&self, keys: &[String]) -> AuthResult<u64>;

    /// Check a key's existence without reading it
    async fn exists(&self, key: &str) -> AuthResult<bool>;

    /// Atomically get and delete a key (one-time-token consumption)
    async fn take(&self, key: &str) -> AuthResult<Option<String>>;

    /// Cursor-paginated key enumeration by glob pattern
    ///
    /// Start with cursor 0; a returned cursor of 0 terminates the scan.
    async fn scan_keys(
        &self,
        pattern: &str,
        cursor: u64,
        count: usize,
    ) -> AuthResult<(u64, Vec<String>)>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    #[test]
    fn test_failure_state_newly_locked() {
        let until = Utc::now() + ChronoDuration::minutes(30);

        let below = FailureState {
            failed_login_count: 4,
            locked_until: None,
        };
        assert!(!below.newly_locked(5));

        let at_threshold = FailureState {
            failed_login_count: 5,
            locked_until: Some(until),
        };
        assert!(at_threshold.newly_locked(5));

        // Already locked earlier; this failure did not cause the transition
        let past_threshold = FailureState {
            failed_login_count: 6,
            locked_until: Some(until),
        };
        assert!(!past_threshold.newly_locked(5));
    }
}
