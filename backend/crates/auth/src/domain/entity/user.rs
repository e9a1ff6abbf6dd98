//! User Entity
//!
//! Identity record for a staff member of the retail backend. The core
//! reads and writes only the authentication-relevant columns (password
//! hash, failure counter, lock-until, last-login); everything else is
//! owned by the wider persistence layer.

use chrono::{DateTime, Utc};
use platform::password::HashedPassword;

use crate::domain::value_object::{Email, StoreId, UserId, UserRole};

/// User entity
#[derive(Debug, Clone)]
pub struct User {
    /// Internal UUID identifier
    pub user_id: UserId,
    /// Login email (unique, lowercased)
    pub email: Email,
    /// Argon2id password hash (PHC string)
    pub password_hash: HashedPassword,
    /// Role (Admin, Manager, Cashier, Viewer)
    pub role: UserRole,
    /// Whether the account may authenticate at all
    pub is_active: bool,
    /// Consecutive login failure count
    pub failed_login_count: i16,
    /// Account locked until (temporary lockout after failures)
    pub locked_until: Option<DateTime<Utc>>,
    /// Last successful login time
    pub last_login_at: Option<DateTime<Utc>>,
    /// Address of the last successful login
    pub last_login_ip: Option<String>,
    /// Store (shop location) affiliation
    pub store_id: Option<StoreId>,
    /// Created timestamp
    pub created_at: DateTime<Utc>,
    /// Updated timestamp
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create a new active user
    pub fn new(email: Email, password_hash: HashedPassword) -> Self {
        let now = Utc::now();
        Self {
            user_id: UserId::new(),
            email,
            password_hash,
            role: UserRole::default(),
            is_active: true,
            failed_login_count: 0,
            locked_until: None,
            last_login_at: None,
            last_login_ip: None,
            store_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Check if the account is eligible for a login attempt
    ///
    /// True iff lock-until is unset or strictly in the past. Eligibility is
    /// checked before the password, so a locked account never pays for a
    /// hash verification.
    pub fn is_eligible(&self) -> bool {
        match self.locked_until {
            Some(until) => Utc::now() > until,
            None => true,
        }
    }

    /// Whether any failure state (counter or lock) is recorded
    pub fn has_failure_state(&self) -> bool {
        self.failed_login_count > 0 || self.locked_until.is_some()
    }

    /// Clear failure state after a successful login
    pub fn clear_failure_state(&mut self) {
        self.failed_login_count = 0;
        self.locked_until = None;
        self.updated_at = Utc::now();
    }

    /// Record successful login
    pub fn record_login(&mut self, address: Option<String>) {
        let now = Utc::now();
        self.last_login_at = Some(now);
        self.last_login_ip = address;
        self.updated_at = now;
    }

    /// Derived permission codes for this user's role
    pub fn permissions(&self) -> Vec<String> {
        self.role
            .permissions()
            .iter()
            .map(|p| (*p).to_string())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use platform::password::ClearTextPassword;

    fn test_user() -> User {
        let hash = ClearTextPassword::unvalidated("Correct#Horse7".into())
            .hash(None)
            .unwrap();
        User::new(Email::new("a@x.com").unwrap(), hash)
    }

    #[test]
    fn test_new_user_is_eligible() {
        let user = test_user();
        assert!(user.is_eligible());
        assert!(!user.has_failure_state());
        assert!(user.is_active);
    }

    #[test]
    fn test_locked_user_is_not_eligible() {
        let mut user = test_user();
        user.locked_until = Some(Utc::now() + Duration::minutes(30));
        assert!(!user.is_eligible());
    }

    #[test]
    fn test_expired_lock_is_eligible_again() {
        let mut user = test_user();
        user.locked_until = Some(Utc::now() - Duration::seconds(1));
        assert!(user.is_eligible());
        // The stale lock still counts as failure state until reset
        assert!(user.has_failure_state());
    }

    #[test]
    fn test_clear_failure_state() {
        let mut user = test_user();
        user.failed_login_count = 4;
        user.locked_until = Some(Utc::now() + Duration::minutes(30));
        user.clear_failure_state();
        assert_eq!(user.failed_login_count, 0);
        assert!(user.locked_until.is_none());
    }

    #[test]
    fn test_record_login() {
        let mut user = test_user();
        user.record_login(Some("192.168.1.1".into()));
        assert!(user.last_login_at.is_some());
        assert_eq!(user.last_login_ip.as_deref(), Some("192.168.1.1"));
    }
}
