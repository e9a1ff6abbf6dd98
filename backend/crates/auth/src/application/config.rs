//! Application Configuration
//!
//! Configuration for the Auth application layer. Signing secrets are
//! required at construction; their absence is a startup-time fatal error,
//! never a runtime one.

use std::env;
use std::fmt;
use std::time::Duration;

use crate::error::{AuthError, AuthResult};

/// Re-export cookie types from platform
pub use platform::cookie::{CookieConfig, SameSite};

/// Minimum length for signing secrets, in bytes
pub const MIN_SECRET_LENGTH: usize = 32;

/// Environment variable holding the access-token signing secret
pub const ACCESS_SECRET_ENV: &str = "AUTH_ACCESS_TOKEN_SECRET";

/// Environment variable holding the refresh-token signing secret
pub const REFRESH_SECRET_ENV: &str = "AUTH_REFRESH_TOKEN_SECRET";

/// Auth application configuration
#[derive(Clone)]
pub struct AuthConfig {
    /// Signing secret for access tokens
    pub access_token_secret: Vec<u8>,
    /// Signing secret for refresh tokens; distinct from the access secret
    /// so a leaked access secret cannot forge refresh tokens
    pub refresh_token_secret: Vec<u8>,
    /// Access token TTL (15 minutes)
    pub access_token_ttl: Duration,
    /// Refresh token / session TTL (7 days)
    pub refresh_token_ttl: Duration,
    /// Password-reset token TTL (1 hour)
    pub reset_token_ttl: Duration,
    /// Per-call session store timeout; a timed-out call is treated as
    /// store unavailability
    pub store_timeout: Duration,
    /// Failed logins before lockout
    pub max_login_failures: i16,
    /// Lockout duration (30 minutes)
    pub lockout_duration: Duration,
    /// Password pepper (optional, application-wide secret)
    pub password_pepper: Option<Vec<u8>>,
    /// Refresh-token cookie settings
    pub cookie: CookieConfig,
}

impl AuthConfig {
    /// Create a config from the two signing secrets, with defaults for
    /// everything else
    pub fn new(access_token_secret: Vec<u8>, refresh_token_secret: Vec<u8>) -> AuthResult<Self> {
        if access_token_secret.len() < MIN_SECRET_LENGTH {
            return Err(AuthError::Configuration(format!(
                "access token secret must be at least {MIN_SECRET_LENGTH} bytes"
            )));
        }
        if refresh_token_secret.len() < MIN_SECRET_LENGTH {
            return Err(AuthError::Configuration(format!(
                "refresh token secret must be at least {MIN_SECRET_LENGTH} bytes"
            )));
        }
        if access_token_secret == refresh_token_secret {
            return Err(AuthError::Configuration(
                "access and refresh token secrets must differ".to_string(),
            ));
        }

        let refresh_token_ttl = Duration::from_secs(7 * 24 * 3600);
        Ok(Self {
            access_token_secret,
            refresh_token_secret,
            access_token_ttl: Duration::from_secs(15 * 60),
            refresh_token_ttl,
            reset_token_ttl: Duration::from_secs(3600),
            store_timeout: Duration::from_secs(2),
            max_login_failures: 5,
            lockout_duration: Duration::from_secs(30 * 60),
            password_pepper: None,
            cookie: CookieConfig {
                max_age_secs: Some(refresh_token_ttl.as_secs() as i64),
                ..CookieConfig::default()
            },
        })
    }

    /// Load configuration from the environment
    ///
    /// Fails when either signing secret is absent or too short; callers
    /// must treat that as fatal and refuse to start.
    pub fn from_env() -> AuthResult<Self> {
        let access = env::var(ACCESS_SECRET_ENV).map_err(|_| {
            AuthError::Configuration(format!("{ACCESS_SECRET_ENV} must be set"))
        })?;
        let refresh = env::var(REFRESH_SECRET_ENV).map_err(|_| {
            AuthError::Configuration(format!("{REFRESH_SECRET_ENV} must be set"))
        })?;

        let mut config = Self::new(access.into_bytes(), refresh.into_bytes())?;

        if let Ok(pepper) = env::var("AUTH_PASSWORD_PEPPER") {
            config.password_pepper = Some(pepper.into_bytes());
        }

        if let Ok(secure) = env::var("AUTH_COOKIE_SECURE") {
            config.cookie.secure = secure != "false";
        }

        Ok(config)
    }

    /// Create config with random secrets and an insecure cookie (for
    /// development only)
    pub fn development() -> Self {
        let mut config = Self::new(
            platform::crypto::random_bytes(MIN_SECRET_LENGTH),
            platform::crypto::random_bytes(MIN_SECRET_LENGTH),
        )
        .expect("random secrets satisfy the length policy");
        config.cookie.secure = false;
        config
    }

    /// Get password pepper as slice
    pub fn pepper(&self) -> Option<&[u8]> {
        self.password_pepper.as_deref()
    }

    /// Lockout duration as a chrono duration (for lock-until arithmetic)
    pub fn lockout_duration_chrono(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.lockout_duration)
            .unwrap_or_else(|_| chrono::Duration::minutes(30))
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("access_token_secret", &"[REDACTED]")
            .field("refresh_token_secret", &"[REDACTED]")
            .field("access_token_ttl", &self.access_token_ttl)
            .field("refresh_token_ttl", &self.refresh_token_ttl)
            .field("reset_token_ttl", &self.reset_token_ttl)
            .field("store_timeout", &self.store_timeout)
            .field("max_login_failures", &self.max_login_failures)
            .field("lockout_duration", &self.lockout_duration)
            .field(
                "password_pepper",
                &self.password_pepper.as_ref().map(|_| "[REDACTED]"),
            )
            .field("cookie", &self.cookie)
            .finish()
    }
}
