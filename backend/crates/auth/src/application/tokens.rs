//! Token Codec
//!
//! Signs and verifies the two bearer-token classes with HMAC-SHA256 and
//! fixed-shape claims. Access tokens are stateless so per-request
//! authorization is cheap; refresh tokens are long-lived and therefore
//! re-validated against the session store on every use by the refresh
//! use case.

use chrono::Utc;
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::application::config::AuthConfig;
use crate::domain::entity::User;
use crate::domain::value_object::UserId;
use crate::error::{AuthError, AuthResult};

/// Claims embedded in an access token
///
/// Fixed shape so claim extraction is exhaustive and statically checked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject: user UUID
    pub sub: String,
    /// Role code at issue time
    pub role: String,
    /// Derived permission set at issue time
    pub perms: Vec<String>,
    /// Session UUID; the revocation handle. Deleting the session kills
    /// this token before its `exp` is reached.
    pub sid: String,
    /// Issued-at (Unix timestamp, seconds)
    pub iat: i64,
    /// Expiry (Unix timestamp, seconds)
    pub exp: i64,
}

/// Claims embedded in a refresh token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefreshClaims {
    /// Subject: user UUID
    pub sub: String,
    /// Session UUID
    pub sid: String,
    /// Issued-at (Unix timestamp, seconds)
    pub iat: i64,
    /// Expiry (Unix timestamp, seconds)
    pub exp: i64,
}

/// Why a token failed verification
///
/// Carried separately from [`AuthError`] so use cases can tag security
/// events with the precise cause while still surfacing a uniform
/// `InvalidToken` to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenRejection {
    /// Expiry elapsed
    Expired,
    /// Bad signature or malformed structure
    Invalid,
}

impl TokenRejection {
    /// Reason tag for the security-event log
    pub const fn reason(self) -> &'static str {
        match self {
            TokenRejection::Expired => "expired",
            TokenRejection::Invalid => "signature_invalid",
        }
    }
}

impl From<TokenRejection> for AuthError {
    fn from(_: TokenRejection) -> Self {
        AuthError::InvalidToken
    }
}

/// Signs and verifies access/refresh tokens with distinct secrets
pub struct TokenCodec {
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
    access_ttl_secs: i64,
    refresh_ttl_secs: i64,
}

impl TokenCodec {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            access_encoding: EncodingKey::from_secret(&config.access_token_secret),
            access_decoding: DecodingKey::from_secret(&config.access_token_secret),
            refresh_encoding: EncodingKey::from_secret(&config.refresh_token_secret),
            refresh_decoding: DecodingKey::from_secret(&config.refresh_token_secret),
            access_ttl_secs: config.access_token_ttl.as_secs() as i64,
            refresh_ttl_secs: config.refresh_token_ttl.as_secs() as i64,
        }
    }

    /// Mint an access token bound to a session
    ///
    /// Role and permissions are derived from the user at signing time, so
    /// refresh picks up role changes.
    pub fn sign_access(&self, user: &User, session_id: Uuid) -> AuthResult<String> {
        let now = Utc::now().timestamp();
        let claims = AccessClaims {
            sub: user.user_id.to_string(),
            role: user.role.code().to_string(),
            perms: user.permissions(),
            sid: session_id.to_string(),
            iat: now,
            exp: now + self.access_ttl_secs,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.access_encoding)
            .map_err(|e| AuthError::Internal(format!("failed to sign access token: {e}")))
    }

    /// Mint a refresh token bound to a session
    pub fn sign_refresh(&self, user_id: &UserId, session_id: Uuid) -> AuthResult<String> {
        let now = Utc::now().timestamp();
        let claims = RefreshClaims {
            sub: user_id.to_string(),
            sid: session_id.to_string(),
            iat: now,
            exp: now + self.refresh_ttl_secs,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.refresh_encoding)
            .map_err(|e| AuthError::Internal(format!("failed to sign refresh token: {e}")))
    }

    /// Verify an access token's signature, structure, and expiry
    pub fn verify_access(&self, token: &str) -> Result<AccessClaims, TokenRejection> {
        decode::<AccessClaims>(token, &self.access_decoding, &Self::validation())
            .map(|data| data.claims)
            .map_err(Self::rejection)
    }

    /// Verify a refresh token's signature, structure, and expiry
    pub fn verify_refresh(&self, token: &str) -> Result<RefreshClaims, TokenRejection> {
        decode::<RefreshClaims>(token, &self.refresh_decoding, &Self::validation())
            .map(|data| data.claims)
            .map_err(Self::rejection)
    }

    /// Expiry validation is mandatory, with zero leeway
    fn validation() -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);
        validation
    }

    fn rejection(err: jsonwebtoken::errors::Error) -> TokenRejection {
        match err.kind() {
            ErrorKind::ExpiredSignature => TokenRejection::Expired,
            _ => TokenRejection::Invalid,
        }
    }
}
