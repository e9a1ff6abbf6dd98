//! HTTP Handlers

use axum::Json;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::IntoResponse;
use std::sync::Arc;

use platform::client::{extract_client_ip, extract_client_meta};

use crate::application::config::AuthConfig;
use crate::application::{
    LoginInput, LoginUseCase, LogoutUseCase, PasswordResetUseCase, RefreshUseCase, TokenCodec,
    ValidateAccessUseCase,
};
use crate::domain::events::SecurityEventSink;
use crate::domain::repository::{SessionStore, UserRepository};
use crate::domain::value_object::Email;
use crate::error::{AuthError, AuthResult};
use crate::presentation::dto::{
    ForgotPasswordRequest, LoginRequest, LoginResponse, LogoutAllResponse, MeResponse,
    RefreshRequest, RefreshResponse, ResetPasswordRequest, StatusResponse, UserResponse,
};

/// Shared state for auth handlers
pub struct AuthAppState<U, S>
where
    U: UserRepository + Send + Sync + 'static,
    S: SessionStore + Clone + Send + Sync + 'static,
{
    pub users: Arc<U>,
    pub store: Arc<S>,
    pub codec: Arc<TokenCodec>,
    pub config: Arc<AuthConfig>,
    pub events: Arc<dyn SecurityEventSink>,
}

// Manual impl: deriving would demand U: Clone and S: Clone for no reason,
// all fields are Arcs.
impl<U, S> Clone for AuthAppState<U, S>
where
    U: UserRepository + Send + Sync + 'static,
    S: SessionStore + Clone + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            users: self.users.clone(),
            store: self.store.clone(),
            codec: self.codec.clone(),
            config: self.config.clone(),
            events: self.events.clone(),
        }
    }
}

// ============================================================================
// Login
// ============================================================================

/// POST /api/auth/login
pub async fn login<U, S>(
    State(state): State<AuthAppState<U, S>>,
    headers: HeaderMap,
    axum::extract::ConnectInfo(addr): axum::extract::ConnectInfo<std::net::SocketAddr>,
    Json(req): Json<LoginRequest>,
) -> AuthResult<impl IntoResponse>
where
    U: UserRepository + Send + Sync + 'static,
    S: SessionStore + Clone + Send + Sync + 'static,
{
    let client_ip = extract_client_ip(&headers, Some(addr.ip()));
    let client = extract_client_meta(&headers, client_ip);

    let use_case = LoginUseCase::new(
        state.users.clone(),
        state.store.clone(),
        state.codec.clone(),
        state.config.clone(),
        state.events.clone(),
    );

    let input = LoginInput {
        email: req.email,
        password: req.password,
    };

    let output = use_case.execute(input, client).await?;

    // Refresh token travels only in the cookie
    let cookie = state.config.cookie.build_set_cookie(&output.refresh_token);

    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(LoginResponse {
            user: UserResponse::from(&output.user),
            access_token: output.access_token,
        }),
    ))
}

// ============================================================================
// Refresh
// ============================================================================

/// POST /api/auth/refresh
pub async fn refresh<U, S>(
    State(state): State<AuthAppState<U, S>>,
    headers: HeaderMap,
    body: Option<Json<RefreshRequest>>,
) -> AuthResult<Json<RefreshResponse>>
where
    U: UserRepository + Send + Sync + 'static,
    S: SessionStore + Clone + Send + Sync + 'static,
{
    let token = platform::cookie::extract_cookie(&headers, &state.config.cookie.name)
        .or_else(|| body.and_then(|Json(req)| req.refresh_token))
        .ok_or(AuthError::InvalidToken)?;

    let use_case = RefreshUseCase::new(
        state.users.clone(),
        state.store.clone(),
        state.codec.clone(),
        state.events.clone(),
    );

    let output = use_case.execute(&token).await?;

    Ok(Json(RefreshResponse {
        access_token: output.access_token,
    }))
}

// ============================================================================
// Logout
// ============================================================================

/// POST /api/auth/logout (bearer access token)
///
/// Idempotent: revoking an already-revoked session still clears the
/// cookie and returns 200.
pub async fn logout<U, S>(
    State(state): State<AuthAppState<U, S>>,
    headers: HeaderMap,
) -> AuthResult<impl IntoResponse>
where
    U: UserRepository + Send + Sync + 'static,
    S: SessionStore + Clone + Send + Sync + 'static,
{
    let token = extract_bearer(&headers).ok_or(AuthError::InvalidToken)?;

    // Signature/expiry only: the session may already be gone, and that
    // must not fail the logout.
    let claims = state
        .codec
        .verify_access(&token)
        .map_err(AuthError::from)?;
    let session_id: uuid::Uuid = claims.sid.parse().map_err(|_| AuthError::InvalidToken)?;

    let use_case = LogoutUseCase::new(state.store.clone(), state.events.clone());
    use_case.execute(session_id).await?;

    let cookie = state.config.cookie.build_delete_cookie();

    Ok((StatusCode::OK, [(header::SET_COOKIE, cookie)]))
}

/// POST /api/auth/logout-all (bearer access token)
pub async fn logout_all<U, S>(
    State(state): State<AuthAppState<U, S>>,
    headers: HeaderMap,
) -> AuthResult<impl IntoResponse>
where
    U: UserRepository + Send + Sync + 'static,
    S: SessionStore + Clone + Send + Sync + 'static,
{
    let token = extract_bearer(&headers).ok_or(AuthError::InvalidToken)?;

    let validate = ValidateAccessUseCase::new(
        state.store.clone(),
        state.codec.clone(),
        state.events.clone(),
    );
    let ctx = validate.execute(&token).await?;

    let use_case = LogoutUseCase::new(state.store.clone(), state.events.clone());
    let revoked = use_case.execute_all(&ctx.user_id).await?;

    let cookie = state.config.cookie.build_delete_cookie();

    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(LogoutAllResponse {
            revoked_sessions: revoked,
        }),
    ))
}

// ============================================================================
// Current principal
// ============================================================================

/// GET /api/auth/me (bearer access token)
pub async fn me<U, S>(
    State(state): State<AuthAppState<U, S>>,
    headers: HeaderMap,
) -> AuthResult<Json<MeResponse>>
where
    U: UserRepository + Send + Sync + 'static,
    S: SessionStore + Clone + Send + Sync + 'static,
{
    let token = extract_bearer(&headers).ok_or(AuthError::InvalidToken)?;

    let validate = ValidateAccessUseCase::new(
        state.store.clone(),
        state.codec.clone(),
        state.events.clone(),
    );
    let ctx = validate.execute(&token).await?;

    Ok(Json(MeResponse {
        user_id: ctx.user_id.to_string(),
        role: ctx.role.code().to_string(),
        permissions: ctx.permissions,
        session_id: ctx.session_id.to_string(),
    }))
}

// ============================================================================
// Password reset
// ============================================================================

/// POST /api/auth/forgot-password
///
/// The response is identical whether or not the email exists; the token
/// is handed to the delivery collaborator, never returned here.
pub async fn forgot_password<U, S>(
    State(state): State<AuthAppState<U, S>>,
    Json(req): Json<ForgotPasswordRequest>,
) -> AuthResult<Json<StatusResponse>>
where
    U: UserRepository + Send + Sync + 'static,
    S: SessionStore + Clone + Send + Sync + 'static,
{
    if let Ok(email) = Email::new(&req.email) {
        if let Some(user) = state.users.find_by_email(&email).await? {
            let use_case = PasswordResetUseCase::new(
                state.users.clone(),
                state.store.clone(),
                state.config.clone(),
                state.events.clone(),
            );
            let _token = use_case.generate(&user.user_id).await?;
            // TODO(mailer): hand _token to the email delivery service once
            // it is wired up here; until then it is only issued and logged
            // as a preview.
        }
    }

    Ok(Json(StatusResponse::ok()))
}

/// POST /api/auth/reset-password
pub async fn reset_password<U, S>(
    State(state): State<AuthAppState<U, S>>,
    Json(req): Json<ResetPasswordRequest>,
) -> AuthResult<Json<StatusResponse>>
where
    U: UserRepository + Send + Sync + 'static,
    S: SessionStore + Clone + Send + Sync + 'static,
{
    let use_case = PasswordResetUseCase::new(
        state.users.clone(),
        state.store.clone(),
        state.config.clone(),
        state.events.clone(),
    );

    match use_case.complete(&req.token, req.new_password).await? {
        Some(_) => Ok(Json(StatusResponse::ok())),
        None => Err(AuthError::InvalidToken),
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Extract a bearer token from the Authorization header
pub fn extract_bearer(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(|token| token.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_extract_bearer() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer abc.def.ghi"),
        );
        assert_eq!(extract_bearer(&headers), Some("abc.def.ghi".to_string()));
    }

    #[test]
    fn test_extract_bearer_missing_or_malformed() {
        assert_eq!(extract_bearer(&HeaderMap::new()), None);

        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic xyz"));
        assert_eq!(extract_bearer(&headers), None);
    }
}
