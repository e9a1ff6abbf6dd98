//! Auth Middleware
//!
//! Middleware for requiring authentication on protected routes. On
//! success the validated [`AuthContext`] is inserted into request
//! extensions; downstream handlers enforce further permissions with
//! [`AuthContext::require`].

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use std::sync::Arc;

use crate::application::{AuthContext, TokenCodec, ValidateAccessUseCase};
use crate::domain::events::SecurityEventSink;
use crate::domain::repository::SessionStore;
use crate::presentation::handlers::extract_bearer;

/// Middleware state
pub struct AuthMiddlewareState<S>
where
    S: SessionStore + Clone + Send + Sync + 'static,
{
    pub store: Arc<S>,
    pub codec: Arc<TokenCodec>,
    pub events: Arc<dyn SecurityEventSink>,
}

impl<S> Clone for AuthMiddlewareState<S>
where
    S: SessionStore + Clone + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            codec: self.codec.clone(),
            events: self.events.clone(),
        }
    }
}

impl<S> AuthMiddlewareState<S>
where
    S: SessionStore + Clone + Send + Sync + 'static,
{
    /// Validate the request's bearer token against signature and live
    /// session
    async fn authenticate(&self, req: &Request<Body>) -> Option<AuthContext> {
        let token = extract_bearer(req.headers())?;
        let use_case = ValidateAccessUseCase::new(
            self.store.clone(),
            self.codec.clone(),
            self.events.clone(),
        );
        use_case.execute(&token).await.ok()
    }
}

fn unauthorized() -> Response {
    (StatusCode::UNAUTHORIZED, [("X-Auth-Required", "true")]).into_response()
}

/// Middleware that requires a valid, store-live access token
pub async fn require_auth<S>(
    state: AuthMiddlewareState<S>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, Response>
where
    S: SessionStore + Clone + Send + Sync + 'static,
{
    let Some(ctx) = state.authenticate(&req).await else {
        return Err(unauthorized());
    };

    req.extensions_mut().insert(ctx);
    Ok(next.run(req).await)
}

/// Middleware that requires a valid token AND a specific permission
///
/// Admin passes every check. Use with `axum::middleware::from_fn`:
///
/// ```ignore
/// let guard = move |req, next| require_permission(state.clone(), "inventory:write", req, next);
/// ```
pub async fn require_permission<S>(
    state: AuthMiddlewareState<S>,
    permission: &'static str,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, Response>
where
    S: SessionStore + Clone + Send + Sync + 'static,
{
    let Some(ctx) = state.authenticate(&req).await else {
        return Err(unauthorized());
    };

    if let Err(denied) = ctx.require(permission) {
        return Err(denied.into_response());
    }

    req.extensions_mut().insert(ctx);
    Ok(next.run(req).await)
}
