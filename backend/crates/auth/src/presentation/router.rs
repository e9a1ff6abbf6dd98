//! Auth Router

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;

use crate::application::config::AuthConfig;
use crate::application::tokens::TokenCodec;
use crate::domain::events::{SecurityEventSink, TracingEventSink};
use crate::domain::repository::{SessionStore, UserRepository};
use crate::infra::postgres::PgUserRepository;
use crate::infra::redis::RedisSessionStore;
use crate::presentation::handlers::{self, AuthAppState};

/// Create the Auth router with the production backends
pub fn auth_router(
    users: PgUserRepository,
    store: RedisSessionStore,
    config: AuthConfig,
) -> Router {
    auth_router_generic(users, store, config, Arc::new(TracingEventSink))
}

/// Create a generic Auth router for any repository/store implementation
pub fn auth_router_generic<U, S>(
    users: U,
    store: S,
    config: AuthConfig,
    events: Arc<dyn SecurityEventSink>,
) -> Router
where
    U: UserRepository + Send + Sync + 'static,
    S: SessionStore + Clone + Send + Sync + 'static,
{
    let codec = Arc::new(TokenCodec::new(&config));
    let state = AuthAppState {
        users: Arc::new(users),
        store: Arc::new(store),
        codec,
        config: Arc::new(config),
        events,
    };

    Router::new()
        .route("/login", post(handlers::login::<U, S>))
        .route("/refresh", post(handlers::refresh::<U, S>))
        .route("/logout", post(handlers::logout::<U, S>))
        .route("/logout-all", post(handlers::logout_all::<U, S>))
        .route("/me", get(handlers::me::<U, S>))
        .route("/forgot-password", post(handlers::forgot_password::<U, S>))
        .route("/reset-password", post(handlers::reset_password::<U, S>))
        .with_state(state)
}
