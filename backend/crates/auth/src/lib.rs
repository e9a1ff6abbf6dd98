//! Auth (Authentication) Backend Module
//!
//! Clean Architecture structure:
//! - `domain/` - Business logic, entities, repository + store traits
//! - `application/` - Use cases and application services
//! - `infra/` - Database / key-value store implementations
//! - `presentation/` - HTTP handlers, DTOs, router
//!
//! ## Features
//! - Email + password login with stateless JWT access tokens
//! - Store-backed revocable refresh tokens and sessions
//! - Role-based permissions (Admin, Manager, Cashier, Viewer)
//! - Automatic lockout after failed login attempts
//! - One-time password-reset tokens
//!
//! ## Security Model
//! - Passwords hashed with Argon2id (NIST SP 800-63B compliant)
//! - Access tokens verified statelessly, then checked against the live
//!   session; a revoked session kills structurally valid tokens
//! - Store unavailability always fails closed
//! - Lockout counters live in the user record, never in process memory

pub mod application;
pub mod domain;
pub mod error;
pub mod infra;
pub mod presentation;

#[cfg(test)]
mod tests;

// Re-exports for convenience
pub use application::config::AuthConfig;
pub use application::tokens::TokenCodec;
pub use error::{AuthError, AuthResult};
pub use infra::postgres::PgUserRepository;
pub use infra::redis::RedisSessionStore;
pub use presentation::router::auth_router;

// Re-export kernel error types for unified error handling
pub use kernel::error::{
    app_error::{AppError, AppResult},
    kind::ErrorKind,
};

// Convenience re-exports
pub mod config {
    pub use crate::application::config::*;
}

pub mod models {
    pub use crate::domain::entity::*;
    pub use crate::domain::value_object::*;
    pub use crate::presentation::dto::*;
}

pub mod handlers {
    pub use crate::presentation::handlers::*;
}

pub mod middleware {
    pub use crate::presentation::middleware::*;
}
