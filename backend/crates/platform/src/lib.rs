//! Platform Crate - Technical Infrastructure
//!
//! This crate provides shared technical foundations:
//! - Cryptographic utilities (SHA-256, Base64, constant-time compare)
//! - Password hashing (Argon2id, NIST SP 800-63B compliant)
//! - Client metadata extraction (IP, User-Agent)
//! - Cookie management

pub mod client;
pub mod cookie;
pub mod crypto;
pub mod password;
