//! Redis Session Store Implementation
//!
//! Adapter over a shared Redis instance. Every call is bounded by the
//! configured timeout; a timed-out or failed call surfaces as
//! `StoreUnavailable`, which the use cases treat as "deny".

use redis::aio::ConnectionManager;
use std::time::Duration;

use crate::domain::repository::SessionStore;
use crate::error::{AuthError, AuthResult};

/// Redis-backed session store
#[derive(Clone)]
pub struct RedisSessionStore {
    conn: ConnectionManager,
    op_timeout: Duration,
}

impl RedisSessionStore {
    /// Connect to Redis and build the store
    pub async fn connect(url: &str, op_timeout: Duration) -> AuthResult<Self> {
        let client = redis::Client::open(url)
            .map_err(|e| AuthError::Configuration(format!("invalid Redis URL: {e}")))?;

        let conn = ConnectionManager::new(client)
            .await
            .map_err(|e| AuthError::StoreUnavailable(e.to_string()))?;

        Ok(Self { conn, op_timeout })
    }

    /// Round-trip health check (startup diagnostics)
    pub async fn ping(&self) -> AuthResult<()> {
        let mut conn = self.conn.clone();
        let pong: String = self
            .bounded(async move {
                let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
                Ok(pong)
            })
            .await?;
        if pong == "PONG" {
            Ok(())
        } else {
            Err(AuthError::StoreUnavailable(format!(
                "unexpected PING reply: {pong}"
            )))
        }
    }

    /// Apply the per-call timeout and map failures to `StoreUnavailable`
    async fn bounded<T>(
        &self,
        fut: impl Future<Output = redis::RedisResult<T>>,
    ) -> AuthResult<T> {
        tokio::time::timeout(self.op_timeout, fut)
            .await
            .map_err(|_| AuthError::StoreUnavailable("session store timed out".to_string()))?
            .map_err(|e| AuthError::StoreUnavailable(e.to_string()))
    }
}

impl SessionStore for RedisSessionStore {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> AuthResult<()> {
        let mut conn = self.conn.clone();
        let key = key.to_string();
        let value = value.to_string();
        let ttl_secs = ttl.as_secs().max(1);

        self.bounded(async move {
            let reply: () = redis::cmd("SET")
                .arg(&key)
                .arg(&value)
                .arg("EX")
                .arg(ttl_secs)
                .query_async(&mut conn)
                .await?;
            Ok(reply)
        })
        .await
    }

    async fn get(&self, key: &str) -> AuthResult<Option<String>> {
        let mut conn = self.conn.clone();
        let key = key.to_string();

        self.bounded(async move {
            let value: Option<String> = redis::cmd("GET").arg(&key).query_async(&mut conn).await?;
            Ok(value)
        })
        .await
    }

    async fn delete(&self, keys: &[String]) -> AuthResult<u64> {
        if keys.is_empty() {
            return Ok(0);
        }
        let mut conn = self.conn.clone();
        let keys = keys.to_vec();

        self.bounded(async move {
            let mut cmd = redis::cmd("DEL");
            for key in &keys {
                cmd.arg(key);
            }
            let removed: u64 = cmd.query_async(&mut conn).await?;
            Ok(removed)
        })
        .await
    }

    async fn exists(&self, key: &str) -> AuthResult<bool> {
        let mut conn = self.conn.clone();
        let key = key.to_string();

        self.bounded(async move {
            let found: bool = redis::cmd("EXISTS").arg(&key).query_async(&mut conn).await?;
            Ok(found)
        })
        .await
    }

    async fn take(&self, key: &str) -> AuthResult<Option<String>> {
        let mut conn = self.conn.clone();
        let key = key.to_string();

        // GETDEL is atomic server-side; concurrent takers see the value
        // at most once.
        self.bounded(async move {
            let value: Option<String> =
                redis::cmd("GETDEL").arg(&key).query_async(&mut conn).await?;
            Ok(value)
        })
        .await
    }

    async fn scan_keys(
        &self,
        pattern: &str,
        cursor: u64,
        count: usize,
    ) -> AuthResult<(u64, Vec<String>)> {
        let mut conn = self.conn.clone();
        let pattern = pattern.to_string();

        self.bounded(async move {
            let page: (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(count)
                .query_async(&mut conn)
                .await?;
            Ok(page)
        })
        .await
    }
}
