//! In-Memory Session Store
//!
//! TTL-aware map used by tests and local development. Mirrors the Redis
//! adapter's semantics, in particular the atomicity of `take`: removal
//! happens under the write lock, so concurrent takers of one key see its
//! value at most once.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use crate::domain::repository::SessionStore;
use crate::error::{AuthError, AuthResult};

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Instant,
}

impl Entry {
    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// In-memory session store
#[derive(Clone, Default)]
pub struct MemorySessionStore {
    entries: Arc<RwLock<HashMap<String, Entry>>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_err() -> AuthError {
        AuthError::StoreUnavailable("in-memory store lock poisoned".to_string())
    }

    /// Number of live (unexpired) entries
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .map(|map| map.values().filter(|e| !e.is_expired()).count())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SessionStore for MemorySessionStore {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> AuthResult<()> {
        let mut entries = self.entries.write().map_err(|_| Self::lock_err())?;
        entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> AuthResult<Option<String>> {
        let entries = self.entries.read().map_err(|_| Self::lock_err())?;
        Ok(entries
            .get(key)
            .filter(|entry| !entry.is_expired())
            .map(|entry| entry.value.clone()))
    }

    async fn delete(&self, keys: &[String]) -> AuthResult<u64> {
        let mut entries = self.entries.write().map_err(|_| Self::lock_err())?;
        let mut removed = 0;
        for key in keys {
            if let Some(entry) = entries.remove(key) {
                if !entry.is_expired() {
                    removed += 1;
                }
            }
        }
        Ok(removed)
    }

    async fn exists(&self, key: &str) -> AuthResult<bool> {
        let entries = self.entries.read().map_err(|_| Self::lock_err())?;
        Ok(entries.get(key).is_some_and(|entry| !entry.is_expired()))
    }

    async fn take(&self, key: &str) -> AuthResult<Option<String>> {
        let mut entries = self.entries.write().map_err(|_| Self::lock_err())?;
        Ok(entries
            .remove(key)
            .filter(|entry| !entry.is_expired())
            .map(|entry| entry.value))
    }

    async fn scan_keys(
        &self,
        pattern: &str,
        cursor: u64,
        count: usize,
    ) -> AuthResult<(u64, Vec<String>)> {
        // Only prefix globs ("prefix*") are needed by the core
        let prefix = pattern.strip_suffix('*').unwrap_or(pattern);

        let entries = self.entries.read().map_err(|_| Self::lock_err())?;
        let mut matching: Vec<String> = entries
            .iter()
            .filter(|(key, entry)| key.starts_with(prefix) && !entry.is_expired())
            .map(|(key, _)| key.clone())
            .collect();
        matching.sort();

        let offset = cursor as usize;
        let page: Vec<String> = matching.iter().skip(offset).take(count).cloned().collect();
        let next = offset + page.len();
        let next_cursor = if next >= matching.len() { 0 } else { next as u64 };

        Ok((next_cursor, page))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_secs(60);

    #[tokio::test]
    async fn test_set_get_delete() {
        let store = MemorySessionStore::new();
        store.set("k1", "v1", TTL).await.unwrap();

        assert_eq!(store.get("k1").await.unwrap(), Some("v1".to_string()));
        assert!(store.exists("k1").await.unwrap());

        assert_eq!(store.delete(&["k1".to_string()]).await.unwrap(), 1);
        assert_eq!(store.get("k1").await.unwrap(), None);

        // Deleting a missing key is not an error
        assert_eq!(store.delete(&["k1".to_string()]).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_expired_entries_are_invisible() {
        let store = MemorySessionStore::new();
        store.set("k1", "v1", Duration::ZERO).await.unwrap();

        assert_eq!(store.get("k1").await.unwrap(), None);
        assert!(!store.exists("k1").await.unwrap());
        assert_eq!(store.take("k1").await.unwrap(), None);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_take_consumes_exactly_once() {
        let store = MemorySessionStore::new();
        store.set("k1", "v1", TTL).await.unwrap();

        assert_eq!(store.take("k1").await.unwrap(), Some("v1".to_string()));
        assert_eq!(store.take("k1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_concurrent_take_single_winner() {
        let store = MemorySessionStore::new();
        store.set("k1", "v1", TTL).await.unwrap();

        let (a, b) = tokio::join!(store.take("k1"), store.take("k1"));
        let winners = [a.unwrap(), b.unwrap()]
            .into_iter()
            .flatten()
            .count();
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn test_scan_keys_paginates() {
        let store = MemorySessionStore::new();
        for i in 0..25 {
            store
                .set(&format!("auth:session:{i:02}"), "s", TTL)
                .await
                .unwrap();
        }
        store.set("other:key", "x", TTL).await.unwrap();

        let mut cursor = 0u64;
        let mut seen = Vec::new();
        loop {
            let (next, page) = store
                .scan_keys("auth:session:*", cursor, 10)
                .await
                .unwrap();
            seen.extend(page);
            if next == 0 {
                break;
            }
            cursor = next;
        }

        assert_eq!(seen.len(), 25);
        assert!(seen.iter().all(|k| k.starts_with("auth:session:")));
    }
}
