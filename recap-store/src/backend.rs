//! Store backend trait and the in-memory implementation.
//!
//! The backend abstracts the shared key-value store down to the primitives
//! the governance layer needs: get, set-with-expiry, atomic increment,
//! expire, delete, and a prefix scan for the audit namespace. All
//! mutations are atomic at the single-key level; there are no multi-key
//! transactions.

use async_trait::async_trait;
use recap_core::StoreError;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// Pluggable shared-store backend.
///
/// Implementations must be thread-safe and atomic per key. `incr` is the
/// primitive the rate limiter's correctness rests on: concurrent calls on
/// the same key must each observe a distinct counter value.
#[async_trait]
pub trait StoreBackend: Send + Sync {
    /// Get a value. `None` means absent or expired.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Set a value with a time-to-live.
    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration)
        -> Result<(), StoreError>;

    /// Atomically increment the integer at `key`, treating absence as 0.
    /// Returns the post-increment value.
    async fn incr(&self, key: &str) -> Result<i64, StoreError>;

    /// Set the time-to-live of an existing key.
    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), StoreError>;

    /// Delete a key. Deleting a non-existent key is not an error.
    async fn delete(&self, key: &str) -> Result<(), StoreError>;

    /// All live `(key, value)` pairs whose key starts with `prefix`.
    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<(String, String)>, StoreError>;
}

// ============================================================================
// IN-MEMORY BACKEND
// ============================================================================

#[derive(Debug, Clone)]
struct StoredValue {
    value: String,
    expires_at: Option<Instant>,
}

impl StoredValue {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.map(|at| now >= at).unwrap_or(false)
    }
}

/// In-memory backend for tests and single-process deployments.
///
/// Expiry is evaluated lazily on access. The failure switch makes every
/// operation return `StoreError::Unavailable`, which is how the fail-open
/// paths are exercised in tests.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    entries: Mutex<HashMap<String, StoredValue>>,
    failing: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Switch the backend into (or out of) simulated unavailability.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Remaining time-to-live of a key, if it exists and has one.
    pub fn ttl(&self, key: &str) -> Option<Duration> {
        let entries = self.lock();
        let stored = entries.get(key)?;
        let expires_at = stored.expires_at?;
        Some(expires_at.saturating_duration_since(Instant::now()))
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.lock().values().filter(|v| !v.is_expired(now)).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable {
                reason: "simulated store outage".to_string(),
            })
        } else {
            Ok(())
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, StoredValue>> {
        match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[async_trait]
impl StoreBackend for InMemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.check_available()?;
        let mut entries = self.lock();
        let now = Instant::now();
        if let Some(stored) = entries.get(key) {
            if stored.is_expired(now) {
                entries.remove(key);
                return Ok(None);
            }
            return Ok(Some(stored.value.clone()));
        }
        Ok(None)
    }

    async fn set_with_ttl(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        self.check_available()?;
        self.lock().insert(
            key.to_string(),
            StoredValue {
                value: value.to_string(),
                expires_at: Some(Instant::now() + ttl),
            },
        );
        Ok(())
    }

    async fn incr(&self, key: &str) -> Result<i64, StoreError> {
        self.check_available()?;
        let mut entries = self.lock();
        let now = Instant::now();

        let current = match entries.get(key) {
            Some(stored) if !stored.is_expired(now) => {
                stored.value.parse::<i64>().map_err(|e| StoreError::MalformedValue {
                    key: key.to_string(),
                    reason: e.to_string(),
                })?
            }
            _ => 0,
        };

        let next = current + 1;
        // A fresh counter has no expiry until the caller sets one.
        let expires_at = entries
            .get(key)
            .filter(|stored| !stored.is_expired(now))
            .and_then(|stored| stored.expires_at);
        entries.insert(
            key.to_string(),
            StoredValue {
                value: next.to_string(),
                expires_at,
            },
        );
        Ok(next)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), StoreError> {
        self.check_available()?;
        let mut entries = self.lock();
        if let Some(stored) = entries.get_mut(key) {
            stored.expires_at = Some(Instant::now() + ttl);
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.check_available()?;
        self.lock().remove(key);
        Ok(())
    }

    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<(String, String)>, StoreError> {
        self.check_available()?;
        let entries = self.lock();
        let now = Instant::now();
        Ok(entries
            .iter()
            .filter(|(key, stored)| key.starts_with(prefix) && !stored.is_expired(now))
            .map(|(key, stored)| (key.clone(), stored.value.clone()))
            .collect())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_absent_key() {
        let store = InMemoryStore::new();
        assert_eq!(store.get("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_set_then_get() {
        let store = InMemoryStore::new();
        store
            .set_with_ttl("k", "v", Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some("v".to_string()));
    }

    #[tokio::test]
    async fn test_expired_value_reads_as_absent() {
        let store = InMemoryStore::new();
        store
            .set_with_ttl("k", "v", Duration::from_millis(10))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(store.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_incr_from_absent_starts_at_one() {
        let store = InMemoryStore::new();
        assert_eq!(store.incr("counter").await.unwrap(), 1);
        assert_eq!(store.incr("counter").await.unwrap(), 2);
        assert_eq!(store.incr("counter").await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_incr_after_expiry_restarts() {
        let store = InMemoryStore::new();
        store.incr("counter").await.unwrap();
        store
            .expire("counter", Duration::from_millis(10))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(store.incr("counter").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_incr_preserves_ttl() {
        let store = InMemoryStore::new();
        store.incr("counter").await.unwrap();
        store
            .expire("counter", Duration::from_secs(60))
            .await
            .unwrap();
        store.incr("counter").await.unwrap();
        assert!(store.ttl("counter").is_some());
    }

    #[tokio::test]
    async fn test_incr_malformed_value_errors() {
        let store = InMemoryStore::new();
        store
            .set_with_ttl("k", "not a number", Duration::from_secs(60))
            .await
            .unwrap();
        assert!(matches!(
            store.incr("k").await,
            Err(StoreError::MalformedValue { .. })
        ));
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let store = InMemoryStore::new();
        store
            .set_with_ttl("k", "v", Duration::from_secs(60))
            .await
            .unwrap();
        store.delete("k").await.unwrap();
        store.delete("k").await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_scan_prefix_filters() {
        let store = InMemoryStore::new();
        store
            .set_with_ttl("audit:1:a", "one", Duration::from_secs(60))
            .await
            .unwrap();
        store
            .set_with_ttl("audit:2:b", "two", Duration::from_secs(60))
            .await
            .unwrap();
        store
            .set_with_ttl("rate:acme:widgets", "3", Duration::from_secs(60))
            .await
            .unwrap();

        let mut scanned = store.scan_prefix("audit:").await.unwrap();
        scanned.sort();
        assert_eq!(
            scanned,
            vec![
                ("audit:1:a".to_string(), "one".to_string()),
                ("audit:2:b".to_string(), "two".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_failure_switch() {
        let store = InMemoryStore::new();
        store.set_failing(true);
        assert!(matches!(
            store.get("k").await,
            Err(StoreError::Unavailable { .. })
        ));
        assert!(matches!(
            store.incr("k").await,
            Err(StoreError::Unavailable { .. })
        ));

        store.set_failing(false);
        assert!(store.get("k").await.is_ok());
    }
}
