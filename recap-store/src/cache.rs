//! Content-addressed result cache.
//!
//! Maps a [`SummaryKey`] to a previously computed summary. A cache must
//! never fail a request that could otherwise succeed: reads degrade to a
//! miss on store failure or a malformed payload, and writes are
//! best-effort.

use crate::backend::StoreBackend;
use crate::keys::SummaryKey;
use recap_core::{CacheConfig, ChangeSummary};
use std::sync::Arc;
use std::time::Duration;

/// TTL-bounded summary cache over the shared store.
pub struct SummaryCache {
    store: Arc<dyn StoreBackend>,
    ttl: Duration,
}

impl SummaryCache {
    pub fn new(store: Arc<dyn StoreBackend>, config: CacheConfig) -> Self {
        Self {
            store,
            ttl: config.ttl,
        }
    }

    /// Look up the summary for a content revision. Absence, store failure,
    /// and malformed stored values all read as a miss.
    pub async fn get(&self, key: &SummaryKey) -> Option<ChangeSummary> {
        let store_key = key.encode();
        let raw = match self.store.get(&store_key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(err) => {
                tracing::warn!(key = %store_key, error = %err, "cache read failed, treating as miss");
                return None;
            }
        };

        match serde_json::from_str::<ChangeSummary>(&raw) {
            Ok(summary) => {
                tracing::debug!(key = %store_key, "cache hit");
                Some(summary)
            }
            Err(err) => {
                tracing::warn!(key = %store_key, error = %err, "malformed cache entry, treating as miss");
                None
            }
        }
    }

    /// Store a freshly computed summary under its content revision.
    /// Best-effort: a failed write costs a future recomputation, not
    /// correctness.
    pub async fn put(&self, key: &SummaryKey, summary: &ChangeSummary) {
        let store_key = key.encode();
        let raw = match serde_json::to_string(summary) {
            Ok(raw) => raw,
            Err(err) => {
                tracing::warn!(key = %store_key, error = %err, "failed to serialize summary for cache");
                return;
            }
        };

        if let Err(err) = self.store.set_with_ttl(&store_key, &raw, self.ttl).await {
            tracing::warn!(key = %store_key, error = %err, "cache write failed");
        }
    }
}

impl std::fmt::Debug for SummaryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SummaryCache").field("ttl", &self.ttl).finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================
