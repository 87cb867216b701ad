//! Append-only audit log.
//!
//! Every consequential action gets a time-indexed record under
//! `audit:{timestamp_ms}:{uuid}`, retained for the compliance window.
//! Appends must never block or fail user-facing behavior, so failures are
//! logged and swallowed; range queries are administrative reads and do
//! propagate store errors.

use crate::backend::StoreBackend;
use crate::keys::{audit_key, AUDIT_PREFIX};
use recap_core::{AuditConfig, AuditLogEntry, StoreError};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Audit trail over the shared store.
pub struct AuditLog {
    store: Arc<dyn StoreBackend>,
    retention: Duration,
}

impl AuditLog {
    pub fn new(store: Arc<dyn StoreBackend>, config: AuditConfig) -> Self {
        Self {
            store,
            retention: config.retention,
        }
    }

    /// Append one record, best-effort. A failed append is surfaced at
    /// warn level for compliance monitoring and otherwise swallowed.
    pub async fn append(&self, entry: &AuditLogEntry) {
        let key = audit_key(entry.timestamp_epoch_ms, Uuid::now_v7());
        let raw = match serde_json::to_string(entry) {
            Ok(raw) => raw,
            Err(err) => {
                tracing::warn!(error = %err, action = %entry.action, "failed to serialize audit entry");
                return;
            }
        };

        if let Err(err) = self.store.set_with_ttl(&key, &raw, self.retention).await {
            tracing::warn!(
                key = %key,
                action = %entry.action,
                error = %err,
                "audit append failed"
            );
        }
    }

    /// All entries with `start_ms <= timestamp <= end_ms`, most recent
    /// first.
    ///
    /// Scans the whole audit namespace; O(retained entries), acceptable
    /// under the bounded retention and expected volume. The read contract
    /// (inclusive range, descending order) holds regardless of how a
    /// future implementation indexes.
    pub async fn query_range(
        &self,
        start_ms: i64,
        end_ms: i64,
    ) -> Result<Vec<AuditLogEntry>, StoreError> {
        let pairs = self.store.scan_prefix(AUDIT_PREFIX).await?;

        let mut entries: Vec<AuditLogEntry> = pairs
            .into_iter()
            .filter_map(|(key, raw)| match serde_json::from_str(&raw) {
                Ok(entry) => Some(entry),
                Err(err) => {
                    tracing::warn!(key = %key, error = %err, "skipping malformed audit entry");
                    None
                }
            })
            .filter(|entry: &AuditLogEntry| {
                entry.timestamp_epoch_ms >= start_ms && entry.timestamp_epoch_ms <= end_ms
            })
            .collect();

        entries.sort_by(|a, b| b.timestamp_epoch_ms.cmp(&a.timestamp_epoch_ms));
        Ok(entries)
    }
}

impl std::fmt::Debug for AuditLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditLog")
            .field("retention", &self.retention)
            .finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================
