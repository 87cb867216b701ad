//! RECAP Store - Shared-Store Governance
//!
//! Everything that lives in the shared key-value store: the per-repository
//! fixed-window rate limiter, the content-addressed result cache, and the
//! append-only audit log. The store itself is abstracted behind
//! [`StoreBackend`] with a Redis implementation for deployments and an
//! in-memory implementation for tests and single-process runs.
//!
//! # Failure policy
//!
//! The limiter and the cache fail open: an unreachable store yields a
//! permissive status or a miss, never an error on the event path. The
//! audit log swallows append failures (observably, at warn level). Only
//! administrative operations - limiter reset and audit range queries -
//! propagate store errors.

pub mod audit;
pub mod backend;
pub mod cache;
pub mod keys;
pub mod rate_limit;
pub mod redis_store;

pub use audit::AuditLog;
pub use backend::{InMemoryStore, StoreBackend};
pub use cache::SummaryCache;
pub use keys::{audit_key, rate_key, SummaryKey, AUDIT_PREFIX, RATE_PREFIX, SUMMARY_PREFIX};
pub use rate_limit::RateLimiter;
pub use redis_store::RedisStore;
