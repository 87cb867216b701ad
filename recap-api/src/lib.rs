//! RECAP API - Webhook Endpoint and Orchestrator
//!
//! The inbound surface of the service: an Axum router with the webhook
//! route, a health probe, and the administrative audit/rate-limit routes,
//! plus the orchestrator that sequences each job through the governance
//! layer.

pub mod config;
pub mod error;
pub mod orchestrator;
pub mod webhook;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult, ErrorCode};
pub use orchestrator::{render_comment, Orchestrator, COMMENT_MARKER};
pub use webhook::{create_router, AppState, PullRequestEvent};
