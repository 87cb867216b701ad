//! API Configuration Module
//!
//! Server-level settings loaded from environment variables. The
//! governance-layer knobs (retry, breaker, limits, TTLs) live in
//! `recap_core::RecapConfig`; this covers the process surface: bind
//! address, store URL, credentials, and the skip-label filter.

use recap_core::ConfigError;

/// API configuration for the webhook server.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Address the HTTP server binds to.
    pub bind_addr: String,

    /// Shared-store URL, e.g. `redis://127.0.0.1:6379`.
    pub store_url: String,

    /// Token for the source-repository API.
    pub github_token: String,

    /// API key for the classification provider.
    pub anthropic_api_key: String,

    /// Model identifier for the classification provider.
    pub anthropic_model: Option<String>,

    /// Labels that exclude a change request from summarization.
    pub skip_labels: Vec<String>,
}

impl ApiConfig {
    /// Create ApiConfig from environment variables.
    ///
    /// Environment variables:
    /// - `RECAP_BIND_ADDR`: listen address (default: "0.0.0.0:8080")
    /// - `RECAP_STORE_URL`: shared-store URL (default: "redis://127.0.0.1:6379")
    /// - `RECAP_GITHUB_TOKEN`: repository API token (required)
    /// - `RECAP_ANTHROPIC_API_KEY`: classifier API key (required)
    /// - `RECAP_ANTHROPIC_MODEL`: classifier model (default: provider default)
    /// - `RECAP_SKIP_LABELS`: comma-separated skip labels
    ///   (default: "no-summary,skip-summary")
    pub fn from_env() -> Result<Self, ConfigError> {
        let bind_addr =
            std::env::var("RECAP_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

        let store_url = std::env::var("RECAP_STORE_URL")
            .unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());

        let github_token = require_env("RECAP_GITHUB_TOKEN")?;
        let anthropic_api_key = require_env("RECAP_ANTHROPIC_API_KEY")?;
        let anthropic_model = std::env::var("RECAP_ANTHROPIC_MODEL").ok();

        let skip_labels = std::env::var("RECAP_SKIP_LABELS")
            .unwrap_or_else(|_| "no-summary,skip-summary".to_string())
            .split(',')
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .collect();

        Ok(Self {
            bind_addr,
            store_url,
            github_token,
            anthropic_api_key,
            anthropic_model,
            skip_labels,
        })
    }
}

fn require_env(var: &str) -> Result<String, ConfigError> {
    std::env::var(var)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ConfigError::MissingRequired {
            field: var.to_string(),
        })
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_env_missing() {
        let result = require_env("RECAP_TEST_DEFINITELY_UNSET");
        assert!(matches!(result, Err(ConfigError::MissingRequired { .. })));
    }
}
