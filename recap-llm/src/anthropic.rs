//! Anthropic (Claude) classifier implementation.

use crate::ClassifierProvider;
use async_trait::async_trait;
use recap_core::ClassifyError;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const PROVIDER_ID: &str = "anthropic";
const API_VERSION: &str = "2023-06-01";
const DEFAULT_MODEL: &str = "claude-3-5-haiku-20241022";

// ============================================================================
// WIRE TYPES
// ============================================================================

#[derive(Debug, Serialize)]
struct MessageRequest {
    model: String,
    max_tokens: i32,
    messages: Vec<Message>,
}

#[derive(Debug, Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text { text: String },
}

#[derive(Debug, Deserialize)]
struct ApiError {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

// ============================================================================
// CLASSIFIER
// ============================================================================

/// Classifier over the Anthropic Messages API.
pub struct AnthropicClassifier {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: i32,
}

impl AnthropicClassifier {
    /// Create a classifier with the given key and model.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(60))
                .build()
                .unwrap_or_default(),
            api_key: api_key.into(),
            base_url: "https://api.anthropic.com/v1".to_string(),
            model: model.into(),
            max_tokens: 1024,
        }
    }

    /// Create a classifier with the default model.
    pub fn with_default_model(api_key: impl Into<String>) -> Self {
        Self::new(api_key, DEFAULT_MODEL)
    }

    /// Override the base URL (local gateways, test servers).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn map_transport_error(err: reqwest::Error) -> ClassifyError {
        if err.is_timeout() {
            ClassifyError::Timeout {
                provider: PROVIDER_ID.to_string(),
            }
        } else {
            // Connection resets and DNS failures both land here.
            ClassifyError::Connection {
                provider: PROVIDER_ID.to_string(),
                reason: err.to_string(),
            }
        }
    }

    fn map_status_error(status: StatusCode, body: &str) -> ClassifyError {
        let message = serde_json::from_str::<ApiError>(body)
            .map(|e| e.error.message)
            .unwrap_or_else(|_| body.to_string());

        match status {
            StatusCode::TOO_MANY_REQUESTS => ClassifyError::RateLimited {
                provider: PROVIDER_ID.to_string(),
            },
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ClassifyError::InvalidApiKey {
                provider: PROVIDER_ID.to_string(),
            },
            _ => ClassifyError::UpstreamStatus {
                provider: PROVIDER_ID.to_string(),
                status: status.as_u16(),
                message,
            },
        }
    }
}

#[async_trait]
impl ClassifierProvider for AnthropicClassifier {
    async fn classify(&self, prompt: &str) -> Result<String, ClassifyError> {
        let request = MessageRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            messages: vec![Message {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
        };

        let response = self
            .client
            .post(format!("{}/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&request)
            .send()
            .await
            .map_err(Self::map_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Self::map_status_error(status, &body));
        }

        let parsed: MessageResponse = response.json().await.map_err(|e| {
            ClassifyError::MalformedResponse {
                provider: PROVIDER_ID.to_string(),
                reason: format!("failed to parse response body: {}", e),
            }
        })?;

        let text = parsed
            .content
            .into_iter()
            .map(|block| match block {
                ContentBlock::Text { text } => text,
            })
            .collect::<Vec<_>>()
            .join("\n");

        Ok(text)
    }

    fn provider_id(&self) -> &str {
        PROVIDER_ID
    }
}

impl std::fmt::Debug for AnthropicClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicClassifier")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================
