//! Recap API Server Entry Point
//!
//! Bootstraps configuration, connects the shared store, and starts the
//! Axum HTTP server.

use std::sync::Arc;

use recap_api::{create_router, ApiConfig, ApiError, ApiResult, AppState, Orchestrator};
use recap_core::RecapConfig;
use recap_llm::AnthropicClassifier;
use recap_scm::GitHubClient;
use recap_store::RedisStore;

#[tokio::main]
async fn main() -> ApiResult<()> {
    init_tracing();

    let api_config = ApiConfig::from_env().map_err(recap_core::RecapError::from)?;
    let recap_config = RecapConfig::from_env();
    recap_config.validate()?;

    let store = Arc::new(RedisStore::connect(&api_config.store_url).await?);

    let scm = Arc::new(GitHubClient::new(&api_config.github_token));
    let classifier: Arc<AnthropicClassifier> = Arc::new(match &api_config.anthropic_model {
        Some(model) => AnthropicClassifier::new(&api_config.anthropic_api_key, model),
        None => AnthropicClassifier::with_default_model(&api_config.anthropic_api_key),
    });

    let orchestrator = Arc::new(Orchestrator::new(
        store,
        scm,
        classifier,
        recap_config,
        api_config.skip_labels.clone(),
    ));

    let app = create_router(Arc::new(AppState { orchestrator }));

    tracing::info!(addr = %api_config.bind_addr, "starting recap server");
    let listener = tokio::net::TcpListener::bind(&api_config.bind_addr)
        .await
        .map_err(|e| {
            ApiError::internal_error(format!("failed to bind {}: {}", api_config.bind_addr, e))
        })?;

    let server = axum::serve(listener, app);
    tokio::select! {
        result = server => {
            result.map_err(|e| ApiError::internal_error(format!("server error: {}", e)))?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown signal received");
        }
    }

    Ok(())
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
}
