mod config;
mod errors;
mod export;
mod extract;
mod llm_client;
mod matching;
mod models;
mod routes;
mod session;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::extract::DocumentExtractor;
use crate::llm_client::LlmClient;
use crate::matching::evaluator::LlmMatchEvaluator;
use crate::routes::build_router;
use crate::session::registry::SessionRegistry;
use crate::state::AppState;

const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on a missing OPENAI_API_KEY)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Talent Match API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize LLM client
    let llm = LlmClient::new(config.openai_api_key.clone(), config.openai_model.clone())
        .with_base_url(config.openai_base_url.clone());
    info!("LLM client initialized (model: {})", llm.model());

    let sessions = Arc::new(SessionRegistry::new(config.session_idle_ttl));
    spawn_session_sweeper(sessions.clone());

    // Build app state
    let state = AppState {
        config: config.clone(),
        sessions,
        evaluator: Arc::new(LlmMatchEvaluator::new(llm)),
        extractor: Arc::new(DocumentExtractor),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins once the frontend host is fixed

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!(
        "Listening on {addr} (upload limit {} MB)",
        config.max_upload_bytes / (1024 * 1024)
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Evicts idle sessions once a minute for the life of the process.
fn spawn_session_sweeper(sessions: Arc<SessionRegistry>) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
        loop {
            ticker.tick().await;
            let evicted = sessions.evict_idle().await;
            if evicted > 0 {
                let live = sessions.len().await;
                info!(evicted, live, "Swept idle sessions");
            }
        }
    });
}
