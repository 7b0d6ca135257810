mod agent;
mod assets;
mod config;
mod errors;
mod models;
mod routes;
mod screening;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::agent::{prompts::screening_instruction, AgentInvoker, LyzrAgentInvoker};
use crate::assets::{AssetUploader, LyzrAssetUploader};
use crate::config::Config;
use crate::routes::build_router;
use crate::screening::session::ScreeningOrchestrator;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Resume Screener v{}", env!("CARGO_PKG_VERSION"));

    if config.lyzr_api_key.is_none() {
        warn!("LYZR_API_KEY is not set; every upload will fail with a configuration error");
    }

    // Uploads are not time-boxed; agent calls are.
    let upload_client = reqwest::Client::builder()
        .build()
        .context("Failed to build upload HTTP client")?;
    let agent_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.agent_timeout_secs))
        .build()
        .context("Failed to build agent HTTP client")?;

    let uploader: Arc<dyn AssetUploader> = Arc::new(LyzrAssetUploader::new(
        upload_client,
        config.upload_url.clone(),
        config.lyzr_api_key.clone(),
    ));
    let invoker: Arc<dyn AgentInvoker> = Arc::new(LyzrAgentInvoker::new(
        agent_client,
        config.agent_url.clone(),
        config.lyzr_api_key.clone(),
    ));
    info!(
        "Agent client initialized (agent: {}, timeout: {}s)",
        config.agent_id, config.agent_timeout_secs
    );

    let orchestrator = Arc::new(ScreeningOrchestrator::new(
        uploader.clone(),
        invoker,
        config.agent_id.clone(),
        screening_instruction(&config.notify_email),
    ));

    // Log every session transition
    let mut observer = orchestrator.subscribe();
    tokio::spawn(async move {
        while observer.changed().await.is_ok() {
            let snapshot = observer.borrow_and_update().clone();
            debug!(
                generation = snapshot.generation,
                history_len = snapshot.history_len,
                "Session state: {:?}",
                snapshot.state
            );
        }
    });

    // Build app state
    let state = AppState {
        config: config.clone(),
        uploader,
        orchestrator,
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict CORS to the front-end origin once it has a fixed host

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
