use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use chainrag::api::{create_router, AppState};
use chainrag::builder::{EtherscanClient, EtherscanStoreBuilder};
use chainrag::config::Config;
use chainrag::embeddings::EmbeddingProvider;
use chainrag::llm::LlmProvider;

#[derive(Parser)]
#[command(name = "chainrag")]
#[command(about = "Ask questions about an Ethereum account's transaction history")]
struct Args {
    /// Override CHAINRAG_HOST
    #[arg(long)]
    host: Option<String>,

    /// Override CHAINRAG_PORT
    #[arg(long)]
    port: Option<u16>,

    /// Override CHAINRAG_DATA_DIR
    #[arg(long)]
    data_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chainrag=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = Config::from_env();
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(data_dir) = args.data_dir {
        config.storage.data_dir = data_dir;
    }

    tokio::fs::create_dir_all(&config.storage.data_dir).await?;

    tracing::info!("Loading embedding model: {}...", config.embeddings.model);
    let embeddings = EmbeddingProvider::new(&config.embeddings)?;

    if let Some(llm_config) = &config.llm {
        tracing::info!("Initializing LLM provider: {}...", llm_config.model);
    }
    let llm = LlmProvider::new(config.llm.as_ref());
    if !llm.is_available() {
        tracing::warn!(
            "LLM unavailable - intent extraction falls back to defaults and chat answers will fail"
        );
    }

    if config.etherscan.api_key.is_none() {
        tracing::warn!("ETHERSCAN_API_KEY is not set - preparation jobs will fail at the fetch stage");
    }
    let etherscan = EtherscanClient::new(config.etherscan.clone())?;
    let builder = Arc::new(EtherscanStoreBuilder::new(
        etherscan,
        embeddings.clone(),
        &config.storage.data_dir,
    ));

    let state = AppState::new(config.clone(), embeddings, llm, builder);
    let app = create_router(state);

    let cancel_token = CancellationToken::new();
    tokio::spawn(shutdown_signal(cancel_token.clone()));

    let addr = format!("{}:{}", config.server.host, config.server.port);
    tracing::info!("ChainRAG starting on http://{}", addr);
    tracing::info!("  Health check: http://{}/api/v1/health", addr);
    tracing::info!("  API docs:     http://{}/api/v1/docs", addr);
    tracing::info!("  OpenAPI spec: http://{}/api/v1/openapi.json", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(cancel_token.cancelled_owned())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal(cancel_token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, draining connections...");
    cancel_token.cancel();
}
