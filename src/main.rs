use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;

use ollama_gateway::config::{Cli, Config};
use ollama_gateway::server::api::{build_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env is fine.
    let _ = dotenvy::dotenv();

    // Parse CLI arguments.
    let cli = Cli::parse();

    // Initialize tracing/logging.
    let filter = if cli.verbose {
        "ollama_gateway=debug,tower_http=debug"
    } else {
        "ollama_gateway=info,tower_http=info"
    };

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .with_target(true);
    if cli.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    info!("ollama-gateway v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration.
    let config = Arc::new(Config::load(&cli.config)?.resolve(&cli));

    info!(
        upstream = %config.upstream.url,
        connect_timeout_secs = config.upstream.connect_timeout_secs,
        read_timeout_secs = config.upstream.read_timeout_secs,
        "Configuration loaded"
    );

    // Build application state and router.
    let state = Arc::new(AppState::new(config.clone())?);
    let app = build_router(state);

    // Start the server.
    let listen_addr = &config.server.listen;
    let listener = TcpListener::bind(listen_addr).await?;
    info!("Listening on {listen_addr}");

    axum::serve(listener, app).await?;

    Ok(())
}
