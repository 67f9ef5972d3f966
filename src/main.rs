//! ollamaverse HTTP server
//!
//! Starts an Axum web server that routes chat requests to Ollama backends.

use clap::Parser;
use ollamaverse::{
    cli::{Cli, Command, generate_config_template},
    config::Config,
    handlers::AppState,
    server, telemetry,
};
use std::net::SocketAddr;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if let Some(Command::Config { output }) = cli.command {
        let template = generate_config_template();
        match output {
            Some(path) => {
                std::fs::write(&path, template)?;
                eprintln!("Configuration template written to {}", path);
            }
            None => print!("{}", template),
        }
        return Ok(());
    }

    let config = Arc::new(Config::load(cli.config.as_deref())?);

    telemetry::init(&config.observability);

    tracing::info!(
        config_file = cli.config.as_deref().unwrap_or("<built-in>"),
        host = %config.server.host,
        port = config.server.port,
        models = config.models.len(),
        auth_enabled = config.auth.enabled,
        "Starting ollamaverse"
    );

    let state = AppState::new(config.clone())?;

    // Never aborts startup; unreachable backends are only logged
    state.health().log_startup_report().await;

    let app = server::build_router(state);

    let addr = SocketAddr::from((
        config
            .server
            .host
            .parse::<std::net::IpAddr>()
            .unwrap_or_else(|_| std::net::IpAddr::from([0, 0, 0, 0])),
        config.server.port,
    ));

    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
