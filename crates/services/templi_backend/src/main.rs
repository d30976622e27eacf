// File: services/templi_backend/src/main.rs
use std::sync::Arc;
use templi_backend::{build_app, AppState};
use templi_common::logging::{self, log_result, parse_level};
use templi_config::load_config;
use tokio::net::TcpListener;
use tracing::{error, info};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            logging::init();
            error!("Failed to load config: {}", e);
            return Err(e.into());
        }
    };
    logging::init_with_level(parse_level(&config.server.log_level));

    let config = Arc::new(config);
    let state = AppState::new(config.clone())?;
    let app = build_app(state);

    // Bind and serve
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = log_result(
        TcpListener::bind(&addr).await,
        &format!("Starting {} at http://{}", config.server.service_name, addr),
        &format!("Failed to bind {}", addr),
    )?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        // Without a signal handler, run until the process is killed
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
