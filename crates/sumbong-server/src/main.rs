//! Sumbong Server: application entry point.

use std::process::ExitCode;

use sumbong_server::Config;
use tracing::error;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("sumbong=info,tower_http=info"));
    tracing_subscriber::fmt().with_env_filter(filter).json().init();

    tracing::info!("Starting Sumbong server...");

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = sumbong_server::start_server(config).await {
        error!(error = %e, "server failed");
        return ExitCode::FAILURE;
    }

    tracing::info!("Sumbong server stopped.");
    ExitCode::SUCCESS
}
