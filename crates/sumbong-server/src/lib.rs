//! Sumbong Server: HTTP API and realtime stream over the workflow
//! services.
//!
//! Everything is JSON. Responses carry `success`, and failures add
//! `message` and a machine-readable `code`. Authentication is a bearer
//! session token issued by the login endpoints.

use std::time::Duration;

use axum::Router;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderValue, Method};
use sumbong_db::DbManager;
use tokio::net::TcpListener;
use tokio::signal::ctrl_c;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

pub mod config;
pub mod dto;
pub mod error;
pub mod extract;
pub mod mailer;
pub mod oauth;
pub mod routes;
pub mod state;

pub use config::Config;
pub use error::{ApiError, ServerError};
pub use state::{AppState, SharedState};

/// The full application: routes, CORS for the web client and request
/// tracing.
pub fn build_router(state: SharedState, cors_origins: &[String]) -> Router {
    let origins: Vec<HeaderValue> = cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .max_age(Duration::from_secs(60 * 60));

    routes::api(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

pub async fn start_server(config: Config) -> Result<(), ServerError> {
    info!("Initializing state...");
    let db = DbManager::connect(&config.db).await?;
    sumbong_db::run_migrations(db.client()).await?;
    let state = AppState::new(db.client().clone(), &config)?;

    let app = build_router(state, &config.server.cors_origins);

    let address = config.server.bind_addr;
    info!("Binding to {address}");
    let listener = TcpListener::bind(address).await?;
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                warn!(error = %e, "failed to install Ctrl+C handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                warn!(error = %e, "failed to install terminate handler");
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
}
