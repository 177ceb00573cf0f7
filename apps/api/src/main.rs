//! Carelog API composition root.

#![forbid(unsafe_code)]

mod api_config;
mod api_router;
mod dto;
mod handlers;
mod openapi;
mod state;

use carelog_application::AuditRecordInput;
use carelog_core::AppError;
use carelog_infrastructure::install_global_audit_recorder;
use tracing::{info, warn};

use crate::api_config::{ApiConfig, init_tracing};
use crate::state::AppState;

const API_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = ApiConfig::load()?;

    // The audit trail supplements the API; a broken destination must not
    // keep the status endpoints down.
    let recorder = match install_global_audit_recorder(config.audit.clone()).await {
        Ok(recorder) => {
            recorder
                .record(
                    AuditRecordInput::new("System startup")
                        .detail("version", API_VERSION)
                        .detail("environment", config.environment.as_str()),
                )
                .await;
            Some(recorder)
        }
        Err(error) => {
            warn!(
                destination = %config.audit.destination.display(),
                %error,
                "audit recorder unavailable; continuing without an audit trail"
            );
            None
        }
    };

    let app = api_router::build_router(AppState {
        environment: config.environment.clone(),
        version: API_VERSION,
    });

    let address = config.socket_address()?;
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .map_err(|error| AppError::Internal(format!("failed to bind listener: {error}")))?;

    info!(%address, environment = %config.environment, "carelog-api listening");

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|error| AppError::Internal(format!("api server error: {error}")));

    if let Some(recorder) = recorder {
        recorder.record(AuditRecordInput::new("System shutdown")).await;
        if let Err(error) = recorder.shutdown().await {
            warn!(%error, "audit recorder did not drain cleanly");
        }
    }

    info!("carelog-api stopped");
    served
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            warn!(%error, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(error) => {
                warn!(%error, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("received Ctrl+C, shutting down"),
        () = terminate => info!("received SIGTERM, shutting down"),
    }
}
