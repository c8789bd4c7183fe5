use std::net::SocketAddr;
use std::sync::Arc;

use gateway_service::{
    build_router,
    config::GatewayConfig,
    services::{AuthServiceClient, TokenVerifier},
    AppState,
};
use service_core::observability::logging::init_tracing;
use tokio::signal;

#[tokio::main]
async fn main() -> Result<(), service_core::error::AppError> {
    let config = GatewayConfig::from_env()?;

    init_tracing(&config.service_name, &config.log_level);

    tracing::info!(
        service = %config.service_name,
        version = %config.service_version,
        environment = ?config.environment,
        routes = config.routes.len(),
        "Starting gateway service"
    );

    let resolver = Arc::new(AuthServiceClient::new(&config.auth_service)?);
    let verifier = Arc::new(TokenVerifier::from_key_file(
        &config.verifier.public_key_path,
        resolver,
    )?);
    tracing::info!("Token verifier initialized");

    let http = reqwest::Client::builder()
        .build()
        .map_err(|e| service_core::error::AppError::InternalError(anyhow::anyhow!(e)))?;

    let state = AppState {
        config: config.clone(),
        verifier,
        http,
    };

    let app = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
    tracing::info!(address = %addr, "Listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Service shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => tracing::error!(error = %e, "Failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
