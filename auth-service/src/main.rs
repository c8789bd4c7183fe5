use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use auth_service::{
    build_router,
    config::AuthConfig,
    db,
    services::{
        Database, GrantProvider, GrantProviderRegistry, JwtService, JwtTokenGenerator,
        OrganizationClient, PasswordGrantProvider, RefreshTokenGrantProvider, TokenIssuer,
    },
    AppState,
};
use service_core::observability::logging::init_tracing;
use tokio::signal;

#[tokio::main]
async fn main() -> Result<(), service_core::error::AppError> {
    // Load configuration - fail fast if invalid
    let config = AuthConfig::from_env()?;

    init_tracing(&config.service_name, &config.log_level);

    tracing::info!(
        service = %config.service_name,
        version = %config.service_version,
        environment = ?config.environment,
        "Starting authentication service"
    );

    let pool = db::create_pool(&config.database)
        .await
        .map_err(|e| service_core::error::AppError::DatabaseError(anyhow::anyhow!(e)))?;
    db::run_migrations(&pool)
        .await
        .map_err(|e| service_core::error::AppError::DatabaseError(anyhow::anyhow!(e)))?;

    let database = Database::new(pool);
    let db_arc = Arc::new(database.clone());

    let jwt = JwtService::new(&config.jwt)?;
    tracing::info!("JWT service initialized");

    let organizations = Arc::new(OrganizationClient::new(&config.organization)?);

    let registry = Arc::new(GrantProviderRegistry::new(vec![
        Arc::new(PasswordGrantProvider::new(db_arc.clone())) as Arc<dyn GrantProvider>,
        Arc::new(RefreshTokenGrantProvider::new(db_arc.clone())) as Arc<dyn GrantProvider>,
    ]));

    let issuer = Arc::new(TokenIssuer::new(
        Arc::new(JwtTokenGenerator::new(jwt.clone())),
        db_arc,
        organizations,
        Duration::from_millis(config.organization.timeout_ms),
    ));

    let state = AppState {
        config: config.clone(),
        db: database,
        jwt,
        registry,
        issuer,
    };

    let app = build_router(state).await?;

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
