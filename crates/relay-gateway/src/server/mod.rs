//! Gateway server setup
//!
//! Routes, collaborator wiring and the serve loop.

mod handler;
mod state;

pub use handler::{health_handler, notification_handler, room_handler, ApiError, ConnectParams};
pub use state::GatewayState;

use crate::hub::{DeliveryServices, Hub};
use axum::{routing::get, Router};
use relay_common::{AppConfig, AppError, JwtCredentialValidator};
use relay_core::SnowflakeGenerator;
use relay_db::{
    InMemoryChatStore, InMemoryNotificationStore, InMemoryRoomDirectory, PgChatMessageStore,
    PgNotificationStore, PgRoomAuthorizer, PoolConfig,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

/// Create the gateway router
pub fn create_router() -> Router<GatewayState> {
    Router::new()
        .route("/ws/rooms/:room_id", get(room_handler))
        .route("/ws/notifications", get(notification_handler))
        .route("/health", get(health_handler))
}

/// Build the complete application
pub fn create_app(state: GatewayState) -> Router {
    create_router()
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Connect collaborators and start the hub
///
/// Without `DATABASE_URL` the gateway runs on in-memory collaborators, which
/// know no rooms and keep nothing across restarts.
pub async fn create_gateway_state(config: AppConfig) -> Result<GatewayState, AppError> {
    let services = match &config.database {
        Some(database) => {
            info!("Connecting to PostgreSQL...");
            let pool = relay_db::create_pool(&PoolConfig::from(database))
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
            relay_db::run_migrations(&pool)
                .await
                .map_err(|e| AppError::Database(format!("Migration failed: {e}")))?;
            info!("PostgreSQL connection established");

            let ids = Arc::new(SnowflakeGenerator::new(config.snowflake.worker_id));
            DeliveryServices::builder()
                .room_authorizer(Arc::new(PgRoomAuthorizer::new(pool.clone())))
                .chat_store(Arc::new(PgChatMessageStore::new(pool.clone(), ids)))
                .notification_store(Arc::new(PgNotificationStore::new(pool)))
                .build()
                .map_err(|e| AppError::Config(e.to_string()))?
        }
        None => {
            warn!("DATABASE_URL not set, using in-memory collaborators");
            DeliveryServices::new(
                Arc::new(InMemoryRoomDirectory::new()),
                Arc::new(InMemoryChatStore::new()),
                Arc::new(InMemoryNotificationStore::new()),
            )
        }
    };

    Ok(gateway_state_with_services(config, services))
}

/// Start a hub over `services` and pair it with the JWT validator
pub fn gateway_state_with_services(config: AppConfig, services: DeliveryServices) -> GatewayState {
    let credentials = Arc::new(JwtCredentialValidator::from_config(&config.jwt));
    let hub = Hub::spawn(config.hub.clone(), services);
    GatewayState::new(hub, credentials, config)
}

/// Serve until Ctrl+C, then close every connection
pub async fn run_server(listener: TcpListener, state: GatewayState) -> Result<(), AppError> {
    let addr = listener
        .local_addr()
        .map_err(|e| AppError::Config(format!("Listener has no address: {e}")))?;
    info!("Gateway listening on ws://{}/ws", addr);

    let hub = state.hub().clone();
    axum::serve(listener, create_app(state))
        .with_graceful_shutdown(shutdown_signal(hub))
        .await
        .map_err(|e| AppError::Config(format!("Server error: {e}")))?;

    info!("Gateway stopped");
    Ok(())
}

async fn shutdown_signal(hub: Hub) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }

    info!("Shutdown signal received");
    match hub.shutdown().await {
        Ok(closed) => info!(closed, "Connections closed"),
        Err(e) => warn!(error = %e, "Hub already stopped"),
    }
}

/// Run the complete gateway server with configuration
pub async fn run(config: AppConfig) -> Result<(), AppError> {
    let addr = config.gateway.address();
    info!("Starting Gateway server on {}", addr);

    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::Config(format!("Failed to bind to {addr}: {e}")))?;

    let state = create_gateway_state(config).await?;
    run_server(listener, state).await
}
