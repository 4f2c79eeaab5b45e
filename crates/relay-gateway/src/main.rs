//! Relay Gateway entry point
//!
//! Run with:
//! ```bash
//! GATEWAY_PORT=8081 JWT_SECRET=... cargo run -p relay-gateway
//! ```
//!
//! Configuration is loaded from environment variables (and `.env`).

use relay_common::{try_init_tracing_with_config, AppConfig, TracingConfig};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!(error = %e, "Gateway failed");
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::from_env()?;

    if let Err(e) = try_init_tracing_with_config(TracingConfig::for_environment(config.app.env)) {
        eprintln!("Warning: Failed to initialize tracing: {e}");
    }

    info!(
        app = %config.app.name,
        env = ?config.app.env,
        address = %config.gateway.address(),
        database = config.database.is_some(),
        heartbeat_interval_ms = config.hub.heartbeat_interval.as_millis() as u64,
        pong_timeout_ms = config.hub.pong_timeout.as_millis() as u64,
        "Configuration loaded"
    );

    relay_gateway::run(config).await?;

    Ok(())
}
