// Main entry point - Dependency injection and server setup
use std::{net::SocketAddr, sync::Arc};

use operating_time::application::evaluation_service::EvaluationService;
use operating_time::infrastructure::config::{load_influx_config, load_monitors_config};
use operating_time::infrastructure::influx_repository::InfluxRepository;
use operating_time::infrastructure::monitors::{build_calculators, InfluxStreams};
use operating_time::presentation::app_state::AppState;
use operating_time::presentation::handlers::router;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load configuration
    let influx_config = load_influx_config()?;
    let monitors_config = load_monitors_config()?;

    // Create repository (infrastructure layer)
    let repository = Arc::new(InfluxRepository::new(
        influx_config.influx.host,
        influx_config.influx.token,
        influx_config.influx.database,
        influx_config.influx.retention_policy,
    ));
    let streams = InfluxStreams::new(repository);

    // Create services (application layer)
    let calculators = build_calculators(&monitors_config.monitors, &streams);
    let evaluation_service = EvaluationService::new(calculators);

    let state = Arc::new(AppState { evaluation_service });

    // Start server
    let addr: SocketAddr = monitors_config.server.bind.parse()?;
    tracing::info!(
        "Starting operating-time service on {} with {} monitors",
        addr,
        monitors_config.monitors.len()
    );

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router(state)).await?;

    Ok(())
}
