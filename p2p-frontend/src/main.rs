use dotenvy::dotenv;
use p2p_core::observability::logging::init_tracing;
use p2p_frontend::config::get_configuration;
use p2p_frontend::startup::{build_router, build_state, spawn_background_polling};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let configuration = get_configuration().map_err(|e| {
        eprintln!("Failed to read configuration: {}", e);
        anyhow::anyhow!("Configuration error: {}", e)
    })?;

    init_tracing(
        "p2p-frontend",
        &configuration.telemetry.log_level,
        configuration.telemetry.otlp_endpoint.as_deref(),
    )?;

    p2p_frontend::services::metrics::init_metrics();

    let state = build_state(&configuration).await?;
    let background_poller = spawn_background_polling(&state);

    let app = build_router(state.clone());

    let address = format!(
        "{}:{}",
        configuration.server.host, configuration.server.port
    );
    let listener = tokio::net::TcpListener::bind(&address).await.map_err(|e| {
        tracing::error!("Failed to bind TCP listener to {}: {}", address, e);
        anyhow::anyhow!("Failed to bind to address {}: {}", address, e)
    })?;

    info!(
        gateway = %configuration.gateway.base_url,
        polling = ?state.polling.scope,
        "Starting p2p-frontend on {}",
        address
    );
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| {
            tracing::error!("Server error: {}", e);
            anyhow::anyhow!("Server error: {}", e)
        })?;

    if let Some(poller) = background_poller {
        poller.shutdown().await;
    }
    state.shutdown_pollers().await;
    info!("p2p-frontend stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
