use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use lastmile_ops::api;
use lastmile_ops::config::Config;
use lastmile_ops::error::AppError;
use lastmile_ops::realtime::relay::{EventSink, HttpRelay, HubSink};
use lastmile_ops::state::AppState;
use lastmile_ops::workers;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let config = Config::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(config.log_level.clone()))
        .with_target(false)
        .compact()
        .init();

    let (app_state, risk_rx, import_rx) = AppState::new(&config);
    let shared_state = Arc::new(app_state);

    let app = api::router(shared_state.clone());

    // With no relay configured the workers emit straight into the in-process
    // hub; a configured relay routes emits through the internal endpoint of
    // the process that owns the sockets.
    let sink: Arc<dyn EventSink> = match &config.relay_base_url {
        Some(base_url) => Arc::new(HttpRelay::new(
            base_url.clone(),
            config.internal_secret.clone(),
        )),
        None => Arc::new(HubSink::new(shared_state.hub.clone())),
    };

    tokio::spawn(workers::risk::run_risk_worker(
        shared_state.clone(),
        sink,
        risk_rx,
    ));
    tokio::spawn(workers::imports::run_import_worker(
        shared_state.clone(),
        import_rx,
    ));
    tokio::spawn(workers::heartbeat::run_heartbeat(
        shared_state.clone(),
        config.heartbeat_interval_secs,
        config.heartbeat_ttl_secs,
    ));

    let bind_addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|err| AppError::Internal(format!("failed to bind {bind_addr}: {err}")))?;

    tracing::info!(http_port = config.http_port, "http server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| AppError::Internal(format!("server error: {err}")))?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
}
