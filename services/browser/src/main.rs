use anyhow::{Context, Result};
use browser_service::api::{start_api_server, AppState};
use browser_service::{Config, S3Gateway, SampleBrowser};
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = Config::load().context("Failed to load configuration")?;

    // Initialize logging
    init_tracing(&config.service.log_level);

    info!(
        service = %config.service.name,
        bucket = %config.store.bucket,
        "Starting IndicVoices Browser Service"
    );

    // Credentials are checked before anything talks to the store
    let credentials = match config.credentials() {
        Ok(credentials) => credentials,
        Err(e) => {
            error!(
                error = %e,
                "Object store credentials not configured; set STORE_ACCESS_KEY and STORE_SECRET_KEY"
            );
            return Err(e).context("Browser service disabled");
        }
    };
    config.validate().context("Invalid configuration")?;

    // Initialize metrics
    init_metrics(config.service.metrics_port)?;

    let gateway = Arc::new(S3Gateway::new(&config.store, &credentials).await);
    let browser = Arc::new(SampleBrowser::new(gateway, &config));

    // Spawn API server task
    let api_state = AppState { browser };
    let api_config = config.api.clone();
    let api_handle = tokio::spawn(async move {
        if let Err(e) = start_api_server(api_state, &api_config).await {
            error!(error = %e, "API server error");
        }
    });

    info!("Browser service started successfully");

    // Wait for shutdown signal
    shutdown_signal().await;

    info!("Shutting down browser service");
    api_handle.abort();
    info!("Browser service stopped");

    Ok(())
}

/// Initialize tracing/logging
fn init_tracing(log_level: &str) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().json())
        .init();
}

/// Initialize Prometheus metrics exporter
fn init_metrics(port: u16) -> Result<()> {
    let builder = metrics_exporter_prometheus::PrometheusBuilder::new();

    builder
        .with_http_listener(([0, 0, 0, 0], port))
        .install()
        .context("Failed to install Prometheus metrics exporter")?;

    info!(port = port, "Prometheus metrics exporter started");

    Ok(())
}

/// Wait for shutdown signal (SIGINT or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            info!("Received SIGTERM signal");
        }
    }
}
