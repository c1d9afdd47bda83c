use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use metrics_exporter_prometheus::PrometheusBuilder;
use tokio::signal;
use tracing::info;

use fittrack_core::config::Config;
use fittrack_mcp::http::{AppState, HttpOptions, router};
use fittrack_mcp::services::TrackerService;

fn init_tracing() {
    let log_env = std::env::var("FITTRACK_LOG_LEVEL")
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| "info".to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_new(log_env.clone())
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,rmcp=warn"));
    tracing_subscriber::fmt()
        .compact()
        .with_ansi(false)
        .with_target(false)
        .with_env_filter(env_filter)
        .init();
    info!(%log_env, "fittrack:http: log filter");
}

fn bind_address(raw: Option<String>) -> SocketAddr {
    raw.and_then(|s| s.parse().ok())
        .unwrap_or_else(|| SocketAddr::from(([127, 0, 0, 1], 3000)))
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        tracing::error!("failed to listen for ctrl+c: {e}");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    init_tracing();

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .context("installing prometheus recorder")?;

    let config = Config::from_env().context("reading configuration")?;
    let service = TrackerService::from_config(&config)
        .await
        .context("initialising tracker service")?;
    let options = HttpOptions::from_env_with(|k| std::env::var(k).ok());

    let state = Arc::new(AppState {
        service,
        metrics: handle,
    });
    let app = router(state, &options);

    let addr = bind_address(std::env::var("ADDRESS").ok());
    info!(
        %addr,
        max_body_bytes = options.max_body_size,
        timeout_secs = options.request_timeout.as_secs(),
        "starting HTTP server"
    );

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving HTTP")?;

    Ok(())
}
