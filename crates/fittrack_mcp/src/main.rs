use anyhow::Context;
use fittrack_core::config::Config;
use fittrack_mcp::FitTrackMcpHandler;
use fittrack_mcp::services::TrackerService;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    // `FITTRACK_LOG_LEVEL`, then `RUST_LOG`, then `info`. Logs go to stderr;
    // stdout carries the MCP protocol.
    let log_env = std::env::var("FITTRACK_LOG_LEVEL")
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| "info".to_string());

    let combined_filter = format!("{},rmcp=warn,serve_inner=warn", log_env);
    let env_filter = tracing_subscriber::EnvFilter::try_new(combined_filter)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,rmcp=warn,serve_inner=warn"));
    tracing_subscriber::fmt()
        .compact()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(false)
        .with_env_filter(env_filter)
        .init();
    tracing::info!("fittrack_mcp: log filter: {}", log_env);

    let config = Config::from_env().context("reading configuration")?;
    let service = TrackerService::from_config(&config)
        .await
        .context("initialising tracker service")?;
    let handler = FitTrackMcpHandler::new(service);

    tracing::info!(
        "fittrack_mcp: registered {} tools and {} prompts",
        handler.tool_count(),
        handler.prompt_count()
    );

    let transport = (tokio::io::stdin(), tokio::io::stdout());
    let server = rmcp::serve_server(handler, transport).await?;
    tracing::info!("fittrack_mcp: stdio MCP server running");

    server.waiting().await?;
    Ok(())
}
