use anyhow::{Context, Result};
use commit_viewer::api::{cors_layer, create_router, AppState};
use commit_viewer::config::AppConfig;
use commit_viewer::github::{http_client, GitHubClient};
use commit_viewer::oauth::{run_correlation_cleanup, AuthFlow};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // .env is optional; real environment variables take precedence
    dotenvy::dotenv().ok();

    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "commit_viewer=info".into()),
        )
        .init();

    info!("Commit viewer backend starting...");

    let config = AppConfig::from_env().context("Invalid configuration")?;
    let settings = config.settings.clone();

    info!(
        bind_addr = %settings.server.bind_addr,
        public_url = %settings.server.public_url,
        frontend_url = %settings.flow.frontend_url,
        flow_mode = %settings.flow.mode,
        app_id = %config.app.app_id(),
        "Configuration loaded"
    );

    let http = http_client(&settings.github.user_agent).context("Failed to build HTTP client")?;
    let flow = Arc::new(AuthFlow::from_config(&config, http.clone()));

    // Expired `state` entries are swept in the background
    let cleanup_handle = tokio::spawn(run_correlation_cleanup(
        flow.correlations(),
        settings.flow.cleanup_interval_seconds,
    ));

    let state = AppState {
        flow,
        github: GitHubClient::new(http, settings.github.api_url.clone()),
        default_branch: settings.github.default_branch.clone(),
    };
    let router = create_router(state).layer(
        cors_layer(&settings.flow.frontend_url).context("Invalid frontend URL for CORS")?,
    );

    let listener = tokio::net::TcpListener::bind(&settings.server.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", settings.server.bind_addr))?;
    info!(addr = %settings.server.bind_addr, "HTTP API listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    cleanup_handle.abort();
    info!("Commit viewer backend stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for ctrl_c signal");
        // Keep serving rather than shutting down immediately
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
