use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;

use openlist_monitor::api::OpenListClient;
use openlist_monitor::config::{self, Config};
use openlist_monitor::http_client::OpenListHttpClient;
use openlist_monitor::monitor::Monitor;
use openlist_monitor::routes::AppState;
use openlist_monitor::services::ServiceRegistry;

#[tokio::main]
async fn main() -> Result<()> {
    // Check if interactive setup is needed (no .env and missing required values)
    if config::needs_interactive_setup() {
        let interactive_config = config::run_interactive_setup().await?;
        interactive_config.apply_to_env();
    }

    // Load configuration first (for log level)
    let config = Config::load()?;
    config.validate()?;

    // Initialize logging with a configured level
    let log_level = config.log_level.to_lowercase();
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("OpenList Monitor starting...");
    tracing::info!(
        "Server configured: {}:{}",
        config.server_host,
        config.server_port
    );
    tracing::debug!(config = ?config, "Loaded configuration");

    let http_client = OpenListHttpClient::new(config.credentials(), config.http_request_timeout)?;

    // Test authentication once; the monitor keeps retrying on its own schedule
    tracing::info!("Logging in to {}...", config.openlist_host);
    match http_client.auth_manager().login().await {
        Ok(()) => tracing::info!("Authentication successful"),
        Err(e) => {
            tracing::error!("Authentication failed: {}", e);
            tracing::warn!("Server will start but sensors stay unavailable until login succeeds");
        }
    }

    let client = OpenListClient::new(http_client);
    let monitor = Arc::new(Monitor::new(
        config.source_name.clone(),
        client.clone(),
        &config.track_dirs,
    ));

    monitor.start(
        Duration::from_secs(config.file_scan_interval),
        Duration::from_secs(config.task_scan_interval),
    );

    let app_state = AppState {
        proxy_api_key: config.proxy_api_key.clone(),
        monitor: monitor.clone(),
        services: Arc::new(ServiceRegistry::new(client)),
    };

    let app = openlist_monitor::build_app(app_state);

    // Bind to configured host and port
    let addr = format!("{}:{}", config.server_host, config.server_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    print_startup_banner(&config);

    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    monitor.stop();
    tracing::info!("Server shutdown complete");

    Ok(())
}

/// Print startup banner
fn print_startup_banner(config: &Config) {
    println!();
    println!("  OpenList Monitor");
    println!("  Version:     {}", env!("CARGO_PKG_VERSION"));
    println!(
        "  Server:      http://{}:{}",
        config.server_host, config.server_port
    );
    println!("  OpenList:    {}", config.openlist_host);
    println!("  Source:      {}", config.source_name);
    if config.track_dirs.is_empty() {
        println!("  Track dirs:  (none)");
    } else {
        println!("  Track dirs:  {}", config.track_dirs.join(", "));
    }
    println!(
        "  Intervals:   files {}s, tasks {}s",
        config.file_scan_interval, config.task_scan_interval
    );
    println!("  Log Level:   {}", config.log_level);
    println!();
}

/// Handle graceful shutdown signal
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal, initiating graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown...");
        },
    }
}
