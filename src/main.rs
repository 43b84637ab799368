use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use errs::api::handlers::{AppStateInner, User, UserDirectory};
use errs::api::routes::create_router;
use errs::config::Config;
use errs::logging::{install_defaults, LogOptions};
use errs::metrics;

/// Wait for shutdown signal (SIGTERM or SIGINT)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }

    info!("Starting graceful shutdown...");
}

fn demo_users() -> UserDirectory {
    UserDirectory::new([
        User {
            id: 1,
            name: "Ada Lovelace".to_string(),
        },
        User {
            id: 2,
            name: "Grace Hopper".to_string(),
        },
    ])
    .with_avatar_backend(Duration::from_millis(50), Duration::from_millis(250))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;

    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.logging.filter))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting errs demo service v{}", env!("CARGO_PKG_VERSION"));

    if install_defaults(config.log_defaults()).is_err() {
        warn!("Error log defaults were already installed");
    }

    // Initialize metrics
    metrics::registry::init_metrics();
    info!("Metrics registry initialized");

    // Create application state
    let state = Arc::new(AppStateInner {
        users: demo_users(),
        log_options: LogOptions::new(),
    });

    // Create router
    let app = create_router(state);

    // Start server
    let addr = config.server_address();
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind server")?;

    info!("Server listening on {}", addr);

    // Serve with graceful shutdown; connect info feeds remote_addr in error logs
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("Server error")?;

    info!("Server shutdown complete");

    Ok(())
}
