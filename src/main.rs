//! Town Server
//!
//! Hosts the authoritative town state: players, conversation areas and pet
//! follower chains. Transports attach to the shared [`AppState`].

use anyhow::Result;
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{debug, error, info};
use tracing_subscriber::{fmt, EnvFilter};

use town_server::config::ServerConfig;
use town_server::state::AppState;
use town_server::VERSION;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first so it can shape logging
    let config = ServerConfig::load().await?;

    init_logging(&config);

    info!(
        version = VERSION,
        server_name = %config.server_name,
        "Starting town server"
    );
    info!(
        config_path = %config.config_path.display(),
        "Configuration loaded"
    );
    info!(
        town_capacity = config.town_capacity,
        max_followers = config.followers.max_depth,
        follower_name = %config.followers.display_name,
        "Town settings"
    );

    let (shutdown_tx, _) = broadcast::channel::<()>(1);

    let state = AppState::new(config, shutdown_tx.clone())?;
    if let Some(town) = &state.default_town {
        info!(town_id = %town.town_id, "Default town is ready for players");
    }

    info!("Server startup complete!");

    let received = shutdown_signal().await;
    info!(signal = received, "Shutting down server...");
    if shutdown_tx.send(()).is_err() {
        debug!("No tasks subscribed to shutdown");
    }
    state.shutdown();

    info!("Server shutdown complete. Goodbye!");
    Ok(())
}

/// Initialize the logging/tracing system
fn init_logging(config: &ServerConfig) {
    let default_filter = if config.debug {
        "debug"
    } else {
        "info,town_server=debug"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let builder = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_level(true);

    if config.log_json {
        builder.json().init();
    } else {
        builder.with_file(true).with_line_number(true).init();
    }
}

/// Resolve with the name of the first stop signal received
///
/// A signal whose handler cannot be installed is logged and never fires.
async fn shutdown_signal() -> &'static str {
    let interrupt = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Unable to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Unable to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = interrupt => "SIGINT",
        _ = terminate => "SIGTERM",
    }
}
