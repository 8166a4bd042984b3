use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use srcds_sentinel::{
    ConfigStore, Supervisor, SysProcessControl, TcpProbe, WebhookNotifier, DEFAULT_CONFIG_FILE,
};

#[tokio::main]
async fn main() {
    init_logging();

    let config_path = std::env::var("SENTINEL_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_FILE));
    info!(path = %config_path.display(), "using configuration file");

    let store = ConfigStore::new(config_path);
    let mut supervisor = Supervisor::new(
        store,
        Arc::new(TcpProbe),
        Arc::new(SysProcessControl),
        Arc::new(WebhookNotifier::new()),
    );

    supervisor.startup().await;

    tokio::select! {
        _ = supervisor.run() => {}
        _ = shutdown_signal() => {
            info!("shutdown signal received; exiting");
        }
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,srcds_sentinel=debug"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("failed to install Ctrl+C handler: {e}");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => error!("failed to install SIGTERM handler: {e}"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
