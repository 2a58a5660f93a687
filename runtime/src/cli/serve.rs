//! `rankscope serve`: HTTP API plus the automation scheduler.

use crate::cli::output::{self, Styled};
use crate::config::RuntimeConfig;
use crate::server::Server;
use anyhow::Result;
use tracing::info;

/// Run the service until Ctrl-C.
pub async fn run(config: RuntimeConfig) -> Result<()> {
    let s = Styled::new();
    info!("starting Rankscope v{}", env!("CARGO_PKG_VERSION"));

    if !output::is_quiet() && !output::is_json() {
        eprintln!(
            "  {} Rankscope v{} on http://{}:{}",
            s.ok_sym(),
            env!("CARGO_PKG_VERSION"),
            config.bind,
            config.port
        );
        eprintln!("  Data: {}", config.db_path().display());
    }

    let server = Server::new(config);

    let shutdown_signal = server.shutdown_handle();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        info!("received shutdown signal");
        shutdown_signal.notify_one();
    });

    let result = server.start().await;

    if !output::is_quiet() && !output::is_json() {
        eprintln!("  {} Rankscope stopped.", s.ok_sym());
    }
    result
}
