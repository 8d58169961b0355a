//! pcc-server: counts printable characters in files sent over TCP.
//!
//! Serves one transaction at a time on a current-thread runtime. On Ctrl-C
//! the accept loop winds down and the accumulated character histogram is
//! printed to stdout.

use pcc::config::ServerConfig;
use pcc::server::{self, Server};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = ServerConfig::load()?;

    // Initialize logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    // Diagnostics go to stderr; stdout carries only the final report.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    info!(
        host = %config.host,
        port = config.port,
        "Starting pcc-server"
    );

    let addr = config.listen_addr().parse()?;
    let listener = server::bind(addr)?;
    let shutdown = server::shutdown_on_ctrl_c();

    let totals = Server::new().run(listener, shutdown).await?;
    print!("{totals}");
    Ok(())
}
