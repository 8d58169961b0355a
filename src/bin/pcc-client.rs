//! pcc-client: sends a file to a pcc server and prints the printable count.

use clap::Parser;
use pcc::client;
use pcc::config::ClientArgs;
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = ClientArgs::parse();

    // Initialize logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    // Diagnostics go to stderr; stdout carries only the count.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let count = client::run(&args.host, args.port, &args.file).await?;
    println!("{count}");
    Ok(())
}
