mod config;
mod process;
mod read;
mod search;
mod tools;
mod transport;

use clap::Parser;
use config::{Config, Transport};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("localfind=info".parse()?),
        )
        .init();

    let config = Config::parse();
    config.validate()?;

    info!(transport = ?config.transport, os = std::env::consts::OS, "starting localfind MCP server");

    match config.transport {
        Transport::Stdio => transport::serve_stdio().await?,
        Transport::Http => transport::serve_http(&config).await?,
    }

    info!("server stopped");
    Ok(())
}
