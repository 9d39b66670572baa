//! Chat Server - Entry Point
//!
//! Loads configuration, starts the listener, and closes it on Ctrl-C.

use std::env;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use irc_lite::{Server, ServerConfig, ServerError};

/// Environment variable naming an optional TOML config file
const CONFIG_ENV: &str = "IRC_LITE_CONFIG";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut config = match env::var(CONFIG_ENV) {
        Ok(path) => ServerConfig::from_file(path).map_err(ServerError::Config)?,
        Err(_) => ServerConfig::default(),
    };

    // Bind address from command line overrides the config file
    if let Some(addr) = env::args().nth(1) {
        config.listen_addr = addr;
    }

    // Use RUST_LOG env var to control log level, e.g. RUST_LOG=irc_lite=debug
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_filter)),
        )
        .init();

    let server = Server::new(config);
    let handle = server.handle();

    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
            return;
        }
        info!("Ctrl-C received, closing listener");
        handle.close();
    });

    server.run().await?;
    Ok(())
}
