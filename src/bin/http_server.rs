//! File server binary.
//!
//! ```text
//! http_server <port> [--config FILE] [--bind IP] [--max-clients N] [--root DIR]
//! ```

use std::path::PathBuf;

use clap::Parser;

use bare_http::cli::CommonArgs;
use bare_http::config::DEFAULT_MAX_CLIENTS;
use bare_http::files::{FileServer, ResourceStore};
use bare_http::http::HttpServer;
use bare_http::lifecycle::{
    bind, finalize_config, init_observability, spawn_signal_handler, Shutdown, StartupError,
};

#[derive(Parser)]
#[command(name = "http_server")]
#[command(about = "Serves and stores files of allow-listed types", long_about = None)]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,

    /// Directory files are served from and uploaded to
    #[arg(short, long, value_name = "DIR")]
    root: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = cli.common.load()?;
    if let Some(root) = cli.root {
        config.files.root = root;
    }
    config.listener.max_clients.get_or_insert(DEFAULT_MAX_CLIENTS);
    let config = finalize_config(config)?;
    init_observability(&config)?;

    tracing::info!(
        bind_address = %config.listener.bind_address,
        max_clients = ?config.listener.max_clients,
        root = %config.files.root.display(),
        "http_server v{} starting",
        env!("CARGO_PKG_VERSION")
    );

    let store = ResourceStore::new(&config.files).map_err(StartupError::FileRoot)?;
    let listener = bind(&config).await?;
    let shutdown = Shutdown::new();
    let stop = shutdown.subscribe();
    spawn_signal_handler(shutdown);

    let server = HttpServer::new(FileServer::new(store), config);
    server.run(listener, stop).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
