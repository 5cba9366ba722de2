//! Forwarding proxy binary.
//!
//! ```text
//! proxy <port> [--config FILE] [--bind IP] [--max-clients N]
//! ```

use clap::Parser;

use bare_http::cli::CommonArgs;
use bare_http::http::HttpServer;
use bare_http::lifecycle::{bind, finalize_config, init_observability, spawn_signal_handler, Shutdown};
use bare_http::proxy::ForwardProxy;

#[derive(Parser)]
#[command(name = "proxy")]
#[command(about = "Relays GET requests for absolute URLs to their origin", long_about = None)]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = finalize_config(cli.common.load()?)?;
    init_observability(&config)?;

    tracing::info!(
        bind_address = %config.listener.bind_address,
        max_clients = ?config.listener.max_clients,
        upstream_timeout_secs = config.timeouts.upstream_secs,
        "proxy v{} starting",
        env!("CARGO_PKG_VERSION")
    );

    let listener = bind(&config).await?;
    let shutdown = Shutdown::new();
    let stop = shutdown.subscribe();
    spawn_signal_handler(shutdown);

    let server = HttpServer::new(ForwardProxy::new(config.timeouts), config);
    server.run(listener, stop).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
