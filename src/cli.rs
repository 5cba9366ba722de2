//! Command-line arguments shared by both binaries.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use clap::Args;

use crate::config::{load_config, ConfigError, ServiceConfig};

/// Arguments common to `proxy` and `http_server`.
#[derive(Debug, Clone, Args)]
pub struct CommonArgs {
    /// Port to listen on
    pub port: u16,

    /// TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Address to bind instead of the configured one
    #[arg(short, long, value_name = "IP")]
    pub bind: Option<IpAddr>,

    /// Maximum connections handled at once
    #[arg(long, value_name = "N")]
    pub max_clients: Option<usize>,
}

impl CommonArgs {
    /// Load the config file (or defaults) and apply the overrides.
    ///
    /// The result is not validated yet; callers may still adjust it.
    pub fn load(&self) -> Result<ServiceConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => ServiceConfig::default(),
        };
        self.apply(&mut config);
        Ok(config)
    }

    pub fn apply(&self, config: &mut ServiceConfig) {
        let ip = self.bind.unwrap_or_else(|| {
            config
                .listener
                .bind_address
                .parse::<SocketAddr>()
                .map(|addr| addr.ip())
                .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
        });
        config.listener.bind_address = SocketAddr::new(ip, self.port).to_string();

        if let Some(n) = self.max_clients {
            config.listener.max_clients = Some(n);
        }
    }
}
