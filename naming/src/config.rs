//! Startup configuration: well-known ports plus overrides. Defaults live in
//! `NamingConfig::default`; a `config.toml` next to the binary overrides
//! them, and CLI flags take final precedence, mirroring how the client
//! crate layers its own `config.toml` under hard-coded defaults.

use clap::Parser;
use serde::Deserialize;
use std::net::Ipv4Addr;

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct NamingConfig {
    pub bind_addr: Ipv4Addr,
    pub service_port: u16,
    pub registration_port: u16,
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            bind_addr: Ipv4Addr::UNSPECIFIED,
            service_port: 8090,
            registration_port: 8091,
        }
    }
}

/// Command-line overrides for the naming server's well-known ports.
#[derive(Parser, Debug)]
#[command(name = "naming", about = "Naming server: directory tree, locking, replication")]
pub struct Cli {
    #[arg(long, default_value = "config.toml")]
    pub config: String,

    #[arg(long)]
    pub service_port: Option<u16>,

    #[arg(long)]
    pub registration_port: Option<u16>,
}

impl NamingConfig {
    pub fn load(cli: &Cli) -> Self {
        let mut config = std::path::Path::new(&cli.config)
            .exists()
            .then(|| std::fs::read_to_string(&cli.config).ok())
            .flatten()
            .and_then(|content| match toml::from_str(&content) {
                Ok(parsed) => Some(parsed),
                Err(e) => {
                    tracing::warn!(error = %e, path = %cli.config, "failed to parse config file, using defaults");
                    None
                }
            })
            .unwrap_or_default();

        if let Some(port) = cli.service_port {
            config.service_port = port;
        }
        if let Some(port) = cli.registration_port {
            config.registration_port = port;
        }
        config
    }
}
