//! Mount-time configuration: which naming server to register reads/writes
//! through, plus the kernel-facing attribute cache policy. A `config.toml`
//! next to the binary overrides the defaults below; CLI flags (see
//! [`crate::main`]) take final precedence, mirroring the naming and storage
//! crates' own config layering.

use clap::Parser;
use serde::Deserialize;

#[derive(Deserialize, Debug, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum CacheStrategy {
    Ttl,
    Lru,
    None,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Config {
    /// `host:port` of the naming server's Service interface.
    pub naming_addr: String,
    pub cache_strategy: CacheStrategy,
    pub cache_ttl_seconds: u64,
    pub cache_lru_capacity: usize,
    pub kernel_attr_timeout_seconds: u64,
    pub kernel_entry_timeout_seconds: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            naming_addr: "127.0.0.1:8090".to_string(),
            cache_strategy: CacheStrategy::Ttl,
            cache_ttl_seconds: 60,
            cache_lru_capacity: 1000,
            kernel_attr_timeout_seconds: 1,
            kernel_entry_timeout_seconds: 1,
        }
    }
}

/// Command-line overrides for the mount, layered the same way the naming
/// and storage crates layer theirs: hard-coded defaults, then `config.toml`,
/// then these flags.
#[derive(Parser, Debug)]
#[command(name = "client", about = "FUSE client: mounts a naming server's tree")]
pub struct Cli {
    /// Where to mount the filesystem.
    pub mountpoint: String,

    #[arg(long, default_value = "config.toml")]
    pub config: String,

    #[arg(long)]
    pub naming_addr: Option<String>,
}

impl Config {
    pub fn load(cli: &Cli) -> Self {
        let mut config = load_config(&cli.config);
        if let Some(addr) = &cli.naming_addr {
            config.naming_addr = addr.clone();
        }
        config
    }
}

fn load_config(path: &str) -> Config {
    let path = std::path::Path::new(path);
    if !path.exists() {
        return Config::default();
    }

    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!(error = %e, path = %path.display(), "failed to read config, using defaults");
            return Config::default();
        }
    };

    match toml::from_str(&content) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!(error = %e, path = %path.display(), "failed to parse config, using defaults");
            Config::default()
        }
    }
}