mod config;
mod fs;
mod naming_client;
mod storage_client;

use clap::Parser;
use config::{Cli, Config};
use fs::{FsWrapper, RemoteFS};
use fuser::MountOption;
use std::sync::{Arc, Mutex};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "client=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = Config::load(&cli);
    let mountpoint = cli.mountpoint.clone();

    let filesystem = FsWrapper(Arc::new(Mutex::new(RemoteFS::new(config))));

    let options = vec![MountOption::AutoUnmount, MountOption::FSName("remoteFS".to_string())];
    tracing::info!(%mountpoint, "mounting filesystem");
    if let Err(e) = fuser::mount2(filesystem, &mountpoint, &options) {
        tracing::error!(error = %e, "failed to mount filesystem");
    }
}
