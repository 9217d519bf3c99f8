use clap::Parser;
use nfs_common::wire::{CommandStub, StorageStub};
use std::net::SocketAddr;
use std::path::PathBuf;
use storage::config::Cli;
use storage::registration::{prune_duplicate, register_with_naming};
use storage::{command_router, storage_router};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "storage=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let root = PathBuf::from(&cli.root);
    if let Err(e) = std::fs::create_dir_all(&root) {
        tracing::warn!(error = %e, root = %cli.root, "could not create storage root");
    }

    let storage_listener = tokio::net::TcpListener::bind(SocketAddr::from(([0, 0, 0, 0], cli.storage_port)))
        .await
        .expect("failed to bind storage port");
    let command_listener = tokio::net::TcpListener::bind(SocketAddr::from(([0, 0, 0, 0], cli.command_port)))
        .await
        .expect("failed to bind command port");

    let storage_local_addr = storage_listener.local_addr().unwrap();
    let command_local_addr = command_listener.local_addr().unwrap();

    let advertise_host = cli.advertise_host.clone().unwrap_or_else(|| "127.0.0.1".to_string());
    let storage_advertise: SocketAddr = format!("{advertise_host}:{}", storage_local_addr.port())
        .parse()
        .expect("invalid advertise host");
    let command_advertise: SocketAddr = format!("{advertise_host}:{}", command_local_addr.port())
        .parse()
        .expect("invalid advertise host");

    let storage_stub = StorageStub::new(storage_advertise);
    let command_stub = CommandStub::new(command_advertise);

    let naming_registration_addr: SocketAddr = cli
        .naming_registration_addr
        .parse()
        .expect("invalid naming registration address");

    match register_with_naming(naming_registration_addr, storage_stub, command_stub, &root).await {
        Ok(duplicates) => {
            tracing::info!(count = duplicates.len(), "registered with naming server");
            for dup in duplicates {
                if let Err(e) = prune_duplicate(&root, &dup).await {
                    tracing::warn!(path = %dup, error = %e, "failed to prune duplicate file");
                }
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "registration with naming server failed");
        }
    }

    let storage_app = storage_router(root.clone()).layer(TraceLayer::new_for_http());
    let command_app = command_router(root).layer(TraceLayer::new_for_http());

    tracing::info!(storage = %storage_advertise, command = %command_advertise, "storage server listening");

    let storage_task = tokio::spawn(async move {
        axum::serve(storage_listener, storage_app).await.unwrap();
    });
    let command_task = tokio::spawn(async move {
        axum::serve(command_listener, command_app).await.unwrap();
    });

    let _ = tokio::join!(storage_task, command_task);
}
