use clap::Parser;
use naming::config::{Cli, NamingConfig};
use naming::{registration, service, Registration, Service, Store};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "naming=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = NamingConfig::load(&cli);

    let store = Arc::new(Store::new());
    let service = Arc::new(Service::new(store.clone()));
    let registration = Arc::new(Registration::new(store.clone()));

    let service_addr = SocketAddr::from((config.bind_addr, config.service_port));
    let registration_addr = SocketAddr::from((config.bind_addr, config.registration_port));

    let service_app = service::router(service).layer(TraceLayer::new_for_http());
    let registration_app = registration::router(registration).layer(TraceLayer::new_for_http());

    let service_listener = tokio::net::TcpListener::bind(service_addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind service port {service_addr}: {e}"));
    let registration_listener = tokio::net::TcpListener::bind(registration_addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind registration port {registration_addr}: {e}"));

    tracing::info!(%service_addr, %registration_addr, "naming server listening");

    let service_store = store.clone();
    let service_task = tokio::spawn(async move {
        axum::serve(service_listener, service_app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .unwrap();
        drop(service_store);
    });

    let registration_task = tokio::spawn(async move {
        axum::serve(registration_listener, registration_app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .unwrap();
    });

    let _ = tokio::join!(service_task, registration_task);

    tracing::info!("listeners drained, interrupting outstanding locks");
    for lock in store.all_locks() {
        lock.interrupt().await;
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
