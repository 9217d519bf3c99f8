pub mod config;
pub mod handlers;
pub mod registration;

use crate::handlers::StorageState;
use axum::routing::{get, post};
use axum::Router;
use std::path::PathBuf;
use std::sync::Arc;

pub fn storage_router(root: PathBuf) -> Router {
    let state = Arc::new(StorageState { root, http: reqwest::Client::new() });
    Router::new()
        .route("/size", get(handlers::size))
        .route("/read", get(handlers::read))
        .route("/write", post(handlers::write))
        .with_state(state)
}

pub fn command_router(root: PathBuf) -> Router {
    let state = Arc::new(StorageState { root, http: reqwest::Client::new() });
    Router::new()
        .route("/command/create", post(handlers::command_create))
        .route("/command/delete", post(handlers::command_delete))
        .route("/command/copy", post(handlers::command_copy))
        .with_state(state)
}
