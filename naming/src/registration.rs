//! The Registration Facade: the single operation (`register`) storage
//! servers call on startup to announce themselves and the files they
//! already hold on disk.

use crate::index::Store;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use nfs_common::wire::{RegisterRequest, RegisterResponse};
use nfs_common::{AppError, AppResult, Path};
use std::sync::Arc;

pub struct Registration {
    store: Arc<Store>,
}

impl Registration {
    pub fn new(store: Arc<Store>) -> Self {
        Registration { store }
    }

    pub fn register(&self, req: RegisterRequest) -> AppResult<Vec<String>> {
        let paths: Vec<Path> = req
            .paths
            .iter()
            .map(|s| Path::new(s))
            .collect::<Result<_, _>>()?;

        let duplicates = self.store.register(req.storage_stub, req.command_stub, &paths)?;
        Ok(duplicates.into_iter().map(|p| p.to_canonical_string()).collect())
    }
}

pub fn router(registration: Arc<Registration>) -> Router {
    Router::new().route("/register", post(register_handler)).with_state(registration)
}

async fn register_handler(
    State(registration): State<Arc<Registration>>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<RegisterResponse>, AppError> {
    let duplicates = registration.register(req)?;
    Ok(Json(RegisterResponse { duplicates }))
}
