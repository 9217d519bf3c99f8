//! The Service Facade: the client-facing operations (`lock`, `unlock`,
//! `isDirectory`, `list`, `createFile`, `createDirectory`, `delete`,
//! `getStorage`), each wired to an axum handler. The hierarchical locking
//! algorithm from the ancestor-chain walk lives in [`Service::lock`] and
//! [`Service::unlock`]; everything else assumes the caller already holds
//! whatever locks its contract implies.

use crate::command_client::CommandClient;
use crate::index::Store;
use crate::replication::ReplicationDriver;
use axum::extract::{Query, State};
use axum::routing::post;
use axum::{Json, Router};
use nfs_common::wire::{
    BoolResponse, GetStorageResponse, IsDirectoryResponse, ListResponse, LockRequest, PathRequest, UnlockRequest,
};
use nfs_common::{AppError, AppResult, Path};
use rand::seq::{IteratorRandom, SliceRandom};
use serde::Deserialize;
use std::sync::Arc;

const HOT_READ_THRESHOLD: u64 = 20;

pub struct Service {
    store: Arc<Store>,
    replication: ReplicationDriver,
    command: CommandClient,
}

impl Service {
    pub fn new(store: Arc<Store>) -> Self {
        let replication = ReplicationDriver::new(store.clone());
        Service { store, replication, command: CommandClient::new() }
    }

    /// Walks `path`'s subpath chain, locking every ancestor for read and
    /// the target itself for read or write depending on `exclusive`. On any
    /// failure partway through the chain, releases everything already
    /// acquired before returning the error.
    pub async fn lock(&self, path: &Path, exclusive: bool) -> AppResult<()> {
        if !self.store.exists(path) {
            return Err(AppError::not_found(format!("no such path: {path}")));
        }

        let chain = path.subpaths();
        let mut acquired: Vec<(Path, bool)> = Vec::with_capacity(chain.len());

        for (i, node) in chain.iter().enumerate() {
            let is_last = i + 1 == chain.len();
            let write = is_last && exclusive;
            let lock = self.store.lock_for(node);
            let result = if write { lock.acquire_write().await } else { lock.acquire_read().await };
            match result {
                Ok(()) => acquired.push((node.clone(), write)),
                Err(err) => {
                    self.unwind(&acquired).await;
                    return Err(err);
                }
            }
        }

        if !exclusive {
            self.maybe_replicate(path).await;
        } else if !path.is_root() {
            if let Err(err) = self.invalidate_others(path).await {
                self.unwind(&acquired).await;
                return Err(err);
            }
        }

        Ok(())
    }

    async fn unwind(&self, acquired: &[(Path, bool)]) {
        for (node, write) in acquired.iter().rev() {
            let lock = self.store.lock_for(node);
            if *write {
                lock.release_write().await;
            } else {
                lock.release_read().await;
            }
        }
    }

    async fn maybe_replicate(&self, path: &Path) {
        if !self.store.is_directory(path).unwrap_or(true) {
            let lock = self.store.lock_for(path);
            if lock.reads_granted_ever().await >= HOT_READ_THRESHOLD {
                let replicas = self.store.replica_set(path);
                if let Some(target) = self.store.pick_registered_not_in(&replicas) {
                    if let Some(command) = self.store.command_stub_for(&target) {
                        self.replication.enqueue(path.clone(), target, command);
                    }
                }
            }
        }
    }

    /// The invalidation pass: shrinks a file's replica set to one, deleting
    /// the others synchronously on their storage servers.
    async fn invalidate_others(&self, path: &Path) -> AppResult<()> {
        if self.store.is_directory(path).unwrap_or(true) {
            return Ok(());
        }
        let replicas = self.store.replica_set(path);
        if replicas.len() <= 1 {
            return Ok(());
        }
        let mut iter = replicas.into_iter();
        let keep = iter.next().expect("checked len > 1 above");
        for stale in iter {
            let Some(command) = self.store.command_stub_for(&stale) else { continue };
            self.command
                .delete(command, path)
                .await
                .map_err(|e| AppError::internal(format!("invalidation delete failed for {path}: {e}")))?;
            self.store.remove_replica(path, stale);
        }
        let _ = keep;
        Ok(())
    }

    pub async fn unlock(&self, path: &Path, exclusive: bool) -> AppResult<()> {
        if !self.store.exists(path) {
            return Err(AppError::bad_arg(format!("no such path: {path}")));
        }
        let chain = path.subpaths();
        for (i, node) in chain.iter().enumerate() {
            let is_last = i + 1 == chain.len();
            let write = is_last && exclusive;
            let lock = self.store.lock_for(node);
            if write {
                lock.release_write().await;
            } else {
                lock.release_read().await;
            }
        }
        Ok(())
    }

    pub fn is_directory(&self, path: &Path) -> AppResult<bool> {
        self.store.is_directory(path)
    }

    pub fn list(&self, path: &Path) -> AppResult<Vec<String>> {
        self.store.list_dir(path)
    }

    pub async fn create_file(&self, path: &Path) -> AppResult<bool> {
        if path.is_root() {
            return Err(AppError::not_found("root has no parent"));
        }
        let parent = path.parent()?;
        if !self.store.is_directory(&parent)? {
            return Err(AppError::not_found(format!("parent is not a directory: {parent}")));
        }
        if self.store.exists(path) {
            return Ok(false);
        }
        let stubs = self.store.all_storage_stubs();
        let target = stubs
            .choose(&mut rand::thread_rng())
            .copied()
            .ok_or_else(|| AppError::illegal_state("no storage server is registered"))?;
        let command = self
            .store
            .command_stub_for(&target)
            .ok_or_else(|| AppError::illegal_state("storage server missing command stub"))?;

        let ok = self.command.create(command, path).await?;
        if ok {
            self.store.create_file(path)?;
            self.store.add_replica(path, target);
        }
        Ok(ok)
    }

    pub fn create_directory(&self, path: &Path) -> AppResult<bool> {
        self.store.create_directory(path)
    }

    pub async fn delete(&self, path: &Path) -> AppResult<bool> {
        if path.is_root() {
            return Ok(false);
        }
        if !self.store.exists(path) {
            return Err(AppError::not_found(format!("no such path: {path}")));
        }
        self.store.delete_subtree(path)?;
        let mut any = false;
        for command in self.store.all_command_stubs() {
            match self.command.delete(command, path).await {
                Ok(result) => any = any || result,
                Err(err) => {
                    tracing::warn!(%path, %command, error = %err, "delete RPC failed during cleanup");
                }
            }
        }
        Ok(any)
    }

    pub fn get_storage(&self, path: &Path) -> AppResult<nfs_common::wire::StorageStub> {
        let replicas = self.store.replica_set(path);
        if !self.store.exists(path) {
            return Err(AppError::not_found(format!("no such path: {path}")));
        }
        replicas
            .into_iter()
            .choose(&mut rand::thread_rng())
            .ok_or_else(|| AppError::not_found(format!("no replica registered for {path}")))
    }
}

// ---- axum wiring -----------------------------------------------------------

#[derive(Deserialize)]
pub struct PathQuery {
    path: String,
}

pub fn router(service: Arc<Service>) -> Router {
    Router::new()
        .route("/lock", post(lock_handler))
        .route("/unlock", post(unlock_handler))
        .route("/isDirectory", axum::routing::get(is_directory_handler))
        .route("/list", axum::routing::get(list_handler))
        .route("/createFile", post(create_file_handler))
        .route("/createDirectory", post(create_directory_handler))
        .route("/delete", post(delete_handler))
        .route("/getStorage", axum::routing::get(get_storage_handler))
        .with_state(service)
}

async fn lock_handler(
    State(service): State<Arc<Service>>,
    Json(req): Json<LockRequest>,
) -> Result<(), AppError> {
    let path = Path::new(&req.path)?;
    service.lock(&path, req.exclusive).await
}

async fn unlock_handler(
    State(service): State<Arc<Service>>,
    Json(req): Json<UnlockRequest>,
) -> Result<(), AppError> {
    let path = Path::new(&req.path)?;
    service.unlock(&path, req.exclusive).await
}

async fn is_directory_handler(
    State(service): State<Arc<Service>>,
    Query(q): Query<PathQuery>,
) -> Result<Json<IsDirectoryResponse>, AppError> {
    let path = Path::new(&q.path)?;
    let is_directory = service.is_directory(&path)?;
    Ok(Json(IsDirectoryResponse { is_directory }))
}

async fn list_handler(
    State(service): State<Arc<Service>>,
    Query(q): Query<PathQuery>,
) -> Result<Json<ListResponse>, AppError> {
    let path = Path::new(&q.path)?;
    let entries = service.list(&path)?;
    Ok(Json(ListResponse { entries }))
}

async fn create_file_handler(
    State(service): State<Arc<Service>>,
    Json(req): Json<PathRequest>,
) -> Result<Json<BoolResponse>, AppError> {
    let path = Path::new(&req.path)?;
    let value = service.create_file(&path).await?;
    Ok(Json(BoolResponse { value }))
}

async fn create_directory_handler(
    State(service): State<Arc<Service>>,
    Json(req): Json<PathRequest>,
) -> Result<Json<BoolResponse>, AppError> {
    let path = Path::new(&req.path)?;
    let value = service.create_directory(&path)?;
    Ok(Json(BoolResponse { value }))
}

async fn delete_handler(
    State(service): State<Arc<Service>>,
    Json(req): Json<PathRequest>,
) -> Result<Json<BoolResponse>, AppError> {
    let path = Path::new(&req.path)?;
    let value = service.delete(&path).await?;
    Ok(Json(BoolResponse { value }))
}

async fn get_storage_handler(
    State(service): State<Arc<Service>>,
    Query(q): Query<PathQuery>,
) -> Result<Json<GetStorageResponse>, AppError> {
    let path = Path::new(&q.path)?;
    let storage = service.get_storage(&path)?;
    Ok(Json(GetStorageResponse { storage }))
}
