//! HTTP handlers for the two interfaces a storage server exposes: Storage
//! (client data reads/writes, `size`/`read`/`write`) and Command (naming
//! server mutations, `create`/`delete`/`copy`).

use axum::extract::{Query, State};
use axum::Json;
use nfs_common::wire::{
    BoolResponse, CommandCopyRequest, CommandCreateRequest, CommandDeleteRequest, ReadQuery, SizeResponse,
    WriteQuery,
};
use nfs_common::AppError;
use std::path::{Path as FsPath, PathBuf};
use std::sync::Arc;

/// Largest chunk copied in one request/response round trip. The original
/// implementation this was ported from computed `bytesLeft % i32::MAX`
/// here, which is wrong for any remainder-aligned file size; copying
/// `min(bytesLeft, MAX_COPY_CHUNK)` at a time is what's actually correct.
const MAX_COPY_CHUNK: i64 = 4 * 1024 * 1024;

#[derive(Clone)]
pub struct StorageState {
    pub root: PathBuf,
    pub http: reqwest::Client,
}

fn local_path(root: &FsPath, logical: &str) -> Result<PathBuf, AppError> {
    let rel = logical.trim_start_matches('/');
    if rel.split('/').any(|c| c == "..") {
        return Err(AppError::bad_arg(format!("path escapes root: {logical}")));
    }
    Ok(root.join(rel))
}

// ---- Storage interface -------------------------------------------------------

#[derive(serde::Deserialize)]
pub struct SizeQuery {
    pub path: String,
}

pub async fn size(
    State(state): State<Arc<StorageState>>,
    Query(q): Query<SizeQuery>,
) -> Result<Json<SizeResponse>, AppError> {
    let path = local_path(&state.root, &q.path)?;
    let meta = tokio::fs::metadata(&path)
        .await
        .map_err(|_| AppError::not_found(format!("no such file: {}", q.path)))?;
    if !meta.is_file() {
        return Err(AppError::not_found(format!("no such file: {}", q.path)));
    }
    Ok(Json(SizeResponse { size: meta.len() as i64 }))
}

pub async fn read(
    State(state): State<Arc<StorageState>>,
    Query(q): Query<ReadQuery>,
) -> Result<Vec<u8>, AppError> {
    use tokio::io::{AsyncReadExt, AsyncSeekExt};

    let path = local_path(&state.root, &q.path)?;
    let mut file = tokio::fs::File::open(&path)
        .await
        .map_err(|_| AppError::not_found(format!("no such file: {}", q.path)))?;
    let size = file
        .metadata()
        .await
        .map_err(|e| AppError::internal(e.to_string()))?
        .len() as i64;

    if q.offset < 0 || q.length < 0 || q.offset > size || q.offset + q.length > size {
        return Err(AppError::out_of_range(format!(
            "read [{}, {}+{}) out of range for size {size}",
            q.offset, q.offset, q.length
        )));
    }

    file.seek(std::io::SeekFrom::Start(q.offset as u64))
        .await
        .map_err(|e| AppError::internal(e.to_string()))?;
    let mut buf = vec![0u8; q.length as usize];
    file.read_exact(&mut buf).await.map_err(|e| AppError::internal(e.to_string()))?;
    Ok(buf)
}

/// Writes at `offset`; fails `OUT_OF_RANGE` if `offset` is past the current
/// end of file, otherwise extends the file as needed. One of two write
/// behaviors the original carried, settled in favor of this one.
pub async fn write(
    State(state): State<Arc<StorageState>>,
    Query(q): Query<WriteQuery>,
    body: axum::body::Bytes,
) -> Result<(), AppError> {
    use tokio::io::{AsyncSeekExt, AsyncWriteExt};

    let path = local_path(&state.root, &q.path)?;
    let mut file = tokio::fs::OpenOptions::new()
        .write(true)
        .open(&path)
        .await
        .map_err(|_| AppError::not_found(format!("no such file: {}", q.path)))?;
    let size = file
        .metadata()
        .await
        .map_err(|e| AppError::internal(e.to_string()))?
        .len() as i64;

    if q.offset < 0 || q.offset > size {
        return Err(AppError::out_of_range(format!("write offset {} beyond size {size}", q.offset)));
    }

    file.seek(std::io::SeekFrom::Start(q.offset as u64))
        .await
        .map_err(|e| AppError::internal(e.to_string()))?;
    file.write_all(&body).await.map_err(|e| AppError::internal(e.to_string()))?;
    Ok(())
}

// ---- Command interface --------------------------------------------------------

pub async fn command_create(
    State(state): State<Arc<StorageState>>,
    Json(req): Json<CommandCreateRequest>,
) -> Result<Json<BoolResponse>, AppError> {
    let path = local_path(&state.root, &req.path)?;
    if path.exists() {
        return Ok(Json(BoolResponse { value: false }));
    }
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(|e| AppError::internal(e.to_string()))?;
    }
    tokio::fs::File::create(&path).await.map_err(|e| AppError::internal(e.to_string()))?;
    Ok(Json(BoolResponse { value: true }))
}

pub async fn command_delete(
    State(state): State<Arc<StorageState>>,
    Json(req): Json<CommandDeleteRequest>,
) -> Result<Json<BoolResponse>, AppError> {
    let path = local_path(&state.root, &req.path)?;
    let meta = match tokio::fs::metadata(&path).await {
        Ok(m) => m,
        Err(_) => return Ok(Json(BoolResponse { value: false })),
    };
    let result = if meta.is_dir() {
        tokio::fs::remove_dir_all(&path).await
    } else {
        tokio::fs::remove_file(&path).await
    };
    result.map_err(|e| AppError::internal(e.to_string()))?;
    Ok(Json(BoolResponse { value: true }))
}

pub async fn command_copy(
    State(state): State<Arc<StorageState>>,
    Json(req): Json<CommandCopyRequest>,
) -> Result<Json<BoolResponse>, AppError> {
    let dest = local_path(&state.root, &req.path)?;
    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(|e| AppError::internal(e.to_string()))?;
    }

    let base = req.source.base_url();
    let size_resp = state
        .http
        .get(format!("{base}/size"))
        .query(&[("path", &req.path)])
        .send()
        .await
        .map_err(|e| AppError::transport_failure(e.to_string()))?;
    if !size_resp.status().is_success() {
        return Err(AppError::not_found(format!("source has no such file: {}", req.path)));
    }
    let size: SizeResponse = size_resp.json().await.map_err(|e| AppError::transport_failure(e.to_string()))?;

    let mut file = tokio::fs::File::create(&dest).await.map_err(|e| AppError::internal(e.to_string()))?;
    use tokio::io::AsyncWriteExt;

    let mut offset: i64 = 0;
    let mut bytes_left = size.size;
    while bytes_left > 0 {
        let chunk = bytes_left.min(MAX_COPY_CHUNK);
        let read_resp = state
            .http
            .get(format!("{base}/read"))
            .query(&[
                ("path", req.path.as_str()),
                ("offset", &offset.to_string()),
                ("length", &chunk.to_string()),
            ])
            .send()
            .await
            .map_err(|e| AppError::transport_failure(e.to_string()))?;
        if !read_resp.status().is_success() {
            return Err(AppError::transport_failure(format!("source read failed at offset {offset}")));
        }
        let bytes = read_resp.bytes().await.map_err(|e| AppError::transport_failure(e.to_string()))?;
        file.write_all(&bytes).await.map_err(|e| AppError::internal(e.to_string()))?;
        offset += chunk;
        bytes_left -= chunk;
    }
    Ok(Json(BoolResponse { value: true }))
}
