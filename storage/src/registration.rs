//! Startup registration against the naming server: scan the local root for
//! files already on disk, announce them, and delete whatever comes back as
//! a duplicate (the naming server already has an owner for those).

use nfs_common::wire::{CommandStub, RegisterRequest, RegisterResponse, StorageStub};
use nfs_common::{AppError, Path};
use std::net::SocketAddr;
use std::path::PathBuf;

pub async fn register_with_naming(
    registration_addr: SocketAddr,
    storage_stub: StorageStub,
    command_stub: CommandStub,
    root: &PathBuf,
) -> Result<Vec<String>, AppError> {
    let paths = Path::list(root)?;
    let paths: Vec<String> = paths.iter().map(|p| p.to_canonical_string()).collect();

    let client = reqwest::Client::new();
    let resp = client
        .post(format!("http://{registration_addr}/register"))
        .json(&RegisterRequest { storage_stub, command_stub, paths })
        .send()
        .await
        .map_err(|e| AppError::transport_failure(e.to_string()))?;

    if !resp.status().is_success() {
        let err: AppError = resp
            .json()
            .await
            .unwrap_or_else(|_| AppError::transport_failure("registration failed"));
        return Err(err);
    }

    let body: RegisterResponse = resp.json().await.map_err(|e| AppError::transport_failure(e.to_string()))?;
    Ok(body.duplicates)
}

/// Deletes a duplicate file the naming server already has an owner for,
/// then prunes any ancestor directory left empty by its removal.
pub async fn prune_duplicate(root: &PathBuf, logical_path: &str) -> std::io::Result<()> {
    let rel = logical_path.trim_start_matches('/');
    let full = root.join(rel);
    if full.exists() {
        tokio::fs::remove_file(&full).await?;
    }
    let mut dir = full.parent().map(|p| p.to_path_buf());
    while let Some(d) = dir {
        if d == *root {
            break;
        }
        match tokio::fs::read_dir(&d).await {
            Ok(mut entries) => {
                if entries.next_entry().await?.is_some() {
                    break;
                }
            }
            Err(_) => break,
        }
        tokio::fs::remove_dir(&d).await?;
        dir = d.parent().map(|p| p.to_path_buf());
    }
    Ok(())
}
