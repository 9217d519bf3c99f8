//! Outbound RPC client for a storage server's Storage interface
//! (`size`/`read`/`write`), reached via the `StorageStub` a naming lookup
//! hands back. One client instance is reused across every storage server
//! the mount talks to.

use nfs_common::wire::{SizeResponse, StorageStub};
use nfs_common::AppError;

#[derive(Clone)]
pub struct StorageClient {
    http: reqwest::Client,
}

impl StorageClient {
    pub fn new() -> Self {
        Self { http: reqwest::Client::new() }
    }

    pub async fn size(&self, storage: &StorageStub, path: &str) -> Result<i64, AppError> {
        let resp = self
            .http
            .get(format!("{}/size", storage.base_url()))
            .query(&[("path", path)])
            .send()
            .await
            .map_err(|e| AppError::transport_failure(e.to_string()))?;
        if resp.status().is_success() {
            resp.json::<SizeResponse>()
                .await
                .map(|r| r.size)
                .map_err(|e| AppError::transport_failure(e.to_string()))
        } else {
            Err(decode_error(resp).await)
        }
    }

    pub async fn read(
        &self,
        storage: &StorageStub,
        path: &str,
        offset: i64,
        length: i64,
    ) -> Result<Vec<u8>, AppError> {
        let resp = self
            .http
            .get(format!("{}/read", storage.base_url()))
            .query(&[("path", path), ("offset", &offset.to_string()), ("length", &length.to_string())])
            .send()
            .await
            .map_err(|e| AppError::transport_failure(e.to_string()))?;
        if resp.status().is_success() {
            resp.bytes().await.map(|b| b.to_vec()).map_err(|e| AppError::transport_failure(e.to_string()))
        } else {
            Err(decode_error(resp).await)
        }
    }

    pub async fn write(&self, storage: &StorageStub, path: &str, offset: i64, data: Vec<u8>) -> Result<(), AppError> {
        let resp = self
            .http
            .post(format!("{}/write", storage.base_url()))
            .query(&[("path", path), ("offset", &offset.to_string())])
            .body(data)
            .send()
            .await
            .map_err(|e| AppError::transport_failure(e.to_string()))?;
        if resp.status().is_success() {
            Ok(())
        } else {
            Err(decode_error(resp).await)
        }
    }
}

impl Default for StorageClient {
    fn default() -> Self {
        Self::new()
    }
}

async fn decode_error(resp: reqwest::Response) -> AppError {
    let status = resp.status();
    resp.json::<AppError>()
        .await
        .unwrap_or_else(|_| AppError::transport_failure(format!("storage RPC failed with status {status}")))
}
