//! Outbound RPC client for the naming server's Service interface
//! (`lock`/`unlock`/`isDirectory`/`list`/`createFile`/`createDirectory`/
//! `delete`/`getStorage`). Every FUSE operation that touches metadata goes
//! through here before any byte ever moves.

use nfs_common::wire::{
    BoolResponse, GetStorageResponse, IsDirectoryResponse, ListResponse, LockRequest, PathRequest,
    StorageStub, UnlockRequest,
};
use nfs_common::AppError;

#[derive(Clone)]
pub struct NamingClient {
    http: reqwest::Client,
    base_url: String,
}

impl NamingClient {
    pub fn new(addr: &str) -> Self {
        Self { http: reqwest::Client::new(), base_url: format!("http://{addr}") }
    }

    pub async fn lock(&self, path: &str, exclusive: bool) -> Result<(), AppError> {
        let resp = self
            .http
            .post(format!("{}/lock", self.base_url))
            .json(&LockRequest { path: path.to_string(), exclusive })
            .send()
            .await
            .map_err(|e| AppError::transport_failure(e.to_string()))?;
        decode_unit(resp).await
    }

    pub async fn unlock(&self, path: &str, exclusive: bool) -> Result<(), AppError> {
        let resp = self
            .http
            .post(format!("{}/unlock", self.base_url))
            .json(&UnlockRequest { path: path.to_string(), exclusive })
            .send()
            .await
            .map_err(|e| AppError::transport_failure(e.to_string()))?;
        decode_unit(resp).await
    }

    pub async fn is_directory(&self, path: &str) -> Result<bool, AppError> {
        let resp = self
            .http
            .get(format!("{}/isDirectory", self.base_url))
            .query(&[("path", path)])
            .send()
            .await
            .map_err(|e| AppError::transport_failure(e.to_string()))?;
        decode::<IsDirectoryResponse>(resp).await.map(|r| r.is_directory)
    }

    pub async fn list(&self, path: &str) -> Result<Vec<String>, AppError> {
        let resp = self
            .http
            .get(format!("{}/list", self.base_url))
            .query(&[("path", path)])
            .send()
            .await
            .map_err(|e| AppError::transport_failure(e.to_string()))?;
        decode::<ListResponse>(resp).await.map(|r| r.entries)
    }

    pub async fn create_file(&self, path: &str) -> Result<bool, AppError> {
        let resp = self
            .http
            .post(format!("{}/createFile", self.base_url))
            .json(&PathRequest { path: path.to_string() })
            .send()
            .await
            .map_err(|e| AppError::transport_failure(e.to_string()))?;
        decode::<BoolResponse>(resp).await.map(|r| r.value)
    }

    pub async fn create_directory(&self, path: &str) -> Result<bool, AppError> {
        let resp = self
            .http
            .post(format!("{}/createDirectory", self.base_url))
            .json(&PathRequest { path: path.to_string() })
            .send()
            .await
            .map_err(|e| AppError::transport_failure(e.to_string()))?;
        decode::<BoolResponse>(resp).await.map(|r| r.value)
    }

    pub async fn delete(&self, path: &str) -> Result<bool, AppError> {
        let resp = self
            .http
            .post(format!("{}/delete", self.base_url))
            .json(&PathRequest { path: path.to_string() })
            .send()
            .await
            .map_err(|e| AppError::transport_failure(e.to_string()))?;
        decode::<BoolResponse>(resp).await.map(|r| r.value)
    }

    pub async fn get_storage(&self, path: &str) -> Result<StorageStub, AppError> {
        let resp = self
            .http
            .get(format!("{}/getStorage", self.base_url))
            .query(&[("path", path)])
            .send()
            .await
            .map_err(|e| AppError::transport_failure(e.to_string()))?;
        decode::<GetStorageResponse>(resp).await.map(|r| r.storage)
    }
}

async fn decode<T: serde::de::DeserializeOwned>(resp: reqwest::Response) -> Result<T, AppError> {
    if resp.status().is_success() {
        resp.json::<T>().await.map_err(|e| AppError::transport_failure(e.to_string()))
    } else {
        Err(decode_error(resp).await)
    }
}

async fn decode_unit(resp: reqwest::Response) -> Result<(), AppError> {
    if resp.status().is_success() {
        Ok(())
    } else {
        Err(decode_error(resp).await)
    }
}

async fn decode_error(resp: reqwest::Response) -> AppError {
    let status = resp.status();
    resp.json::<AppError>()
        .await
        .unwrap_or_else(|_| AppError::transport_failure(format!("naming RPC failed with status {status}")))
}
