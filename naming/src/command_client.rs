//! Outbound RPC client for the Command interface a storage server exposes
//! to the naming server (`create`, `delete`, `copy`). A thin `reqwest`
//! wrapper, mirroring the request/reply shapes in `nfs_common::wire`.

use nfs_common::wire::{CommandCopyRequest, CommandCreateRequest, CommandDeleteRequest, CommandStub, StorageStub};
use nfs_common::{AppError, Path};

#[derive(Clone)]
pub struct CommandClient {
    http: reqwest::Client,
}

impl CommandClient {
    pub fn new() -> Self {
        Self { http: reqwest::Client::new() }
    }

    pub async fn create(&self, command: CommandStub, path: &Path) -> Result<bool, AppError> {
        let url = format!("{}/command/create", command.base_url());
        let resp = self
            .http
            .post(url)
            .json(&CommandCreateRequest { path: path.to_canonical_string() })
            .send()
            .await
            .map_err(|e| AppError::transport_failure(e.to_string()))?;
        decode_bool(resp).await
    }

    pub async fn delete(&self, command: CommandStub, path: &Path) -> Result<bool, AppError> {
        let url = format!("{}/command/delete", command.base_url());
        let resp = self
            .http
            .post(url)
            .json(&CommandDeleteRequest { path: path.to_canonical_string() })
            .send()
            .await
            .map_err(|e| AppError::transport_failure(e.to_string()))?;
        decode_bool(resp).await
    }

    pub async fn copy(&self, command: CommandStub, path: &Path, source: StorageStub) -> Result<bool, AppError> {
        let url = format!("{}/command/copy", command.base_url());
        let resp = self
            .http
            .post(url)
            .json(&CommandCopyRequest { path: path.to_canonical_string(), source })
            .send()
            .await
            .map_err(|e| AppError::transport_failure(e.to_string()))?;
        decode_bool(resp).await
    }
}

impl Default for CommandClient {
    fn default() -> Self {
        Self::new()
    }
}

async fn decode_bool(resp: reqwest::Response) -> Result<bool, AppError> {
    if resp.status().is_success() {
        resp.json::<nfs_common::wire::BoolResponse>()
            .await
            .map(|b| b.value)
            .map_err(|e| AppError::transport_failure(e.to_string()))
    } else {
        let status = resp.status();
        let body: Result<AppError, _> = resp.json().await;
        match body {
            Ok(err) => Err(err),
            Err(_) => Err(AppError::transport_failure(format!("command RPC failed with status {status}"))),
        }
    }
}
