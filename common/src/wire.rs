//! Request/reply bodies exchanged between the three processes (client,
//! naming server, storage server). These are plain serde DTOs; the actual
//! framing is JSON over HTTP, dispatched by axum routers on the receiving
//! side and issued with `reqwest` on the calling side.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;

/// A handle to a storage server's data endpoint (`size`/`read`/`write`).
/// Keyed by value: two stubs with the same address are the same server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StorageStub {
    pub addr: SocketAddr,
}

impl StorageStub {
    pub fn new(addr: SocketAddr) -> Self {
        Self { addr }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

impl fmt::Display for StorageStub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "storage://{}", self.addr)
    }
}

/// A handle to a storage server's command endpoint (`create`/`delete`/`copy`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CommandStub {
    pub addr: SocketAddr,
}

impl CommandStub {
    pub fn new(addr: SocketAddr) -> Self {
        Self { addr }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

impl fmt::Display for CommandStub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "command://{}", self.addr)
    }
}

// ---- Client -> Naming (Service) -------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
pub struct LockRequest {
    pub path: String,
    pub exclusive: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UnlockRequest {
    pub path: String,
    pub exclusive: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PathRequest {
    pub path: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct IsDirectoryResponse {
    pub is_directory: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ListResponse {
    pub entries: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BoolResponse {
    pub value: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GetStorageResponse {
    pub storage: StorageStub,
}

// ---- Storage -> Naming (Registration) -------------------------------------

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub storage_stub: StorageStub,
    pub command_stub: CommandStub,
    pub paths: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub duplicates: Vec<String>,
}

// ---- Naming -> Storage (Command) ------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
pub struct CommandCreateRequest {
    pub path: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CommandDeleteRequest {
    pub path: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CommandCopyRequest {
    pub path: String,
    pub source: StorageStub,
}

// ---- Client -> Storage (Storage) ------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
pub struct SizeResponse {
    pub size: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReadQuery {
    pub path: String,
    pub offset: i64,
    pub length: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WriteQuery {
    pub path: String,
    pub offset: i64,
}
