//! Integration tests against a storage server spun up in-process on an
//! ephemeral port, exercising the Storage and Command interfaces end to end.

use nfs_common::wire::{CommandCopyRequest, CommandCreateRequest, CommandDeleteRequest, StorageStub};
use reqwest::StatusCode;
use std::net::SocketAddr;
use std::path::PathBuf;
use storage::{command_router, storage_router};

struct Harness {
    storage_base: String,
    command_base: String,
    _root: PathBuf,
}

async fn spawn(root: PathBuf) -> Harness {
    std::fs::create_dir_all(&root).unwrap();

    let storage_listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let storage_addr = storage_listener.local_addr().unwrap();
    let storage_app = storage_router(root.clone());
    tokio::spawn(async move { axum::serve(storage_listener, storage_app).await.unwrap() });

    let command_listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let command_addr = command_listener.local_addr().unwrap();
    let command_app = command_router(root.clone());
    tokio::spawn(async move { axum::serve(command_listener, command_app).await.unwrap() });

    Harness {
        storage_base: format!("http://{storage_addr}"),
        command_base: format!("http://{command_addr}"),
        _root: root,
    }
}

fn tmp_root(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("nfs-storage-test-{name}-{}", std::process::id()))
}

#[tokio::test]
async fn create_then_write_then_read_round_trips() {
    let root = tmp_root("rw");
    let _ = std::fs::remove_dir_all(&root);
    let h = spawn(root).await;
    let client = reqwest::Client::new();

    let created = client
        .post(format!("{}/command/create", h.command_base))
        .json(&CommandCreateRequest { path: "/a.txt".into() })
        .send()
        .await
        .unwrap();
    assert_eq!(created.status(), StatusCode::OK);

    let write_resp = client
        .post(format!("{}/write?path=/a.txt&offset=0", h.storage_base))
        .body("hello world")
        .send()
        .await
        .unwrap();
    assert_eq!(write_resp.status(), StatusCode::OK);

    let size_resp = client
        .get(format!("{}/size?path=/a.txt", h.storage_base))
        .send()
        .await
        .unwrap();
    assert_eq!(size_resp.status(), StatusCode::OK);

    let read_resp = client
        .get(format!("{}/read?path=/a.txt&offset=0&length=11", h.storage_base))
        .send()
        .await
        .unwrap();
    assert_eq!(read_resp.status(), StatusCode::OK);
    assert_eq!(read_resp.bytes().await.unwrap().as_ref(), b"hello world");
}

#[tokio::test]
async fn write_past_end_fails_out_of_range() {
    let root = tmp_root("oob");
    let _ = std::fs::remove_dir_all(&root);
    let h = spawn(root).await;
    let client = reqwest::Client::new();

    client
        .post(format!("{}/command/create", h.command_base))
        .json(&CommandCreateRequest { path: "/b.txt".into() })
        .send()
        .await
        .unwrap();

    let resp = client
        .post(format!("{}/write?path=/b.txt&offset=10", h.storage_base))
        .body("x")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::RANGE_NOT_SATISFIABLE);
}

#[tokio::test]
async fn read_nonexistent_file_is_not_found() {
    let root = tmp_root("missing");
    let _ = std::fs::remove_dir_all(&root);
    let h = spawn(root).await;
    let client = reqwest::Client::new();

    let resp = client
        .get(format!("{}/size?path=/nope.txt", h.storage_base))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_removes_file_and_is_idempotent_false() {
    let root = tmp_root("delete");
    let _ = std::fs::remove_dir_all(&root);
    let h = spawn(root).await;
    let client = reqwest::Client::new();

    client
        .post(format!("{}/command/create", h.command_base))
        .json(&CommandCreateRequest { path: "/c.txt".into() })
        .send()
        .await
        .unwrap();

    let resp = client
        .post(format!("{}/command/delete", h.command_base))
        .json(&CommandDeleteRequest { path: "/c.txt".into() })
        .send()
        .await
        .unwrap();
    let body: nfs_common::wire::BoolResponse = resp.json().await.unwrap();
    assert!(body.value);

    let resp2 = client
        .post(format!("{}/command/delete", h.command_base))
        .json(&CommandDeleteRequest { path: "/c.txt".into() })
        .send()
        .await
        .unwrap();
    let body2: nfs_common::wire::BoolResponse = resp2.json().await.unwrap();
    assert!(!body2.value);
}

#[tokio::test]
async fn copy_pulls_bytes_from_source_server() {
    let source_root = tmp_root("copy-src");
    let dest_root = tmp_root("copy-dst");
    let _ = std::fs::remove_dir_all(&source_root);
    let _ = std::fs::remove_dir_all(&dest_root);
    let source = spawn(source_root).await;
    let dest = spawn(dest_root).await;
    let client = reqwest::Client::new();

    client
        .post(format!("{}/command/create", source.command_base))
        .json(&CommandCreateRequest { path: "/d.txt".into() })
        .send()
        .await
        .unwrap();
    client
        .post(format!("{}/write?path=/d.txt&offset=0", source.storage_base))
        .body("replicated payload")
        .send()
        .await
        .unwrap();

    let source_storage_addr: SocketAddr = source.storage_base.trim_start_matches("http://").parse().unwrap();

    let copy_resp = client
        .post(format!("{}/command/copy", dest.command_base))
        .json(&CommandCopyRequest { path: "/d.txt".into(), source: StorageStub::new(source_storage_addr) })
        .send()
        .await
        .unwrap();
    assert_eq!(copy_resp.status(), StatusCode::OK);

    let read_resp = client
        .get(format!("{}/read?path=/d.txt&offset=0&length=19", dest.storage_base))
        .send()
        .await
        .unwrap();
    assert_eq!(read_resp.bytes().await.unwrap().as_ref(), b"replicated payload");
}
