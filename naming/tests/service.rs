//! End-to-end scenarios for the naming server's Service and Registration
//! facades, driven against real storage-server backends (the `storage`
//! crate's own routers, bound to ephemeral ports over temp directories) so
//! that replication and invalidation exercise the actual Command RPCs
//! rather than a mock.

use naming::{Registration, Service, Store};
use nfs_common::wire::{CommandStub, RegisterRequest, StorageStub};
use nfs_common::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

struct FakeStorage {
    storage_stub: StorageStub,
    command_stub: CommandStub,
    _root: PathBuf,
}

async fn spawn_storage(name: &str) -> FakeStorage {
    let root = std::env::temp_dir().join(format!(
        "nfs-naming-test-{name}-{}-{}",
        std::process::id(),
        rand_suffix()
    ));
    let _ = std::fs::remove_dir_all(&root);
    std::fs::create_dir_all(&root).unwrap();

    let storage_listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let storage_addr = storage_listener.local_addr().unwrap();
    let storage_app = storage::storage_router(root.clone());
    tokio::spawn(async move { axum::serve(storage_listener, storage_app).await.unwrap() });

    let command_listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let command_addr = command_listener.local_addr().unwrap();
    let command_app = storage::command_router(root.clone());
    tokio::spawn(async move { axum::serve(command_listener, command_app).await.unwrap() });

    FakeStorage {
        storage_stub: StorageStub::new(storage_addr),
        command_stub: CommandStub::new(command_addr),
        _root: root,
    }
}

fn rand_suffix() -> u64 {
    use std::collections::hash_map::RandomState;
    use std::hash::{BuildHasher, Hasher};
    RandomState::new().build_hasher().finish()
}

fn harness() -> (Arc<Store>, Arc<Service>, Arc<Registration>) {
    let store = Arc::new(Store::new());
    let service = Arc::new(Service::new(store.clone()));
    let registration = Arc::new(Registration::new(store.clone()));
    (store, service, registration)
}

#[tokio::test]
async fn scenario_1_duplicate_registration_keeps_first_owner() {
    let (store, _service, registration) = harness();
    let s1 = spawn_storage("dup-1").await;
    let s2 = spawn_storage("dup-2").await;

    let dup1 = registration
        .register(RegisterRequest {
            storage_stub: s1.storage_stub,
            command_stub: s1.command_stub,
            paths: vec!["/a/b.txt".to_string()],
        })
        .unwrap();
    assert!(dup1.is_empty());

    let dup2 = registration
        .register(RegisterRequest {
            storage_stub: s2.storage_stub,
            command_stub: s2.command_stub,
            paths: vec!["/a/b.txt".to_string()],
        })
        .unwrap();
    assert_eq!(dup2, vec!["/a/b.txt".to_string()]);

    let replicas = store.replica_set(&Path::new("/a/b.txt").unwrap());
    assert_eq!(replicas.len(), 1);
    assert!(replicas.contains(&s1.storage_stub));
}

#[tokio::test]
async fn scenario_2_hot_read_triggers_replication() {
    let (store, service, _registration) = harness();
    let s1 = spawn_storage("hot-1").await;
    let s2 = spawn_storage("hot-2").await;

    store.register(s1.storage_stub, s1.command_stub, &[]).unwrap();
    store.register(s2.storage_stub, s2.command_stub, &[]).unwrap();

    let path = Path::new("/x").unwrap();
    // Seed the file directly against S1's real Command interface so the
    // eventual copy RPC has real bytes to pull.
    let http = reqwest::Client::new();
    http.post(format!("http://{}/command/create", s1.command_stub.addr))
        .json(&nfs_common::wire::CommandCreateRequest { path: "/x".to_string() })
        .send()
        .await
        .unwrap();
    store.create_file(&path).unwrap();
    store.add_replica(&path, s1.storage_stub);

    // 20 consecutive shared lock/unlock cycles bring the hotness counter to
    // the threshold; the implementation is free to enqueue replication as
    // soon as the threshold is met rather than strictly on a 21st call, so
    // this only asserts the eventual outcome, not which exact call fired it.
    for _ in 0..21 {
        service.lock(&path, false).await.unwrap();
        service.unlock(&path, false).await.unwrap();
    }

    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        let replicas = store.replica_set(&path);
        if replicas.len() == 2 {
            assert!(replicas.contains(&s1.storage_stub));
            assert!(replicas.contains(&s2.storage_stub));
            break;
        }
        if tokio::time::Instant::now() > deadline {
            panic!("replication did not complete in time, replicas = {replicas:?}");
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    // A successful replication resets the hotness counter (property 7).
    assert_eq!(store.lock_for(&path).reads_granted_ever().await, 0);
}

#[tokio::test]
async fn scenario_3_exclusive_lock_invalidates_other_replicas() {
    let (store, service, _registration) = harness();
    let s1 = spawn_storage("inv-1").await;
    let s2 = spawn_storage("inv-2").await;
    store.register(s1.storage_stub, s1.command_stub, &[]).unwrap();
    store.register(s2.storage_stub, s2.command_stub, &[]).unwrap();

    let path = Path::new("/x").unwrap();
    store.create_file(&path).unwrap();
    store.add_replica(&path, s1.storage_stub);
    store.add_replica(&path, s2.storage_stub);
    assert_eq!(store.replica_set(&path).len(), 2);

    service.lock(&path, true).await.unwrap();
    service.unlock(&path, true).await.unwrap();

    let replicas = store.replica_set(&path);
    assert_eq!(replicas.len(), 1, "exclusive lock must shrink the replica set to one");
}

#[tokio::test]
async fn scenario_4_create_file_without_registered_storage_is_illegal_state() {
    let (store, service, _registration) = harness();
    store.create_directory(&Path::new("/a").unwrap()).unwrap();

    let err = service.create_file(&Path::new("/a/f.txt").unwrap()).await.unwrap_err();
    assert_eq!(err.kind, nfs_common::ErrorKind::IllegalState);
}

#[tokio::test]
async fn scenario_5_writer_preference_orders_blocked_clients() {
    let (store, service, _registration) = harness();
    store.create_directory(&Path::new("/d").unwrap()).unwrap();
    let path = Path::new("/d").unwrap();

    let order: Arc<tokio::sync::Mutex<Vec<&'static str>>> = Arc::new(tokio::sync::Mutex::new(Vec::new()));

    // A holds a shared lock.
    service.lock(&path, false).await.unwrap();

    // B queues for exclusive.
    let service_b = service.clone();
    let path_b = path.clone();
    let order_b = order.clone();
    let b = tokio::spawn(async move {
        service_b.lock(&path_b, true).await.unwrap();
        order_b.lock().await.push("B");
        service_b.unlock(&path_b, true).await.unwrap();
    });
    tokio::time::sleep(Duration::from_millis(30)).await;

    // C arrives after B and must not cut in front of the waiting writer.
    let service_c = service.clone();
    let path_c = path.clone();
    let order_c = order.clone();
    let c = tokio::spawn(async move {
        service_c.lock(&path_c, false).await.unwrap();
        order_c.lock().await.push("C");
        service_c.unlock(&path_c, false).await.unwrap();
    });
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert!(order.lock().await.is_empty(), "neither B nor C should proceed while A holds the lock");

    service.unlock(&path, false).await.unwrap();
    b.await.unwrap();
    c.await.unwrap();

    assert_eq!(*order.lock().await, vec!["B", "C"]);
}

#[tokio::test]
async fn scenario_6_recursive_delete_fans_out_to_every_registered_server() {
    let (store, service, _registration) = harness();
    let s1 = spawn_storage("del-1").await;
    let s2 = spawn_storage("del-2").await;
    // S3 is registered but never held a replica of anything under /a — the
    // facade contract still requires it receive delete(p).
    let s3 = spawn_storage("del-3").await;
    store.register(s1.storage_stub, s1.command_stub, &[]).unwrap();
    store.register(s2.storage_stub, s2.command_stub, &[]).unwrap();
    store.register(s3.storage_stub, s3.command_stub, &[]).unwrap();

    store.create_directory(&Path::new("/a").unwrap()).unwrap();
    store.create_file(&Path::new("/a/b").unwrap()).unwrap();
    store.add_replica(&Path::new("/a/b").unwrap(), s1.storage_stub);
    store.add_replica(&Path::new("/a/b").unwrap(), s2.storage_stub);

    // Give every registered server a real on-disk file at /a so a delete
    // RPC (issued against the path itself, per the facade contract) has
    // something to actually remove, whether or not it held a replica.
    let http = reqwest::Client::new();
    for command_addr in [s1.command_stub.addr, s2.command_stub.addr, s3.command_stub.addr] {
        http.post(format!("http://{command_addr}/command/create"))
            .json(&nfs_common::wire::CommandCreateRequest { path: "/a".to_string() })
            .send()
            .await
            .unwrap();
    }

    let deleted = service.delete(&Path::new("/a").unwrap()).await.unwrap();
    assert!(deleted);
    assert!(!store.exists(&Path::new("/a").unwrap()));
    assert!(!store.exists(&Path::new("/a/b").unwrap()));

    // S3 never held a replica, but the delete RPC must still have reached
    // it and removed its local copy of /a.
    let size_resp = http
        .get(format!("http://{}/size", s3.storage_stub.addr))
        .query(&[("path", "/a")])
        .send()
        .await
        .unwrap();
    assert_eq!(size_resp.status(), reqwest::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_root_returns_false() {
    let (_store, service, _registration) = harness();
    assert!(!service.delete(&Path::root()).await.unwrap());
}

#[tokio::test]
async fn create_directory_then_create_directory_is_true_then_false() {
    let (_store, service, _registration) = harness();
    let path = Path::new("/a").unwrap();
    assert!(service.create_directory(&path).unwrap());
    assert!(!service.create_directory(&path).unwrap());
}
