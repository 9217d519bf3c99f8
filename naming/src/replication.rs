//! Background replication: growing a hot file's replica set without the
//! requesting client waiting on the copy. A task is enqueued while the
//! caller still holds the path's read lock; the actual copy happens later,
//! on a bounded pool of spawned tasks, and failures are dropped silently —
//! the file stays under-replicated and the next hot read retries.

use crate::command_client::CommandClient;
use crate::index::Store;
use nfs_common::wire::{CommandStub, StorageStub};
use nfs_common::Path;
use rand::seq::IteratorRandom;
use std::sync::Arc;
use tokio::sync::Semaphore;

pub struct ReplicationDriver {
    store: Arc<Store>,
    client: CommandClient,
    /// Caps the number of copy tasks running at once; unboundedly many can
    /// be queued, but this keeps storage servers from being hammered.
    permits: Arc<Semaphore>,
}

const MAX_CONCURRENT_COPIES: usize = 8;

impl ReplicationDriver {
    pub fn new(store: Arc<Store>) -> Self {
        Self {
            store,
            client: CommandClient::new(),
            permits: Arc::new(Semaphore::new(MAX_CONCURRENT_COPIES)),
        }
    }

    /// Spawns a copy of `path` onto `target`, drawing a source uniformly at
    /// random from the replica set observed at enqueue time. On success,
    /// adds `target` to the path's replica set and resets its read counter.
    pub fn enqueue(&self, path: Path, target: StorageStub, target_command: CommandStub) {
        let store = self.store.clone();
        let client = self.client.clone();
        let permits = self.permits.clone();
        tokio::spawn(async move {
            let Ok(_permit) = permits.acquire_owned().await else { return };

            let replicas = store.replica_set(&path);
            let Some(source) = replicas.into_iter().choose(&mut rand::thread_rng()) else {
                return;
            };

            match client.copy(target_command, &path, source).await {
                Ok(true) => {
                    store.add_replica(&path, target);
                    let lock = store.lock_for(&path);
                    lock.reset_read_count().await;
                    tracing::debug!(%path, %target, "replication task completed");
                }
                Ok(false) => {
                    tracing::debug!(%path, %target, "replication task reported failure");
                }
                Err(err) => {
                    tracing::debug!(%path, %target, error = %err, "replication task failed, dropping");
                }
            }
        });
    }
}
