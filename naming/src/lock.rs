//! A writer-preferring read/write lock with a cooperative "stopped" escape
//! hatch, one instance per path in the directory tree.
//!
//! Writer preference keeps a steady stream of readers from starving a
//! waiting writer: once a writer is queued, new readers block behind it.
//! `interrupt` flips `stopped`, which unblocks every acquire currently
//! waiting (and every future one) with `STOPPED`, so a clean shutdown never
//! has to wait out an in-flight client.

use nfs_common::AppError;
use tokio::sync::{Mutex, Notify};

#[derive(Debug, Default)]
struct State {
    readers: u32,
    writer_held: bool,
    writers_waiting: u32,
    reads_granted_ever: u64,
    stopped: bool,
}

#[derive(Debug, Default)]
pub struct PathLock {
    state: Mutex<State>,
    notify: Notify,
}

impl PathLock {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire_read(&self) -> Result<(), AppError> {
        loop {
            let notified = self.notify.notified();
            {
                let mut s = self.state.lock().await;
                if s.stopped {
                    return Err(AppError::stopped());
                }
                if !s.writer_held && s.writers_waiting == 0 {
                    s.readers += 1;
                    s.reads_granted_ever += 1;
                    return Ok(());
                }
            }
            notified.await;
        }
    }

    pub async fn release_read(&self) {
        let mut s = self.state.lock().await;
        s.readers = s.readers.saturating_sub(1);
        drop(s);
        self.notify.notify_waiters();
    }

    pub async fn acquire_write(&self) -> Result<(), AppError> {
        {
            let mut s = self.state.lock().await;
            if s.stopped {
                return Err(AppError::stopped());
            }
            s.writers_waiting += 1;
        }
        loop {
            let notified = self.notify.notified();
            {
                let mut s = self.state.lock().await;
                if s.stopped {
                    s.writers_waiting -= 1;
                    self.notify.notify_waiters();
                    return Err(AppError::stopped());
                }
                if s.readers == 0 && !s.writer_held {
                    s.writers_waiting -= 1;
                    s.writer_held = true;
                    return Ok(());
                }
            }
            notified.await;
        }
    }

    pub async fn release_write(&self) {
        let mut s = self.state.lock().await;
        s.writer_held = false;
        drop(s);
        self.notify.notify_waiters();
    }

    /// Sets `stopped`, waking every blocked acquire with `STOPPED`. Holders
    /// already granted a lock may still call `release_read`/`release_write`.
    pub async fn interrupt(&self) {
        let mut s = self.state.lock().await;
        s.stopped = true;
        drop(s);
        self.notify.notify_waiters();
    }

    pub async fn reads_granted_ever(&self) -> u64 {
        self.state.lock().await.reads_granted_ever
    }

    pub async fn reset_read_count(&self) {
        self.state.lock().await.reads_granted_ever = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn reads_coexist() {
        let lock = PathLock::new();
        lock.acquire_read().await.unwrap();
        lock.acquire_read().await.unwrap();
        lock.release_read().await;
        lock.release_read().await;
    }

    #[tokio::test]
    async fn write_excludes_write() {
        let lock = Arc::new(PathLock::new());
        lock.acquire_write().await.unwrap();

        let lock2 = lock.clone();
        let got_it = Arc::new(AtomicU32::new(0));
        let got_it2 = got_it.clone();
        let task = tokio::spawn(async move {
            lock2.acquire_write().await.unwrap();
            got_it2.store(1, Ordering::SeqCst);
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(got_it.load(Ordering::SeqCst), 0);

        lock.release_write().await;
        task.await.unwrap();
        assert_eq!(got_it.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn writer_preference_blocks_new_readers() {
        // Reader A holds the lock, writer B queues, reader C arrives after B:
        // C must not be served before B.
        let lock = Arc::new(PathLock::new());
        lock.acquire_read().await.unwrap();

        let lock_b = lock.clone();
        let order = Arc::new(Mutex::new(Vec::<&'static str>::new()));
        let order_b = order.clone();
        let writer = tokio::spawn(async move {
            lock_b.acquire_write().await.unwrap();
            order_b.lock().await.push("B");
            lock_b.release_write().await;
        });

        // give B a chance to register as a waiting writer
        tokio::time::sleep(Duration::from_millis(20)).await;

        let lock_c = lock.clone();
        let order_c = order.clone();
        let reader = tokio::spawn(async move {
            lock_c.acquire_read().await.unwrap();
            order_c.lock().await.push("C");
            lock_c.release_read().await;
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        // neither should have proceeded while A still holds the read lock
        assert!(order.lock().await.is_empty());

        lock.release_read().await;
        writer.await.unwrap();
        reader.await.unwrap();

        assert_eq!(*order.lock().await, vec!["B", "C"]);
    }

    #[tokio::test]
    async fn interrupt_wakes_waiters_with_stopped() {
        let lock = Arc::new(PathLock::new());
        lock.acquire_write().await.unwrap();

        let lock2 = lock.clone();
        let task = tokio::spawn(async move { lock2.acquire_read().await });

        tokio::time::sleep(Duration::from_millis(20)).await;
        lock.interrupt().await;

        let result = task.await.unwrap();
        assert!(matches!(result, Err(e) if e.kind == nfs_common::ErrorKind::Stopped));
    }

    #[tokio::test]
    async fn read_count_tracks_and_resets() {
        let lock = PathLock::new();
        for _ in 0..5 {
            lock.acquire_read().await.unwrap();
            lock.release_read().await;
        }
        assert_eq!(lock.reads_granted_ever().await, 5);
        lock.reset_read_count().await;
        assert_eq!(lock.reads_granted_ever().await, 0);
    }
}
