//! The in-memory directory tree: which paths exist, whether each is a file
//! or a directory, which storage servers hold a replica of each file, and
//! the per-path lock guarding it. Everything here is protected by a single
//! `std::sync::Mutex`; the tree itself is cheap to walk and no call holds
//! the guard across an `.await`, so a synchronous mutex is the right tool.

use crate::lock::PathLock;
use nfs_common::wire::{CommandStub, StorageStub};
use nfs_common::{AppError, Path};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

struct Entry {
    kind: EntryKind,
    /// Storage servers known to hold this file. Empty for directories.
    replicas: HashSet<StorageStub>,
}

struct Inner {
    entries: HashMap<Path, Entry>,
    locks: HashMap<Path, Arc<PathLock>>,
    /// Every storage server that has registered, and the command stub used
    /// to issue create/delete/copy RPCs against it.
    registry: HashMap<StorageStub, CommandStub>,
}

pub struct Store {
    inner: Mutex<Inner>,
}

impl Store {
    pub fn new() -> Self {
        let mut entries = HashMap::new();
        entries.insert(Path::root(), Entry { kind: EntryKind::Directory, replicas: HashSet::new() });
        let mut locks = HashMap::new();
        locks.insert(Path::root(), Arc::new(PathLock::new()));
        Store {
            inner: Mutex::new(Inner { entries, locks, registry: HashMap::new() }),
        }
    }

    /// Returns (creating if necessary) the lock guarding `path`. Locks are
    /// created lazily and never removed, even after the path they guard is
    /// deleted, so that a racing unlock on a just-deleted path still finds
    /// a lock object to release.
    pub fn lock_for(&self, path: &Path) -> Arc<PathLock> {
        let mut inner = self.inner.lock().unwrap();
        inner.locks.entry(path.clone()).or_insert_with(|| Arc::new(PathLock::new())).clone()
    }

    pub fn exists(&self, path: &Path) -> bool {
        self.inner.lock().unwrap().entries.contains_key(path)
    }

    pub fn is_directory(&self, path: &Path) -> Result<bool, AppError> {
        let inner = self.inner.lock().unwrap();
        inner
            .entries
            .get(path)
            .map(|e| e.kind == EntryKind::Directory)
            .ok_or_else(|| AppError::not_found(format!("no such path: {path}")))
    }

    pub fn list_dir(&self, path: &Path) -> Result<Vec<String>, AppError> {
        let inner = self.inner.lock().unwrap();
        match inner.entries.get(path) {
            None => Err(AppError::not_found(format!("no such path: {path}"))),
            Some(e) if e.kind != EntryKind::Directory => {
                Err(AppError::bad_arg(format!("not a directory: {path}")))
            }
            Some(_) => {
                let mut names: Vec<String> = inner
                    .entries
                    .keys()
                    .filter(|p| p.depth() == path.depth() + 1 && p.is_subpath(path))
                    .map(|p| p.last().unwrap().to_string())
                    .collect();
                names.sort();
                Ok(names)
            }
        }
    }

    /// Creates a directory entry. `parent` must already exist as a directory
    /// and `path` must not already exist. Returns `false` (not an error) if
    /// `path` already exists, matching the facade's create-semantics.
    pub fn create_directory(&self, path: &Path) -> Result<bool, AppError> {
        self.create_entry(path, EntryKind::Directory)
    }

    /// Registers a brand-new file entry with no replicas yet. Used only by
    /// the replication path for files a newly-registering storage server
    /// brings with it; ordinary client-initiated file creation goes through
    /// [`Store::create_entry`] plus [`Store::add_replica`].
    pub fn create_file(&self, path: &Path) -> Result<bool, AppError> {
        self.create_entry(path, EntryKind::File)
    }

    fn create_entry(&self, path: &Path, kind: EntryKind) -> Result<bool, AppError> {
        if path.is_root() {
            return Err(AppError::bad_arg("cannot create the root"));
        }
        let parent = path.parent()?;
        let mut inner = self.inner.lock().unwrap();
        match inner.entries.get(&parent) {
            None => return Err(AppError::not_found(format!("parent does not exist: {parent}"))),
            Some(e) if e.kind != EntryKind::Directory => {
                return Err(AppError::bad_arg(format!("parent is not a directory: {parent}")))
            }
            Some(_) => {}
        }
        if inner.entries.contains_key(path) {
            return Ok(false);
        }
        inner.entries.insert(path.clone(), Entry { kind, replicas: HashSet::new() });
        Ok(true)
    }

    /// Removes `path` and, if it is a directory, everything beneath it.
    /// Returns the storage servers that held a replica of any deleted file,
    /// deduplicated, for observability; the `delete` RPC fan-out itself goes
    /// to every registered command stub, not just these (see `Service::delete`).
    pub fn delete_subtree(&self, path: &Path) -> Result<HashSet<StorageStub>, AppError> {
        if path.is_root() {
            return Err(AppError::bad_arg("cannot delete the root"));
        }
        let mut inner = self.inner.lock().unwrap();
        if !inner.entries.contains_key(path) {
            return Err(AppError::not_found(format!("no such path: {path}")));
        }
        let doomed: Vec<Path> = inner
            .entries
            .keys()
            .filter(|p| p.is_subpath(path))
            .cloned()
            .collect();
        let mut replicas = HashSet::new();
        for p in &doomed {
            if let Some(entry) = inner.entries.remove(p) {
                replicas.extend(entry.replicas);
            }
        }
        Ok(replicas)
    }

    /// Picks an arbitrary storage server holding a replica of `path`.
    pub fn get_storage(&self, path: &Path) -> Result<StorageStub, AppError> {
        let inner = self.inner.lock().unwrap();
        let entry = inner
            .entries
            .get(path)
            .ok_or_else(|| AppError::not_found(format!("no such path: {path}")))?;
        if entry.kind != EntryKind::File {
            return Err(AppError::bad_arg(format!("not a file: {path}")));
        }
        entry
            .replicas
            .iter()
            .next()
            .copied()
            .ok_or_else(|| AppError::illegal_state(format!("file has no registered replica: {path}")))
    }

    pub fn replica_set(&self, path: &Path) -> HashSet<StorageStub> {
        self.inner
            .lock()
            .unwrap()
            .entries
            .get(path)
            .map(|e| e.replicas.clone())
            .unwrap_or_default()
    }

    pub fn add_replica(&self, path: &Path, storage: StorageStub) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(e) = inner.entries.get_mut(path) {
            e.replicas.insert(storage);
        }
    }

    pub fn remove_replica(&self, path: &Path, storage: StorageStub) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(e) = inner.entries.get_mut(path) {
            e.replicas.remove(&storage);
        }
    }

    /// Picks a storage server registered in the tree that is not already in
    /// `exclude`, for use as a replication target. Deterministic iteration
    /// order is fine here; the caller randomizes among ties if it cares to.
    pub fn pick_registered_not_in(&self, exclude: &HashSet<StorageStub>) -> Option<StorageStub> {
        let inner = self.inner.lock().unwrap();
        inner.registry.keys().find(|s| !exclude.contains(s)).copied()
    }

    /// Every lock currently tracked, used only to broadcast `interrupt()`
    /// across the whole tree at shutdown.
    pub fn all_locks(&self) -> Vec<Arc<PathLock>> {
        self.inner.lock().unwrap().locks.values().cloned().collect()
    }

    pub fn command_stub_for(&self, storage: &StorageStub) -> Option<CommandStub> {
        self.inner.lock().unwrap().registry.get(storage).copied()
    }

    pub fn all_storage_stubs(&self) -> Vec<StorageStub> {
        self.inner.lock().unwrap().registry.keys().copied().collect()
    }

    /// Every distinct command stub currently registered, deduplicated (two
    /// storage stubs could in principle share a command endpoint). Used by
    /// `delete` to fan out to every registered server, not just the ones
    /// known to hold a replica of the deleted subtree.
    pub fn all_command_stubs(&self) -> HashSet<CommandStub> {
        self.inner.lock().unwrap().registry.values().copied().collect()
    }

    /// Registers a new storage server and its initial file list. Files that
    /// already exist in the tree are treated as duplicates and excluded from
    /// this server's advertised set (the caller is expected to instruct the
    /// storage server to delete its local copies of those). Returns the
    /// duplicate paths.
    pub fn register(
        &self,
        storage: StorageStub,
        command: CommandStub,
        paths: &[Path],
    ) -> Result<Vec<Path>, AppError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.registry.contains_key(&storage) {
            return Err(AppError::illegal_state(format!("storage server already registered: {storage}")));
        }
        inner.registry.insert(storage, command);

        let mut duplicates = Vec::new();
        for path in paths {
            if path.is_root() {
                continue;
            }
            if inner.entries.contains_key(path) {
                duplicates.push(path.clone());
                continue;
            }
            for ancestor in path.subpaths() {
                inner.entries.entry(ancestor).or_insert_with(|| Entry {
                    kind: EntryKind::Directory,
                    replicas: HashSet::new(),
                });
            }
            if let Some(entry) = inner.entries.get_mut(path) {
                entry.kind = EntryKind::File;
                entry.replicas.insert(storage);
            }
        }
        Ok(duplicates)
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(s: &str) -> Path {
        Path::new(s).unwrap()
    }

    fn stub(port: u16) -> StorageStub {
        StorageStub::new(format!("127.0.0.1:{port}").parse().unwrap())
    }

    #[test]
    fn root_exists_as_directory() {
        let store = Store::new();
        assert!(store.is_directory(&p("/")).unwrap());
    }

    #[test]
    fn create_directory_requires_existing_parent() {
        let store = Store::new();
        assert!(store.create_directory(&p("/a/b")).is_err());
        assert!(store.create_directory(&p("/a")).unwrap());
        assert!(store.create_directory(&p("/a/b")).unwrap());
    }

    #[test]
    fn create_entry_is_idempotent_false_not_error() {
        let store = Store::new();
        assert!(store.create_directory(&p("/a")).unwrap());
        assert!(!store.create_directory(&p("/a")).unwrap());
    }

    #[test]
    fn list_dir_returns_immediate_children_sorted() {
        let store = Store::new();
        store.create_directory(&p("/b")).unwrap();
        store.create_directory(&p("/a")).unwrap();
        store.create_directory(&p("/a/x")).unwrap();
        assert_eq!(store.list_dir(&p("/")).unwrap(), vec!["a", "b"]);
        assert_eq!(store.list_dir(&p("/a")).unwrap(), vec!["x"]);
    }

    #[test]
    fn register_builds_directory_structure_and_reports_duplicates() {
        let store = Store::new();
        let s1 = stub(9001);
        let c1 = CommandStub::new("127.0.0.1:9101".parse().unwrap());
        let dup = store.register(s1, c1, &[p("/a/file.txt")]).unwrap();
        assert!(dup.is_empty());
        assert!(store.is_directory(&p("/a")).unwrap());
        assert!(!store.is_directory(&p("/a/file.txt")).unwrap());
        assert_eq!(store.get_storage(&p("/a/file.txt")).unwrap(), s1);

        let s2 = stub(9002);
        let c2 = CommandStub::new("127.0.0.1:9102".parse().unwrap());
        let dup2 = store.register(s2, c2, &[p("/a/file.txt"), p("/a/new.txt")]).unwrap();
        assert_eq!(dup2, vec![p("/a/file.txt")]);
        assert_eq!(store.get_storage(&p("/a/new.txt")).unwrap(), s2);
    }

    #[test]
    fn register_same_storage_twice_is_illegal_state() {
        let store = Store::new();
        let s1 = stub(9001);
        let c1 = CommandStub::new("127.0.0.1:9101".parse().unwrap());
        store.register(s1, c1, &[]).unwrap();
        assert!(store.register(s1, c1, &[]).is_err());
    }

    #[test]
    fn delete_subtree_removes_descendants_and_collects_replicas() {
        let store = Store::new();
        let s1 = stub(9001);
        let c1 = CommandStub::new("127.0.0.1:9101".parse().unwrap());
        store.register(s1, c1, &[p("/a/one.txt"), p("/a/b/two.txt")]).unwrap();

        let replicas = store.delete_subtree(&p("/a")).unwrap();
        assert!(replicas.contains(&s1));
        assert!(!store.exists(&p("/a")));
        assert!(!store.exists(&p("/a/one.txt")));
        assert!(!store.exists(&p("/a/b/two.txt")));
    }

    #[test]
    fn delete_root_rejected() {
        let store = Store::new();
        assert!(store.delete_subtree(&p("/")).is_err());
    }

    #[test]
    fn get_storage_requires_at_least_one_replica() {
        let store = Store::new();
        store.create_directory(&p("/a")).unwrap();
        // file with no registered replica: caller created metadata only
        store.create_file(&p("/a/f.txt")).unwrap();
        assert!(store.get_storage(&p("/a/f.txt")).is_err());
    }
}
