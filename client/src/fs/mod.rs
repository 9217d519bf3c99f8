//! Root of the FUSE filesystem implementation.
//!
//! [`RemoteFS`] holds every cache the mount needs plus the two RPC clients
//! (`naming`, `storage`) that speak the naming server's Service interface
//! and a storage server's data interface respectively. The `impl Filesystem`
//! block on [`FsWrapper`] is a thin dispatcher: every kernel callback locks
//! the shared state and forwards to the matching function in a sibling
//! module (`attr`, `read`, `write`, `create`, `delete`, `rename`, `xattr`).

use crate::config::Config;
use crate::fs::cache::AttributeCache;
use crate::naming_client::NamingClient;
use crate::storage_client::StorageClient;
use fuser::{
    FileAttr, FileType, Filesystem, ReplyAttr, ReplyCreate, ReplyData, ReplyDirectory, ReplyEmpty,
    ReplyEntry, ReplyOpen, ReplyWrite, ReplyXattr, Request,
};
use nfs_common::wire::StorageStub;
use nfs_common::{AppError, ErrorKind};
use std::collections::HashMap;
use std::ffi::OsStr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, UNIX_EPOCH};

pub mod cache;
pub mod prelude;
mod attr;
mod create;
mod delete;
mod read;
mod rename;
mod write;
mod xattr;

/// Default Time-To-Live for FUSE kernel attribute/entry caches.
pub const TTL: Duration = Duration::from_secs(1);

/// Static attributes for the root directory (inode 1), which never changes
/// and has no corresponding naming-server path lookup.
pub const ROOT_DIR_ATTR: FileAttr = FileAttr {
    ino: 1, size: 0, blocks: 0, atime: UNIX_EPOCH, mtime: UNIX_EPOCH, ctime: UNIX_EPOCH,
    crtime: UNIX_EPOCH, kind: FileType::Directory, perm: 0o755, nlink: 2, uid: 501, gid: 20,
    rdev: 0, flags: 0, blksize: 5120,
};

/// Turns a client-relative path (no leading slash; `""` for root) into the
/// canonical `/a/b` form the naming server's wire protocol expects.
pub(crate) fn canonical(path: &str) -> String {
    if path.is_empty() {
        "/".to_string()
    } else {
        format!("/{path}")
    }
}

/// Maps a protocol error to the `errno` FUSE expects back from the kernel
/// callback. There's no one-to-one mapping for every kind; this picks the
/// closest POSIX analogue.
pub(crate) fn errno_for(err: &AppError) -> i32 {
    match err.kind {
        ErrorKind::NotFound => libc::ENOENT,
        ErrorKind::BadArg | ErrorKind::BadPath => libc::EINVAL,
        ErrorKind::IllegalState => libc::EEXIST,
        ErrorKind::OutOfRange => libc::EINVAL,
        ErrorKind::Stopped | ErrorKind::TransportFailure | ErrorKind::Internal => libc::EIO,
    }
}

/// State held for a file opened for data I/O: which path it is, the
/// storage replica `getStorage` handed back, and whether the naming-server
/// lock backing this session is a reader or a writer (so `release` unwinds
/// it with the matching mode).
pub struct OpenHandle {
    pub(crate) path: String,
    pub(crate) exclusive: bool,
    pub(crate) storage: StorageStub,
}

pub struct RemoteFS {
    pub(crate) naming: NamingClient,
    pub(crate) storage: StorageClient,
    /// Drives every async RPC from these synchronous FUSE callbacks.
    pub(crate) runtime: tokio::runtime::Runtime,
    pub(crate) inode_to_path: HashMap<u64, String>,
    pub(crate) path_to_inode: HashMap<String, u64>,
    pub(crate) inode_to_type: HashMap<u64, FileType>,
    pub(crate) next_inode: u64,
    pub(crate) attribute_cache: AttributeCache,
    pub(crate) config: Config,
    /// Handles for files opened with `open`/`create`, keyed by file handle.
    pub(crate) open_files: HashMap<u64, OpenHandle>,
    pub(crate) next_fh: u64,
    /// `chmod` has no naming-protocol counterpart (the directory index
    /// tracks no permission bits), so a mode change is remembered here and
    /// reapplied over whatever [`attr::fetch_and_cache_attributes`] derives.
    pub(crate) perm_overrides: HashMap<u64, u16>,
}

impl RemoteFS {
    pub fn new(config: Config) -> Self {
        let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build().unwrap();
        let mut fs = Self {
            naming: NamingClient::new(&config.naming_addr),
            storage: StorageClient::new(),
            runtime,
            inode_to_path: HashMap::new(),
            path_to_inode: HashMap::new(),
            inode_to_type: HashMap::new(),
            next_inode: 2, // 1 is root
            attribute_cache: AttributeCache::new(&config),
            config,
            open_files: HashMap::new(),
            next_fh: 1,
            perm_overrides: HashMap::new(),
        };

        fs.inode_to_path.insert(1, String::new());
        fs.path_to_inode.insert(String::new(), 1);
        fs.inode_to_type.insert(1, FileType::Directory);
        let ttl = Duration::from_secs(fs.config.cache_ttl_seconds);
        fs.attribute_cache.put(1, ROOT_DIR_ATTR, ttl);
        fs
    }

    /// Returns the inode for `path`, allocating and caching a fresh one if
    /// this is the first time the mount has seen it.
    pub(crate) fn inode_for(&mut self, path: &str, kind: FileType) -> u64 {
        if let Some(&ino) = self.path_to_inode.get(path) {
            self.inode_to_type.insert(ino, kind);
            return ino;
        }
        let ino = self.next_inode;
        self.next_inode += 1;
        self.inode_to_path.insert(ino, path.to_string());
        self.path_to_inode.insert(path.to_string(), ino);
        self.inode_to_type.insert(ino, kind);
        ino
    }

    pub(crate) fn forget_path(&mut self, path: &str) {
        if let Some(ino) = self.path_to_inode.remove(path) {
            self.inode_to_path.remove(&ino);
            self.inode_to_type.remove(&ino);
            self.attribute_cache.remove(&ino);
        }
    }
}

#[derive(Clone)]
pub struct FsWrapper(pub Arc<Mutex<RemoteFS>>);

impl Filesystem for FsWrapper {
    fn getattr(&mut self, req: &Request, ino: u64, reply: ReplyAttr) {
        let mut fs = self.0.lock().unwrap();
        attr::getattr(&mut fs, req, ino, reply);
    }

    fn setattr(&mut self, req: &Request<'_>, ino: u64, mode: Option<u32>, uid: Option<u32>, gid: Option<u32>, size: Option<u64>, atime: Option<fuser::TimeOrNow>, mtime: Option<fuser::TimeOrNow>, ctime: Option<std::time::SystemTime>, fh: Option<u64>, crtime: Option<std::time::SystemTime>, chgtime: Option<std::time::SystemTime>, bkuptime: Option<std::time::SystemTime>, flags: Option<u32>, reply: ReplyAttr) {
        let mut fs = self.0.lock().unwrap();
        attr::setattr(&mut fs, req, ino, mode, uid, gid, size, atime, mtime, ctime, fh, crtime, chgtime, bkuptime, flags, reply);
    }

    fn lookup(&mut self, req: &Request, parent: u64, name: &OsStr, reply: ReplyEntry) {
        let mut fs = self.0.lock().unwrap();
        read::lookup(&mut fs, req, parent, name, reply);
    }

    fn readdir(&mut self, req: &Request, ino: u64, fh: u64, offset: i64, reply: ReplyDirectory) {
        let mut fs = self.0.lock().unwrap();
        read::readdir(&mut fs, req, ino, fh, offset, reply);
    }

    fn read(&mut self, req: &Request<'_>, ino: u64, fh: u64, offset: i64, size: u32, flags: i32, lock_owner: Option<u64>, reply: ReplyData) {
        let mut fs = self.0.lock().unwrap();
        read::read(&mut fs, req, ino, fh, offset, size, flags, lock_owner, reply);
    }

    fn open(&mut self, req: &Request<'_>, ino: u64, flags: i32, reply: ReplyOpen) {
        let mut fs = self.0.lock().unwrap();
        read::open(&mut fs, req, ino, flags, reply);
    }

    fn write(&mut self, req: &Request<'_>, ino: u64, fh: u64, offset: i64, data: &[u8], write_flags: u32, flags: i32, lock_owner: Option<u64>, reply: ReplyWrite) {
        let mut fs = self.0.lock().unwrap();
        write::write(&mut fs, req, ino, fh, offset, data, write_flags, flags, lock_owner, reply);
    }

    fn release(&mut self, req: &Request<'_>, ino: u64, fh: u64, flags: i32, lock_owner: Option<u64>, flush: bool, reply: ReplyEmpty) {
        let mut fs = self.0.lock().unwrap();
        write::release(&mut fs, req, ino, fh, flags, lock_owner, flush, reply);
    }

    fn flush(&mut self, req: &Request<'_>, ino: u64, fh: u64, lock_owner: u64, reply: ReplyEmpty) {
        let mut fs = self.0.lock().unwrap();
        write::flush(&mut fs, req, ino, fh, lock_owner, reply);
    }

    fn create(&mut self, req: &Request<'_>, parent: u64, name: &OsStr, mode: u32, umask: u32, flags: i32, reply: ReplyCreate) {
        let mut fs = self.0.lock().unwrap();
        create::create(&mut fs, req, parent, name, mode, umask, flags, reply);
    }

    fn mkdir(&mut self, req: &Request<'_>, parent: u64, name: &OsStr, mode: u32, umask: u32, reply: ReplyEntry) {
        let mut fs = self.0.lock().unwrap();
        create::mkdir(&mut fs, req, parent, name, mode, umask, reply);
    }

    fn unlink(&mut self, req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        let mut fs = self.0.lock().unwrap();
        delete::unlink(&mut fs, req, parent, name, reply);
    }

    fn rmdir(&mut self, req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        let mut fs = self.0.lock().unwrap();
        delete::rmdir(&mut fs, req, parent, name, reply);
    }

    fn rename(&mut self, req: &Request<'_>, parent: u64, name: &OsStr, newparent: u64, newname: &OsStr, flags: u32, reply: ReplyEmpty) {
        let mut fs = self.0.lock().unwrap();
        rename::rename(&mut fs, req, parent, name, newparent, newname, flags, reply);
    }

    fn getxattr(&mut self, req: &Request<'_>, ino: u64, name: &OsStr, size: u32, reply: ReplyXattr) {
        let mut fs = self.0.lock().unwrap();
        xattr::getxattr(&mut fs, req, ino, name, size, reply);
    }

    fn setxattr(&mut self, req: &Request<'_>, ino: u64, name: &OsStr, value: &[u8], flags: i32, position: u32, reply: ReplyEmpty) {
        let mut fs = self.0.lock().unwrap();
        xattr::setxattr(&mut fs, req, ino, name, value, flags, position, reply);
    }

    fn listxattr(&mut self, req: &Request<'_>, ino: u64, size: u32, reply: ReplyXattr) {
        let mut fs = self.0.lock().unwrap();
        xattr::listxattr(&mut fs, req, ino, size, reply);
    }

    fn removexattr(&mut self, req: &Request<'_>, ino: u64, name: &OsStr, reply: ReplyEmpty) {
        let mut fs = self.0.lock().unwrap();
        xattr::removexattr(&mut fs, req, ino, name, reply);
    }
}
