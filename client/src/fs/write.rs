use super::prelude::*;
use crate::fs::errno_for;

/// FUSE `write`: forwards straight to the storage replica recorded in the
/// open file handle at the kernel-given offset. No client-side buffering:
/// the storage protocol's `write` already supports arbitrary offsets, so
/// there is nothing to merge here.
pub fn write(
    fs: &mut RemoteFS,
    _req: &Request<'_>,
    ino: u64,
    fh: u64,
    offset: i64,
    data: &[u8],
    _write_flags: u32,
    _flags: i32,
    _lock_owner: Option<u64>,
    reply: ReplyWrite,
) {
    let handle = match fs.open_files.get(&fh) {
        Some(h) => h,
        None => {
            reply.error(EBADF);
            return;
        }
    };
    let canon = canonical(&handle.path);
    let storage = handle.storage;
    let len = data.len() as u32;
    let result = fs.runtime.block_on(fs.storage.write(&storage, &canon, offset, data.to_vec()));
    match result {
        Ok(()) => {
            fs.attribute_cache.remove(&ino);
            reply.written(len);
        }
        Err(err) => reply.error(errno_for(&err)),
    }
}

/// FUSE `release`: unwinds the naming-server lock this session acquired in
/// `open`, in the same mode it was taken (shared for a read-only open,
/// exclusive otherwise).
pub fn release(
    fs: &mut RemoteFS,
    _req: &Request<'_>,
    _ino: u64,
    fh: u64,
    _flags: i32,
    _lock_owner: Option<u64>,
    _flush: bool,
    reply: ReplyEmpty,
) {
    if let Some(handle) = fs.open_files.remove(&fh) {
        let canon = canonical(&handle.path);
        let _ = fs.runtime.block_on(fs.naming.unlock(&canon, handle.exclusive));
    }
    reply.ok();
}

pub fn flush(_fs: &mut RemoteFS, _req: &Request<'_>, _ino: u64, _fh: u64, _lock_owner: u64, reply: ReplyEmpty) {
    reply.ok();
}
