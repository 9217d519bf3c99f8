use super::prelude::*;
use crate::fs::errno_for;

/// Fetches attributes for an inode, using the cache if available.
///
/// On a cache miss this asks the naming server whether the path is a
/// directory and, for files, asks whichever storage replica `getStorage`
/// returns for its size. mtime/ctime have no representation in the naming
/// protocol, so they're synthesized as "now" on every miss.
pub fn fetch_and_cache_attributes(fs: &mut RemoteFS, ino: u64) -> Option<FileAttr> {
    if ino == 1 {
        return Some(ROOT_DIR_ATTR);
    }

    if let Some(attr) = fs.attribute_cache.get(&ino) {
        return Some(attr);
    }

    let path = fs.inode_to_path.get(&ino)?.clone();
    let canon = canonical(&path);

    let is_dir = fs.runtime.block_on(fs.naming.is_directory(&canon)).ok()?;
    let kind = if is_dir { FileType::Directory } else { FileType::RegularFile };
    fs.inode_to_type.insert(ino, kind);

    let size: u64 = if is_dir {
        0
    } else {
        let naming = fs.naming.clone();
        let storage_client = fs.storage.clone();
        let canon_for_size = canon.clone();
        fs.runtime
            .block_on(async move {
                let storage = naming.get_storage(&canon_for_size).await?;
                storage_client.size(&storage, &canon_for_size).await
            })
            .unwrap_or(0)
            .max(0) as u64
    };

    let now = SystemTime::now();
    let default_perm: u16 = if is_dir { 0o755 } else { 0o644 };
    let perm = fs.perm_overrides.get(&ino).copied().unwrap_or(default_perm);

    let attrs = FileAttr {
        ino,
        size,
        blocks: size.div_ceil(512),
        atime: now,
        mtime: now,
        ctime: now,
        crtime: now,
        kind,
        perm,
        nlink: if kind == FileType::Directory { 2 } else { 1 },
        uid: 501,
        gid: 20,
        rdev: 0,
        flags: 0,
        blksize: 5120,
    };

    let ttl = Duration::from_secs(fs.config.cache_ttl_seconds);
    fs.attribute_cache.put(ino, attrs, ttl);

    Some(attrs)
}

/// FUSE `getattr`: a thin wrapper around [`fetch_and_cache_attributes`].
pub fn getattr(fs: &mut RemoteFS, _req: &Request, ino: u64, reply: ReplyAttr) {
    match fetch_and_cache_attributes(fs, ino) {
        Some(attr) => reply.attr(&TTL, &attr),
        None => reply.error(ENOENT),
    }
}

/// FUSE `setattr`. Supports:
/// - `chmod` (mode): tracked client-side only, in [`RemoteFS::perm_overrides`],
///   since the naming protocol has no permission bits of its own.
/// - `truncate` growing a file (size): a zero-filled `write` past the current
///   end stands in for extension.
///
/// Shrinking a file has no counterpart in the storage protocol's `write`
/// (which only ever extends), so a truncate to a smaller size fails with
/// `EIO` rather than silently no-op'ing. UID/GID/timestamp changes are
/// accepted and ignored.
#[allow(clippy::too_many_arguments)]
pub fn setattr(
    fs: &mut RemoteFS,
    _req: &Request<'_>,
    ino: u64,
    mode: Option<u32>,
    _uid: Option<u32>,
    _gid: Option<u32>,
    size: Option<u64>,
    _atime: Option<TimeOrNow>,
    _mtime: Option<TimeOrNow>,
    _ctime: Option<SystemTime>,
    _fh: Option<u64>,
    _crtime: Option<SystemTime>,
    _chgtime: Option<SystemTime>,
    _bkuptime: Option<SystemTime>,
    _flags: Option<u32>,
    reply: ReplyAttr,
) {
    if let Some(new_mode) = mode {
        fs.perm_overrides.insert(ino, (new_mode & 0o777) as u16);
    }

    if let Some(new_size) = size {
        let path = match fs.inode_to_path.get(&ino) {
            Some(p) => p.clone(),
            None => {
                reply.error(ENOENT);
                return;
            }
        };
        let canon = canonical(&path);
        let naming = fs.naming.clone();
        let storage_client = fs.storage.clone();
        let result = fs.runtime.block_on(async move {
            let storage = naming.get_storage(&canon).await?;
            let current = storage_client.size(&storage, &canon).await?;
            if new_size as i64 > current {
                let zeros = vec![0u8; (new_size as i64 - current) as usize];
                storage_client.write(&storage, &canon, current, zeros).await?;
            } else if (new_size as i64) < current {
                return Err(nfs_common::AppError::internal(
                    "storage servers cannot shrink a file; truncate-down is unsupported",
                ));
            }
            Ok(())
        });
        if let Err(err) = result {
            reply.error(errno_for(&err));
            return;
        }
    }

    fs.attribute_cache.remove(&ino);

    match fetch_and_cache_attributes(fs, ino) {
        Some(attr) => reply.attr(&TTL, &attr),
        None => reply.error(ENOENT),
    }
}
