use super::prelude::*;
use crate::fs::errno_for;

/// FUSE `create`: creates the file through the naming server, then opens it
/// for write the same way `open` would (exclusive lock, resolve a storage
/// replica) so the returned file handle is immediately usable for `write`.
pub fn create(
    fs: &mut RemoteFS,
    req: &Request<'_>,
    parent: u64,
    name: &OsStr,
    mode: u32,
    _umask: u32,
    _flags: i32,
    reply: ReplyCreate,
) {
    let parent_path = match fs.inode_to_path.get(&parent) {
        Some(p) => p.clone(),
        None => {
            reply.error(ENOENT);
            return;
        }
    };
    let filename = match name.to_str() {
        Some(s) => s,
        None => {
            reply.error(ENOENT);
            return;
        }
    };
    let full_path =
        if parent_path.is_empty() { filename.to_string() } else { format!("{parent_path}/{filename}") };
    let canon = canonical(&full_path);

    if let Err(err) = fs.runtime.block_on(fs.naming.create_file(&canon)) {
        reply.error(errno_for(&err));
        return;
    }

    let naming = fs.naming.clone();
    let canon_for_open = canon.clone();
    let result = fs.runtime.block_on(async move {
        naming.lock(&canon_for_open, true).await?;
        match naming.get_storage(&canon_for_open).await {
            Ok(storage) => Ok(storage),
            Err(err) => {
                let _ = naming.unlock(&canon_for_open, true).await;
                Err(err)
            }
        }
    });
    let storage = match result {
        Ok(storage) => storage,
        Err(err) => {
            reply.error(errno_for(&err));
            return;
        }
    };

    let inode = fs.inode_for(&full_path, FileType::RegularFile);
    let fh = fs.next_fh;
    fs.next_fh += 1;
    fs.open_files.insert(fh, OpenHandle { path: full_path, exclusive: true, storage });

    let ts = SystemTime::now();
    let attrs = FileAttr {
        ino: inode,
        size: 0,
        blocks: 0,
        atime: ts,
        mtime: ts,
        ctime: ts,
        crtime: ts,
        kind: FileType::RegularFile,
        perm: (mode & 0o777) as u16,
        nlink: 1,
        uid: req.uid(),
        gid: req.gid(),
        rdev: 0,
        flags: 0,
        blksize: 5120,
    };
    let ttl = Duration::from_secs(fs.config.cache_ttl_seconds);
    fs.attribute_cache.put(inode, attrs, ttl);
    fs.attribute_cache.remove(&parent);

    reply.created(&TTL, &attrs, 0, fh, 0);
}

/// FUSE `mkdir`: creates the directory through the naming server and caches
/// a locally synthesized set of attributes (the naming protocol reports no
/// directory metadata beyond existence).
pub fn mkdir(fs: &mut RemoteFS, _req: &Request<'_>, parent: u64, name: &OsStr, mode: u32, _umask: u32, reply: ReplyEntry) {
    let parent_path = match fs.inode_to_path.get(&parent) {
        Some(p) => p.clone(),
        None => {
            reply.error(ENOENT);
            return;
        }
    };
    let dirname = match name.to_str() {
        Some(s) => s,
        None => {
            reply.error(ENOENT);
            return;
        }
    };
    let full_path =
        if parent_path.is_empty() { dirname.to_string() } else { format!("{parent_path}/{dirname}") };
    let canon = canonical(&full_path);

    if let Err(err) = fs.runtime.block_on(fs.naming.create_directory(&canon)) {
        reply.error(errno_for(&err));
        return;
    }

    let inode = fs.inode_for(&full_path, FileType::Directory);

    let ts = SystemTime::now();
    let attrs = FileAttr {
        ino: inode,
        size: 4096,
        blocks: 8,
        atime: ts,
        mtime: ts,
        ctime: ts,
        crtime: ts,
        kind: FileType::Directory,
        perm: (mode & 0o777) as u16,
        nlink: 2,
        uid: 501,
        gid: 20,
        rdev: 0,
        flags: 0,
        blksize: 5120,
    };
    let ttl = Duration::from_secs(fs.config.cache_ttl_seconds);
    fs.attribute_cache.put(inode, attrs, ttl);
    fs.attribute_cache.remove(&parent);

    reply.entry(&TTL, &attrs, 0);
}
