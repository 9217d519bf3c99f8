use super::prelude::*;
use crate::fs::errno_for;

/// Joins a parent path and a child name the way every FUSE op in this module
/// needs to: empty parent means the child lives directly under the root.
fn join(parent_path: &str, name: &str) -> String {
    if parent_path.is_empty() {
        name.to_string()
    } else {
        format!("{parent_path}/{name}")
    }
}

/// FUSE `lookup`: resolves `name` under `parent` by asking the naming server
/// whether the joined path is a directory, allocating an inode for it on
/// first sight and replying with its cached or freshly fetched attributes.
pub fn lookup(fs: &mut RemoteFS, _req: &Request, parent: u64, name: &OsStr, reply: ReplyEntry) {
    let parent_path = match fs.inode_to_path.get(&parent) {
        Some(p) => p.clone(),
        None => {
            reply.error(ENOENT);
            return;
        }
    };
    let name_str = match name.to_str() {
        Some(s) => s,
        None => {
            reply.error(ENOENT);
            return;
        }
    };
    let full_path = join(&parent_path, name_str);
    let canon = canonical(&full_path);

    let is_dir = match fs.runtime.block_on(fs.naming.is_directory(&canon)) {
        Ok(b) => b,
        Err(_) => {
            reply.error(ENOENT);
            return;
        }
    };
    let kind = if is_dir { FileType::Directory } else { FileType::RegularFile };
    let inode = fs.inode_for(&full_path, kind);

    match crate::fs::attr::fetch_and_cache_attributes(fs, inode) {
        Some(attr) => reply.entry(&TTL, &attr, 0),
        None => reply.error(ENOENT),
    }
}

/// FUSE `readdir`: lists the directory's immediate children through the
/// naming server and reports each one's type by asking `isDirectory` in turn
/// (the naming protocol's `list` only carries names, not types).
pub fn readdir(fs: &mut RemoteFS, _req: &Request, ino: u64, _fh: u64, offset: i64, mut reply: ReplyDirectory) {
    let dir_path = match fs.inode_to_path.get(&ino) {
        Some(p) => p.clone(),
        None => {
            reply.error(ENOENT);
            return;
        }
    };

    let mut entries_to_add: Vec<(u64, FileType, String)> = vec![];
    if offset == 0 {
        entries_to_add.push((ino, FileType::Directory, ".".to_string()));

        let parent_ino = if ino == 1 {
            1
        } else {
            let parent_path = dir_path.rsplit_once('/').map_or("", |(p, _)| p);
            *fs.path_to_inode.get(parent_path).unwrap_or(&1)
        };
        entries_to_add.push((parent_ino, FileType::Directory, "..".to_string()));
    }

    if offset < 2 {
        let names = match fs.runtime.block_on(fs.naming.list(&canonical(&dir_path))) {
            Ok(names) => names,
            Err(_) => {
                reply.ok();
                return;
            }
        };

        for name in names {
            let full_path = join(&dir_path, &name);
            let canon = canonical(&full_path);
            let is_dir = fs.runtime.block_on(fs.naming.is_directory(&canon)).unwrap_or(false);
            let kind = if is_dir { FileType::Directory } else { FileType::RegularFile };
            let inode = fs.inode_for(&full_path, kind);
            entries_to_add.push((inode, kind, name));
        }
    }

    for (i, (ino_to_add, kind_to_add, name_to_add)) in
        entries_to_add.into_iter().enumerate().skip(offset as usize)
    {
        if reply.add(ino_to_add, (i + 1) as i64, kind_to_add, &name_to_add) {
            break;
        }
    }
    reply.ok();
}

/// FUSE `read`: serves directly from the storage replica recorded in the
/// open file handle, using the protocol's true ranged `read` rather than
/// fetching the whole file.
pub fn read(
    fs: &mut RemoteFS,
    _req: &Request<'_>,
    _ino: u64,
    fh: u64,
    offset: i64,
    size: u32,
    _flags: i32,
    _lock_owner: Option<u64>,
    reply: ReplyData,
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
    let result = fs.runtime.block_on(fs.storage.read(&storage, &canon, offset, size as i64));
    match result {
        Ok(data) => reply.data(&data),
        Err(err) => reply.error(errno_for(&err)),
    }
}

/// FUSE `open`: acquires the naming-server lock for the duration of this
/// session (shared for read-only opens, exclusive otherwise) and resolves
/// the storage replica to read or write through, stashing both in an
/// [`OpenHandle`] keyed by a freshly minted file handle.
pub fn open(fs: &mut RemoteFS, _req: &Request<'_>, ino: u64, flags: i32, reply: ReplyOpen) {
    let write_access = (flags & libc::O_WRONLY != 0) || (flags & libc::O_RDWR != 0);

    let path = match fs.inode_to_path.get(&ino) {
        Some(p) => p.clone(),
        None => {
            reply.error(ENOENT);
            return;
        }
    };
    let canon = canonical(&path);
    let exclusive = write_access;

    let naming = fs.naming.clone();
    let canon_for_lock = canon.clone();
    let result = fs.runtime.block_on(async move {
        naming.lock(&canon_for_lock, exclusive).await?;
        match naming.get_storage(&canon_for_lock).await {
            Ok(storage) => Ok(storage),
            Err(err) => {
                let _ = naming.unlock(&canon_for_lock, exclusive).await;
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

    let fh = fs.next_fh;
    fs.next_fh += 1;
    fs.open_files.insert(fh, OpenHandle { path, exclusive, storage });
    reply.opened(fh, 0);
}
