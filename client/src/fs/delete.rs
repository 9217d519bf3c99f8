use super::prelude::*;
use crate::fs::errno_for;

fn join(parent_path: &str, name: &str) -> String {
    if parent_path.is_empty() {
        name.to_string()
    } else {
        format!("{parent_path}/{name}")
    }
}

/// FUSE `rmdir`: checked for emptiness client-side (POSIX `rmdir` must fail
/// on a non-empty directory; the naming server's `delete` removes a whole
/// subtree without asking), then forwarded to [`unlink`].
pub fn rmdir(fs: &mut RemoteFS, req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEmpty) {
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
    let full_path = join(&parent_path, dirname);

    match fs.runtime.block_on(fs.naming.list(&canonical(&full_path))) {
        Ok(entries) if !entries.is_empty() => {
            reply.error(ENOTEMPTY);
            return;
        }
        Ok(_) => {}
        Err(err) => {
            reply.error(errno_for(&err));
            return;
        }
    }

    unlink(fs, req, parent, name, reply);
}

/// FUSE `unlink`: removes the path via a single naming-server `delete` call,
/// which recursively tears down the whole subtree and its replicas
/// server-side, then drops the path from local inode bookkeeping.
pub fn unlink(fs: &mut RemoteFS, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEmpty) {
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
    let full_path = join(&parent_path, filename);
    let canon = canonical(&full_path);

    if let Err(err) = fs.runtime.block_on(fs.naming.delete(&canon)) {
        reply.error(errno_for(&err));
        return;
    }

    fs.forget_path(&full_path);
    fs.attribute_cache.remove(&parent);

    reply.ok();
}
