use super::prelude::*;
use crate::fs::errno_for;
use crate::naming_client::NamingClient;
use crate::storage_client::StorageClient;
use nfs_common::AppError;
use std::future::Future;
use std::pin::Pin;

fn join(parent_path: &str, name: &str) -> String {
    if parent_path.is_empty() {
        name.to_string()
    } else {
        format!("{parent_path}/{name}")
    }
}

async fn copy_file(naming: &NamingClient, storage: &StorageClient, old: &str, new: &str) -> Result<(), AppError> {
    let src = naming.get_storage(old).await?;
    let size = storage.size(&src, old).await?;
    let content = storage.read(&src, old, 0, size).await?;
    naming.create_file(new).await?;
    let dst = naming.get_storage(new).await?;
    if !content.is_empty() {
        storage.write(&dst, new, 0, content).await?;
    }
    naming.delete(old).await?;
    Ok(())
}

/// Recursively moves a directory by creating the new tree, copying each
/// child (files via [`copy_file`], subdirectories by recursing), and
/// finally deleting the now-empty source directory. There is no
/// naming-protocol `rename`, so this is the only way to express `mv` for a
/// directory; it is not atomic and can be slow for large trees.
fn move_dir<'a>(
    naming: &'a NamingClient,
    storage: &'a StorageClient,
    old: &'a str,
    new: &'a str,
) -> Pin<Box<dyn Future<Output = Result<(), AppError>> + 'a>> {
    Box::pin(async move {
        naming.create_directory(new).await?;
        let names = naming.list(old).await?;
        for name in names {
            let old_child = format!("{old}/{name}");
            let new_child = format!("{new}/{name}");
            if naming.is_directory(&old_child).await? {
                move_dir(naming, storage, &old_child, &new_child).await?;
            } else {
                copy_file(naming, storage, &old_child, &new_child).await?;
            }
        }
        naming.delete(old).await?;
        Ok(())
    })
}

/// FUSE `rename`: the naming protocol has no rename call, so files move by
/// copy-then-delete and directories by [`move_dir`]. Both paths go through
/// the same `lock`-free metadata RPCs every other op uses (each is already
/// self-locking server-side).
pub fn rename(
    fs: &mut RemoteFS,
    _req: &Request<'_>,
    parent: u64,
    name: &OsStr,
    newparent: u64,
    newname: &OsStr,
    _flags: u32,
    reply: ReplyEmpty,
) {
    let old_parent_path = match fs.inode_to_path.get(&parent) {
        Some(p) => p.clone(),
        None => {
            reply.error(ENOENT);
            return;
        }
    };
    let new_parent_path = match fs.inode_to_path.get(&newparent) {
        Some(p) => p.clone(),
        None => {
            reply.error(ENOENT);
            return;
        }
    };
    let old_name = match name.to_str() {
        Some(s) => s,
        None => {
            reply.error(ENOENT);
            return;
        }
    };
    let new_name = match newname.to_str() {
        Some(s) => s,
        None => {
            reply.error(ENOENT);
            return;
        }
    };

    let old_full_path = join(&old_parent_path, old_name);
    let new_full_path = join(&new_parent_path, new_name);
    let old_canon = canonical(&old_full_path);
    let new_canon = canonical(&new_full_path);

    let naming = fs.naming.clone();
    let storage_client = fs.storage.clone();
    let result = fs.runtime.block_on(async move {
        if naming.is_directory(&old_canon).await? {
            move_dir(&naming, &storage_client, &old_canon, &new_canon).await
        } else {
            copy_file(&naming, &storage_client, &old_canon, &new_canon).await
        }
    });

    if let Err(err) = result {
        reply.error(errno_for(&err));
        return;
    }

    if let Some(inode) = fs.path_to_inode.remove(&old_full_path) {
        fs.attribute_cache.remove(&inode);
        fs.path_to_inode.insert(new_full_path.clone(), inode);
        fs.inode_to_path.insert(inode, new_full_path);
    }
    if let Some(&inode_parent) = fs.path_to_inode.get(&old_parent_path) {
        fs.attribute_cache.remove(&inode_parent);
    }
    if let Some(&inode_newparent) = fs.path_to_inode.get(&new_parent_path) {
        fs.attribute_cache.remove(&inode_newparent);
    }

    reply.ok();
}
