//! Common imports shared by every FUSE operation module (`read.rs`,
//! `write.rs`, etc.), so each file only has to say `use super::prelude::*;`.

pub use fuser::{
    FileAttr, FileType, ReplyAttr, ReplyCreate, ReplyData, ReplyDirectory, ReplyEmpty, ReplyEntry,
    ReplyOpen, ReplyWrite, ReplyXattr, Request, TimeOrNow,
};

pub use libc::{EBADF, EIO, ENOENT, ENOTEMPTY};
#[cfg(not(target_os = "macos"))]
pub use libc::ENODATA;
#[cfg(target_os = "macos")]
pub use libc::ENOATTR;

pub use std::collections::HashMap;
pub use std::ffi::OsStr;
pub use std::time::{Duration, SystemTime, UNIX_EPOCH};

pub use super::{canonical, OpenHandle, RemoteFS, ROOT_DIR_ATTR, TTL};
