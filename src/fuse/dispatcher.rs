//! Per-hook filesystem logic.
//!
//! Each method resolves node ids through the path cache, talks to the
//! remote store and returns a typed result. Conversion to errno happens
//! only in `operations.rs`.
//!
//! The store is append-only: a write at an arbitrary offset is emulated
//! with a suffix truncate followed by an append. Multi-step hooks (create,
//! rename, write) have no rollback; if a follow-up stat fails after the
//! remote change succeeded, the caches stay stale until the next lookup.

use std::sync::Arc;

use crate::api::error::RemoteError;
use crate::api::types::XAttrSetFlag;
use crate::fuse::attr::{mode_to_permission, FileAttributes, NodeKind};
use crate::fuse::error::FsError;
use crate::fuse::path_cache::{child_path, ROOT_INO};
use crate::fuse::store::ListingPages;
use crate::state::FsState;

/// Generation number reported with every entry.
pub const GENERATION: u64 = 1;

/// Assumed size of one directory record when budgeting a readdir buffer.
pub const DIRENT_SIZE: u32 = 32;

/// Upper bound on the data returned for a single read.
const MAX_READ: u32 = 1024 * 1024;

const XATTR_REPLACE: i32 = 2;

/// One directory record. `offset` is the cookie the kernel passes back to
/// resume after this entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub ino: u64,
    pub offset: i64,
    pub kind: NodeKind,
    pub name: String,
}

/// Attribute changes requested by setattr. Times are epoch milliseconds.
#[derive(Debug, Clone, Default)]
pub struct SetAttrRequest {
    pub mode: Option<u32>,
    pub size: Option<u64>,
    pub atime_ms: Option<i64>,
    pub mtime_ms: Option<i64>,
}

/// Answer to getxattr/listxattr: either the length the caller must
/// allocate (size probe) or the bytes themselves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XattrReply {
    Size(u32),
    Data(Vec<u8>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatFs {
    pub blocks: u64,
    pub bfree: u64,
    pub bavail: u64,
    pub files: u64,
    pub ffree: u64,
    pub bsize: u32,
    pub namelen: u32,
    pub frsize: u32,
}

pub struct Dispatcher {
    state: Arc<FsState>,
}

impl Dispatcher {
    pub fn new(state: Arc<FsState>) -> Self {
        Self { state }
    }

    #[cfg(test)]
    pub fn state(&self) -> &FsState {
        &self.state
    }

    fn path_of(&self, ino: u64) -> Result<String, FsError> {
        self.state.paths.get(ino).ok_or(FsError::Unresolvable(ino))
    }

    fn child_of(&self, parent: u64, name: &str) -> Result<String, FsError> {
        if name.is_empty() || name.contains('/') {
            return Err(FsError::InvalidName);
        }
        Ok(child_path(&self.path_of(parent)?, name))
    }

    fn stat_attrs(&self, path: &str) -> Result<FileAttributes, FsError> {
        let status = self.state.store.stat(path)?;
        Ok(self.state.adapter.adapt(status))
    }

    /// Stat a freshly created path and make it resolvable.
    fn register(&self, path: &str) -> Result<FileAttributes, FsError> {
        self.state.negative.delete(path);
        let attr = self.stat_attrs(path)?;
        self.state.paths.set(attr.ino, path);
        Ok(attr)
    }

    // ── metadata ─────────────────────────────────────────────────────────

    pub fn getattr(&self, ino: u64) -> Result<FileAttributes, FsError> {
        if ino == ROOT_INO {
            return Ok(self.state.root_attr.clone());
        }
        let path = self.path_of(ino)?;
        match self.state.store.stat(&path) {
            Ok(status) => Ok(self.state.adapter.adapt(status)),
            Err(RemoteError::Transport(msg)) => {
                log::warn!("getattr: {}: {}", path, msg);
                Err(RemoteError::Transport(msg).into())
            }
            Err(e) => {
                log::debug!("getattr: {}: {}", path, e);
                Err(RemoteError::NotFound.into())
            }
        }
    }

    pub fn lookup(&self, parent: u64, name: &str) -> Result<FileAttributes, FsError> {
        let path = self.child_of(parent, name)?;

        if !self.state.negative.is_absent(&path) {
            log::trace!("lookup: {} inside negative window", path);
            return Err(RemoteError::NotFound.into());
        }

        match self.state.store.stat(&path) {
            Ok(status) => {
                let attr = self.state.adapter.adapt(status);
                self.state.paths.set(attr.ino, &path);
                Ok(attr)
            }
            Err(RemoteError::Transport(e)) => {
                log::warn!("lookup: {}: {}", path, e);
                Err(RemoteError::Transport(e).into())
            }
            Err(e) => {
                if !matches!(e, RemoteError::NotFound) {
                    log::debug!("lookup: {}: {}, treating as absent", path, e);
                }
                self.state
                    .negative
                    .insert(&path, self.state.negative_timeout);
                Err(RemoteError::NotFound.into())
            }
        }
    }

    pub fn setattr(&self, ino: u64, req: &SetAttrRequest) -> Result<FileAttributes, FsError> {
        let path = self.path_of(ino)?;
        let store = &self.state.store;

        if let Some(size) = req.size {
            store.truncate(&path, size)?;
        }
        if let Some(mode) = req.mode {
            store.set_permission(&path, &mode_to_permission(mode))?;
        }
        if req.atime_ms.is_some() || req.mtime_ms.is_some() {
            store.set_times(&path, req.mtime_ms.unwrap_or(-1), req.atime_ms.unwrap_or(-1))?;
        }

        self.getattr(ino)
    }

    pub fn readlink(&self, ino: u64) -> Result<Vec<u8>, FsError> {
        let path = self.path_of(ino)?;
        let status = self.state.store.stat(&path)?;
        match status.symlink {
            Some(target) if status.kind == "SYMLINK" => Ok(target.into_bytes()),
            _ => Err(FsError::InvalidArgument(format!("{} is not a symlink", path))),
        }
    }

    // ── directories ──────────────────────────────────────────────────────

    /// List a directory starting at entry index `offset`, returning at most
    /// `size / 32` entries. "." and ".." occupy indices 0 and 1.
    pub fn readdir(&self, ino: u64, size: u32, offset: i64) -> Result<Vec<DirEntry>, FsError> {
        let path = self.path_of(ino)?;
        let budget = (size / DIRENT_SIZE) as usize;
        let start = offset.max(0);
        let mut entries = Vec::new();
        if budget == 0 {
            return Ok(entries);
        }

        let mut index: i64 = 0;
        for name in [".", ".."] {
            if index >= start {
                entries.push(DirEntry {
                    ino,
                    offset: index + 1,
                    kind: NodeKind::Directory,
                    name: name.to_string(),
                });
                if entries.len() >= budget {
                    return Ok(entries);
                }
            }
            index += 1;
        }

        for page in ListingPages::new(&*self.state.store, &path) {
            for status in page? {
                if index >= start {
                    let name = status.path_suffix.clone();
                    let attr = self.state.adapter.adapt(status);
                    entries.push(DirEntry {
                        ino: attr.ino,
                        offset: index + 1,
                        kind: attr.kind,
                        name,
                    });
                    if entries.len() >= budget {
                        return Ok(entries);
                    }
                }
                index += 1;
            }
        }

        Ok(entries)
    }

    pub fn mkdir(&self, parent: u64, name: &str, mode: u32) -> Result<FileAttributes, FsError> {
        let path = self.child_of(parent, name)?;
        log::debug!("mkdir: {} mode {:o}", path, mode);
        self.state.store.mkdir(&path, &mode_to_permission(mode))?;
        self.register(&path)
    }

    pub fn rmdir(&self, parent: u64, name: &str) -> Result<(), FsError> {
        self.remove(parent, name)
    }

    // ── files ────────────────────────────────────────────────────────────

    pub fn create(&self, parent: u64, name: &str, mode: u32) -> Result<FileAttributes, FsError> {
        let path = self.child_of(parent, name)?;
        log::debug!("create: {} mode {:o}", path, mode);
        self.state.store.create(&path, &mode_to_permission(mode))?;
        self.register(&path)
    }

    pub fn symlink(&self, parent: u64, link_name: &str, target: &str) -> Result<FileAttributes, FsError> {
        let path = self.child_of(parent, link_name)?;
        log::debug!("symlink: {} -> {}", path, target);
        self.state.store.create_symlink(target, &path)?;
        self.register(&path)
    }

    /// Read up to `size` bytes at `offset`. Reading past the end yields an
    /// empty buffer.
    pub fn read(&self, ino: u64, offset: i64, size: u32) -> Result<Vec<u8>, FsError> {
        let path = self.path_of(ino)?;
        let offset = u64::try_from(offset)
            .map_err(|_| FsError::InvalidArgument(format!("negative offset {}", offset)))?;
        match self.state.store.read(&path, offset, size.min(MAX_READ)) {
            Ok(data) => Ok(data),
            Err(RemoteError::EndOfFile) => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Write `data` at `offset` on an append-only store.
    ///
    /// At the current end: append. Inside the file: truncate to `offset`,
    /// then append (everything after the written range is discarded). Past
    /// the end: append the zero-filled gap together with `data`.
    pub fn write(&self, ino: u64, offset: i64, data: &[u8]) -> Result<u32, FsError> {
        let path = self.path_of(ino)?;
        let offset = u64::try_from(offset)
            .map_err(|_| FsError::InvalidArgument(format!("negative offset {}", offset)))?;
        let written = u32::try_from(data.len())
            .map_err(|_| FsError::InvalidArgument("write too large".to_string()))?;
        let store = &self.state.store;

        let current = store.stat(&path)?.length;
        if offset == current {
            store.append(&path, data)?;
        } else if offset < current {
            log::debug!("write: {} truncating {} -> {}", path, current, offset);
            store.truncate(&path, offset)?;
            store.append(&path, data)?;
        } else {
            let gap = usize::try_from(offset - current)
                .map_err(|_| FsError::InvalidArgument("write gap too large".to_string()))?;
            log::debug!("write: {} filling {} byte gap", path, gap);
            let mut buf = vec![0u8; gap];
            buf.extend_from_slice(data);
            store.append(&path, &buf)?;
        }
        Ok(written)
    }

    pub fn unlink(&self, parent: u64, name: &str) -> Result<(), FsError> {
        self.remove(parent, name)
    }

    fn remove(&self, parent: u64, name: &str) -> Result<(), FsError> {
        let path = self.child_of(parent, name)?;
        let ino = self.state.store.stat(&path)?.file_id;
        self.state.store.delete(&path)?;
        self.state.paths.delete(ino);
        log::debug!("removed {} (ino {})", path, ino);
        Ok(())
    }

    pub fn rename(
        &self,
        parent: u64,
        name: &str,
        new_parent: u64,
        new_name: &str,
    ) -> Result<(), FsError> {
        let from = self.child_of(parent, name)?;
        let to = self.child_of(new_parent, new_name)?;
        let store = &self.state.store;

        let source_ino = store.stat(&from)?.file_id;
        store.rename(&from, &to)?;
        let dest_ino = store.stat(&to)?.file_id;

        self.state.paths.delete(source_ino);
        self.state.paths.set(dest_ino, &to);
        self.state.negative.delete(&to);
        log::debug!("rename: {} -> {}", from, to);
        Ok(())
    }

    // ── extended attributes ──────────────────────────────────────────────

    /// Set an attribute. Unless the caller demanded REPLACE, the attribute
    /// is created, and an "already exists" answer is retried once as a
    /// replace.
    pub fn setxattr(&self, ino: u64, name: &str, value: &[u8], flags: i32) -> Result<(), FsError> {
        let path = self.path_of(ino)?;
        let store = &self.state.store;

        if flags & XATTR_REPLACE != 0 {
            store.set_xattr(&path, name, value, XAttrSetFlag::Replace)?;
            return Ok(());
        }

        match store.set_xattr(&path, name, value, XAttrSetFlag::Create) {
            Err(RemoteError::AlreadyExists) => {
                log::debug!("setxattr: {} {} exists, replacing", path, name);
                store.set_xattr(&path, name, value, XAttrSetFlag::Replace)?;
                Ok(())
            }
            other => Ok(other?),
        }
    }

    pub fn getxattr(&self, ino: u64, name: &str, size: u32) -> Result<XattrReply, FsError> {
        let path = self.path_of(ino)?;
        let value = self.state.store.get_xattr(&path, name)?;
        size_probe(value, size)
    }

    /// Names are returned NUL-terminated and concatenated.
    pub fn listxattr(&self, ino: u64, size: u32) -> Result<XattrReply, FsError> {
        let path = self.path_of(ino)?;
        let mut buf = Vec::new();
        for name in self.state.store.list_xattrs(&path)? {
            buf.extend_from_slice(name.as_bytes());
            buf.push(0);
        }
        size_probe(buf, size)
    }

    pub fn removexattr(&self, ino: u64, name: &str) -> Result<(), FsError> {
        let path = self.path_of(ino)?;
        self.state.store.remove_xattr(&path, name)?;
        Ok(())
    }

    // ── filesystem ───────────────────────────────────────────────────────

    /// The store exposes no capacity figures; report a large, mostly free
    /// volume so tools that check free space proceed.
    pub fn statfs(&self) -> StatFs {
        const BLOCK: u64 = 4096;
        const TOTAL_BYTES: u64 = 1 << 50;
        let blocks = TOTAL_BYTES / BLOCK;
        let files = self.state.paths.len() as u64;
        StatFs {
            blocks,
            bfree: blocks,
            bavail: blocks,
            files,
            ffree: u64::from(u32::MAX),
            bsize: BLOCK as u32,
            namelen: 255,
            frsize: BLOCK as u32,
        }
    }
}

fn size_probe(data: Vec<u8>, size: u32) -> Result<XattrReply, FsError> {
    let len = u32::try_from(data.len()).map_err(|_| RemoteError::OutOfRange)?;
    if size == 0 {
        Ok(XattrReply::Size(len))
    } else if len > size {
        Err(RemoteError::OutOfRange.into())
    } else {
        Ok(XattrReply::Data(data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_probe() {
        assert_eq!(size_probe(b"abc".to_vec(), 0).unwrap(), XattrReply::Size(3));
        assert_eq!(
            size_probe(b"abc".to_vec(), 3).unwrap(),
            XattrReply::Data(b"abc".to_vec())
        );
        assert_eq!(size_probe(b"abc".to_vec(), 2).unwrap_err().errno(), libc::ERANGE);
    }
}
