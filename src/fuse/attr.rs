//! Conversion of remote status records into POSIX-shaped attributes.
//!
//! Everything here is a pure transform except owner/group resolution,
//! which consults the local user database once per distinct name.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::api::types::FileStatus;

/// Reported size and block size for directories.
pub const DIR_SIZE: u64 = 4096;

/// Fallback block size when the store reports none.
pub const DEFAULT_BLKSIZE: u32 = 4096;

/// Numeric id used when neither the name nor the fallback name resolves.
pub const NOBODY_ID: u32 = 65534;

const FALLBACK_USER: &str = "nobody";
const FALLBACK_GROUP: &str = "nogroup";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    File,
    Directory,
    Symlink,
    Unknown,
}

impl NodeKind {
    pub fn from_remote(kind: &str) -> Self {
        match kind {
            "DIRECTORY" => NodeKind::Directory,
            "FILE" => NodeKind::File,
            "SYMLINK" => NodeKind::Symlink,
            _ => NodeKind::Unknown,
        }
    }
}

/// Adapted attributes. Timestamps are nanoseconds since the Unix epoch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileAttributes {
    pub ino: u64,
    pub kind: NodeKind,
    pub size: u64,
    pub blocks: u64,
    pub nlink: u32,
    pub uid: u32,
    pub gid: u32,
    pub perm: u16,
    pub blksize: u32,
    pub atime_ns: i64,
    pub mtime_ns: i64,
    pub ctime_ns: i64,
}

/// Local name → numeric id lookups.
pub trait IdentityDirectory: Send + Sync {
    fn uid_of(&self, user: &str) -> Option<u32>;
    fn gid_of(&self, group: &str) -> Option<u32>;
}

/// The host's passwd/group databases.
pub struct SystemDirectory;

impl IdentityDirectory for SystemDirectory {
    fn uid_of(&self, user: &str) -> Option<u32> {
        match nix::unistd::User::from_name(user) {
            Ok(found) => found.map(|u| u.uid.as_raw()),
            Err(e) => {
                log::warn!("User lookup failed for {}: {}", user, e);
                None
            }
        }
    }

    fn gid_of(&self, group: &str) -> Option<u32> {
        match nix::unistd::Group::from_name(group) {
            Ok(found) => found.map(|g| g.gid.as_raw()),
            Err(e) => {
                log::warn!("Group lookup failed for {}: {}", group, e);
                None
            }
        }
    }
}

pub struct AttributeAdapter {
    directory: Box<dyn IdentityDirectory>,
    uids: RwLock<HashMap<String, u32>>,
    gids: RwLock<HashMap<String, u32>>,
}

impl AttributeAdapter {
    pub fn new(directory: Box<dyn IdentityDirectory>) -> Self {
        Self {
            directory,
            uids: RwLock::new(HashMap::new()),
            gids: RwLock::new(HashMap::new()),
        }
    }

    /// Adapt one remote record. The record is consumed.
    pub fn adapt(&self, status: FileStatus) -> FileAttributes {
        let kind = NodeKind::from_remote(&status.kind);
        let (size, nlink) = match kind {
            NodeKind::Directory => (DIR_SIZE, 2),
            _ => (status.length, 1),
        };

        let mtime_ns = millis_to_nanos(status.modification_time);
        let atime_ns = if status.access_time == 0 {
            mtime_ns
        } else {
            millis_to_nanos(status.access_time)
        };

        let blksize = if status.block_size == 0 {
            DEFAULT_BLKSIZE
        } else {
            u32::try_from(status.block_size).unwrap_or(u32::MAX)
        };

        FileAttributes {
            ino: status.file_id,
            kind,
            size,
            blocks: size.div_ceil(512),
            nlink,
            uid: self.resolve_uid(&status.owner),
            gid: self.resolve_gid(&status.group),
            perm: parse_permission(&status.permission),
            blksize,
            atime_ns,
            mtime_ns,
            ctime_ns: mtime_ns,
        }
    }

    fn resolve_uid(&self, user: &str) -> u32 {
        if let Some(uid) = self.uids.read().unwrap_or_else(|e| e.into_inner()).get(user) {
            return *uid;
        }
        let uid = self
            .directory
            .uid_of(user)
            .or_else(|| self.directory.uid_of(FALLBACK_USER))
            .unwrap_or(NOBODY_ID);
        self.uids
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(user.to_string(), uid);
        uid
    }

    fn resolve_gid(&self, group: &str) -> u32 {
        if let Some(gid) = self.gids.read().unwrap_or_else(|e| e.into_inner()).get(group) {
            return *gid;
        }
        let gid = self
            .directory
            .gid_of(group)
            .or_else(|| self.directory.gid_of(FALLBACK_GROUP))
            .unwrap_or(NOBODY_ID);
        self.gids
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(group.to_string(), gid);
        gid
    }
}

fn millis_to_nanos(ms: i64) -> i64 {
    ms.saturating_mul(1_000_000)
}

/// Parse an octal permission string ("755", "1777"). Invalid input is 0.
pub fn parse_permission(permission: &str) -> u16 {
    u16::from_str_radix(permission, 8)
        .map(|p| p & 0o7777)
        .unwrap_or(0)
}

/// Render mode bits the way the store expects: sticky bit plus rwx, octal.
pub fn mode_to_permission(mode: u32) -> String {
    format!("{:o}", mode & 0o1777)
}
