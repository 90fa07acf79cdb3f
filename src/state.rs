//! Shared filesystem state.
//!
//! Built once at startup and shared through `Arc` into the dispatcher. The
//! two caches are guarded independently; there is no cross-cache transaction.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::fuse::attr::{AttributeAdapter, FileAttributes, NodeKind, DIR_SIZE, DEFAULT_BLKSIZE};
use crate::fuse::cache::NegativeLookupCache;
use crate::fuse::path_cache::{PathIdentityCache, ROOT_INO};
use crate::fuse::store::RemoteStore;

pub struct FsState {
    /// Node-id → remote path.
    pub paths: PathIdentityCache,

    /// Paths recently confirmed absent.
    pub negative: NegativeLookupCache,

    /// How long a failed lookup stays in `negative`.
    pub negative_timeout: Duration,

    pub store: Arc<dyn RemoteStore>,

    pub adapter: AttributeAdapter,

    /// Attributes of "/", fixed at construction.
    pub root_attr: FileAttributes,
}

impl FsState {
    pub fn new(
        store: Arc<dyn RemoteStore>,
        adapter: AttributeAdapter,
        negative: NegativeLookupCache,
        negative_timeout: Duration,
    ) -> Self {
        let uid = nix::unistd::getuid().as_raw();
        let gid = nix::unistd::getgid().as_raw();
        Self {
            paths: PathIdentityCache::new(),
            negative,
            negative_timeout,
            store,
            adapter,
            root_attr: root_attributes(uid, gid, SystemTime::now()),
        }
    }
}

/// Synthesized record for the mount root: a world-writable directory owned
/// by the running process, stamped with the start time.
pub fn root_attributes(uid: u32, gid: u32, started: SystemTime) -> FileAttributes {
    let now_ns = started
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_nanos()).unwrap_or(i64::MAX))
        .unwrap_or(0);
    FileAttributes {
        ino: ROOT_INO,
        kind: NodeKind::Directory,
        size: DIR_SIZE,
        blocks: DIR_SIZE / 512,
        nlink: 2,
        uid,
        gid,
        perm: 0o777,
        blksize: DEFAULT_BLKSIZE,
        atime_ns: now_ns,
        mtime_ns: now_ns,
        ctime_ns: now_ns,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_attributes() {
        let started = UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        let attr = root_attributes(1000, 100, started);
        assert_eq!(attr.ino, 1);
        assert_eq!(attr.kind, NodeKind::Directory);
        assert_eq!(attr.perm, 0o777);
        assert_eq!(attr.size, 4096);
        assert_eq!(attr.nlink, 2);
        assert_eq!(attr.uid, 1000);
        assert_eq!(attr.gid, 100);
        assert_eq!(attr.mtime_ns, 1_700_000_000 * 1_000_000_000);
        assert_eq!(attr.atime_ns, attr.mtime_ns);
        assert_eq!(attr.ctime_ns, attr.mtime_ns);
    }
}
