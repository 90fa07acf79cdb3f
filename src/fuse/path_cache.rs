//! Node-id to path table.
//!
//! Node ids are the store's `fileId`, so they stay stable for the whole
//! session. Entries are last-write-wins and there is no reverse index.

use std::collections::HashMap;
use std::sync::RwLock;

/// Root inode number (standard FUSE convention).
pub const ROOT_INO: u64 = 1;

/// Path of the mount root on the remote store.
pub const ROOT_PATH: &str = "/";

pub struct PathIdentityCache {
    paths: RwLock<HashMap<u64, String>>,
}

impl Default for PathIdentityCache {
    fn default() -> Self {
        Self::new()
    }
}

impl PathIdentityCache {
    pub fn new() -> Self {
        let mut paths = HashMap::new();
        paths.insert(ROOT_INO, ROOT_PATH.to_string());
        Self {
            paths: RwLock::new(paths),
        }
    }

    /// Path registered for `ino`, or `None` if the id is unresolvable.
    pub fn get(&self, ino: u64) -> Option<String> {
        self.paths
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&ino)
            .cloned()
    }

    /// Register (or overwrite) the path for `ino`. The root mapping is fixed.
    pub fn set(&self, ino: u64, path: &str) {
        if ino == ROOT_INO {
            return;
        }
        self.paths
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(ino, path.to_string());
    }

    /// Forget `ino`. The root mapping is never evicted.
    pub fn delete(&self, ino: u64) {
        if ino == ROOT_INO {
            return;
        }
        self.paths
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&ino);
    }

    pub fn len(&self) -> usize {
        self.paths.read().unwrap_or_else(|e| e.into_inner()).len()
    }
}

/// Join a parent directory path and a child name.
pub fn child_path(parent: &str, name: &str) -> String {
    if parent.ends_with('/') {
        format!("{}{}", parent, name)
    } else {
        format!("{}/{}", parent, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_is_seeded() {
        let cache = PathIdentityCache::new();
        assert_eq!(cache.get(ROOT_INO).as_deref(), Some("/"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_set_get_delete() {
        let cache = PathIdentityCache::new();
        cache.set(16386, "/data/a.txt");
        assert_eq!(cache.get(16386).as_deref(), Some("/data/a.txt"));

        cache.set(16386, "/data/b.txt");
        assert_eq!(cache.get(16386).as_deref(), Some("/data/b.txt"));

        cache.delete(16386);
        assert!(cache.get(16386).is_none());
    }

    #[test]
    fn test_root_cannot_be_replaced_or_evicted() {
        let cache = PathIdentityCache::new();
        cache.set(ROOT_INO, "/elsewhere");
        cache.delete(ROOT_INO);
        assert_eq!(cache.get(ROOT_INO).as_deref(), Some("/"));
    }

    #[test]
    fn test_unknown_id_is_unresolvable() {
        let cache = PathIdentityCache::new();
        assert!(cache.get(42).is_none());
    }

    #[test]
    fn test_child_path() {
        assert_eq!(child_path("/", "a"), "/a");
        assert_eq!(child_path("/a", "b"), "/a/b");
    }

    #[test]
    fn test_default_seeds_root() {
        let cache = PathIdentityCache::default();
        assert_eq!(cache.get(ROOT_INO).as_deref(), Some("/"));
        assert_eq!(cache.len(), 1);
    }
}
