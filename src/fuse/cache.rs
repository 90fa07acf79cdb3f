//! Negative lookup cache: paths recently confirmed absent on the store.
//!
//! Repeated probes for missing files (lock files, editor swap files) would
//! each cost a round trip. A failed lookup is remembered for a fixed window;
//! a remote creation inside that window stays invisible until it expires.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

/// Source of the current instant. Swapped for a manual clock in tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

pub struct NegativeLookupCache {
    entries: RwLock<HashMap<String, Instant>>,
    clock: Box<dyn Clock>,
}

impl Default for NegativeLookupCache {
    fn default() -> Self {
        Self::new()
    }
}

impl NegativeLookupCache {
    pub fn new() -> Self {
        Self::with_clock(Box::new(SystemClock))
    }

    pub fn with_clock(clock: Box<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            clock,
        }
    }

    /// Returns `true` when the remote store must be asked: there is no entry
    /// for `path` or its window has passed. An expired entry is removed here.
    /// Returns `false` while `path` is inside its negative window.
    pub fn is_absent(&self, path: &str) -> bool {
        let now = self.clock.now();
        {
            let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
            match entries.get(path) {
                None => return true,
                Some(expiry) if now < *expiry => return false,
                Some(_) => {}
            }
        }

        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        // Re-check: another thread may have refreshed the entry meanwhile.
        if let Some(expiry) = entries.get(path) {
            if now < *expiry {
                return false;
            }
            entries.remove(path);
            log::trace!("negative entry expired: {}", path);
        }
        true
    }

    /// Remember `path` as absent for `timeout`.
    pub fn insert(&self, path: &str, timeout: Duration) {
        let expiry = self.clock.now() + timeout;
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(path.to_string(), expiry);
    }

    pub fn delete(&self, path: &str) {
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(path);
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }
}

/// Clock that only moves when told to.
#[cfg(test)]
pub struct ManualClock {
    start: Instant,
    offset: std::sync::Arc<std::sync::Mutex<Duration>>,
}

#[cfg(test)]
impl ManualClock {
    /// Returns the clock plus a handle for advancing it after the clock has
    /// been boxed into a cache.
    pub fn new() -> (Self, std::sync::Arc<std::sync::Mutex<Duration>>) {
        let offset = std::sync::Arc::new(std::sync::Mutex::new(Duration::ZERO));
        (
            Self {
                start: Instant::now(),
                offset: offset.clone(),
            },
            offset,
        )
    }
}

#[cfg(test)]
impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.start + *self.offset.lock().unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manual_cache() -> (NegativeLookupCache, std::sync::Arc<std::sync::Mutex<Duration>>) {
        let (clock, offset) = ManualClock::new();
        (NegativeLookupCache::with_clock(Box::new(clock)), offset)
    }

    #[test]
    fn test_unknown_path_is_absent() {
        let (cache, _) = manual_cache();
        assert!(cache.is_absent("/never/seen"));
    }

    #[test]
    fn test_inside_window_is_not_absent() {
        let (cache, offset) = manual_cache();
        cache.insert("/a", Duration::from_secs(200));
        assert!(!cache.is_absent("/a"));

        *offset.lock().unwrap() = Duration::from_secs(199);
        assert!(!cache.is_absent("/a"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_expired_entry_is_removed_on_check() {
        let (cache, offset) = manual_cache();
        cache.insert("/a", Duration::from_secs(200));

        *offset.lock().unwrap() = Duration::from_secs(200);
        assert_eq!(cache.len(), 1);
        assert!(cache.is_absent("/a"));
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn test_delete_clears_window() {
        let (cache, _) = manual_cache();
        cache.insert("/a", Duration::from_secs(200));
        cache.delete("/a");
        assert!(cache.is_absent("/a"));
    }

    #[test]
    fn test_reinsert_extends_window() {
        let (cache, offset) = manual_cache();
        cache.insert("/a", Duration::from_secs(10));
        *offset.lock().unwrap() = Duration::from_secs(5);
        cache.insert("/a", Duration::from_secs(10));
        *offset.lock().unwrap() = Duration::from_secs(12);
        assert!(!cache.is_absent("/a"));
    }

    #[test]
    fn test_default_cache_starts_empty() {
        let cache = NegativeLookupCache::default();
        assert_eq!(cache.len(), 0);
        assert!(cache.is_absent("/a"));
        cache.insert("/a", Duration::from_secs(200));
        assert!(!cache.is_absent("/a"));
    }
}
