//! In-process cache for verification results.
//!
//! Keeps command outcomes for a TTL so repeated analyses of the same file do
//! not respawn verification processes.

use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use crate::analysis::Ecosystem;

static SHARED: Lazy<Arc<VerifyCache>> = Lazy::new(|| Arc::new(VerifyCache::new()));

#[derive(Debug, Clone, Copy)]
struct CacheEntry {
    installed: bool,
    stored_at: Instant,
}

/// Memoized installed/missing outcomes keyed by ecosystem and package.
#[derive(Debug, Default)]
pub struct VerifyCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl VerifyCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide cache.
    pub fn shared() -> Arc<VerifyCache> {
        Arc::clone(&SHARED)
    }

    fn key(ecosystem: Ecosystem, package: &str) -> String {
        format!("{}:{}", ecosystem.as_str(), package)
    }

    /// Cached outcome if stored less than `ttl` ago.
    pub fn get(&self, ecosystem: Ecosystem, package: &str, ttl: Duration) -> Option<bool> {
        let key = Self::key(ecosystem, package);
        let hit = self
            .entries
            .read()
            .ok()
            .and_then(|entries| entries.get(&key).copied())
            .filter(|e| e.stored_at.elapsed() < ttl)
            .map(|e| e.installed);
        match hit {
            Some(_) => self.hits.fetch_add(1, Ordering::Relaxed),
            None => self.misses.fetch_add(1, Ordering::Relaxed),
        };
        hit
    }

    pub fn set(&self, ecosystem: Ecosystem, package: &str, installed: bool) {
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(
                Self::key(ecosystem, package),
                CacheEntry {
                    installed,
                    stored_at: Instant::now(),
                },
            );
        }
    }

    /// (hits, misses) since creation.
    pub fn stats(&self) -> (usize, usize) {
        (self.hits.load(Ordering::Relaxed), self.misses.load(Ordering::Relaxed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_cache() {
        let cache = VerifyCache::new();
        cache.set(Ecosystem::Pip, "requests", true);

        assert_eq!(cache.get(Ecosystem::Pip, "requests", Duration::from_secs(60)), Some(true));
        assert_eq!(cache.get(Ecosystem::Npm, "requests", Duration::from_secs(60)), None);
        assert_eq!(cache.get(Ecosystem::Pip, "flask", Duration::from_secs(60)), None);
        assert_eq!(cache.stats(), (1, 2));
    }

    #[test]
    fn test_expired_entries_are_ignored() {
        let cache = VerifyCache::new();
        cache.set(Ecosystem::Npm, "left-pad", false);
        assert_eq!(cache.get(Ecosystem::Npm, "left-pad", Duration::ZERO), None);
    }
}
