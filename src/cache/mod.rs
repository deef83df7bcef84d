//! Response caching with a fixed TTL
//!
//! Entries are keyed by a [`Fingerprint`] of the endpoint path and its sorted
//! query parameters. Staleness is checked lazily on read: an expired entry is
//! reported as a miss and stays in the map until the next `put` for the same
//! fingerprint replaces it (or [`ResponseCache::evict_expired`] sweeps it).

mod disk;

pub use self::disk::DiskMirror;

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

/// Default freshness window
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// Deterministic cache key for one logical request
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Hash `endpoint + "?" + sorted("key=value"&...)`
    ///
    /// Parameter order does not affect the result.
    #[must_use]
    pub fn new(endpoint: &str, params: &[(String, String)]) -> Self {
        let mut pairs: Vec<String> = params.iter().map(|(k, v)| format!("{k}={v}")).collect();
        pairs.sort();
        let canonical = format!("{endpoint}?{}", pairs.join("&"));

        let mut hasher = Sha256::new();
        hasher.update(canonical.as_bytes());
        Self(hex::encode(hasher.finalize()))
    }

    /// Hex digest
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Thread-safe response cache with TTL expiry
pub struct ResponseCache {
    entries: DashMap<Fingerprint, CacheEntry>,
    ttl: Duration,
    stats: CacheStats,
}

struct CacheEntry {
    value: Value,
    captured_at: Instant,
}

impl CacheEntry {
    fn is_fresh(&self, ttl: Duration) -> bool {
        self.captured_at.elapsed() < ttl
    }
}

/// Cache statistics tracked atomically
#[derive(Debug, Default)]
struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    /// Misses caused by an entry older than the TTL
    stale: AtomicU64,
    /// Puts that replaced an existing entry
    overwrites: AtomicU64,
    evictions: AtomicU64,
}

impl CacheStats {
    #[allow(clippy::cast_precision_loss)]
    fn hit_rate(&self) -> f64 {
        let hits = self.hits.load(Ordering::Relaxed);
        let total = hits + self.misses.load(Ordering::Relaxed);
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }
}

impl ResponseCache {
    /// Create an empty cache with the given freshness window
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            stats: CacheStats::default(),
        }
    }

    /// Process-wide instance, constructed on first use with [`DEFAULT_TTL`]
    pub fn global() -> Arc<Self> {
        static GLOBAL: OnceLock<Arc<ResponseCache>> = OnceLock::new();
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(Self::new(DEFAULT_TTL))))
    }

    /// Freshness window
    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Get a cached value if present and younger than the TTL
    pub fn get(&self, fingerprint: &Fingerprint) -> Option<Value> {
        match self.entries.get(fingerprint) {
            Some(entry) if entry.is_fresh(self.ttl) => {
                self.stats.hits.fetch_add(1, Ordering::Relaxed);
                Some(entry.value.clone())
            }
            Some(_) => {
                self.stats.stale.fetch_add(1, Ordering::Relaxed);
                self.stats.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
            None => {
                self.stats.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Store a value captured now, replacing any previous entry
    pub fn put(&self, fingerprint: Fingerprint, value: Value) {
        self.insert(fingerprint, value, Instant::now());
    }

    /// Store a value that was captured `age` ago
    ///
    /// Used when promoting entries from the disk mirror so they expire on
    /// their original schedule.
    pub fn put_with_age(&self, fingerprint: Fingerprint, value: Value, age: Duration) {
        let now = Instant::now();
        self.insert(fingerprint, value, now.checked_sub(age).unwrap_or(now));
    }

    fn insert(&self, fingerprint: Fingerprint, value: Value, captured_at: Instant) {
        let previous = self
            .entries
            .insert(fingerprint, CacheEntry { value, captured_at });
        if previous.is_some() {
            self.stats.overwrites.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Number of stored entries, fresh or stale
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds no entries
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Clear all cached entries
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Remove every entry older than the TTL, returning how many were dropped
    pub fn evict_expired(&self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.is_fresh(self.ttl));
        let removed = before.saturating_sub(self.entries.len());
        if removed > 0 {
            self.stats
                .evictions
                .fetch_add(removed as u64, Ordering::Relaxed);
        }
        removed
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStatsSnapshot {
        CacheStatsSnapshot {
            hits: self.stats.hits.load(Ordering::Relaxed),
            misses: self.stats.misses.load(Ordering::Relaxed),
            stale: self.stats.stale.load(Ordering::Relaxed),
            overwrites: self.stats.overwrites.load(Ordering::Relaxed),
            evictions: self.stats.evictions.load(Ordering::Relaxed),
            size: self.entries.len(),
            hit_rate: self.stats.hit_rate(),
        }
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

/// Snapshot of cache statistics
#[derive(Debug, Clone, Serialize)]
pub struct CacheStatsSnapshot {
    /// Total cache hits
    pub hits: u64,
    /// Total misses, stale reads included
    pub misses: u64,
    /// Reads that found an expired entry
    pub stale: u64,
    /// Puts that replaced an existing entry
    pub overwrites: u64,
    /// Entries removed by `evict_expired`
    pub evictions: u64,
    /// Current number of entries
    pub size: usize,
    /// Hit rate (0.0-1.0)
    pub hit_rate: f64,
}
