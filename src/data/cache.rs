use crate::types::{canonical_program, Grid, ProgramStep};
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Cache key: exact grid encoding plus the canonical program text. Both
/// components are injective, so distinct (grid, program) inputs never
/// collide.
fn cache_key(grid: &Grid, program: &[ProgramStep]) -> String {
    format!("{}|{}", grid.fingerprint(), canonical_program(program))
}

/// Shared memo of program execution results.
///
/// A hit is always an exact replay of a previous execution, so enabling or
/// disabling the cache can change wall-clock time but never results.
/// Entries expire `ttl` after insertion, checked on read, and the map is
/// capped at `capacity` with least-recently-used eviction. Reads and
/// writes are safe from any thread.
pub struct ProgramCache {
    entries: DashMap<String, CacheEntry>,
    capacity: usize,
    ttl: Duration,
    clock: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

struct CacheEntry {
    value: Grid,
    inserted_at: Instant,
    last_used: u64,
}

/// Point-in-time counters for logging and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

impl ProgramCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            capacity,
            ttl,
            clock: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// The result of running `program` on `grid`, if memoized. Expired
    /// entries are dropped here and count as misses.
    pub fn get(&self, grid: &Grid, program: &[ProgramStep]) -> Option<Grid> {
        let key = cache_key(grid, program);
        let mut expired = false;
        if let Some(mut entry) = self.entries.get_mut(&key) {
            if entry.inserted_at.elapsed() <= self.ttl {
                entry.last_used = self.clock.fetch_add(1, Ordering::Relaxed);
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Some(entry.value.clone());
            }
            expired = true;
        }
        if expired {
            self.entries.remove(&key);
            self.evictions.fetch_add(1, Ordering::Relaxed);
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    pub fn put(&self, grid: &Grid, program: &[ProgramStep], result: Grid) {
        if self.capacity == 0 {
            return;
        }
        let key = cache_key(grid, program);
        if !self.entries.contains_key(&key) && self.entries.len() >= self.capacity {
            self.evict_least_recent();
        }
        self.entries.insert(
            key,
            CacheEntry {
                value: result,
                inserted_at: Instant::now(),
                last_used: self.clock.fetch_add(1, Ordering::Relaxed),
            },
        );
    }

    fn evict_least_recent(&self) {
        let mut oldest: Option<(String, u64)> = None;
        for entry in self.entries.iter() {
            let replace = match &oldest {
                None => true,
                Some((_, used)) => entry.value().last_used < *used,
            };
            if replace {
                oldest = Some((entry.key().clone(), entry.value().last_used));
            }
        }
        if let Some((key, _)) = oldest {
            self.entries.remove(&key);
            self.evictions.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
