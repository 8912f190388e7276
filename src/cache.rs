//! In-memory processing cache for repeated uploads.
//!
//! Background removal is the bottleneck of every request: decoding, fitting
//! and segmenting a 2000px image takes far longer than anything else the
//! server does. This module lets the pipeline skip all of that when the
//! exact same bytes have been processed before.
//!
//! # Design
//!
//! The cache covers the decode → fit → remove → encode stages and stores
//! their [`ProcessedResult`], including the encoded `fixed.png` and the
//! upload bytes, so serving a result never re-encodes anything.
//!
//! ## Cache keys
//!
//! The cache is **content-addressed**: the key is the SHA-256 of the raw
//! upload bytes, rendered as hex ([`CacheKey`]). File names, MIME types and
//! who uploaded the file play no part. The same key doubles as the public
//! identifier of a result in the web UI's image and download URLs.
//!
//! The compute function handed to [`ProcessingCache::get_or_compute`] must
//! be pure with respect to its bytes. Nothing invalidates an entry, so a
//! compute function whose output depended on anything else would serve
//! stale results.
//!
//! ## Bounds
//!
//! Two independent bounds, both evicting least recently used entries:
//!
//! - **Capacity**: maximum number of entries.
//! - **Byte budget**: maximum total [`ProcessedResult::weight`]. Decoded
//!   images dwarf their files, so this is the bound that caps memory. The
//!   newest entry is always kept, even when it alone exceeds the budget,
//!   so the result just computed can still be served.
//!
//! Without either the cache grows for the life of the process.
//!
//! ## Concurrency
//!
//! A single mutex guards the entries and statistics. It is never held while
//! computing, so two concurrent misses on the same key both compute and the
//! later insert replaces the earlier (equal) value. Failed computations are
//! not cached.

use crate::types::ProcessedResult;
use lru::LruCache;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Hex SHA-256 of an upload's bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(format!("{:x}", Sha256::digest(bytes)))
    }

    /// Parse a key received from a URL. Only 64 lowercase hex chars are valid.
    pub fn parse(s: &str) -> Option<Self> {
        let valid = s.len() == 64 && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'));
        valid.then(|| Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Whether a lookup was served from the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Miss,
}

/// Summary of cache performance since startup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub entries: usize,
    pub capacity: Option<usize>,
    /// Total weight of the cached entries
    pub bytes: usize,
    pub max_bytes: Option<usize>,
}

impl CacheStats {
    pub fn total(&self) -> u64 {
        self.hits + self.misses
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.hits > 0 {
            write!(
                f,
                "{} cached, {} processed ({} total)",
                self.hits,
                self.misses,
                self.total()
            )
        } else {
            write!(f, "{} processed", self.misses)
        }
    }
}

struct Inner {
    entries: LruCache<CacheKey, Arc<ProcessedResult>>,
    stats: CacheStats,
}

impl Inner {
    /// Drop least recently used entries until within the byte budget,
    /// never dropping the most recent one.
    fn trim_to_budget(&mut self) {
        let Some(max_bytes) = self.stats.max_bytes else {
            return;
        };
        while self.stats.bytes > max_bytes && self.entries.len() > 1 {
            let Some((_, evicted)) = self.entries.pop_lru() else {
                break;
            };
            self.stats.bytes = self.stats.bytes.saturating_sub(evicted.weight());
            self.stats.evictions += 1;
        }
    }
}

/// Content-addressed memo of processed uploads, safe to share across threads.
pub struct ProcessingCache {
    inner: Mutex<Inner>,
}

impl ProcessingCache {
    /// Cache holding at most `capacity` results (LRU eviction).
    pub fn bounded(capacity: NonZeroUsize) -> Self {
        Self::from_lru(LruCache::new(capacity), Some(capacity.get()))
    }

    /// Cache that never evicts.
    pub fn unbounded() -> Self {
        Self::from_lru(LruCache::unbounded(), None)
    }

    /// `Some(n)` with `n > 0` → bounded, anything else → unbounded.
    pub fn with_capacity(capacity: Option<usize>) -> Self {
        match capacity.and_then(NonZeroUsize::new) {
            Some(n) => Self::bounded(n),
            None => Self::unbounded(),
        }
    }

    /// Cap the total weight of cached entries. `None` or `Some(0)` removes
    /// the cap.
    pub fn with_max_bytes(self, max_bytes: Option<usize>) -> Self {
        self.lock().stats.max_bytes = max_bytes.filter(|&n| n > 0);
        self
    }

    fn from_lru(entries: LruCache<CacheKey, Arc<ProcessedResult>>, capacity: Option<usize>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries,
                stats: CacheStats {
                    capacity,
                    ..CacheStats::default()
                },
            }),
        }
    }

    // Entries are plain values, so a panic elsewhere cannot leave them half-written.
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Return the cached result for `bytes`, computing and storing it on a miss.
    pub fn get_or_compute<E>(
        &self,
        bytes: &[u8],
        compute: impl FnOnce(&[u8]) -> Result<ProcessedResult, E>,
    ) -> Result<(CacheKey, Arc<ProcessedResult>, CacheStatus), E> {
        let key = CacheKey::from_bytes(bytes);

        {
            let mut inner = self.lock();
            if let Some(hit) = inner.entries.get(&key).cloned() {
                inner.stats.hits += 1;
                return Ok((key, hit, CacheStatus::Hit));
            }
            inner.stats.misses += 1;
        }

        let result = Arc::new(compute(bytes)?);

        let mut inner = self.lock();
        if let Some((evicted_key, evicted)) = inner.entries.push(key.clone(), Arc::clone(&result)) {
            inner.stats.bytes = inner.stats.bytes.saturating_sub(evicted.weight());
            if evicted_key != key {
                inner.stats.evictions += 1;
            }
        }
        inner.stats.bytes += result.weight();
        inner.trim_to_budget();
        Ok((key, result, CacheStatus::Miss))
    }

    /// Look up a stored result without computing. Counts as a use for LRU.
    pub fn get(&self, key: &CacheKey) -> Option<Arc<ProcessedResult>> {
        self.lock().entries.get(key).cloned()
    }

    pub fn stats(&self) -> CacheStats {
        let inner = self.lock();
        CacheStats {
            entries: inner.entries.len(),
            ..inner.stats
        }
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for ProcessingCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessingCache")
            .field("stats", &self.stats())
            .finish()
    }
}
