//! In-memory cache manager for question batches
//!
//! Provides a `CacheManager` that stores immutable batches with expiry
//! timestamps. A batch is replaced wholesale on refresh, never edited.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use tracing::debug;

use super::{Clock, QuestionCache, SystemClock};
use crate::data::{Question, QuerySignature};

/// Wrapper struct for a stored batch
#[derive(Debug, Clone)]
struct CacheEntry {
    /// The cached questions
    questions: Arc<[Question]>,
    /// When the data was cached
    cached_at: DateTime<Utc>,
    /// When the cache entry expires
    expires_at: DateTime<Utc>,
}

impl CacheEntry {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// A live batch read from the cache
#[derive(Debug, Clone)]
pub struct CachedBatch {
    /// The cached questions; may be empty (negative cache)
    pub questions: Arc<[Question]>,
    /// When the batch was stored
    pub cached_at: DateTime<Utc>,
    /// When the batch stops being served
    pub expires_at: DateTime<Utc>,
}

/// Manages the in-memory batch store
///
/// Entries are kept in a `HashMap` behind a read/write lock. The map is not
/// size-bounded; keys accumulate for the process lifetime apart from what the
/// expiry sweep removes.
pub struct CacheManager {
    entries: RwLock<HashMap<QuerySignature, CacheEntry>>,
    clock: Arc<dyn Clock>,
}

impl Default for CacheManager {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheManager {
    /// Creates a new CacheManager reading the system clock
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Creates a new CacheManager with a custom clock
    ///
    /// Useful for testing expiry without sleeping.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            clock,
        }
    }
}

impl QuestionCache for CacheManager {
    /// Reads a batch from the cache
    ///
    /// An expired entry is treated as absent and removed on the way out.
    fn get(&self, signature: &QuerySignature) -> Option<CachedBatch> {
        let now = self.clock.now();

        {
            let entries = self.entries.read();
            match entries.get(signature) {
                Some(entry) if !entry.is_expired(now) => {
                    return Some(CachedBatch {
                        questions: Arc::clone(&entry.questions),
                        cached_at: entry.cached_at,
                        expires_at: entry.expires_at,
                    });
                }
                Some(_) => {}
                None => return None,
            }
        }

        // Re-check under the write lock: a fresh batch may have replaced it
        let mut entries = self.entries.write();
        if entries
            .get(signature)
            .is_some_and(|entry| entry.is_expired(now))
        {
            debug!(signature = %signature, "Evicting expired cache entry");
            entries.remove(signature);
        }
        None
    }

    /// Writes a batch to the cache with the given TTL
    fn set(&self, signature: QuerySignature, questions: Arc<[Question]>, ttl: StdDuration) {
        let now = self.clock.now();
        let expires_at = Duration::from_std(ttl)
            .ok()
            .and_then(|ttl| now.checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        let entry = CacheEntry {
            questions,
            cached_at: now,
            expires_at,
        };

        self.entries.write().insert(signature, entry);
    }

    fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        before - entries.len()
    }

    fn len(&self) -> usize {
        self.entries.read().len()
    }
}
