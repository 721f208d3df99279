//! Cache module for fetched question batches
//!
//! Batches are kept in memory, keyed by [`QuerySignature`], and expire after a
//! fixed TTL. Expired entries are never returned. The store sits behind the
//! [`QuestionCache`] trait and reads time from a [`Clock`] so tests can drive
//! expiry deterministically.

mod clock;
mod manager;

pub use clock::{Clock, ManualClock, SystemClock};
pub use manager::{CacheManager, CachedBatch};

use std::sync::Arc;
use std::time::Duration;

use crate::data::{Question, QuerySignature};

/// Time-to-live for cached batches
pub const CACHE_TTL: Duration = Duration::from_secs(3600);

/// Storage for fetched batches
pub trait QuestionCache: Send + Sync {
    /// Returns the live batch for `signature`, or `None` if absent or expired
    fn get(&self, signature: &QuerySignature) -> Option<CachedBatch>;

    /// Stores `questions` under `signature`, replacing any previous entry
    fn set(&self, signature: QuerySignature, questions: Arc<[Question]>, ttl: Duration);

    /// Drops every expired entry, returning how many were removed
    fn purge_expired(&self) -> usize;

    /// Number of stored entries, expired ones included until purged
    fn len(&self) -> usize;

    /// Whether the store holds no entries
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
