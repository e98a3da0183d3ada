//! Local caches
//!
//! SQLite-backed storage shared by the scoped local cache (collection
//! lists, optimistic writes) and the router's versioned response buckets.

pub mod buckets;
pub mod key;
pub mod local;
pub mod storage;

use std::time::Duration;

/// Cache TTL configuration per data type
pub struct CacheTtl;

impl CacheTtl {
    // Per-user collection lists - served stale, always revalidated
    pub const USER_COLLECTIONS: Duration = Duration::from_secs(5 * 60); // 5 min

    // Optimistic writes never expire on their own; confirmation prunes them
    pub const PENDING_COLLECTIONS: Duration = Duration::from_secs(30 * 24 * 60 * 60); // 30 days
}

// Re-export main types
pub use buckets::StoredResponse;
pub use key::{PENDING_COLLECTIONS_KEY, api_bucket, image_bucket, request_key, user_collections_key};
pub use local::{CacheEntry, LocalCache};
pub use storage::CacheStorage;
