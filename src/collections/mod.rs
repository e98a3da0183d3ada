//! Collection summaries and the rules for merging them
//!
//! Three sources describe a user's collections: the stale local cache,
//! optimistic writes recorded right after a create action, and the
//! fresh on-chain enumeration. They are merged by lowercase address,
//! and the first source that mentions an address wins.

pub mod engine;

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::cache::{CacheEntry, LocalCache, PENDING_COLLECTIONS_KEY, user_collections_key};

pub use engine::{CollectionsLoad, CollectionsView, EngineSettings, ReconciliationEngine, ViewSource};

/// Display data for one collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionSummary {
    pub address: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub cover: Option<String>,

    #[serde(default)]
    pub description: String,

    #[serde(default, rename = "firstNFTImage")]
    pub first_nft_image: Option<String>,
}

impl CollectionSummary {
    /// Identity key: addresses compare case-insensitively
    pub fn key(&self) -> String {
        self.address.trim().to_lowercase()
    }
}

/// Per-user cache payload (`dreava_user_collections_<address>`)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CachedCollections {
    /// Epoch milliseconds of the refresh that produced the list
    pub ts: i64,
    pub collections: Vec<CollectionSummary>,
}

/// Cached collection list for `owner`, stale or not
pub fn cached_collections(cache: &LocalCache, owner: &str) -> Option<CacheEntry<CachedCollections>> {
    cache.read(&user_collections_key(owner))
}

/// Optimistic writes not yet confirmed on-chain
pub fn pending_collections(cache: &LocalCache) -> Vec<CollectionSummary> {
    cache
        .read::<Vec<CollectionSummary>>(PENDING_COLLECTIONS_KEY)
        .map(|entry| entry.payload)
        .unwrap_or_default()
}

/// Merge lists in priority order, de-duplicated by lowercase address.
///
/// The first list mentioning an address supplies its entry; later
/// mentions are dropped. Order follows first appearance.
pub fn merge_first_seen(sources: &[&[CollectionSummary]]) -> Vec<CollectionSummary> {
    let mut seen = HashSet::new();
    let mut merged = Vec::new();

    for source in sources {
        for summary in source.iter() {
            if seen.insert(summary.key()) {
                merged.push(summary.clone());
            }
        }
    }

    merged
}

/// View served before any refresh: optimistic writes ahead of the cache.
pub fn stale_view(
    cached: &[CollectionSummary],
    pending: &[CollectionSummary],
) -> Vec<CollectionSummary> {
    merge_first_seen(&[pending, cached])
}

/// View after a refresh: fresh on-chain data first, then optimistic
/// writes, then cached entries the enumeration did not reconfirm.
///
/// Cache-only entries are retained: a missing address is more often a
/// flaky RPC node than a removed collection.
pub fn refreshed_view(
    fresh: &[CollectionSummary],
    pending: &[CollectionSummary],
    cached: &[CollectionSummary],
) -> Vec<CollectionSummary> {
    merge_first_seen(&[fresh, pending, cached])
}

/// `0x1234...abcd` short form used when a name can't be fetched
pub fn truncate_address(address: &str) -> String {
    let chars: Vec<char> = address.chars().collect();
    if chars.len() <= 10 {
        return address.to_string();
    }
    let head: String = chars[..6].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}

/// Placeholder summary for an address whose details all failed
pub fn fallback_summary(address: &str, default_cover: &str) -> CollectionSummary {
    CollectionSummary {
        address: address.to_string(),
        name: truncate_address(address),
        cover: Some(default_cover.to_string()),
        description: String::new(),
        first_nft_image: None,
    }
}

#[cfg(test)]
pub(crate) fn summary(address: &str, name: &str) -> CollectionSummary {
    CollectionSummary {
        address: address.to_string(),
        name: name.to_string(),
        cover: None,
        description: String::new(),
        first_nft_image: None,
    }
}
