//! Collection reconciliation engine
//!
//! A load publishes the cached view immediately, then refreshes from the
//! registry in the background: enumerate the owner's collections, fetch
//! per-address details in barrier chunks, merge with optimistic writes
//! and the cache, persist, and publish again.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use log::{debug, info, warn};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::{
    CachedCollections, CollectionSummary, cached_collections, fallback_summary, merge_first_seen,
    pending_collections, refreshed_view, stale_view, truncate_address,
};
use crate::cache::{CacheTtl, LocalCache, PENDING_COLLECTIONS_KEY, user_collections_key};
use crate::client::parallel::{process_in_chunks, with_timeout};
use crate::client::wallet::WalletProvider;
use crate::client::{CollectionRegistry, MetadataResolver};
use crate::config::Config;

/// Tunables for a reconciliation run
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Addresses whose details are fetched concurrently
    pub chunk_size: usize,
    /// Limit for each `name()` / `contractURI()` read
    pub call_timeout: Duration,
    /// Freshness window of the per-user cache
    pub collection_ttl: Duration,
    /// Cover used when metadata can't be resolved
    pub default_cover: String,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            chunk_size: 4,
            call_timeout: Duration::from_millis(5000),
            collection_ttl: CacheTtl::USER_COLLECTIONS,
            default_cover: "/images/default-collection.png".to_string(),
        }
    }
}

impl EngineSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            chunk_size: config.tuning.chunk_size,
            call_timeout: config.tuning.call_timeout(),
            collection_ttl: config.collection_ttl(),
            default_cover: config.default_cover.clone(),
        }
    }
}

/// Where the published collection list came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewSource {
    /// Nothing known yet (no account, or nothing cached)
    Empty,
    /// Cache and optimistic writes, not yet revalidated
    Cached,
    /// Merged with a fresh on-chain enumeration
    Refreshed,
}

/// Snapshot published to consumers
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct CollectionsView {
    pub owner: Option<String>,
    pub collections: Vec<CollectionSummary>,
    pub source: ViewSource,
}

impl CollectionsView {
    fn empty(owner: Option<String>) -> Self {
        Self {
            owner,
            collections: Vec::new(),
            source: ViewSource::Empty,
        }
    }
}

/// Handle to one load: the published view and its background refresh
pub struct CollectionsLoad {
    pub view: watch::Receiver<CollectionsView>,
    pub refresh: Option<JoinHandle<()>>,
}

impl CollectionsLoad {
    /// The view as currently published
    pub fn current(&self) -> CollectionsView {
        self.view.borrow().clone()
    }

    /// Wait for the background refresh, then return the final view.
    pub async fn settled(mut self) -> CollectionsView {
        if let Some(handle) = self.refresh.take()
            && let Err(e) = handle.await
        {
            warn!("Collection refresh task failed: {}", e);
        }
        self.current()
    }
}

/// Reconciles cached, optimistic and on-chain collection data
pub struct ReconciliationEngine {
    wallet: Arc<dyn WalletProvider>,
    registry: Arc<dyn CollectionRegistry>,
    metadata: Arc<dyn MetadataResolver>,
    cache: LocalCache,
    settings: EngineSettings,
    active_owner: Mutex<Option<String>>,
}

impl ReconciliationEngine {
    pub fn new(
        wallet: Arc<dyn WalletProvider>,
        registry: Arc<dyn CollectionRegistry>,
        metadata: Arc<dyn MetadataResolver>,
        cache: LocalCache,
        settings: EngineSettings,
    ) -> Self {
        Self {
            wallet,
            registry,
            metadata,
            cache,
            settings,
            active_owner: Mutex::new(None),
        }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Load the active account's collections.
    ///
    /// The returned receiver already holds the cached view. A refresh
    /// task is spawned when an account is connected.
    pub async fn load(self: &Arc<Self>) -> CollectionsLoad {
        let owner = match self.wallet.active_account().await {
            Ok(Some(account)) => account.to_lowercase(),
            Ok(None) => {
                debug!("No wallet account connected");
                self.set_active_owner(None);
                return Self::finished(CollectionsView::empty(None));
            }
            Err(e) => {
                warn!("Wallet detection failed: {}", e);
                self.set_active_owner(None);
                return Self::finished(CollectionsView::empty(None));
            }
        };
        self.set_active_owner(Some(owner.clone()));

        let cached = match cached_collections(&self.cache, &owner) {
            Some(entry) => {
                let age = Utc::now().signed_duration_since(entry.stored_at);
                debug!(
                    "Cached collections for {} ({}s old, fresh: {})",
                    owner,
                    age.num_seconds(),
                    entry.is_fresh(Utc::now())
                );
                entry.payload.collections
            }
            None => Vec::new(),
        };
        let pending = pending_collections(&self.cache);

        let collections = stale_view(&cached, &pending);
        let source = if collections.is_empty() {
            ViewSource::Empty
        } else {
            ViewSource::Cached
        };
        let (tx, rx) = watch::channel(CollectionsView {
            owner: Some(owner.clone()),
            collections,
            source,
        });

        let engine = Arc::clone(self);
        let refresh = tokio::spawn(async move {
            engine.refresh(owner, cached, tx).await;
        });

        CollectionsLoad {
            view: rx,
            refresh: Some(refresh),
        }
    }

    fn finished(view: CollectionsView) -> CollectionsLoad {
        let (_tx, rx) = watch::channel(view);
        CollectionsLoad {
            view: rx,
            refresh: None,
        }
    }

    fn set_active_owner(&self, owner: Option<String>) {
        if let Ok(mut active) = self.active_owner.lock() {
            *active = owner;
        }
    }

    fn is_active_owner(&self, owner: &str) -> bool {
        self.active_owner
            .lock()
            .map(|active| active.as_deref() == Some(owner))
            .unwrap_or(false)
    }

    async fn refresh(
        &self,
        owner: String,
        cached: Vec<CollectionSummary>,
        tx: watch::Sender<CollectionsView>,
    ) {
        let addresses = match self.registry.user_collections(&owner).await {
            Ok(addresses) => addresses,
            Err(e) => {
                warn!("Keeping cached collections for {}: {}", owner, e);
                return;
            }
        };
        info!("Registry lists {} collections for {}", addresses.len(), owner);

        let fresh = self.fetch_summaries(addresses).await;

        if !self.is_active_owner(&owner) {
            info!("Account changed during refresh, discarding results for {}", owner);
            return;
        }

        let pending = pending_collections(&self.cache);
        let merged = refreshed_view(&fresh, &pending, &cached);

        self.cache.write(
            &user_collections_key(&owner),
            Some(&owner),
            &CachedCollections {
                ts: Utc::now().timestamp_millis(),
                collections: merged.clone(),
            },
            self.settings.collection_ttl,
        );
        self.prune_confirmed(&pending, &fresh);

        tx.send_replace(CollectionsView {
            owner: Some(owner),
            collections: merged,
            source: ViewSource::Refreshed,
        });
    }

    /// Details for every address, `chunk_size` at a time
    pub async fn fetch_summaries(&self, addresses: Vec<String>) -> Vec<CollectionSummary> {
        process_in_chunks(
            addresses,
            self.settings.chunk_size,
            Duration::ZERO,
            |address| self.fetch_summary(address),
        )
        .await
    }

    /// Details for one address; every failure degrades to a fallback.
    pub async fn fetch_summary(&self, address: String) -> CollectionSummary {
        let limit = self.settings.call_timeout;
        let (name, uri) = tokio::join!(
            with_timeout(limit, self.registry.collection_name(&address)),
            with_timeout(limit, self.registry.contract_uri(&address)),
        );

        let name = match name {
            Ok(name) if !name.trim().is_empty() => name,
            Ok(_) => truncate_address(&address),
            Err(e) => {
                debug!("name() failed for {}: {}", address, e);
                truncate_address(&address)
            }
        };

        let metadata = match uri {
            Ok(uri) if !uri.trim().is_empty() => match self.metadata.resolve(&uri).await {
                Ok(metadata) => Some(metadata),
                Err(e) => {
                    debug!("Metadata for {} unavailable: {}", address, e);
                    None
                }
            },
            Ok(_) => None,
            Err(e) => {
                debug!("contractURI() failed for {}: {}", address, e);
                None
            }
        };

        let mut summary = fallback_summary(&address, &self.settings.default_cover);
        summary.name = name;
        if let Some(metadata) = metadata {
            if let Some(image) = metadata.image.filter(|i| !i.trim().is_empty()) {
                summary.cover = Some(self.metadata.display_url(&image));
            }
            summary.description = metadata.description.unwrap_or_default();
        }
        summary
    }

    /// Record a collection created locally, ahead of chain confirmation.
    pub fn record_created(&self, summary: CollectionSummary) {
        let pending = pending_collections(&self.cache);
        let updated = merge_first_seen(&[&[summary], &pending]);
        self.cache.write(
            PENDING_COLLECTIONS_KEY,
            None,
            &updated,
            CacheTtl::PENDING_COLLECTIONS,
        );
    }

    /// Optimistic writes awaiting confirmation
    pub fn pending(&self) -> Vec<CollectionSummary> {
        pending_collections(&self.cache)
    }

    fn prune_confirmed(&self, pending: &[CollectionSummary], fresh: &[CollectionSummary]) {
        let remaining: Vec<CollectionSummary> = pending
            .iter()
            .filter(|p| !fresh.iter().any(|f| f.key() == p.key()))
            .cloned()
            .collect();

        if remaining.len() == pending.len() {
            return;
        }
        debug!(
            "{} optimistic collections confirmed on-chain",
            pending.len() - remaining.len()
        );
        if remaining.is_empty() {
            self.cache.remove(PENDING_COLLECTIONS_KEY);
        } else {
            self.cache.write(
                PENDING_COLLECTIONS_KEY,
                None,
                &remaining,
                CacheTtl::PENDING_COLLECTIONS,
            );
        }
    }
}
