//! Image preloading
//!
//! Primes a set of image URLs in small concurrent batches. A shared
//! registry remembers every URL whose load has settled, so later calls
//! skip them whether they succeeded or not.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info};
use reqwest::{Client as HttpClient, Url};
use serde::Serialize;

use crate::cache::LocalCache;
use crate::client::parallel::process_in_chunks;
use crate::collections::{CollectionSummary, cached_collections, pending_collections};
use crate::error::{FetchError, Result};

/// URLs whose preload attempt has settled.
///
/// Cloning shares the same set. Membership means "attempted", not
/// "available offline".
#[derive(Debug, Clone, Default)]
pub struct PreloadRegistry {
    loaded: Arc<Mutex<HashSet<String>>>,
}

impl PreloadRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, url: &str) -> bool {
        self.loaded
            .lock()
            .map(|set| set.contains(url))
            .unwrap_or(false)
    }

    fn insert(&self, url: String) {
        if let Ok(mut set) = self.loaded.lock() {
            set.insert(url);
        }
    }

    pub fn len(&self) -> usize {
        self.loaded.lock().map(|set| set.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn reset(&self) {
        if let Ok(mut set) = self.loaded.lock() {
            set.clear();
        }
    }
}

/// Fetches one image
#[async_trait]
pub trait ImageLoader: Send + Sync {
    async fn load(&self, url: &str) -> Result<()>;
}

/// Loads images straight from the network, discarding the bytes
pub struct HttpImageLoader {
    http: HttpClient,
}

impl HttpImageLoader {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }
}

#[async_trait]
impl ImageLoader for HttpImageLoader {
    async fn load(&self, url: &str) -> Result<()> {
        let response = self.http.get(url).send().await.map_err(FetchError::from)?;
        if !response.status().is_success() {
            return Err(FetchError::Status(response.status().as_u16()).into());
        }
        response.bytes().await.map_err(FetchError::from)?;
        Ok(())
    }
}

/// Outcome of one `preload` call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PreloadReport {
    pub requested: usize,
    pub skipped: usize,
    pub loaded: usize,
    pub failed: usize,
}

/// Batched image preloader
pub struct ImagePreloader {
    loader: Arc<dyn ImageLoader>,
    registry: PreloadRegistry,
    batch_size: usize,
    batch_delay: Duration,
}

impl ImagePreloader {
    pub fn new(
        loader: Arc<dyn ImageLoader>,
        registry: PreloadRegistry,
        batch_size: usize,
        batch_delay: Duration,
    ) -> Self {
        Self {
            loader,
            registry,
            batch_size,
            batch_delay,
        }
    }

    /// Load every URL not already attempted, `batch_size` at a time.
    ///
    /// Individual failures never abort a batch.
    pub async fn preload(&self, urls: &[String]) -> PreloadReport {
        let mut seen = HashSet::new();
        let todo: Vec<String> = urls
            .iter()
            .filter(|url| seen.insert(url.as_str()))
            .filter(|url| !self.registry.contains(url))
            .cloned()
            .collect();

        let mut report = PreloadReport {
            requested: urls.len(),
            skipped: urls.len() - todo.len(),
            ..Default::default()
        };
        if todo.is_empty() {
            return report;
        }

        debug!(
            "Preloading {} images in batches of {}",
            todo.len(),
            self.batch_size
        );

        let outcomes = process_in_chunks(todo, self.batch_size, self.batch_delay, |url| {
            let loader = Arc::clone(&self.loader);
            let registry = self.registry.clone();
            async move {
                let result = loader.load(&url).await;
                if let Err(e) = &result {
                    debug!("Preload failed for {}: {}", url, e);
                }
                registry.insert(url);
                result.is_ok()
            }
        })
        .await;

        report.loaded = outcomes.iter().filter(|ok| **ok).count();
        report.failed = outcomes.len() - report.loaded;
        info!(
            "Preloaded {} images ({} failed, {} skipped)",
            report.loaded, report.failed, report.skipped
        );
        report
    }

    pub fn is_preloaded(&self, url: &str) -> bool {
        self.registry.contains(url)
    }

    pub fn count(&self) -> usize {
        self.registry.len()
    }

    pub fn registry(&self) -> &PreloadRegistry {
        &self.registry
    }
}

/// Covers and first-NFT images from the local collection caches.
///
/// Relative paths resolve against `base`. Order follows the cache.
pub fn collect_image_urls(cache: &LocalCache, owner: Option<&str>, base: &Url) -> Vec<String> {
    let mut summaries: Vec<CollectionSummary> = pending_collections(cache);
    if let Some(owner) = owner
        && let Some(entry) = cached_collections(cache, owner)
    {
        summaries.extend(entry.payload.collections);
    }

    let mut seen = HashSet::new();
    summaries
        .iter()
        .flat_map(|s| [s.cover.as_deref(), s.first_nft_image.as_deref()])
        .flatten()
        .filter(|u| !u.trim().is_empty())
        .filter_map(|u| base.join(u).ok())
        .filter(|u| matches!(u.scheme(), "http" | "https"))
        .map(String::from)
        .filter(|u| seen.insert(u.clone()))
        .collect()
}
