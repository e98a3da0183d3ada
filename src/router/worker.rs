//! Cache router lifecycle and strategies

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use log::{debug, info, warn};
use reqwest::Url;
use serde::Serialize;
use tokio::task::JoinHandle;

use super::{Network, ResponseKind, RouteRequest, RouteResponse, Strategy, classify};
use crate::cache::{CacheStorage, api_bucket, image_bucket};
use crate::error::{CacheError, FetchError, Result};
use crate::preload::ImageLoader;

/// Router lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Lifecycle {
    Parsed,
    Installed,
    Activated,
}

/// A bucket as listed by `buckets()`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BucketInfo {
    pub name: String,
    pub entries: usize,
    pub current: bool,
}

/// Intercepts requests and serves them from versioned buckets.
///
/// Until `activate` runs the router does not control requests and
/// passes them straight to the network.
pub struct CacheRouter {
    storage: Arc<Mutex<CacheStorage>>,
    network: Arc<dyn Network>,
    origin: Url,
    version: String,
    state: Mutex<Lifecycle>,
    pending: Mutex<Vec<JoinHandle<()>>>,
}

impl CacheRouter {
    pub fn new(
        storage: Arc<Mutex<CacheStorage>>,
        network: Arc<dyn Network>,
        origin: Url,
        version: &str,
    ) -> Self {
        Self {
            storage,
            network,
            origin,
            version: version.to_string(),
            state: Mutex::new(Lifecycle::Parsed),
            pending: Mutex::new(Vec::new()),
        }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn api_bucket(&self) -> String {
        api_bucket(&self.version)
    }

    pub fn image_bucket(&self) -> String {
        image_bucket(&self.version)
    }

    pub fn state(&self) -> Lifecycle {
        self.state
            .lock()
            .map(|state| *state)
            .unwrap_or(Lifecycle::Parsed)
    }

    fn set_state(&self, next: Lifecycle) {
        if let Ok(mut state) = self.state.lock() {
            *state = next;
        }
    }

    pub fn is_controlling(&self) -> bool {
        self.state() == Lifecycle::Activated
    }

    fn shell_request(&self) -> RouteRequest {
        RouteRequest::navigate(self.origin.clone())
    }

    /// Precache the app shell, then take over without waiting.
    ///
    /// Precaching is best effort; returns whether the shell was stored.
    pub async fn install(&self) -> bool {
        let shell = self.shell_request();
        let cached = match self.network.fetch(&shell).await {
            Ok(response) if response.is_ok() => {
                store(&self.storage, &self.api_bucket(), &shell.cache_key(), &response);
                true
            }
            Ok(response) => {
                debug!("App shell answered {}, not precached", response.status);
                false
            }
            Err(e) => {
                debug!("App shell precache failed: {}", e);
                false
            }
        };
        self.set_state(Lifecycle::Installed);
        info!("Router {} installed (shell cached: {})", self.version, cached);
        cached
    }

    /// Open the current buckets, delete every other bucket and claim
    /// control. Returns the deleted bucket names.
    pub fn activate(&self) -> Result<Vec<String>> {
        let current = [self.api_bucket(), self.image_bucket()];
        let deleted = {
            let storage = lock(&self.storage)?;
            for name in &current {
                storage.open_bucket(name)?;
            }

            let mut deleted = Vec::new();
            for name in storage.bucket_names()? {
                if !current.contains(&name) {
                    storage.delete_bucket(&name)?;
                    deleted.push(name);
                }
            }
            deleted
        };

        for name in &deleted {
            info!("Deleted outdated cache bucket {}", name);
        }
        self.set_state(Lifecycle::Activated);
        Ok(deleted)
    }

    /// Activate, installing first unless this version was activated
    /// before (its buckets already exist).
    pub async fn ensure_active(&self) -> Result<()> {
        if self.is_controlling() {
            return Ok(());
        }
        let existing = lock(&self.storage)?.bucket_names()?;
        let installed = existing.contains(&self.api_bucket()) && existing.contains(&self.image_bucket());
        if !installed {
            self.install().await;
        }
        self.activate()?;
        Ok(())
    }

    /// Every stored bucket with its entry count
    pub fn buckets(&self) -> Result<Vec<BucketInfo>> {
        let storage = lock(&self.storage)?;
        let current = [self.api_bucket(), self.image_bucket()];
        storage
            .bucket_names()?
            .into_iter()
            .map(|name| -> Result<BucketInfo> {
                let entries = storage.bucket_len(&name)?;
                Ok(BucketInfo {
                    current: current.contains(&name),
                    name,
                    entries,
                })
            })
            .collect()
    }

    /// Answer an intercepted request.
    pub async fn handle(&self, request: RouteRequest) -> RouteResponse {
        if !self.is_controlling() {
            return self.passthrough(&request).await;
        }

        let strategy = classify(&request, &self.origin);
        debug!("{} {} -> {:?}", request.method, request.url, strategy);

        match strategy {
            Strategy::NetworkFirst => self.network_first(&request).await,
            Strategy::StaleWhileRevalidate => self.stale_while_revalidate(request).await,
            Strategy::CacheFirst => self.cache_first(&request).await,
            Strategy::Passthrough => self.passthrough(&request).await,
        }
    }

    /// Wait for background revalidations started by `handle`.
    pub async fn settle(&self) {
        let handles = match self.pending.lock() {
            Ok(mut pending) => std::mem::take(&mut *pending),
            Err(_) => return,
        };
        for handle in handles {
            if let Err(e) = handle.await {
                warn!("Background revalidation failed: {}", e);
            }
        }
    }

    async fn passthrough(&self, request: &RouteRequest) -> RouteResponse {
        match self.network.fetch(request).await {
            Ok(response) => response,
            Err(e) => {
                debug!("Network error for {}: {}", request.url, e);
                RouteResponse::error()
            }
        }
    }

    async fn network_first(&self, request: &RouteRequest) -> RouteResponse {
        match self.network.fetch(request).await {
            Ok(response) => response,
            Err(e) => {
                debug!("Navigation to {} offline: {}", request.url, e);
                self.lookup(&self.api_bucket(), &self.shell_request().cache_key())
                    .unwrap_or_else(RouteResponse::service_unavailable)
            }
        }
    }

    async fn stale_while_revalidate(&self, request: RouteRequest) -> RouteResponse {
        let bucket = self.api_bucket();
        let key = request.cache_key();

        if let Some(cached) = self.lookup(&bucket, &key) {
            let network = Arc::clone(&self.network);
            let storage = Arc::clone(&self.storage);
            let handle = tokio::spawn(async move {
                match network.fetch(&request).await {
                    Ok(fresh) if fresh.is_ok() => store(&storage, &bucket, &key, &fresh),
                    Ok(fresh) => debug!("Revalidation of {} answered {}", request.url, fresh.status),
                    Err(e) => debug!("Revalidation of {} failed: {}", request.url, e),
                }
            });
            self.track(handle);
            return cached;
        }

        match self.network.fetch(&request).await {
            Ok(response) => {
                if response.is_ok() {
                    store(&self.storage, &bucket, &key, &response);
                }
                response
            }
            Err(e) => {
                debug!("{} unreachable, serving empty list: {}", request.url, e);
                RouteResponse::empty_json()
            }
        }
    }

    async fn cache_first(&self, request: &RouteRequest) -> RouteResponse {
        let bucket = self.image_bucket();
        let key = request.cache_key();

        if let Some(cached) = self.lookup(&bucket, &key) {
            return cached;
        }

        match self.network.fetch(request).await {
            Ok(response) => {
                if response.is_cacheable() {
                    store(&self.storage, &bucket, &key, &response);
                }
                response
            }
            Err(e) => {
                debug!("Image {} unreachable: {}", request.url, e);
                self.lookup(&bucket, &key)
                    .unwrap_or_else(RouteResponse::error)
            }
        }
    }

    fn lookup(&self, bucket: &str, key: &str) -> Option<RouteResponse> {
        let storage = lock(&self.storage).ok()?;
        match storage.bucket_match(bucket, key) {
            Ok(found) => found.map(RouteResponse::from_stored),
            Err(e) => {
                debug!("Bucket lookup in {} failed: {}", bucket, e);
                None
            }
        }
    }

    fn track(&self, handle: JoinHandle<()>) {
        if let Ok(mut pending) = self.pending.lock() {
            pending.retain(|h| !h.is_finished());
            pending.push(handle);
        }
    }
}

fn lock(storage: &Mutex<CacheStorage>) -> Result<MutexGuard<'_, CacheStorage>> {
    storage
        .lock()
        .map_err(|_| CacheError::Io("cache lock poisoned".to_string()).into())
}

/// Overwrite-put; failures only cost a future cache hit.
fn store(storage: &Mutex<CacheStorage>, bucket: &str, key: &str, response: &RouteResponse) {
    let result = lock(storage).and_then(|storage| {
        storage
            .bucket_put(bucket, key, &response.to_stored())
            .map_err(Into::into)
    });
    if let Err(e) = result {
        debug!("Failed to cache {} in {}: {}", response.url, bucket, e);
    }
}

#[async_trait]
impl ImageLoader for CacheRouter {
    async fn load(&self, url: &str) -> Result<()> {
        let parsed = Url::parse(url)
            .map_err(|e| FetchError::UnsupportedUri(format!("{} ({})", url, e)))?;
        let response = self.handle(RouteRequest::image(parsed)).await;
        match response.kind {
            ResponseKind::Error => Err(FetchError::Network(format!("Failed to load {}", url)).into()),
            _ if response.is_ok() || response.is_masked() => Ok(()),
            _ => Err(FetchError::Status(response.status).into()),
        }
    }
}
