//! Mock remote sources for testing
//!
//! In-memory implementations of the wallet, registry, metadata, network
//! and image-loader seams. Each records call counts so tests can verify
//! fan-out, concurrency limits and deduplication.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use super::wallet::{WalletProvider, WalletProviderKind};
use super::{CollectionMetadata, CollectionRegistry, MetadataResolver};
use crate::error::{FetchError, Result};
use crate::preload::ImageLoader;
use crate::router::{Network, RouteRequest, RouteResponse};

/// Tracks concurrent operations and the high-water mark.
#[derive(Default, Debug)]
pub struct InFlight {
    current: AtomicUsize,
    max: AtomicUsize,
}

impl InFlight {
    fn enter(&self) {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.max.fetch_max(now, Ordering::SeqCst);
    }

    fn exit(&self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn max(&self) -> usize {
        self.max.load(Ordering::SeqCst)
    }
}

// ============================================================================
// Wallet
// ============================================================================

/// Wallet whose account can be switched mid-test.
#[derive(Default)]
pub struct MockWallet {
    account: Mutex<Option<String>>,
    fail: AtomicBool,
    pub calls: AtomicUsize,
}

impl MockWallet {
    pub fn new(account: Option<&str>) -> Self {
        Self {
            account: Mutex::new(account.map(str::to_string)),
            ..Default::default()
        }
    }

    /// Wallet whose detection always errors
    pub fn failing() -> Self {
        let wallet = Self::default();
        wallet.fail.store(true, Ordering::SeqCst);
        wallet
    }

    pub fn set_account(&self, account: Option<&str>) {
        *self.account.lock().unwrap() = account.map(str::to_string);
    }
}

#[async_trait]
impl WalletProvider for MockWallet {
    fn kind(&self) -> WalletProviderKind {
        WalletProviderKind::Unknown
    }

    async fn active_account(&self) -> Result<Option<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(FetchError::Network("provider not injected".to_string()).into());
        }
        Ok(self.account.lock().unwrap().clone())
    }
}

// ============================================================================
// Registry
// ============================================================================

/// Registry call counts
#[derive(Default, Debug)]
pub struct RegistryCalls {
    pub user_collections: AtomicUsize,
    pub collection_name: AtomicUsize,
    pub contract_uri: AtomicUsize,
}

/// On-chain registry backed by maps.
///
/// Unknown names and URIs fail like a reverted call.
#[derive(Default)]
pub struct MockRegistry {
    collections: HashMap<String, Vec<String>>,
    names: HashMap<String, String>,
    uris: HashMap<String, String>,
    hanging: HashSet<String>,
    exhausted: bool,
    enumeration_delay: Duration,
    detail_delay: Duration,
    pub calls: RegistryCalls,
    pub name_in_flight: InFlight,
}

impl MockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_collections(mut self, owner: &str, addresses: &[&str]) -> Self {
        self.collections.insert(
            owner.to_lowercase(),
            addresses.iter().map(|a| a.to_string()).collect(),
        );
        self
    }

    pub fn with_name(mut self, address: &str, name: &str) -> Self {
        self.names.insert(address.to_lowercase(), name.to_string());
        self
    }

    pub fn with_uri(mut self, address: &str, uri: &str) -> Self {
        self.uris.insert(address.to_lowercase(), uri.to_string());
        self
    }

    /// `name()` for this address never resolves
    pub fn hang_name(mut self, address: &str) -> Self {
        self.hanging.insert(address.to_lowercase());
        self
    }

    /// Every RPC node is down for the enumeration call
    pub fn exhausted(mut self) -> Self {
        self.exhausted = true;
        self
    }

    pub fn with_enumeration_delay(mut self, delay: Duration) -> Self {
        self.enumeration_delay = delay;
        self
    }

    pub fn with_detail_delay(mut self, delay: Duration) -> Self {
        self.detail_delay = delay;
        self
    }

    fn reverted(address: &str) -> crate::error::Error {
        FetchError::Rpc {
            code: -32000,
            message: format!("execution reverted at {}", address),
        }
        .into()
    }
}

#[async_trait]
impl CollectionRegistry for MockRegistry {
    async fn user_collections(&self, owner: &str) -> Result<Vec<String>> {
        self.calls.user_collections.fetch_add(1, Ordering::SeqCst);
        if !self.enumeration_delay.is_zero() {
            tokio::time::sleep(self.enumeration_delay).await;
        }
        if self.exhausted {
            return Err(FetchError::AllEndpointsExhausted {
                attempted: 3,
                last_error: "connection refused".to_string(),
            }
            .into());
        }
        Ok(self
            .collections
            .get(&owner.to_lowercase())
            .cloned()
            .unwrap_or_default())
    }

    async fn collection_name(&self, address: &str) -> Result<String> {
        self.calls.collection_name.fetch_add(1, Ordering::SeqCst);
        let key = address.to_lowercase();
        if self.hanging.contains(&key) {
            futures::future::pending::<()>().await;
        }

        self.name_in_flight.enter();
        if !self.detail_delay.is_zero() {
            tokio::time::sleep(self.detail_delay).await;
        }
        self.name_in_flight.exit();

        self.names
            .get(&key)
            .cloned()
            .ok_or_else(|| Self::reverted(address))
    }

    async fn contract_uri(&self, address: &str) -> Result<String> {
        self.calls.contract_uri.fetch_add(1, Ordering::SeqCst);
        if !self.detail_delay.is_zero() {
            tokio::time::sleep(self.detail_delay).await;
        }
        self.uris
            .get(&address.to_lowercase())
            .cloned()
            .ok_or_else(|| Self::reverted(address))
    }
}

// ============================================================================
// Metadata
// ============================================================================

/// Metadata resolver with fixed documents per URI
#[derive(Default)]
pub struct MockMetadata {
    documents: HashMap<String, CollectionMetadata>,
    pub resolves: AtomicUsize,
}

impl MockMetadata {
    pub const GATEWAY: &'static str = "https://gw.test/ipfs/";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(mut self, uri: &str, metadata: CollectionMetadata) -> Self {
        self.documents.insert(uri.to_string(), metadata);
        self
    }
}

#[async_trait]
impl MetadataResolver for MockMetadata {
    async fn resolve(&self, uri: &str) -> Result<CollectionMetadata> {
        self.resolves.fetch_add(1, Ordering::SeqCst);
        self.documents
            .get(uri)
            .cloned()
            .ok_or_else(|| {
                FetchError::AllEndpointsExhausted {
                    attempted: 3,
                    last_error: format!("{} not pinned", uri),
                }
                .into()
            })
    }

    fn display_url(&self, uri: &str) -> String {
        match uri.strip_prefix("ipfs://") {
            Some(rest) => format!("{}{}", Self::GATEWAY, rest),
            None => uri.to_string(),
        }
    }
}

// ============================================================================
// Network
// ============================================================================

/// Network with canned responses per URL.
///
/// Unknown URLs answer 404. `set_offline(true)` makes every fetch fail.
#[derive(Default)]
pub struct MockNetwork {
    responses: Mutex<HashMap<String, RouteResponse>>,
    offline: AtomicBool,
    delay: Mutex<Duration>,
    calls: Mutex<Vec<String>>,
}

impl MockNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, url: &str, response: RouteResponse) {
        self.responses
            .lock()
            .unwrap()
            .insert(url.to_string(), response);
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Delay every response by `delay`
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = delay;
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, url: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|u| *u == url).count()
    }
}

#[async_trait]
impl Network for MockNetwork {
    async fn fetch(&self, request: &RouteRequest) -> Result<RouteResponse> {
        let url = request.url.to_string();
        self.calls.lock().unwrap().push(url.clone());

        let delay = *self.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if self.offline.load(Ordering::SeqCst) {
            return Err(FetchError::Network("Failed to connect".to_string()).into());
        }

        let response = self.responses.lock().unwrap().get(&url).cloned();
        Ok(response.unwrap_or_else(|| RouteResponse::network(404, Vec::new(), &url)))
    }
}

// ============================================================================
// Image loader
// ============================================================================

/// Image loader that records attempts per URL
#[derive(Default)]
pub struct MockImageLoader {
    failing: HashSet<String>,
    delay: Duration,
    loads: Mutex<HashMap<String, usize>>,
    pub in_flight: InFlight,
}

impl MockImageLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(mut self, url: &str) -> Self {
        self.failing.insert(url.to_string());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn load_count(&self, url: &str) -> usize {
        self.loads.lock().unwrap().get(url).copied().unwrap_or(0)
    }

    pub fn total_loads(&self) -> usize {
        self.loads.lock().unwrap().values().sum()
    }
}

#[async_trait]
impl ImageLoader for MockImageLoader {
    async fn load(&self, url: &str) -> Result<()> {
        *self.loads.lock().unwrap().entry(url.to_string()).or_default() += 1;

        self.in_flight.enter();
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.exit();

        if self.failing.contains(url) {
            Err(FetchError::Status(404).into())
        } else {
            Ok(())
        }
    }
}
