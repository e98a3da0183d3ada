//! Command execution context
//!
//! Loads configuration once, applies the global overrides, and builds
//! the shared pieces (cache storage, HTTP client, wallet) that command
//! handlers assemble into engines, routers and preloaders.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use log::debug;
use reqwest::{Client as HttpClient, Url};

use crate::cache::{CacheStorage, LocalCache};
use crate::cli::OutputFormat;
use crate::cli::args::GlobalOptions;
use crate::client::wallet::{ConfigFileWallet, ConfiguredWallet, WalletProvider};
use crate::client::{BackendClient, IpfsMetadataResolver, RpcRegistryClient, http_client};
use crate::collections::{EngineSettings, ReconciliationEngine};
use crate::config::Config;
use crate::error::{ConfigError, Result};
use crate::preload::{ImageLoader, ImagePreloader, PreloadRegistry};
use crate::router::{CacheRouter, HttpNetwork};

/// Shared state for one command invocation
pub struct CommandContext {
    /// Configuration with CLI overrides applied
    pub config: Config,
    pub format: OutputFormat,
    /// `None` with `--no-cache`
    pub storage: Option<Arc<Mutex<CacheStorage>>>,
    pub cache: LocalCache,
    pub wallet: Arc<ConfiguredWallet>,
    pub http: HttpClient,
    pub preloaded: PreloadRegistry,
}

impl CommandContext {
    /// Load config, apply overrides and open the cache.
    pub fn new(opts: &GlobalOptions) -> Result<Self> {
        let mut config = Config::load_at(opts.config_ref())?;

        if let Some(host) = opts.api_host_ref() {
            config.api_host = host.to_string();
        }
        if let Some(account) = opts.account_ref() {
            config.wallet.account = Some(account.to_string());
        }
        if let Some(version) = opts.cache_version_ref() {
            config.cache.version = version.to_string();
        }
        config.validate()?;

        let storage = if opts.no_cache {
            debug!("Cache disabled for this run");
            None
        } else {
            let dir = cache_dir(opts)?;
            Some(Arc::new(Mutex::new(CacheStorage::open_at(&dir)?)))
        };
        let cache = match &storage {
            Some(storage) => LocalCache::new(Arc::clone(storage)),
            None => LocalCache::disabled(),
        };

        let wallet = Arc::new(ConfiguredWallet::new(
            config.wallet.account.clone(),
            config.wallet.provider.clone(),
        ));
        let http = http_client(config.tuning.request_timeout())?;

        Ok(Self {
            config,
            format: opts.format,
            storage,
            cache,
            wallet,
            http,
            preloaded: PreloadRegistry::new(),
        })
    }

    /// Backend origin; the router treats it as "same origin"
    pub fn origin(&self) -> Result<Url> {
        Url::parse(&self.config.api_host).map_err(|e| {
            ConfigError::Invalid(format!("api_host '{}' is not a URL: {}", self.config.api_host, e))
                .into()
        })
    }

    pub fn backend(&self) -> BackendClient {
        BackendClient::new(self.http.clone(), &self.config.api_host)
    }

    /// Wallet that follows config file edits, unless `--account` pins it
    pub fn live_wallet(&self, opts: &GlobalOptions) -> Result<Arc<dyn WalletProvider>> {
        let wallet: Arc<dyn WalletProvider> = if opts.account_ref().is_some() {
            self.wallet.clone()
        } else {
            Arc::new(ConfigFileWallet::new(Config::resolve_path(opts.config_ref())?))
        };
        Ok(wallet)
    }

    /// Reconciliation engine over the configured RPC nodes and gateways
    pub fn engine(&self) -> Arc<ReconciliationEngine> {
        self.engine_with(self.wallet.clone())
    }

    /// Same as [`engine`](Self::engine) with a different wallet source
    pub fn engine_with(&self, wallet: Arc<dyn WalletProvider>) -> Arc<ReconciliationEngine> {
        let registry = RpcRegistryClient::new(
            self.http.clone(),
            self.config.rpc_endpoints.clone(),
            self.config.registry_address.clone(),
        );
        let metadata =
            IpfsMetadataResolver::new(self.http.clone(), self.config.ipfs_gateways.clone());

        Arc::new(ReconciliationEngine::new(
            wallet,
            Arc::new(registry),
            Arc::new(metadata),
            self.cache.clone(),
            EngineSettings::from_config(&self.config),
        ))
    }

    /// Cache router for the configured version; needs the cache.
    pub fn router(&self) -> Result<Arc<CacheRouter>> {
        let storage = self.storage.clone().ok_or_else(|| {
            ConfigError::Invalid("the cache router needs the local cache; drop --no-cache".into())
        })?;
        let origin = self.origin()?;
        let network = HttpNetwork::new(self.http.clone(), origin.clone());

        Ok(Arc::new(CacheRouter::new(
            storage,
            Arc::new(network),
            origin,
            &self.config.cache.version,
        )))
    }

    pub fn preloader(&self, loader: Arc<dyn ImageLoader>) -> ImagePreloader {
        ImagePreloader::new(
            loader,
            self.preloaded.clone(),
            self.config.tuning.preload_batch_size,
            self.config.tuning.preload_delay(),
        )
    }
}

/// Cache directory from `--cache-dir`, else the platform default
pub fn cache_dir(opts: &GlobalOptions) -> Result<PathBuf> {
    match opts.cache_dir_ref() {
        Some(dir) => Ok(PathBuf::from(dir)),
        None => Ok(CacheStorage::cache_dir()?),
    }
}
