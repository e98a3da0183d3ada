//! Configuration management for Dreava

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::client::wallet::ProviderFlags;
use crate::error::{ConfigError, Result};

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Backend base URL; also the router's same-origin
    #[serde(default = "default_api_host")]
    pub api_host: String,

    /// Ordered RPC node list, tried first to last
    #[serde(default = "default_rpc_endpoints")]
    pub rpc_endpoints: Vec<String>,

    /// Collection registry contract address
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registry_address: Option<String>,

    /// Ordered IPFS gateway prefixes (`https://host/ipfs/`)
    #[serde(default = "default_ipfs_gateways")]
    pub ipfs_gateways: Vec<String>,

    /// Placeholder cover for collections whose metadata can't be resolved
    #[serde(default = "default_cover")]
    pub default_cover: String,

    /// Wallet identity
    #[serde(default)]
    pub wallet: WalletConfig,

    /// Cache settings
    #[serde(default)]
    pub cache: CacheConfig,

    /// Concurrency and timing knobs
    #[serde(default)]
    pub tuning: Tuning,
}

/// Wallet identity as seen by the reconciliation engine
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WalletConfig {
    /// Connected account address
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,

    /// Flags advertised by the injected provider
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<ProviderFlags>,
}

/// Cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Router bucket version tag (`dreava-api-<version>`)
    #[serde(default = "default_cache_version")]
    pub version: String,

    /// Freshness window for per-user collection caches
    #[serde(default = "default_collection_ttl_secs")]
    pub collection_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            version: default_cache_version(),
            collection_ttl_secs: default_collection_ttl_secs(),
        }
    }
}

/// Concurrency caps and timeouts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tuning {
    /// Detail fetches in flight per chunk
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Timeout for each on-chain name / contract URI read
    #[serde(default = "default_call_timeout_ms")]
    pub call_timeout_ms: u64,

    /// Image loads in flight per batch
    #[serde(default = "default_preload_batch_size")]
    pub preload_batch_size: usize,

    /// Pause between preload batches
    #[serde(default = "default_preload_delay_ms")]
    pub preload_delay_ms: u64,

    /// Whole-request timeout for the HTTP client
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            call_timeout_ms: default_call_timeout_ms(),
            preload_batch_size: default_preload_batch_size(),
            preload_delay_ms: default_preload_delay_ms(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl Tuning {
    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }

    pub fn preload_delay(&self) -> Duration {
        Duration::from_millis(self.preload_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn default_api_host() -> String {
    "http://localhost:3000".to_string()
}

fn default_rpc_endpoints() -> Vec<String> {
    vec![
        "https://ethereum-sepolia-rpc.publicnode.com".to_string(),
        "https://rpc.sepolia.org".to_string(),
        "https://sepolia.drpc.org".to_string(),
    ]
}

fn default_ipfs_gateways() -> Vec<String> {
    vec![
        "https://gateway.pinata.cloud/ipfs/".to_string(),
        "https://ipfs.io/ipfs/".to_string(),
        "https://dweb.link/ipfs/".to_string(),
    ]
}

fn default_cover() -> String {
    "/images/default-collection.png".to_string()
}

fn default_cache_version() -> String {
    "v1".to_string()
}

fn default_collection_ttl_secs() -> u64 {
    5 * 60
}

fn default_chunk_size() -> usize {
    4
}

fn default_call_timeout_ms() -> u64 {
    5000
}

fn default_preload_batch_size() -> usize {
    3
}

fn default_preload_delay_ms() -> u64 {
    100
}

fn default_request_timeout_secs() -> u64 {
    15
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_host: default_api_host(),
            rpc_endpoints: default_rpc_endpoints(),
            registry_address: None,
            ipfs_gateways: default_ipfs_gateways(),
            default_cover: default_cover(),
            wallet: WalletConfig::default(),
            cache: CacheConfig::default(),
            tuning: Tuning::default(),
        }
    }
}

impl Config {
    /// Get the default config file path
    pub fn default_path() -> Result<PathBuf> {
        let home = dirs::home_dir().ok_or(ConfigError::Invalid(
            "Could not determine home directory".to_string(),
        ))?;

        Ok(home.join(".dreava").join("config.yaml"))
    }

    /// Resolve an optional override to a concrete path
    pub fn resolve_path(path: Option<&str>) -> Result<PathBuf> {
        match path {
            Some(p) => Ok(PathBuf::from(p)),
            None => Self::default_path(),
        }
    }

    /// Load from the given (or default) path, falling back to defaults
    /// when no file exists yet.
    pub fn load_at(path: Option<&str>) -> Result<Self> {
        let path = Self::resolve_path(path)?;
        if !path.exists() {
            log::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents).map_err(ConfigError::from)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents =
            serde_yaml::to_string(self).map_err(|e| ConfigError::SaveError(e.to_string()))?;
        std::fs::write(path, contents)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = std::fs::metadata(path)?.permissions();
            perms.set_mode(0o600);
            std::fs::set_permissions(path, perms)?;
        }

        Ok(())
    }

    /// Reject settings the subsystem can't run with
    pub fn validate(&self) -> Result<()> {
        if self.tuning.chunk_size == 0 {
            return Err(ConfigError::Invalid("tuning.chunk_size must be at least 1".into()).into());
        }
        if self.tuning.preload_batch_size == 0 {
            return Err(ConfigError::Invalid(
                "tuning.preload_batch_size must be at least 1".into(),
            )
            .into());
        }
        if self.cache.version.trim().is_empty() {
            return Err(ConfigError::Invalid("cache.version must not be empty".into()).into());
        }
        Ok(())
    }

    pub fn collection_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.collection_ttl_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.tuning.chunk_size, 4);
        assert_eq!(config.tuning.preload_batch_size, 3);
        assert_eq!(config.tuning.call_timeout(), Duration::from_millis(5000));
        assert_eq!(config.tuning.preload_delay(), Duration::from_millis(100));
        assert_eq!(config.collection_ttl(), Duration::from_secs(300));
        assert_eq!(config.ipfs_gateways.len(), 3);
        assert!(config.wallet.account.is_none());
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let yaml = "wallet:\n  account: \"0xAbC\"\ntuning:\n  chunk_size: 2\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.wallet.account.as_deref(), Some("0xAbC"));
        assert_eq!(config.tuning.chunk_size, 2);
        assert_eq!(config.tuning.preload_batch_size, 3);
        assert_eq!(config.cache.version, "v1");
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nope.yaml");
        let config = Config::load_at(path.to_str()).unwrap();
        assert_eq!(config.api_host, "http://localhost:3000");
    }

    #[test]
    fn test_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.yaml");

        let mut config = Config::default();
        config.registry_address = Some("0x1234".to_string());
        config.cache.version = "v5".to_string();
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.registry_address.as_deref(), Some("0x1234"));
        assert_eq!(loaded.cache.version, "v5");
    }

    #[test]
    fn test_zero_chunk_size_rejected() {
        let mut config = Config::default();
        config.tuning.chunk_size = 0;
        assert!(config.validate().is_err());
    }
}
