//! Remote data sources: RPC nodes, IPFS gateways, the launchpad backend

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};

use crate::error::{FetchError, Result};

pub mod abi;
pub mod backend;
pub mod endpoints;
pub mod gateway;
#[cfg(test)]
pub mod mock;
pub mod parallel;
pub mod rate_limit;
pub mod rpc;
pub mod wallet;

pub use backend::BackendClient;
pub use endpoints::{gateway_urls, resolve_display_url, try_endpoints};
pub use gateway::IpfsMetadataResolver;
pub use rpc::RpcRegistryClient;

/// On-chain collection registry and NFT contract reads
#[async_trait]
pub trait CollectionRegistry: Send + Sync {
    /// Addresses of every collection owned by `owner`
    async fn user_collections(&self, owner: &str) -> Result<Vec<String>>;

    /// `name()` of the collection contract
    async fn collection_name(&self, address: &str) -> Result<String>;

    /// `contractURI()` of the collection contract
    async fn contract_uri(&self, address: &str) -> Result<String>;
}

/// Resolves metadata URIs (IPFS, HTTP, data:) into collection metadata
#[async_trait]
pub trait MetadataResolver: Send + Sync {
    async fn resolve(&self, uri: &str) -> Result<CollectionMetadata>;

    /// Browser-loadable URL for an asset URI
    fn display_url(&self, uri: &str) -> String;
}

/// Contract-level metadata document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CollectionMetadata {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub image: Option<String>,
}

/// Shared HTTP client for every remote source
pub fn http_client(timeout: Duration) -> Result<HttpClient> {
    HttpClient::builder()
        .timeout(timeout)
        .user_agent(concat!("dreava/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| FetchError::Network(e.to_string()).into())
}
