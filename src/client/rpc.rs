//! JSON-RPC collection registry client
//!
//! Every read is an `eth_call` tried against the configured RPC nodes in
//! order; the first node that answers wins.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client as HttpClient, StatusCode};
use serde::Deserialize;
use serde_json::json;

use super::abi;
use super::endpoints::try_endpoints;
use super::rate_limit::EndpointThrottle;
use super::CollectionRegistry;
use crate::error::{ConfigError, FetchError, Result};

/// JSON-RPC response envelope
#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<String>,
    #[serde(default)]
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

/// Registry client over a list of equivalent RPC nodes
pub struct RpcRegistryClient {
    http: HttpClient,
    endpoints: Vec<String>,
    registry: Option<String>,
    throttle: Arc<EndpointThrottle>,
}

impl RpcRegistryClient {
    pub fn new(http: HttpClient, endpoints: Vec<String>, registry: Option<String>) -> Self {
        Self {
            http,
            endpoints,
            registry,
            throttle: Arc::new(EndpointThrottle::default()),
        }
    }

    pub fn endpoints(&self) -> &[String] {
        &self.endpoints
    }

    /// `eth_call` against the first responsive node
    async fn eth_call(&self, to: &str, data: &str) -> Result<Vec<u8>> {
        try_endpoints(&self.endpoints, |endpoint| {
            let endpoint = endpoint.clone();
            async move { self.call_endpoint(&endpoint, to, data).await }
        })
        .await
    }

    async fn call_endpoint(&self, endpoint: &str, to: &str, data: &str) -> Result<Vec<u8>> {
        self.throttle.wait_for(endpoint).await;

        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "eth_call",
            "params": [{ "to": to, "data": data }, "latest"],
        });

        let response = self
            .http
            .post(endpoint)
            .json(&body)
            .send()
            .await
            .map_err(FetchError::from)?;

        match response.status() {
            StatusCode::OK => {}
            StatusCode::TOO_MANY_REQUESTS => {
                self.throttle.activate(endpoint).await;
                let retry_after = response
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(1);
                return Err(FetchError::RateLimit(Duration::from_secs(retry_after)).into());
            }
            status => return Err(FetchError::Status(status.as_u16()).into()),
        }

        let rpc: RpcResponse = response
            .json()
            .await
            .map_err(|e| FetchError::InvalidResponse(format!("Failed to parse RPC response: {}", e)))?;

        if let Some(err) = rpc.error {
            return Err(FetchError::Rpc {
                code: err.code,
                message: err.message,
            }
            .into());
        }

        let result = rpc
            .result
            .ok_or_else(|| FetchError::InvalidResponse("RPC response has no result".to_string()))?;
        abi::decode_hex(&result)
    }

    async fn read_string(&self, address: &str, selector: [u8; 4]) -> Result<String> {
        let data = self.eth_call(address, &abi::encode_call(selector)).await?;
        abi::decode_string(&data)
    }
}

#[async_trait]
impl CollectionRegistry for RpcRegistryClient {
    async fn user_collections(&self, owner: &str) -> Result<Vec<String>> {
        let registry = self.registry.as_deref().ok_or_else(|| {
            ConfigError::Invalid("registry_address is not configured".to_string())
        })?;
        let calldata = abi::encode_address_call(abi::GET_USER_COLLECTIONS, owner)?;
        let data = self.eth_call(registry, &calldata).await?;
        abi::decode_address_array(&data)
    }

    async fn collection_name(&self, address: &str) -> Result<String> {
        self.read_string(address, abi::NAME).await
    }

    async fn contract_uri(&self, address: &str) -> Result<String> {
        self.read_string(address, abi::CONTRACT_URI).await
    }
}
