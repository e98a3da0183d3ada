//! IPFS multi-gateway metadata resolution

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose};
use reqwest::{Client as HttpClient, StatusCode, Url};

use super::endpoints::{gateway_urls, resolve_display_url, try_endpoints};
use super::rate_limit::EndpointThrottle;
use super::{CollectionMetadata, MetadataResolver};
use crate::error::{FetchError, Result};

/// Resolves metadata URIs through an ordered list of IPFS gateways
pub struct IpfsMetadataResolver {
    http: HttpClient,
    gateways: Vec<String>,
    throttle: Arc<EndpointThrottle>,
}

impl IpfsMetadataResolver {
    pub fn new(http: HttpClient, gateways: Vec<String>) -> Self {
        Self {
            http,
            gateways,
            throttle: Arc::new(EndpointThrottle::default()),
        }
    }

    async fn fetch_json(&self, url: &str) -> Result<CollectionMetadata> {
        let host = throttle_key(url);
        self.throttle.wait_for(&host).await;

        let response = self.http.get(url).send().await.map_err(FetchError::from)?;

        match response.status() {
            StatusCode::OK => {}
            StatusCode::TOO_MANY_REQUESTS => {
                self.throttle.activate(&host).await;
                return Err(FetchError::RateLimit(Duration::from_secs(1)).into());
            }
            status => return Err(FetchError::Status(status.as_u16()).into()),
        }

        response
            .json::<CollectionMetadata>()
            .await
            .map_err(|e| FetchError::InvalidResponse(format!("Invalid metadata JSON: {}", e)).into())
    }
}

#[async_trait]
impl MetadataResolver for IpfsMetadataResolver {
    async fn resolve(&self, uri: &str) -> Result<CollectionMetadata> {
        if uri.starts_with("data:") {
            return parse_data_uri(uri);
        }

        let urls = gateway_urls(uri, &self.gateways);
        if urls.is_empty() {
            return Err(FetchError::UnsupportedUri(uri.to_string()).into());
        }

        try_endpoints(&urls, |url| {
            let url = url.clone();
            async move { self.fetch_json(&url).await }
        })
        .await
    }

    fn display_url(&self, uri: &str) -> String {
        resolve_display_url(uri, &self.gateways)
    }
}

/// Throttling is per gateway host, not per content URL
fn throttle_key(url: &str) -> String {
    Url::parse(url)
        .map(|u| u.origin().ascii_serialization())
        .unwrap_or_else(|_| url.to_string())
}

/// Decode inline `data:application/json[;base64],...` metadata
pub fn parse_data_uri(uri: &str) -> Result<CollectionMetadata> {
    let rest = uri
        .strip_prefix("data:")
        .ok_or_else(|| FetchError::UnsupportedUri(uri.to_string()))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| FetchError::UnsupportedUri(uri.to_string()))?;

    if !header.starts_with("application/json") {
        return Err(FetchError::UnsupportedUri(uri.to_string()).into());
    }

    let bytes = if header.ends_with(";base64") {
        general_purpose::STANDARD
            .decode(payload.trim())
            .map_err(|e| FetchError::InvalidResponse(format!("Invalid base64 metadata: {}", e)))?
    } else {
        payload.as_bytes().to_vec()
    };

    serde_json::from_slice(&bytes)
        .map_err(|e| FetchError::InvalidResponse(format!("Invalid metadata JSON: {}", e)).into())
}
