//! Launchpad backend API client

use reqwest::{Client as HttpClient, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{FetchError, Result};

/// Path of the active-collections listing (cached by the router)
pub const ACTIVE_COLLECTIONS_PATH: &str = "/api/active-collections";
/// Path of the liveness probe
pub const STATUS_PATH: &str = "/api/status";
/// Path of the whitelist upload endpoint
pub const WHITELIST_SAVE_PATH: &str = "/api/whitelist/save";

/// `GET /api/active-collections` body
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActiveCollections {
    #[serde(default)]
    pub collections: Vec<serde_json::Value>,
}

/// `POST /api/whitelist/save` request body
#[derive(Debug, Clone, Serialize)]
pub struct WhitelistSaveRequest {
    pub collection: String,
    pub phase: String,
    pub addresses: Vec<String>,
}

/// Result of a whitelist upload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WhitelistSaved {
    pub ipfs_url: String,
    pub address_count: usize,
}

#[derive(Debug, Deserialize)]
struct DataEnvelope<T> {
    data: T,
}

/// Thin client for the backend's JSON API
pub struct BackendClient {
    http: HttpClient,
    base_url: String,
}

impl BackendClient {
    pub fn new(http: HttpClient, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Liveness probe; any 2xx counts as up
    pub async fn status(&self) -> Result<()> {
        let response = self
            .http
            .get(self.url(STATUS_PATH))
            .send()
            .await
            .map_err(FetchError::from)?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(FetchError::Status(response.status().as_u16()).into())
        }
    }

    pub async fn active_collections(&self) -> Result<ActiveCollections> {
        let response = self
            .http
            .get(self.url(ACTIVE_COLLECTIONS_PATH))
            .send()
            .await
            .map_err(FetchError::from)?;
        parse_json(response).await
    }

    /// Upload a whitelist phase; the backend pins it to IPFS
    pub async fn save_whitelist(&self, request: &WhitelistSaveRequest) -> Result<WhitelistSaved> {
        let response = self
            .http
            .post(self.url(WHITELIST_SAVE_PATH))
            .json(request)
            .send()
            .await
            .map_err(FetchError::from)?;
        let envelope: DataEnvelope<WhitelistSaved> = parse_json(response).await?;
        Ok(envelope.data)
    }
}

async fn parse_json<T: DeserializeOwned>(response: Response) -> Result<T> {
    match response.status() {
        StatusCode::OK | StatusCode::CREATED => response.json::<T>().await.map_err(|e| {
            FetchError::InvalidResponse(format!("Failed to parse response: {}", e)).into()
        }),
        StatusCode::TOO_MANY_REQUESTS => Err(FetchError::RateLimit(
            std::time::Duration::from_secs(
                response
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(60),
            ),
        )
        .into()),
        status => {
            let body = response.text().await.unwrap_or_default();
            log::debug!("Backend error {}: {}", status, body);
            Err(FetchError::Status(status.as_u16()).into())
        }
    }
}
