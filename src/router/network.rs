//! Network transport behind the router

use async_trait::async_trait;
use reqwest::{Client as HttpClient, Method, Url};

use super::{RequestMode, ResponseKind, RouteRequest, RouteResponse};
use crate::error::{FetchError, Result};

/// Performs a request on the real network
#[async_trait]
pub trait Network: Send + Sync {
    async fn fetch(&self, request: &RouteRequest) -> Result<RouteResponse>;
}

/// `reqwest`-backed transport.
///
/// Response kinds follow browser rules: same-origin is basic, cross-origin
/// no-cors is opaque, anything else cross-origin is cors.
pub struct HttpNetwork {
    http: HttpClient,
    origin: Url,
}

impl HttpNetwork {
    pub fn new(http: HttpClient, origin: Url) -> Self {
        Self { http, origin }
    }

    fn kind_for(&self, request: &RouteRequest) -> ResponseKind {
        if request.url.origin() == self.origin.origin() {
            ResponseKind::Basic
        } else if request.mode == RequestMode::NoCors {
            ResponseKind::Opaque
        } else {
            ResponseKind::Cors
        }
    }
}

#[async_trait]
impl Network for HttpNetwork {
    async fn fetch(&self, request: &RouteRequest) -> Result<RouteResponse> {
        let method = Method::from_bytes(request.method.as_bytes())
            .map_err(|e| FetchError::Network(format!("Invalid method: {}", e)))?;

        let response = self
            .http
            .request(method, request.url.clone())
            .send()
            .await
            .map_err(FetchError::from)?;

        let status = response.status().as_u16();
        let url = response.url().to_string();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response.bytes().await.map_err(FetchError::from)?.to_vec();

        Ok(RouteResponse {
            url,
            status,
            headers,
            body,
            kind: self.kind_for(request),
            served_from: super::ServedFrom::Network,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fetch_same_origin() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/active-collections")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"collections":[]}"#)
            .create_async()
            .await;

        let origin = Url::parse(&server.url()).unwrap();
        let network = HttpNetwork::new(HttpClient::new(), origin.clone());
        let request = RouteRequest::get(origin.join("/api/active-collections").unwrap());

        let response = network.fetch(&request).await.unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.kind, ResponseKind::Basic);
        assert_eq!(response.header("content-type"), Some("application/json"));
        assert_eq!(response.body, br#"{"collections":[]}"#);
    }

    #[tokio::test]
    async fn test_cross_origin_image_is_opaque() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/a.png")
            .with_status(200)
            .with_body("png")
            .create_async()
            .await;

        let network = HttpNetwork::new(
            HttpClient::new(),
            Url::parse("http://app.invalid").unwrap(),
        );
        let url = Url::parse(&format!("{}/a.png", server.url())).unwrap();

        let response = network.fetch(&RouteRequest::image(url.clone())).await.unwrap();
        assert_eq!(response.kind, ResponseKind::Opaque);

        let response = network.fetch(&RouteRequest::get(url)).await.unwrap();
        assert_eq!(response.kind, ResponseKind::Cors);
    }

    #[tokio::test]
    async fn test_cross_origin_missing_image_rejected_by_router() {
        use crate::cache::CacheStorage;
        use crate::preload::ImageLoader;
        use crate::router::CacheRouter;
        use std::sync::{Arc, Mutex};

        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/missing.png")
            .with_status(404)
            .with_body("not found")
            .create_async()
            .await;

        let dir = tempfile::TempDir::new().unwrap();
        let storage = Arc::new(Mutex::new(CacheStorage::open_at(dir.path()).unwrap()));
        let origin = Url::parse("http://app.invalid").unwrap();
        let network = Arc::new(HttpNetwork::new(HttpClient::new(), origin.clone()));
        let router = CacheRouter::new(storage.clone(), network, origin, "v1");
        router.activate().unwrap();

        let url = format!("{}/missing.png", server.url());
        assert!(router.load(&url).await.is_err());
        assert_eq!(
            storage.lock().unwrap().bucket_len(&router.image_bucket()).unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn test_unreachable_host_is_error() {
        let network = HttpNetwork::new(
            HttpClient::new(),
            Url::parse("http://localhost:3000").unwrap(),
        );
        let request = RouteRequest::get(Url::parse("http://127.0.0.1:1/").unwrap());
        assert!(network.fetch(&request).await.is_err());
    }
}
