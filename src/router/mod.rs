//! HTTP cache router
//!
//! Intercepts outgoing requests and answers them with one of three
//! caching strategies chosen by request shape. Responses live in two
//! versioned buckets; activating a new version deletes every other one.

pub mod network;
pub mod worker;

use reqwest::Url;
use serde::Serialize;

use crate::cache::StoredResponse;
use crate::client::backend::ACTIVE_COLLECTIONS_PATH;

pub use network::{HttpNetwork, Network};
pub use worker::{BucketInfo, CacheRouter};

/// Extensions treated as images when no destination is declared
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp", "gif", "svg"];

/// Request mode, as a browser would set it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestMode {
    Navigate,
    SameOrigin,
    Cors,
    NoCors,
}

/// Declared request destination
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    Document,
    Image,
    Other,
}

/// An intercepted request
#[derive(Debug, Clone)]
pub struct RouteRequest {
    pub method: String,
    pub url: Url,
    pub mode: RequestMode,
    pub destination: Destination,
}

impl RouteRequest {
    /// Plain `GET` (fetch / XHR)
    pub fn get(url: Url) -> Self {
        Self {
            method: "GET".to_string(),
            url,
            mode: RequestMode::Cors,
            destination: Destination::Other,
        }
    }

    /// Page navigation
    pub fn navigate(url: Url) -> Self {
        Self {
            method: "GET".to_string(),
            url,
            mode: RequestMode::Navigate,
            destination: Destination::Document,
        }
    }

    /// `<img>` load
    pub fn image(url: Url) -> Self {
        Self {
            method: "GET".to_string(),
            url,
            mode: RequestMode::NoCors,
            destination: Destination::Image,
        }
    }

    pub fn with_method(mut self, method: &str) -> Self {
        self.method = method.to_uppercase();
        self
    }

    pub fn is_get(&self) -> bool {
        self.method.eq_ignore_ascii_case("GET")
    }

    /// Image by declared destination or by file extension
    pub fn is_image(&self) -> bool {
        if self.destination == Destination::Image {
            return true;
        }
        let path = self.url.path().to_lowercase();
        path.rsplit_once('.')
            .is_some_and(|(_, ext)| IMAGE_EXTENSIONS.contains(&ext))
    }

    /// Bucket identity (method + URL)
    pub fn cache_key(&self) -> String {
        crate::cache::request_key(&self.method, self.url.as_str())
    }
}

/// Response type, as a browser would report it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseKind {
    Basic,
    Cors,
    Opaque,
    Error,
}

impl ResponseKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseKind::Basic => "basic",
            ResponseKind::Cors => "cors",
            ResponseKind::Opaque => "opaque",
            ResponseKind::Error => "error",
        }
    }

    fn parse(s: &str) -> Self {
        match s {
            "basic" => ResponseKind::Basic,
            "cors" => ResponseKind::Cors,
            "opaque" => ResponseKind::Opaque,
            _ => ResponseKind::Error,
        }
    }
}

/// Where a routed response came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServedFrom {
    Network,
    Cache,
    Synthetic,
}

/// A routed response
#[derive(Debug, Clone, PartialEq)]
pub struct RouteResponse {
    pub url: String,
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    pub kind: ResponseKind,
    pub served_from: ServedFrom,
}

impl RouteResponse {
    /// A same-origin network response
    pub fn network(status: u16, body: Vec<u8>, url: &str) -> Self {
        Self {
            url: url.to_string(),
            status,
            headers: Vec::new(),
            body,
            kind: ResponseKind::Basic,
            served_from: ServedFrom::Network,
        }
    }

    pub fn with_kind(mut self, kind: ResponseKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_lowercase(), value.to_string()));
        self
    }

    /// Generic network failure (`Response.error()`)
    pub fn error() -> Self {
        Self {
            url: String::new(),
            status: 0,
            headers: Vec::new(),
            body: Vec::new(),
            kind: ResponseKind::Error,
            served_from: ServedFrom::Synthetic,
        }
    }

    /// Offline page of last resort for navigations
    pub fn service_unavailable() -> Self {
        Self {
            url: String::new(),
            status: 503,
            headers: vec![("content-type".to_string(), "text/plain".to_string())],
            body: b"Service Unavailable".to_vec(),
            kind: ResponseKind::Basic,
            served_from: ServedFrom::Synthetic,
        }
    }

    /// Stand-in for an unreachable collections API
    pub fn empty_json() -> Self {
        Self {
            url: String::new(),
            status: 200,
            headers: vec![(
                "content-type".to_string(),
                "application/json".to_string(),
            )],
            body: br#"{"collections":[]}"#.to_vec(),
            kind: ResponseKind::Basic,
            served_from: ServedFrom::Synthetic,
        }
    }

    /// 2xx status
    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Opaque with the status hidden (reported as 0)
    pub fn is_masked(&self) -> bool {
        self.kind == ResponseKind::Opaque && self.status == 0
    }

    /// Worth storing: OK, or opaque with a hidden status. An opaque
    /// response whose real status is known is judged on that status.
    pub fn is_cacheable(&self) -> bool {
        self.kind != ResponseKind::Error && (self.is_ok() || self.is_masked())
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn to_stored(&self) -> StoredResponse {
        StoredResponse {
            url: self.url.clone(),
            status: self.status,
            kind: self.kind.as_str().to_string(),
            headers: self.headers.clone(),
            body: self.body.clone(),
        }
    }

    pub fn from_stored(stored: StoredResponse) -> Self {
        Self {
            url: stored.url,
            status: stored.status,
            headers: stored.headers,
            body: stored.body,
            kind: ResponseKind::parse(&stored.kind),
            served_from: ServedFrom::Cache,
        }
    }
}

/// Caching strategy for a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    NetworkFirst,
    StaleWhileRevalidate,
    CacheFirst,
    Passthrough,
}

/// Pick the strategy for `request`; first match wins.
pub fn classify(request: &RouteRequest, origin: &Url) -> Strategy {
    if request.mode == RequestMode::Navigate {
        return Strategy::NetworkFirst;
    }
    if !request.is_get() {
        return Strategy::Passthrough;
    }
    if request.url.origin() == origin.origin() && request.url.path() == ACTIVE_COLLECTIONS_PATH {
        return Strategy::StaleWhileRevalidate;
    }
    if request.is_image() {
        return Strategy::CacheFirst;
    }
    Strategy::Passthrough
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin() -> Url {
        Url::parse("http://localhost:3000").unwrap()
    }

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_navigation_is_network_first() {
        let req = RouteRequest::navigate(url("http://localhost:3000/collections"));
        assert_eq!(classify(&req, &origin()), Strategy::NetworkFirst);

        // Navigation outranks the image heuristic
        let req = RouteRequest::navigate(url("http://localhost:3000/banner.png"));
        assert_eq!(classify(&req, &origin()), Strategy::NetworkFirst);
    }

    #[test]
    fn test_active_collections_same_origin_only() {
        let req = RouteRequest::get(url("http://localhost:3000/api/active-collections"));
        assert_eq!(classify(&req, &origin()), Strategy::StaleWhileRevalidate);

        let req = RouteRequest::get(url("http://localhost:3000/api/active-collections?page=2"));
        assert_eq!(classify(&req, &origin()), Strategy::StaleWhileRevalidate);

        let req = RouteRequest::get(url("https://other.test/api/active-collections"));
        assert_eq!(classify(&req, &origin()), Strategy::Passthrough);

        let req = RouteRequest::get(url("http://localhost:3000/api/active-collections"))
            .with_method("post");
        assert_eq!(classify(&req, &origin()), Strategy::Passthrough);
    }

    #[test]
    fn test_images_by_destination_or_extension() {
        let req = RouteRequest::image(url("https://gw.test/ipfs/cid"));
        assert_eq!(classify(&req, &origin()), Strategy::CacheFirst);

        for ext in ["png", "JPG", "jpeg", "webp", "gif", "svg"] {
            let req = RouteRequest::get(url(&format!("https://cdn.test/a/b.{}", ext)));
            assert_eq!(classify(&req, &origin()), Strategy::CacheFirst, "{}", ext);
        }

        let req = RouteRequest::get(url("https://cdn.test/a/b.json"));
        assert_eq!(classify(&req, &origin()), Strategy::Passthrough);

        let req = RouteRequest::get(url("https://cdn.test/a.png")).with_method("PUT");
        assert_eq!(classify(&req, &origin()), Strategy::Passthrough);
    }

    #[test]
    fn test_cacheable() {
        assert!(RouteResponse::network(200, vec![], "u").is_cacheable());
        assert!(!RouteResponse::network(404, vec![], "u").is_cacheable());
        assert!(
            RouteResponse::network(0, vec![], "u")
                .with_kind(ResponseKind::Opaque)
                .is_cacheable()
        );
        assert!(!RouteResponse::error().is_cacheable());
        assert!(
            !RouteResponse::network(404, vec![], "u")
                .with_kind(ResponseKind::Opaque)
                .is_cacheable()
        );
    }

    #[test]
    fn test_synthetic_responses() {
        let empty = RouteResponse::empty_json();
        assert_eq!(empty.status, 200);
        assert_eq!(empty.header("Content-Type"), Some("application/json"));
        let body: serde_json::Value = serde_json::from_slice(&empty.body).unwrap();
        assert_eq!(body["collections"].as_array().unwrap().len(), 0);

        assert_eq!(RouteResponse::service_unavailable().status, 503);
        assert_eq!(RouteResponse::error().kind, ResponseKind::Error);
    }

    #[test]
    fn test_stored_conversion_marks_cache_origin() {
        let response = RouteResponse::network(200, b"x".to_vec(), "https://a.test/x.png")
            .with_kind(ResponseKind::Cors)
            .with_header("Content-Type", "image/png");
        let back = RouteResponse::from_stored(response.to_stored());

        assert_eq!(back.served_from, ServedFrom::Cache);
        assert_eq!(back.kind, ResponseKind::Cors);
        assert_eq!(back.body, b"x");
        assert_eq!(back.header("content-type"), Some("image/png"));
    }
}
