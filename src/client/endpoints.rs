//! Ordered failover across equivalent endpoints.
//!
//! RPC nodes and IPFS gateways are interchangeable copies of the same
//! data; a call tries them strictly in order and returns the first
//! success. Individual failures are logged, never surfaced.

use std::fmt::Display;
use std::future::Future;

use log::{debug, warn};

use crate::error::{FetchError, Result};

/// Run `op` against each endpoint in order until one succeeds.
///
/// No retry happens within a single endpoint beyond what `op` does itself.
/// When every endpoint fails the result is `AllEndpointsExhausted`.
pub async fn try_endpoints<E, T, F, Fut>(endpoints: &[E], mut op: F) -> Result<T>
where
    E: Display,
    F: FnMut(&E) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut last_error = String::from("no endpoints configured");

    for (index, endpoint) in endpoints.iter().enumerate() {
        match op(endpoint).await {
            Ok(value) => {
                if index > 0 {
                    debug!("Endpoint {} succeeded after {} failures", endpoint, index);
                }
                return Ok(value);
            }
            Err(e) => {
                debug!("Endpoint {} failed: {}", endpoint, e);
                last_error = e.to_string();
            }
        }
    }

    warn!(
        "All {} endpoints failed (last error: {})",
        endpoints.len(),
        last_error
    );
    Err(FetchError::AllEndpointsExhausted {
        attempted: endpoints.len(),
        last_error,
    }
    .into())
}

/// Candidate URLs for a content URI, in the order they should be tried.
///
/// `ipfs://<cid>/<path>` (and the legacy `ipfs://ipfs/<cid>`) expands to one
/// URL per gateway prefix; `http(s)` URLs pass through untouched. Anything
/// else has no candidates.
pub fn gateway_urls(uri: &str, gateways: &[String]) -> Vec<String> {
    let uri = uri.trim();

    if let Some(path) = ipfs_path(uri) {
        return gateways
            .iter()
            .map(|gateway| format!("{}/{}", gateway.trim_end_matches('/'), path))
            .collect();
    }

    if uri.starts_with("https://") || uri.starts_with("http://") {
        return vec![uri.to_string()];
    }

    Vec::new()
}

/// First browser-loadable URL for `uri`, or `uri` unchanged.
pub fn resolve_display_url(uri: &str, gateways: &[String]) -> String {
    gateway_urls(uri, gateways)
        .into_iter()
        .next()
        .unwrap_or_else(|| uri.to_string())
}

fn ipfs_path(uri: &str) -> Option<&str> {
    let rest = uri.strip_prefix("ipfs://")?;
    let rest = rest.strip_prefix("ipfs/").unwrap_or(rest);
    let rest = rest.trim_start_matches('/');
    if rest.is_empty() { None } else { Some(rest) }
}
