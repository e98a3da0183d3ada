//! Cache key generation
//!
//! Scope keys follow the launchpad's storage conventions; request
//! identities for router buckets are SHA-256 hashes.

use sha2::{Digest, Sha256};

/// Prefix for per-user collection caches
const USER_COLLECTIONS_PREFIX: &str = "dreava_user_collections_";

/// Locally created collections awaiting on-chain confirmation
pub const PENDING_COLLECTIONS_KEY: &str = "dreava_collections";

/// Per-user collection cache key, case-insensitive in the address
pub fn user_collections_key(address: &str) -> String {
    format!("{}{}", USER_COLLECTIONS_PREFIX, address.trim().to_lowercase())
}

/// Versioned name of the API response bucket
pub fn api_bucket(version: &str) -> String {
    format!("dreava-api-{}", version)
}

/// Versioned name of the image response bucket
pub fn image_bucket(version: &str) -> String {
    format!("dreava-images-{}", version)
}

/// Deterministic identity of a request (method + URL).
pub fn request_key(method: &str, url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(method.to_uppercase().as_bytes());
    hasher.update(b" ");
    hasher.update(url.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_key_lowercases() {
        assert_eq!(
            user_collections_key("0xABCdef"),
            "dreava_user_collections_0xabcdef"
        );
        assert_eq!(
            user_collections_key("0xABCdef"),
            user_collections_key("0xabcDEF")
        );
    }

    #[test]
    fn test_bucket_names() {
        assert_eq!(api_bucket("v5"), "dreava-api-v5");
        assert_eq!(image_bucket("v5"), "dreava-images-v5");
    }

    #[test]
    fn test_request_key_deterministic() {
        let key1 = request_key("GET", "https://a.example/x.png");
        let key2 = request_key("get", "https://a.example/x.png");
        assert_eq!(key1, key2);
    }

    #[test]
    fn test_request_key_differs_by_method_and_url() {
        let get = request_key("GET", "https://a.example/api");
        let post = request_key("POST", "https://a.example/api");
        let other = request_key("GET", "https://a.example/api2");
        assert_ne!(get, post);
        assert_ne!(get, other);
    }
}
