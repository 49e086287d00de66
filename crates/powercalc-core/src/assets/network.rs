//! Network side of the asset cache.
//!
//! `HttpFetcher` retrieves assets from the origin the application is served
//! from. Responses are passed through as-is: a non-success status is still a
//! response, only transport failures are errors.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::AssetError;

// ============================================================================
// Constants
// ============================================================================

/// HTTP request timeout in seconds.
/// Assets are small; 15s fails fast enough that startup never feels hung.
const REQUEST_TIMEOUT_SECS: u64 = 15;

/// A fetched or cached asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl AssetResponse {
    pub fn ok(content_type: &str, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: 200,
            content_type: Some(content_type.to_string()),
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Performs the network request for an asset path.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, path: &str) -> Result<AssetResponse, AssetError>;
}

/// Fetcher for an HTTP origin.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
    base_url: String,
}

impl HttpFetcher {
    pub fn new(base_url: &str) -> Result<Self, AssetError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Resolve an asset path against the origin. Absolute URLs pass through.
    pub fn url_for(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, path: &str) -> Result<AssetResponse, AssetError> {
        let url = self.url_for(path);
        debug!(%url, "Fetching asset from network");

        let response = self.client.get(&url).send().await?;
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.bytes().await?.to_vec();

        debug!(%url, status, bytes = body.len(), "Asset fetched");
        Ok(AssetResponse {
            status,
            content_type,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_for_joins_paths() {
        let fetcher = HttpFetcher::new("https://calc.example.com/").unwrap();
        assert_eq!(fetcher.url_for("/"), "https://calc.example.com/");
        assert_eq!(
            fetcher.url_for("/icons/icon-192.png"),
            "https://calc.example.com/icons/icon-192.png"
        );
        assert_eq!(fetcher.url_for("app.js"), "https://calc.example.com/app.js");
        assert_eq!(
            fetcher.url_for("https://cdn.example.com/x.css"),
            "https://cdn.example.com/x.css"
        );
    }

    #[test]
    fn test_is_success() {
        assert!(AssetResponse::ok("text/css", "body{}").is_success());
        let missing = AssetResponse {
            status: 404,
            content_type: None,
            body: Vec::new(),
        };
        assert!(!missing.is_success());
    }
}
