//! Network transport
//!
//! The cache only needs a GET primitive returning a status and a body. The
//! body is read lazily so that a failed status never pays for the download.

use crate::error::{CacheError, Result};
use futures::future::BoxFuture;
use reqwest::Client;
use std::time::Duration;

/// Deferred response body
pub type BodyFuture = BoxFuture<'static, Result<Vec<u8>>>;

/// Status plus a body that has not been read yet
pub struct TransportResponse {
    pub status: u16,
    body: BodyFuture,
}

impl TransportResponse {
    pub fn new(status: u16, body: BodyFuture) -> Self {
        Self { status, body }
    }

    /// Response whose body is already in memory
    pub fn ready(status: u16, body: impl Into<Vec<u8>>) -> Self {
        let body = body.into();
        Self::new(status, Box::pin(async move { Ok::<_, CacheError>(body) }))
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Read the body
    pub async fn bytes(self) -> Result<Vec<u8>> {
        self.body.await
    }
}

impl std::fmt::Debug for TransportResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportResponse")
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

/// Trait for fetching a path (allows mocking in tests)
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// Issue a GET for `path`
    async fn fetch(&self, path: &str) -> Result<TransportResponse>;
}

/// Build the request path for a collection
pub fn collection_path(base_url: &str, name: &str) -> String {
    format!("{}{}.json", base_url, name)
}

/// Fetch a path and fail on any status outside 2xx
///
/// No retry is attempted.
pub async fn fetch_checked(transport: &dyn Transport, path: &str) -> Result<Vec<u8>> {
    let response = transport.fetch(path).await?;
    if !response.is_success() {
        return Err(CacheError::Backend {
            path: path.to_string(),
            status: response.status,
        });
    }
    response.bytes().await
}

/// reqwest-backed transport
///
/// Paths must be absolute URLs, so the cache should be configured with a
/// full backend URL when this transport is used.
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Create a transport with a per-request timeout
    pub fn new(timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self { client })
    }

    /// Wrap an existing client
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl Transport for HttpTransport {
    async fn fetch(&self, path: &str) -> Result<TransportResponse> {
        let response = self.client.get(path).send().await?;
        let status = response.status().as_u16();

        let body: BodyFuture = Box::pin(async move {
            let bytes = response.bytes().await?;
            Ok::<_, CacheError>(bytes.to_vec())
        });

        Ok(TransportResponse::new(status, body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedTransport {
        status: u16,
    }

    #[async_trait::async_trait]
    impl Transport for FixedTransport {
        async fn fetch(&self, _path: &str) -> Result<TransportResponse> {
            let body: BodyFuture = Box::pin(async {
                Err::<Vec<u8>, _>(CacheError::Internal("body must not be read".to_string()))
            });
            Ok(TransportResponse::new(self.status, body))
        }
    }

    #[test]
    fn test_collection_path() {
        assert_eq!(collection_path("/", "users"), "/users.json");
        assert_eq!(
            collection_path("http://api.test/v1/", "system"),
            "http://api.test/v1/system.json"
        );
    }

    #[test]
    fn test_success_range() {
        assert!(TransportResponse::ready(200, "").is_success());
        assert!(TransportResponse::ready(299, "").is_success());
        assert!(!TransportResponse::ready(199, "").is_success());
        assert!(!TransportResponse::ready(300, "").is_success());
        assert!(!TransportResponse::ready(404, "").is_success());
    }

    #[tokio::test]
    async fn test_failed_status_skips_body() {
        let transport = FixedTransport { status: 503 };
        let err = fetch_checked(&transport, "/users.json").await.unwrap_err();
        match err {
            CacheError::Backend { path, status } => {
                assert_eq!(path, "/users.json");
                assert_eq!(status, 503);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_with_client_unreachable_host() {
        let client = Client::builder()
            .timeout(Duration::from_millis(200))
            .build()
            .unwrap();
        let transport = HttpTransport::with_client(client);

        let err = fetch_checked(&transport, "http://127.0.0.1:1/users.json")
            .await
            .unwrap_err();
        assert!(matches!(err, CacheError::Http(_)));
    }

    #[tokio::test]
    async fn test_ready_body() {
        let response = TransportResponse::ready(200, "[]");
        assert_eq!(response.bytes().await.unwrap(), b"[]".to_vec());
    }
}
