//! Network collaborator used to retrieve LESS sources.

use async_trait::async_trait;

/// Errors from a text fetch.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("invalid url {0}")]
    InvalidUrl(String),

    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("request to {url} failed: {message}")]
    Network { url: String, message: String },
}

/// Retrieve a resource body as text.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch_text(&self, path: &str) -> Result<String, FetchError>;
}
