//! reqwest-backed network collaborator.
//!
//! Addresses are resolved against an optional base URL, so request strings
//! can stay relative (`js/app.js`) the way they would inside a page.

use async_trait::async_trait;
use lazyload::{FetchError, Fetcher};
use std::time::Duration;
use url::Url;

/// Status line of a completed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Probe {
    pub url: String,
    pub status: u16,
    pub content_type: Option<String>,
}

impl Probe {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_image(&self) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|ct| ct.starts_with("image/"))
    }
}

/// HTTP client with base-URL resolution.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    base: Option<Url>,
}

impl HttpFetcher {
    pub fn new(base: Option<&str>, timeout: Duration) -> Result<Self, FetchError> {
        let base = base
            .map(|b| Url::parse(b).map_err(|_| FetchError::InvalidUrl(b.to_string())))
            .transpose()?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("lazyload/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FetchError::Network {
                url: String::new(),
                message: e.to_string(),
            })?;
        Ok(Self { client, base })
    }

    /// Turn an asset address into an absolute URL.
    pub fn resolve(&self, path: &str) -> Result<Url, FetchError> {
        match Url::parse(path) {
            Ok(url) => Ok(url),
            Err(url::ParseError::RelativeUrlWithoutBase) => self
                .base
                .as_ref()
                .and_then(|base| base.join(path).ok())
                .ok_or_else(|| FetchError::InvalidUrl(path.to_string())),
            Err(_) => Err(FetchError::InvalidUrl(path.to_string())),
        }
    }

    async fn get(&self, path: &str) -> Result<reqwest::Response, FetchError> {
        let url = self.resolve(path)?;
        self.client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| FetchError::Network {
                url: url.to_string(),
                message: e.to_string(),
            })
    }

    /// GET `path` and report how it finished, discarding the body.
    pub async fn probe(&self, path: &str) -> Result<Probe, FetchError> {
        let resp = self.get(path).await?;
        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        Ok(Probe {
            url: resp.url().to_string(),
            status: resp.status().as_u16(),
            content_type,
        })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch_text(&self, path: &str) -> Result<String, FetchError> {
        let resp = self.get(path).await?;
        let url = resp.url().to_string();
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url,
                status: status.as_u16(),
            });
        }
        resp.text().await.map_err(|e| FetchError::Network {
            url,
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_relative_against_base() {
        let fetcher =
            HttpFetcher::new(Some("https://cdn.example.com/assets/"), Duration::from_secs(5))
                .unwrap();
        assert_eq!(
            fetcher.resolve("js/app.js?v=2").unwrap().as_str(),
            "https://cdn.example.com/assets/js/app.js?v=2"
        );
        assert_eq!(
            fetcher.resolve("/root.css").unwrap().as_str(),
            "https://cdn.example.com/root.css"
        );
        assert_eq!(
            fetcher.resolve("https://other.example/x.js").unwrap().as_str(),
            "https://other.example/x.js"
        );
    }

    #[test]
    fn test_relative_without_base() {
        let fetcher = HttpFetcher::new(None, Duration::from_secs(5)).unwrap();
        assert_eq!(
            fetcher.resolve("js/app.js").unwrap_err(),
            FetchError::InvalidUrl("js/app.js".into())
        );
    }

    #[test]
    fn test_invalid_base() {
        let err = HttpFetcher::new(Some("not a url"), Duration::from_secs(5)).unwrap_err();
        assert_eq!(err, FetchError::InvalidUrl("not a url".into()));
    }

    #[test]
    fn test_probe_kinds() {
        let probe = Probe {
            url: "https://x/a.png".into(),
            status: 200,
            content_type: Some("image/png".into()),
        };
        assert!(probe.is_success());
        assert!(probe.is_image());

        let probe = Probe {
            url: "https://x/a.css".into(),
            status: 404,
            content_type: Some("text/css".into()),
        };
        assert!(!probe.is_success());
        assert!(!probe.is_image());
    }
}
