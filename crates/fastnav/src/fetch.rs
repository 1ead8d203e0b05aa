//! Page fetching — the seam to the page-content source.
//!
//! Every request carries a marker header so the server can tell an in-app
//! fetch from a normal page load. Any non-2xx status is a failure.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

use crate::error::{NavError, NavResult};

/// Default request marker sent with every fetch.
pub const DEFAULT_MARKER_HEADER: (&str, &str) = ("X-Requested-With", "XMLHttpRequest");

/// Source of page HTML.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// GET the page at `url` and return its body.
    async fn fetch(&self, url: &str) -> NavResult<String>;
}

/// HTTP fetcher backed by reqwest.
#[derive(Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Build a fetcher that sends `marker` on every request.
    ///
    /// `timeout` of `None` leaves requests unbounded.
    pub fn new(marker: (&str, &str), timeout: Option<Duration>) -> NavResult<Self> {
        let name = HeaderName::from_bytes(marker.0.as_bytes())
            .map_err(|e| NavError::Config(format!("bad marker header name {:?}: {e}", marker.0)))?;
        let value = HeaderValue::from_str(marker.1)
            .map_err(|e| NavError::Config(format!("bad marker header value {:?}: {e}", marker.1)))?;

        let mut headers = HeaderMap::new();
        headers.insert(name, value);

        let mut builder = reqwest::Client::builder()
            .default_headers(headers)
            .redirect(reqwest::redirect::Policy::limited(5));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
        })
    }

    /// Fetcher with the default marker and no timeout.
    pub fn with_defaults() -> NavResult<Self> {
        Self::new(DEFAULT_MARKER_HEADER, None)
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> NavResult<String> {
        let resp = self.client.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(NavError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(resp.text().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_fetch_sends_marker_header() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/projects"))
            .and(header("X-Requested-With", "XMLHttpRequest"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<main>p</main>"))
            .expect(1)
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::with_defaults().unwrap();
        let body = fetcher
            .fetch(&format!("{}/projects", server.uri()))
            .await
            .unwrap();
        assert_eq!(body, "<main>p</main>");
    }

    #[tokio::test]
    async fn test_non_success_status_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404).set_body_string("nope"))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::with_defaults().unwrap();
        let err = fetcher
            .fetch(&format!("{}/missing", server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, NavError::Status { status: 404, .. }));
    }

    #[tokio::test]
    async fn test_custom_marker() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(header("X-Fastnav", "1"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new(("X-Fastnav", "1"), Some(Duration::from_secs(5))).unwrap();
        let body = fetcher.fetch(&server.uri()).await.unwrap();
        assert!(body.is_empty());
    }

    #[test]
    fn test_invalid_marker_rejected() {
        let err = HttpFetcher::new(("bad header", "x"), None).err().unwrap();
        assert!(matches!(err, NavError::Config(_)));
    }
}
