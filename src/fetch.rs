//! # Configuration Download
//!
//! Fetches the presentation [`Configuration`] for this device from its base
//! configuration source over HTTP.
//!
//! ## Document lookup
//! 1. **Device document**: `{base}/{device_id}.json`, so a single device can be
//!    configured on its own
//! 2. **Shared document**: `{base}/base.json`, used when the device document
//!    does not exist (HTTP 404)
//!
//! Any other failure (timeouts, 5xx responses, malformed JSON, odd page
//! lists) is returned to the caller as a [`FetchError`]. The orchestrator
//! reports it and falls back to the last known safe settings; nothing here
//! retries.

use crate::configuration::{ConfigError, Configuration};
use crate::orchestrator::FetchRequest;
use reqwest::{StatusCode, Url};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Name of the document shared by every device under a base source.
pub const SHARED_DOCUMENT: &str = "base.json";

/// Errors that can occur while downloading a configuration.
#[derive(Error, Debug)]
pub enum FetchError {
    /// Request failed (network, timeout, TLS or protocol error)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Server answered with an unexpected status
    #[error("server returned {status} for {url}")]
    Status { status: u16, url: String },

    /// Neither the device nor the shared document exists
    #[error("no settings found under {0}")]
    NotFound(String),

    /// Base source cannot carry a document path
    #[error("invalid base source: {0}")]
    InvalidBase(String),

    /// Document downloaded but is not a valid configuration
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Source of presentation configurations, driven by the runtime loop.
pub trait ConfigSource {
    fn fetch(
        &self,
        request: &FetchRequest,
    ) -> impl Future<Output = Result<Configuration, FetchError>>;
}

/// Downloads configuration documents with `reqwest`.
#[derive(Clone, Debug)]
pub struct HttpConfigSource {
    client: reqwest::Client,
}

impl HttpConfigSource {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    /// Body of `url`, or `None` when the server answers 404.
    async fn get_document(&self, url: &Url) -> Result<Option<Vec<u8>>, FetchError> {
        let response = self.client.get(url.clone()).send().await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => Ok(Some(response.bytes().await?.to_vec())),
            status => Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            }),
        }
    }
}

/// `document` appended to `base` as a single, percent-encoded path segment.
pub fn document_url(base: &str, document: &str) -> Result<Url, FetchError> {
    let invalid = || FetchError::InvalidBase(base.to_string());
    let mut url = Url::parse(base).map_err(|_| invalid())?;
    url.path_segments_mut()
        .map_err(|()| invalid())?
        .pop_if_empty()
        .push(document);
    Ok(url)
}

impl ConfigSource for HttpConfigSource {
    async fn fetch(&self, request: &FetchRequest) -> Result<Configuration, FetchError> {
        let base = request.base_source.as_str();
        let device_url = document_url(base, &format!("{}.json", request.device_id))?;

        let body = match self.get_document(&device_url).await? {
            Some(body) => body,
            None => {
                let shared_url = document_url(base, SHARED_DOCUMENT)?;
                debug!(url = %device_url, "no device settings, using shared document");
                self.get_document(&shared_url)
                    .await?
                    .ok_or_else(|| FetchError::NotFound(base.to_string()))?
            }
        };

        Ok(Configuration::from_json(&body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configuration::Layout;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request(server: &MockServer) -> FetchRequest {
        FetchRequest {
            ticket: 1,
            base_source: format!("{}/kiosk/", server.uri()),
            device_id: "lobby-1".to_string(),
        }
    }

    fn source() -> HttpConfigSource {
        HttpConfigSource::new(Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn device_id_is_a_single_path_segment() {
        let url = document_url("https://cfg.example/kiosk/", "lobby/1 a?.json").unwrap();
        assert_eq!(url.path(), "/kiosk/lobby%2F1%20a%3F.json");
        assert_eq!(url.query(), None);

        let url = document_url("https://cfg.example", SHARED_DOCUMENT).unwrap();
        assert_eq!(url.as_str(), "https://cfg.example/base.json");

        assert!(matches!(
            document_url("not a url", SHARED_DOCUMENT),
            Err(FetchError::InvalidBase(_))
        ));
    }

    #[tokio::test]
    async fn prefers_device_document() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/kiosk/lobby-1.json"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(r#"{"layout": 3, "home": ["u", "t"]}"#),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/kiosk/base.json"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"layout": 1}"#))
            .mount(&server)
            .await;

        let config = source().fetch(&request(&server)).await.unwrap();
        assert_eq!(config.layout, Layout::SeventyThirty);
    }

    #[tokio::test]
    async fn falls_back_to_shared_document() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/kiosk/base.json"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"layout": 1}"#))
            .mount(&server)
            .await;

        let config = source().fetch(&request(&server)).await.unwrap();
        assert_eq!(config.layout, Layout::Half);
    }

    #[tokio::test]
    async fn missing_documents_are_not_found() {
        let server = MockServer::start().await;
        let err = source().fetch(&request(&server)).await.unwrap_err();
        assert!(matches!(err, FetchError::NotFound(_)), "{err}");
    }

    #[tokio::test]
    async fn server_error_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = source().fetch(&request(&server)).await.unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 503, .. }), "{err}");
    }

    #[tokio::test]
    async fn odd_page_list_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/kiosk/lobby-1.json"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"sites": ["u"]}"#))
            .mount(&server)
            .await;

        let err = source().fetch(&request(&server)).await.unwrap_err();
        assert!(matches!(err, FetchError::Config(_)), "{err}");
    }
}
