//! The fetch client contract and its reqwest implementation.
//!
//! A [`Fetcher`] performs exactly one retrieval per call and reports failures
//! as [`TransportError`]s. Deciding whether to try again is left to the
//! orchestrator.

use crate::error::TransportError;
use crate::http::client::{create_http_client, HttpClientConfig};

use bytes::Bytes;
use futures::future::BoxFuture;
use futures::stream::BoxStream;
use futures::{FutureExt, StreamExt, TryStreamExt};
use reqwest::header::CONTENT_TYPE;
use reqwest::{StatusCode, Url};
use reqwest_middleware::ClientWithMiddleware;
use reqwest_retry::{default_on_request_failure, Retryable};
use std::fmt;
use tracing::debug;

/// A successful response whose body has not been read yet.
pub struct FetchResponse {
    /// HTTP status code.
    pub status: u16,
    /// Advertised body size, when the server sent one.
    pub content_length: Option<u64>,
    /// The body, chunk by chunk.
    pub body: BoxStream<'static, Result<Bytes, TransportError>>,
}

impl FetchResponse {
    /// Build a response from a list of chunks.
    pub fn from_chunks(chunks: Vec<Result<Bytes, TransportError>>) -> Self {
        let content_length = chunks
            .iter()
            .map(|c| c.as_ref().map(|b| b.len() as u64).ok())
            .sum::<Option<u64>>();
        Self {
            status: 200,
            content_length,
            body: futures::stream::iter(chunks).boxed(),
        }
    }
}

impl fmt::Debug for FetchResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchResponse")
            .field("status", &self.status)
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

/// Performs one network retrieval.
///
/// Implementations must surface a "no content" answer as
/// [`TransportErrorKind::NotAvailable`](crate::error::TransportErrorKind::NotAvailable)
/// and mark only retryable failures as transient.
pub trait Fetcher: Send + Sync {
    fn fetch<'a>(&'a self, url: &'a Url) -> BoxFuture<'a, Result<FetchResponse, TransportError>>;
}

/// [`Fetcher`] backed by a reqwest client with tracing middleware.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: ClientWithMiddleware,
}

impl HttpFetcher {
    /// Wrap an existing client.
    pub fn new(client: ClientWithMiddleware) -> Self {
        Self { client }
    }

    /// Build a client from `config`.
    pub fn with_config(config: HttpClientConfig) -> Result<Self, reqwest::Error> {
        Ok(Self::new(create_http_client(config)?))
    }

    async fn get(&self, url: &Url) -> Result<FetchResponse, TransportError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| classify_send_error(&e))?;

        let status = response.status();
        debug!(%url, status = status.as_u16(), "response received");

        if status == StatusCode::NO_CONTENT || !status.is_success() {
            return Err(TransportError::status(status.as_u16()));
        }

        let is_html = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.to_ascii_lowercase().contains("text/html"));
        if is_html {
            return Err(TransportError::not_available(
                "received an HTML page instead of a package",
            ));
        }

        let content_length = response.content_length();
        let body = response
            .bytes_stream()
            .map_err(|e| classify_body_error(&e))
            .boxed();

        Ok(FetchResponse {
            status: status.as_u16(),
            content_length,
            body,
        })
    }
}

impl Fetcher for HttpFetcher {
    fn fetch<'a>(&'a self, url: &'a Url) -> BoxFuture<'a, Result<FetchResponse, TransportError>> {
        self.get(url).boxed()
    }
}

fn classify_send_error(error: &reqwest_middleware::Error) -> TransportError {
    if let reqwest_middleware::Error::Reqwest(e) = error {
        if e.is_timeout() {
            return TransportError::timeout(e.to_string());
        }
    }
    match default_on_request_failure(error) {
        Some(Retryable::Transient) => TransportError::connection(error.to_string()),
        _ => TransportError::fatal(error.to_string()),
    }
}

fn classify_body_error(error: &reqwest::Error) -> TransportError {
    if error.is_timeout() {
        TransportError::timeout(error.to_string())
    } else {
        TransportError::body(error.to_string())
    }
}
