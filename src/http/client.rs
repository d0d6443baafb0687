//! HTTP client setup and middleware configuration.
//!
//! The client is tuned for talking to an extension store:
//!
//! - **Tracing**: every request goes through `reqwest-tracing`
//! - **Store headers**: a browser user agent, a referer and an `Accept`
//!   header listing the package content types
//! - **Timeout**: a per-request deadline
//! - **Proxy Support**: optional HTTP/HTTPS/SOCKS proxy
//!
//! No retry middleware is installed. The orchestrator owns retries so that
//! every attempt is counted, rate limited and reported.
//!
//! # Examples
//!
//! ```rust
//! use crxdl::http::{create_http_client, HttpClientConfig};
//! use std::time::Duration;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = HttpClientConfig {
//!     timeout: Duration::from_secs(10),
//!     ..HttpClientConfig::default()
//! };
//! let client = create_http_client(config)?;
//! # Ok(())
//! # }
//! ```

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, REFERER, USER_AGENT};
use reqwest::Proxy;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_tracing::TracingMiddleware;
use std::time::Duration;

/// Browser user agent sent by default; the store serves HTML to unknown agents.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

const DEFAULT_REFERER: &str = "https://chrome.google.com";
const DEFAULT_ACCEPT: &str = "application/octet-stream,application/x-chrome-extension,*/*";

/// Configuration for HTTP client setup.
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Deadline for a whole request, body included.
    pub timeout: Duration,
    /// Value of the `User-Agent` header.
    pub user_agent: String,
    /// Extra headers merged over the defaults.
    pub headers: Option<HeaderMap>,
    /// Optional proxy configuration.
    pub proxy: Option<Proxy>,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            headers: None,
            proxy: None,
        }
    }
}

fn default_headers(user_agent: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    if let Ok(value) = HeaderValue::from_str(user_agent) {
        headers.insert(USER_AGENT, value);
    }
    headers.insert(REFERER, HeaderValue::from_static(DEFAULT_REFERER));
    headers.insert(ACCEPT, HeaderValue::from_static(DEFAULT_ACCEPT));
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
    headers
}

/// Creates an HTTP client with middleware configuration.
///
/// A user agent that is not a valid header value is skipped rather than
/// failing the build.
pub fn create_http_client(
    config: HttpClientConfig,
) -> Result<ClientWithMiddleware, reqwest::Error> {
    let mut headers = default_headers(&config.user_agent);
    if let Some(extra) = config.headers {
        headers.extend(extra);
    }

    let mut inner_client_builder = reqwest::Client::builder()
        .timeout(config.timeout)
        .default_headers(headers);

    if let Some(proxy) = config.proxy {
        inner_client_builder = inner_client_builder.proxy(proxy);
    }

    let inner_client = inner_client_builder.build()?;

    let client = ClientBuilder::new(inner_client)
        // Trace HTTP requests. See the tracing crate to make use of these traces.
        .with(TracingMiddleware::default())
        .build();

    Ok(client)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = HttpClientConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert!(config.user_agent.contains("Chrome"));
        assert!(config.proxy.is_none());
        assert!(config.headers.is_none());
    }

    #[test]
    fn test_default_headers() {
        let headers = default_headers("agent/1.0");
        assert_eq!(headers[USER_AGENT], "agent/1.0");
        assert_eq!(headers[REFERER], DEFAULT_REFERER);
        assert!(headers[ACCEPT]
            .to_str()
            .unwrap()
            .contains("application/x-chrome-extension"));
    }

    #[test]
    fn test_invalid_user_agent_is_skipped() {
        let headers = default_headers("bad\nagent");
        assert!(headers.get(USER_AGENT).is_none());
    }

    #[test]
    fn test_create_http_client_with_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static("test-agent"));

        let config = HttpClientConfig {
            headers: Some(headers),
            ..HttpClientConfig::default()
        };

        assert!(create_http_client(config).is_ok());
    }
}
