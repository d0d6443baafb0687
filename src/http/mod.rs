//! Network retrieval.
//!
//! - [`client`] - reqwest client creation with store headers and tracing
//! - [`fetcher`] - the [`Fetcher`] contract consumed by the orchestrator and
//!   its reqwest implementation, [`HttpFetcher`]
//!
//! Tests and embedders can supply their own [`Fetcher`] to
//! [`DownloaderBuilder::fetcher`](crate::downloader::DownloaderBuilder::fetcher).
//!
//! # Example
//!
//! ```rust,no_run
//! use crxdl::http::{Fetcher, HttpClientConfig, HttpFetcher};
//! use futures::StreamExt;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let fetcher = HttpFetcher::with_config(HttpClientConfig::default())?;
//! let url = "https://example.com/extension.crx".parse()?;
//! let mut response = fetcher.fetch(&url).await?;
//! while let Some(chunk) = response.body.next().await {
//!     println!("{} bytes", chunk?.len());
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod fetcher;

pub use client::{create_http_client, HttpClientConfig, DEFAULT_USER_AGENT};
pub use fetcher::{FetchResponse, Fetcher, HttpFetcher};
