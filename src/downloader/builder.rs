//! Builder pattern implementation for creating Downloader instances.
//!
//! # Examples
//!
//! ## Basic Builder Usage
//!
//! ```rust
//! use crxdl::downloader::DownloaderBuilder;
//! use std::path::PathBuf;
//! use std::time::Duration;
//!
//! let downloader = DownloaderBuilder::new()
//!     .directory(PathBuf::from("./extensions"))
//!     .max_workers(5)
//!     .max_attempts(4)
//!     .backoff(Duration::from_secs(1), 2.0, Duration::from_secs(20))
//!     .build()?;
//! # Ok::<(), crxdl::Error>(())
//! ```
//!
//! ## Callbacks and Events
//!
//! ```rust
//! use crxdl::downloader::DownloaderBuilder;
//! use crxdl::job::Status;
//!
//! let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
//! let downloader = DownloaderBuilder::new()
//!     .events(tx)
//!     .on_complete(|summary| {
//!         if let Status::Fail(error) = summary.status() {
//!             eprintln!("{} failed: {}", summary.job().id, error);
//!         }
//!     })
//!     .build()?;
//! # Ok::<(), crxdl::Error>(())
//! ```

use super::{config::DownloaderConfig, downloader::Downloader, limiter::RequestLimiter};
use crate::cache::{CacheBackend, MemoryCache};
use crate::error::Result;
use crate::http::{Fetcher, HttpClientConfig, HttpFetcher};
use crate::job::{JobEvent, Summary};

use reqwest::header::{HeaderMap, HeaderValue, IntoHeaderName};
use std::fmt;
use std::{path::PathBuf, sync::Arc, time::Duration};
use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

/// A builder used to create a [`Downloader`].
///
/// ```rust
/// # fn main() -> Result<(), crxdl::Error> {
/// use crxdl::downloader::DownloaderBuilder;
///
/// let d = DownloaderBuilder::new().max_workers(8).rate_limit(None).build()?;
/// assert_eq!(d.max_workers(), 8);
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct DownloaderBuilder {
    config: DownloaderConfig,
    fetcher: Option<Arc<dyn Fetcher>>,
    cache: Option<Arc<dyn CacheBackend>>,
}

impl fmt::Debug for DownloaderBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DownloaderBuilder")
            .field("config", &self.config)
            .field("fetcher", &self.fetcher.is_some())
            .field("cache", &self.cache.is_some())
            .finish()
    }
}

impl DownloaderBuilder {
    /// Creates a builder with the default options.
    pub fn new() -> Self {
        DownloaderBuilder::default()
    }

    /// Start from an existing configuration.
    pub fn with_config(config: DownloaderConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Write every converted archive into `directory`.
    pub fn directory(mut self, directory: PathBuf) -> Self {
        self.config.directory = Some(directory);
        self
    }

    /// Set the number of worker slots.
    pub fn max_workers(mut self, max_workers: usize) -> Self {
        self.config.max_workers = max_workers;
        self
    }

    /// Set the number of attempts per fetch, the first one included.
    pub fn max_attempts(mut self, max_attempts: u32) -> Self {
        self.config.max_attempts = max_attempts;
        self
    }

    /// Set the exponential backoff parameters.
    pub fn backoff(mut self, base: Duration, factor: f64, max: Duration) -> Self {
        self.config.backoff_base = base;
        self.config.backoff_factor = factor;
        self.config.backoff_max = max;
        self
    }

    /// Set the largest accepted response body.
    pub fn max_bytes(mut self, max_bytes: u64) -> Self {
        self.config.max_bytes = max_bytes;
        self
    }

    /// Set the outbound request rate, or `None` for no limit.
    pub fn rate_limit(mut self, requests_per_second: Option<f64>) -> Self {
        self.config.rate_limit = requests_per_second;
        self
    }

    /// Set how many requests may be issued back to back.
    pub fn rate_burst(mut self, burst: u32) -> Self {
        self.config.rate_burst = Some(burst);
        self
    }

    /// Expire successful cache entries after `ttl`.
    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.config.cache_ttl = Some(ttl);
        self
    }

    /// Replace the HTTP settings of the default fetcher.
    pub fn http(mut self, http: HttpClientConfig) -> Self {
        self.config.http = http;
        self
    }

    /// Add extra headers to every request of the default fetcher.
    pub fn headers(mut self, headers: HeaderMap) -> Self {
        let mut new = self.config.http.headers.take().unwrap_or_default();
        new.extend(headers);
        self.config.http.headers = Some(new);
        self
    }

    /// Add a single header to every request of the default fetcher.
    pub fn header<K: IntoHeaderName>(mut self, name: K, value: HeaderValue) -> Self {
        let mut new = self.config.http.headers.take().unwrap_or_default();
        new.insert(name, value);
        self.config.http.headers = Some(new);
        self
    }

    /// Use a custom [`Fetcher`] instead of the reqwest one.
    pub fn fetcher(mut self, fetcher: Arc<dyn Fetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// Use a custom cache backend. `cache_ttl` only applies to the default
    /// [`MemoryCache`].
    pub fn cache(mut self, cache: Arc<dyn CacheBackend>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Publish every job state transition on `events`.
    pub fn events(mut self, events: UnboundedSender<JobEvent>) -> Self {
        self.config.events = Some(events);
        self
    }

    /// Call `callback` once per finished job.
    pub fn on_complete<F>(mut self, callback: F) -> Self
    where
        F: Fn(&Summary) + Send + Sync + 'static,
    {
        self.config.on_complete = Some(Arc::new(Box::new(callback)));
        self
    }

    /// Validate the configuration and create the [`Downloader`].
    pub fn build(self) -> Result<Downloader> {
        self.config.validate()?;
        let limiter = RequestLimiter::new(self.config.rate_limit, self.config.effective_burst())?;
        let fetcher = match self.fetcher {
            Some(fetcher) => fetcher,
            None => Arc::new(HttpFetcher::with_config(self.config.http.clone())?),
        };
        let cache = self
            .cache
            .unwrap_or_else(|| Arc::new(MemoryCache::new(self.config.cache_ttl)));
        debug!(config = ?self.config, "building downloader");
        Ok(Downloader::new(self.config, fetcher, cache, limiter))
    }
}
