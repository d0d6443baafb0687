//! Configuration structures and defaults for the downloader.
//!
//! A [`DownloaderConfig`] is assembled by the
//! [`DownloaderBuilder`](super::DownloaderBuilder), validated once in
//! `build()`, and never changes afterwards.
//!
//! # Example
//!
//! ```rust
//! use crxdl::downloader::JobCallback;
//! use crxdl::job::{Status, Summary};
//!
//! let callback: JobCallback = Box::new(|summary: &Summary| match summary.status() {
//!     Status::Success(result) => println!("{}: {} bytes", summary.job().id, result.len()),
//!     Status::Fail(error) => println!("{}: {}", summary.job().id, error),
//! });
//! ```

use super::retry::RetryPolicy;
use crate::error::{Error, Result};
use crate::http::HttpClientConfig;
use crate::job::{JobEvent, Summary};

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::Semaphore;

/// Callback type for job completion events.
pub type JobCallback = Box<dyn Fn(&Summary) + Send + Sync>;

/// Configuration structure for the downloader.
#[derive(Clone)]
pub struct DownloaderConfig {
    /// Number of worker slots.
    pub max_workers: usize,
    /// Attempts per fetch, the first one included.
    pub max_attempts: u32,
    /// Delay after the first failed attempt.
    pub backoff_base: Duration,
    /// Growth of the delay between consecutive attempts.
    pub backoff_factor: f64,
    /// Upper bound of a single delay.
    pub backoff_max: Duration,
    /// Largest accepted response body.
    pub max_bytes: u64,
    /// Outbound requests per second; `None` disables rate limiting.
    pub rate_limit: Option<f64>,
    /// Requests allowed back to back; defaults to `max_workers`.
    pub rate_burst: Option<u32>,
    /// Lifetime of successful cache entries; `None` keeps them for the process lifetime.
    pub cache_ttl: Option<Duration>,
    /// Directory receiving `<filename>` for every converted job.
    pub directory: Option<PathBuf>,
    /// Settings for the default HTTP fetcher.
    pub http: HttpClientConfig,
    /// Callback for when each job completes.
    pub on_complete: Option<Arc<JobCallback>>,
    /// Receives every job state transition.
    pub events: Option<UnboundedSender<JobEvent>>,
}

impl DownloaderConfig {
    /// Check every option, failing with [`Error::Config`] on the first bad one.
    pub fn validate(&self) -> Result<()> {
        if self.max_workers == 0 || self.max_workers > Semaphore::MAX_PERMITS {
            return Err(Error::Config(format!(
                "max_workers must be between 1 and {}, got {}",
                Semaphore::MAX_PERMITS,
                self.max_workers
            )));
        }
        if self.max_attempts == 0 {
            return Err(Error::Config("max_attempts must be at least 1".into()));
        }
        if !(self.backoff_factor.is_finite() && self.backoff_factor >= 1.0) {
            return Err(Error::Config(format!(
                "backoff_factor must be a finite number >= 1, got {}",
                self.backoff_factor
            )));
        }
        if self.backoff_max < self.backoff_base {
            return Err(Error::Config(format!(
                "backoff_max ({:?}) is shorter than backoff_base ({:?})",
                self.backoff_max, self.backoff_base
            )));
        }
        if self.max_bytes == 0 {
            return Err(Error::Config("max_bytes must be at least 1".into()));
        }
        if let Some(rate) = self.rate_limit {
            if !(rate.is_finite() && rate > 0.0) {
                return Err(Error::Config(format!(
                    "rate_limit must be a positive number, got {}",
                    rate
                )));
            }
        }
        if self.rate_burst == Some(0) {
            return Err(Error::Config("rate_burst must be at least 1".into()));
        }
        Ok(())
    }

    /// The backoff policy described by this configuration.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            base: self.backoff_base,
            factor: self.backoff_factor,
            max: self.backoff_max,
        }
    }

    /// Effective token bucket size.
    pub fn effective_burst(&self) -> u32 {
        self.rate_burst
            .unwrap_or_else(|| u32::try_from(self.max_workers).unwrap_or(u32::MAX))
    }
}

impl fmt::Debug for DownloaderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DownloaderConfig")
            .field("max_workers", &self.max_workers)
            .field("max_attempts", &self.max_attempts)
            .field("backoff_base", &self.backoff_base)
            .field("backoff_factor", &self.backoff_factor)
            .field("backoff_max", &self.backoff_max)
            .field("max_bytes", &self.max_bytes)
            .field("rate_limit", &self.rate_limit)
            .field("rate_burst", &self.rate_burst)
            .field("cache_ttl", &self.cache_ttl)
            .field("directory", &self.directory)
            .field("http", &self.http)
            .field("on_complete", &self.on_complete.is_some())
            .field("events", &self.events.is_some())
            .finish()
    }
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self {
            max_workers: 3,
            max_attempts: 3,
            backoff_base: Duration::from_secs(2),
            backoff_factor: 2.0,
            backoff_max: Duration::from_secs(30),
            max_bytes: 100 * 1024 * 1024,
            rate_limit: Some(1.0),
            rate_burst: None,
            cache_ttl: None,
            directory: None,
            http: HttpClientConfig::default(),
            on_complete: None,
            events: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = DownloaderConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.effective_burst(), 3);
        assert_eq!(config.retry_policy().max_attempts, 3);
    }

    #[test]
    fn test_rejects_zero_workers() {
        let config = DownloaderConfig {
            max_workers: 0,
            ..DownloaderConfig::default()
        };
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_rejects_shrinking_backoff() {
        let config = DownloaderConfig {
            backoff_factor: 0.5,
            ..DownloaderConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_inverted_backoff_bounds() {
        let config = DownloaderConfig {
            backoff_base: Duration::from_secs(60),
            ..DownloaderConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_bad_rate() {
        for rate in [0.0, -1.0, f64::NAN] {
            let config = DownloaderConfig {
                rate_limit: Some(rate),
                ..DownloaderConfig::default()
            };
            assert!(config.validate().is_err(), "rate {} accepted", rate);
        }
    }

    #[test]
    fn test_debug_hides_callback() {
        let config = DownloaderConfig {
            on_complete: Some(Arc::new(Box::new(|_: &Summary| {}))),
            ..DownloaderConfig::default()
        };
        assert!(format!("{:?}", config).contains("on_complete: true"));
    }
}
