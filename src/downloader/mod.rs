//! The download orchestrator.
//!
//! - [`DownloaderBuilder`] - validated construction from a [`DownloaderConfig`]
//! - [`Downloader`] - worker slots, per-key deduplication, rate limiting,
//!   retries, caching and batch aggregation
//! - [`RetryPolicy`] - exponential backoff
//!
//! # Example
//!
//! ```rust,no_run
//! use crxdl::downloader::DownloaderBuilder;
//! use crxdl::extension::PlatformDescriptor;
//! use crxdl::job::Job;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), crxdl::Error> {
//! let downloader = DownloaderBuilder::new().max_workers(4).build()?;
//! let job = Job::parse(
//!     "cjpalhdlnbpafiamejdnhcphjbkeiagm",
//!     PlatformDescriptor::default(),
//!     "https://example.com/cjpalhdlnbpafiamejdnhcphjbkeiagm.crx",
//! )?;
//!
//! let cancel = CancellationToken::new();
//! let summaries = downloader.download_with_cancel(&[job], cancel.clone()).await;
//! assert_eq!(summaries.len(), 1);
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod config;
#[allow(clippy::module_inception)]
pub mod downloader;
mod limiter;
mod output;
pub mod retry;

pub use builder::DownloaderBuilder;
pub use config::{DownloaderConfig, JobCallback};
pub use downloader::{Downloader, PendingJob};
pub use retry::RetryPolicy;
