//! crxdl retrieves browser extension packages and converts them from the
//! vendor's signed container format into plain ZIP archives.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::path::PathBuf;
//! use crxdl::{downloader::DownloaderBuilder, extension::PlatformDescriptor, job::Job, Error};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Error> {
//! let id = "cjpalhdlnbpafiamejdnhcphjbkeiagm";
//! let url = format!("https://example.com/crx/{}.crx", id);
//! let jobs = vec![Job::parse(id, PlatformDescriptor::default(), &url)?];
//! let downloader = DownloaderBuilder::new()
//!     .directory(PathBuf::from("output"))
//!     .build()?;
//! downloader.download(&jobs).await;
//! # Ok(())
//! # }
//! ```
//!
//! Conversion alone needs no network:
//!
//! ```rust
//! let package = b"PK\x03\x04 rest of the archive";
//! let archive = crxdl::crx::convert(package)?;
//! assert_eq!(archive, package);
//! # Ok::<(), crxdl::Error>(())
//! ```
//!
//! # Module Organization
//!
//! - [`crx`] - Format detection and container to archive conversion
//! - [`archive`] - ZIP integrity validation
//! - [`downloader`] - The [`Downloader`] orchestrator and its builder
//! - [`job`] - Job requests, lifecycle events and summaries
//! - [`cache`] - Pluggable result cache
//! - [`http`] - The fetch client contract and its reqwest implementation
//! - [`extension`] - Extension identifiers, platforms and fetch keys
//! - [`error`] - Centralized error handling with the [`Error`] enum
//! - [`utils`] - Shared utility functions

pub mod archive;
pub mod cache;
pub mod crx;
pub mod downloader;
pub mod error;
pub mod extension;
pub mod http;
pub mod job;
pub mod utils;

pub use archive::{validate_archive, ArchiveInfo};
pub use cache::{CacheBackend, CacheEntry, MemoryCache};
pub use crx::{convert, convert_bytes, detect, ConversionResult, PackageFormat};
pub use downloader::{Downloader, DownloaderBuilder, DownloaderConfig};
pub use error::{Error, Result, TransportError, TransportErrorKind};
pub use extension::{parse_id_list, ExtensionId, FetchKey, PlatformDescriptor};
pub use http::{create_http_client, Fetcher, HttpClientConfig, HttpFetcher};
pub use job::{BatchReport, Job, JobEvent, JobState, Origin, Status, Summary};
