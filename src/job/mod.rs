//! Job requests, lifecycle events and results.
//!
//! - [`Job`] - what to fetch and where to write it
//! - [`JobState`] / [`JobEvent`] - lifecycle transitions published while a
//!   batch runs
//! - [`Summary`] / [`Status`] / [`Origin`] - one result per submitted job
//! - [`BatchReport`] - totals over a finished batch
//!
//! # Example
//!
//! ```rust
//! use crxdl::extension::PlatformDescriptor;
//! use crxdl::job::Job;
//!
//! let job = Job::parse(
//!     "cjpalhdlnbpafiamejdnhcphjbkeiagm",
//!     PlatformDescriptor::default(),
//!     "https://example.com/cjpalhdlnbpafiamejdnhcphjbkeiagm.crx",
//! )?
//! .with_filename("ublock-origin");
//! assert_eq!(job.filename, "ublock-origin.zip");
//! # Ok::<(), crxdl::Error>(())
//! ```

#[allow(clippy::module_inception)]
mod job;
mod state;
pub mod summary;

pub use job::Job;
pub use state::{JobEvent, JobState};
pub use summary::{BatchReport, Origin, Status, Summary};
