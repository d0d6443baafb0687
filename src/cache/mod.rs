//! Result cache.
//!
//! The orchestrator consults a [`CacheBackend`] before fetching and stores
//! every terminal outcome that describes the response itself: successful
//! conversions and permanent failures such as `NotAvailable`. Transient
//! failures and cancellations are never stored.
//!
//! [`MemoryCache`] is the default backend. Anything implementing
//! [`CacheBackend`] can be passed to
//! [`DownloaderBuilder::cache`](crate::downloader::DownloaderBuilder::cache).

mod memory;
mod traits;

pub use memory::MemoryCache;
pub use traits::{CacheBackend, CacheEntry};
