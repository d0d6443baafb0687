//! Core orchestrator: scheduling, deduplication, retries and caching.
//!
//! Every submitted [`Job`] resolves in one of three ways:
//!
//! - a completed cache entry for its [`FetchKey`] is reused,
//! - it attaches to a fetch already in flight for the same key,
//! - or it starts the fetch itself.
//!
//! A fetch waits for a rate limiter token, then for a worker slot, and only
//! then issues the request. The slot is held while the body is read,
//! converted and validated, and released during retry backoff.
//!
//! A fetch is cancelled only once every job attached to it has been
//! cancelled; a job whose own token fires detaches and fails on its own.
//!
//! # Example
//!
//! ```rust,no_run
//! use crxdl::downloader::DownloaderBuilder;
//! use crxdl::extension::PlatformDescriptor;
//! use crxdl::job::Job;
//!
//! # async fn example() -> Result<(), crxdl::Error> {
//! let downloader = DownloaderBuilder::new().build()?;
//! let jobs = vec![Job::parse(
//!     "cjpalhdlnbpafiamejdnhcphjbkeiagm",
//!     PlatformDescriptor::default(),
//!     "https://example.com/cjpalhdlnbpafiamejdnhcphjbkeiagm.crx",
//! )?];
//!
//! for summary in downloader.download(&jobs).await {
//!     match summary.result() {
//!         Ok(result) => println!("{}: {} bytes", summary.job().id, result.len()),
//!         Err(error) => println!("{}: {}", summary.job().id, error),
//!     }
//! }
//! # Ok(())
//! # }
//! ```

use super::config::DownloaderConfig;
use super::limiter::RequestLimiter;
use super::output::write_atomically;
use crate::archive::validate_archive;
use crate::cache::{CacheBackend, CacheEntry};
use crate::crx::{convert_bytes, ConversionResult};
use crate::error::{Error, Result};
use crate::extension::FetchKey;
use crate::http::Fetcher;
use crate::job::{BatchReport, Job, JobEvent, JobState, Origin, Status, Summary};
use crate::utils::format_size;

use bytes::BytesMut;
use futures::future::{BoxFuture, Shared};
use futures::{FutureExt, StreamExt};
use parking_lot::Mutex;
use reqwest::Url;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Terminal result of one fetch, shared by every job with the same key.
#[derive(Debug, Clone)]
struct Outcome {
    result: std::result::Result<ConversionResult, Error>,
    bytes: u64,
    attempts: u32,
}

impl Outcome {
    fn reused(result: std::result::Result<ConversionResult, Error>) -> Self {
        Self {
            result,
            bytes: 0,
            attempts: 0,
        }
    }

    /// Successes and failures describing the response itself are cached.
    fn is_cacheable(&self) -> bool {
        match &self.result {
            Ok(_) => true,
            Err(e) => e.is_permanent(),
        }
    }
}

type SharedFetch = Shared<BoxFuture<'static, Outcome>>;

/// Jobs waiting on one fetch. The fetch token fires once all of them have
/// cancelled, or when the fetch finishes.
struct Interest {
    waiting: AtomicUsize,
    cancel: CancellationToken,
}

impl Interest {
    fn new(job_cancel: &CancellationToken) -> Arc<Self> {
        let interest = Arc::new(Self {
            waiting: AtomicUsize::new(1),
            cancel: CancellationToken::new(),
        });
        interest.watch(job_cancel.clone());
        interest
    }

    /// Register another job. Fails once every earlier job has cancelled.
    fn attach(self: &Arc<Self>, job_cancel: &CancellationToken) -> bool {
        let attached = self
            .waiting
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| (n > 0).then_some(n + 1))
            .is_ok();
        if attached {
            self.watch(job_cancel.clone());
        }
        attached
    }

    fn watch(self: &Arc<Self>, job_cancel: CancellationToken) {
        if job_cancel.is_cancelled() {
            self.release();
            return;
        }
        let interest = self.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = job_cancel.cancelled() => interest.release(),
                _ = interest.cancel.cancelled() => {}
            }
        });
    }

    fn release(&self) {
        if self.waiting.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.cancel.cancel();
        }
    }
}

struct InFlight {
    fetch: SharedFetch,
    interest: Arc<Interest>,
}

struct Inner {
    config: DownloaderConfig,
    fetcher: Arc<dyn Fetcher>,
    cache: Arc<dyn CacheBackend>,
    slots: Arc<Semaphore>,
    limiter: RequestLimiter,
    /// Fetches that have not resolved yet. Cache reads and writes happen
    /// under this lock too.
    in_flight: Mutex<HashMap<FetchKey, InFlight>>,
}

impl Inner {
    fn emit(&self, key: &FetchKey, state: JobState, attempt: u32) {
        if let Some(events) = &self.config.events {
            // A dropped receiver only means nobody is listening.
            let _ = events.send(JobEvent {
                key: key.clone(),
                state,
                attempt,
            });
        }
    }

    /// Drive one key through fetch, retry, conversion and validation.
    async fn run_fetch(self: Arc<Self>, key: FetchKey, url: Url, interest: Arc<Interest>) -> Outcome {
        let cancel = interest.cancel.clone();
        let policy = self.config.retry_policy();
        let mut attempts = 0u32;
        let mut bytes = 0u64;
        let mut reported = false;

        let result = loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break Err(Error::Cancelled),
                _ = self.limiter.until_ready() => {}
            }
            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => break Err(Error::Cancelled),
                permit = self.slots.clone().acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break Err(Error::Internal("worker pool closed".into())),
                },
            };

            attempts += 1;
            self.emit(&key, JobState::Fetching, attempts);
            debug!(%key, attempt = attempts, "fetching {}", url);

            match self.attempt(&key, &url, attempts, &cancel, &mut bytes).await {
                Ok(result) => {
                    self.emit(&key, JobState::Done, attempts);
                    reported = true;
                    break Ok(result);
                }
                Err(Error::Transport(e)) if policy.should_retry(attempts, &e) => {
                    let delay = policy.delay(attempts);
                    warn!(%key, attempt = attempts, error = %e, "attempt failed, retrying in {:?}", delay);
                    self.emit(&key, JobState::Retrying, attempts);
                    drop(permit);
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => break Err(Error::Cancelled),
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
                Err(e) => {
                    self.emit(&key, JobState::Failed, attempts);
                    reported = true;
                    break Err(e);
                }
            }
        };

        if !reported {
            self.emit(&key, JobState::Failed, attempts);
        }
        match &result {
            Ok(r) => info!(%key, attempts, bytes = %format_size(bytes), format = %r.format, "converted"),
            Err(e) => warn!(%key, attempts, error = %e, "fetch failed"),
        }

        let outcome = Outcome {
            result,
            bytes,
            attempts,
        };
        {
            let mut in_flight = self.in_flight.lock();
            if outcome.is_cacheable() {
                self.cache
                    .put(CacheEntry::new(key.clone(), outcome.result.clone()));
            }
            // A detached fetch may already have been replaced by a newer one.
            if in_flight
                .get(&key)
                .is_some_and(|entry| Arc::ptr_eq(&entry.interest, &interest))
            {
                in_flight.remove(&key);
            }
        }
        interest.cancel.cancel();
        outcome
    }

    /// One attempt: request, stream the body, convert and validate.
    async fn attempt(
        &self,
        key: &FetchKey,
        url: &Url,
        attempt: u32,
        cancel: &CancellationToken,
        bytes: &mut u64,
    ) -> Result<ConversionResult> {
        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            response = self.fetcher.fetch(url) => response?,
        };

        let limit = self.config.max_bytes;
        if let Some(advertised) = response.content_length {
            if advertised > limit {
                return Err(Error::SizeLimitExceeded {
                    limit,
                    received: advertised,
                });
            }
        }

        let capacity = response.content_length.unwrap_or(0).min(limit);
        let mut buf = BytesMut::with_capacity(usize::try_from(capacity).unwrap_or(0));
        let mut body = response.body;
        loop {
            let chunk = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(Error::Cancelled),
                chunk = body.next() => chunk,
            };
            let Some(chunk) = chunk else { break };
            let chunk = chunk?;
            *bytes += chunk.len() as u64;
            let received = (buf.len() + chunk.len()) as u64;
            if received > limit {
                return Err(Error::SizeLimitExceeded { limit, received });
            }
            buf.extend_from_slice(&chunk);
        }
        debug!(%key, size = %format_size(buf.len() as u64), "body received");

        self.emit(key, JobState::Converting, attempt);
        let result = convert_bytes(buf.freeze())?;

        self.emit(key, JobState::Validating, attempt);
        let payload = result.payload.clone();
        let info = tokio::task::spawn_blocking(move || validate_archive(&payload))
            .await
            .map_err(|e| Error::Internal(format!("validation task failed: {}", e)))??;
        debug!(%key, entries = info.entries, depth = result.depth, "archive valid");

        Ok(result)
    }
}

/// The downloader allows the user to retrieve and convert packages
/// concurrently.
#[derive(Clone)]
pub struct Downloader {
    inner: Arc<Inner>,
}

impl fmt::Debug for Downloader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Downloader")
            .field("config", &self.inner.config)
            .field("limiter", &self.inner.limiter)
            .field("in_flight", &self.inner.in_flight.lock().len())
            .finish()
    }
}

impl Downloader {
    pub(crate) fn new(
        config: DownloaderConfig,
        fetcher: Arc<dyn Fetcher>,
        cache: Arc<dyn CacheBackend>,
        limiter: RequestLimiter,
    ) -> Self {
        let slots = Arc::new(Semaphore::new(config.max_workers));
        Self {
            inner: Arc::new(Inner {
                config,
                fetcher,
                cache,
                slots,
                limiter,
                in_flight: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Get the downloader's configuration.
    pub fn config(&self) -> &DownloaderConfig {
        &self.inner.config
    }

    /// Get the downloader's output directory.
    pub fn directory(&self) -> Option<&Path> {
        self.inner.config.directory.as_deref()
    }

    /// Get the number of worker slots.
    pub fn max_workers(&self) -> usize {
        self.inner.config.max_workers
    }

    /// Get the number of attempts per fetch.
    pub fn max_attempts(&self) -> u32 {
        self.inner.config.max_attempts
    }

    /// Get the cache backend.
    pub fn cache(&self) -> &Arc<dyn CacheBackend> {
        &self.inner.cache
    }

    /// Number of worker slots not held by a fetch.
    pub fn available_slots(&self) -> usize {
        self.inner.slots.available_permits()
    }

    /// Number of keys currently being fetched.
    pub fn in_flight(&self) -> usize {
        self.inner.in_flight.lock().len()
    }

    /// Retrieve and convert every job, returning one [`Summary`] per job in
    /// input order.
    pub async fn download(&self, jobs: &[Job]) -> Vec<Summary> {
        self.download_with_cancel(jobs, CancellationToken::new())
            .await
    }

    /// Like [`download`](Self::download), stopping early once `cancel` fires.
    ///
    /// Jobs that have not started fail with [`Error::Cancelled`]; running
    /// fetches stop at their next chunk or before their next attempt.
    pub async fn download_with_cancel(
        &self,
        jobs: &[Job],
        cancel: CancellationToken,
    ) -> Vec<Summary> {
        debug!(jobs = jobs.len(), "starting batch");
        let pending: Vec<PendingJob> = jobs
            .iter()
            .cloned()
            .map(|job| self.submit_with_cancel(job, cancel.clone()))
            .collect();

        let summaries = futures::future::join_all(pending.into_iter().map(PendingJob::wait)).await;

        let report = BatchReport::from_summaries(&summaries);
        info!(%report, "batch finished");
        summaries
    }

    /// Submit a single job.
    ///
    /// Must be called from within a tokio runtime. The fetch runs in the
    /// background whether or not the returned handle is awaited.
    pub fn submit(&self, job: Job) -> PendingJob {
        self.submit_with_cancel(job, CancellationToken::new())
    }

    /// Submit a single job that stops once `cancel` fires.
    pub fn submit_with_cancel(&self, job: Job, cancel: CancellationToken) -> PendingJob {
        let key = job.key();
        self.inner.emit(&key, JobState::Queued, 0);

        let (origin, state, driver) = {
            let mut in_flight = self.inner.in_flight.lock();
            if let Some(entry) = self.inner.cache.get(&key) {
                debug!(%key, "cache hit");
                (Origin::Cache, Pending::Ready(Outcome::reused(entry.outcome)), None)
            } else if let Some(fetch) = in_flight
                .get(&key)
                .filter(|entry| entry.interest.attach(&cancel))
                .map(|entry| entry.fetch.clone())
            {
                debug!(%key, "attaching to fetch in flight");
                (Origin::Shared, Pending::InFlight(fetch), None)
            } else {
                let interest = Interest::new(&cancel);
                let fetch = self
                    .inner
                    .clone()
                    .run_fetch(key.clone(), job.url.clone(), interest.clone())
                    .boxed()
                    .shared();
                in_flight.insert(
                    key,
                    InFlight {
                        fetch: fetch.clone(),
                        interest,
                    },
                );
                (Origin::Network, Pending::InFlight(fetch.clone()), Some(fetch))
            }
        };

        if let Some(driver) = driver {
            tokio::spawn(driver);
        }

        PendingJob {
            inner: self.inner.clone(),
            job,
            origin,
            state,
            cancel,
        }
    }
}

enum Pending {
    Ready(Outcome),
    InFlight(SharedFetch),
}

/// A submitted job whose result has not been collected yet.
pub struct PendingJob {
    inner: Arc<Inner>,
    job: Job,
    origin: Origin,
    state: Pending,
    cancel: CancellationToken,
}

impl fmt::Debug for PendingJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingJob")
            .field("job", &self.job)
            .field("origin", &self.origin)
            .field("ready", &matches!(self.state, Pending::Ready(_)))
            .finish()
    }
}

impl PendingJob {
    pub fn job(&self) -> &Job {
        &self.job
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }

    /// Wait for the job to finish, write its output and run the callback.
    pub async fn wait(self) -> Summary {
        let PendingJob {
            inner,
            job,
            origin,
            state,
            cancel,
        } = self;
        let key = job.key();

        // A cancelled job detaches; the fetch keeps running for the others.
        let outcome = match state {
            Pending::Ready(outcome) => outcome,
            Pending::InFlight(fetch) => tokio::select! {
                biased;
                outcome = fetch => outcome,
                _ = cancel.cancelled() => Outcome::reused(Err(Error::Cancelled)),
            },
        };
        // Only the job that issued the fetch accounts for its traffic.
        let (bytes, attempts) = match origin {
            Origin::Network => (outcome.bytes, outcome.attempts),
            Origin::Cache | Origin::Shared => (0, 0),
        };

        if origin != Origin::Network {
            let state = if outcome.result.is_ok() {
                JobState::Done
            } else {
                JobState::Failed
            };
            inner.emit(&key, state, attempts);
        }

        let status = match outcome.result {
            Ok(result) => Status::Success(result),
            Err(error) => Status::Fail(error),
        };
        let mut summary =
            Summary::new(job, status, origin).with_transfer(bytes, attempts);

        let payload = match summary.status() {
            Status::Success(result) => Some(result.payload.clone()),
            Status::Fail(_) => None,
        };
        if let (Some(directory), Some(payload)) = (inner.config.directory.as_deref(), payload) {
            let written: Result<PathBuf> =
                write_atomically(directory, &summary.job().filename, &payload).await;
            summary = match written {
                Ok(path) => {
                    debug!(%key, path = %path.display(), "archive written");
                    summary.with_path(path)
                }
                Err(error) => {
                    warn!(%key, %error, "could not write archive");
                    inner.emit(&key, JobState::Failed, attempts);
                    summary.fail(error)
                }
            };
        }

        if let Some(ref callback) = inner.config.on_complete {
            callback(&summary);
        }
        summary
    }
}
