//! Per-job results and batch totals.

use super::job::Job;
use crate::crx::ConversionResult;
use crate::error::Error;
use crate::utils::format_size;

use std::fmt;
use std::path::{Path, PathBuf};

/// Job status.
#[derive(Debug, Clone)]
pub enum Status {
    /// The package was retrieved, converted and validated.
    Success(ConversionResult),
    /// The job failed with the given error.
    Fail(Error),
}

/// Where a job's outcome came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// This job performed the fetch.
    Network,
    /// A completed cache entry was reused.
    Cache,
    /// The job attached to a fetch already in flight for the same key.
    Shared,
}

/// Represents a [`Job`] summary.
#[derive(Debug, Clone)]
pub struct Summary {
    job: Job,
    status: Status,
    origin: Origin,
    /// Bytes received over the network, across every attempt. Zero unless
    /// this job issued the fetch.
    bytes: u64,
    /// Number of fetch attempts made by this job.
    attempts: u32,
    /// Written archive, when an output directory is configured.
    path: Option<PathBuf>,
}

impl Summary {
    /// Create a new [`Job`] [`Summary`].
    pub fn new(job: Job, status: Status, origin: Origin) -> Self {
        Self {
            job,
            status,
            origin,
            bytes: 0,
            attempts: 0,
            path: None,
        }
    }

    /// Record the transfer statistics.
    pub fn with_transfer(self, bytes: u64, attempts: u32) -> Self {
        Self {
            bytes,
            attempts,
            ..self
        }
    }

    /// Attach the path of the written archive.
    pub fn with_path(self, path: PathBuf) -> Self {
        Self {
            path: Some(path),
            ..self
        }
    }

    /// Mark the summary as failed.
    pub fn fail(self, error: Error) -> Self {
        Self {
            status: Status::Fail(error),
            ..self
        }
    }

    pub fn job(&self) -> &Job {
        &self.job
    }

    pub fn status(&self) -> &Status {
        &self.status
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }

    pub fn bytes(&self) -> u64 {
        self.bytes
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn is_success(&self) -> bool {
        matches!(self.status, Status::Success(_))
    }

    /// The conversion result, or the error the job failed with.
    pub fn result(&self) -> Result<&ConversionResult, &Error> {
        match &self.status {
            Status::Success(result) => Ok(result),
            Status::Fail(error) => Err(error),
        }
    }
}

/// Totals over a finished batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub succeeded: usize,
    pub failed: usize,
    /// Jobs served without their own fetch (cache hits and shared fetches).
    pub reused: usize,
    /// Network bytes across the batch.
    pub bytes: u64,
}

impl BatchReport {
    pub fn from_summaries(summaries: &[Summary]) -> Self {
        summaries.iter().fold(Self::default(), |mut report, s| {
            if s.is_success() {
                report.succeeded += 1;
            } else {
                report.failed += 1;
            }
            if s.origin() != Origin::Network {
                report.reused += 1;
            }
            report.bytes += s.bytes();
            report
        })
    }

    pub fn total(&self) -> usize {
        self.succeeded + self.failed
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} succeeded, {} failed, {} reused, {} transferred",
            self.succeeded,
            self.total(),
            self.failed,
            self.reused,
            format_size(self.bytes)
        )
    }
}
