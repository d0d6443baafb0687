use crate::extension::FetchKey;

use std::fmt;

/// Lifecycle of a job.
///
/// `Queued -> Fetching -> (Retrying -> Fetching)* -> Converting -> Validating -> Done`,
/// with `Failed` reachable from every non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobState {
    Queued,
    Fetching,
    Retrying,
    Converting,
    Validating,
    Done,
    Failed,
}

impl JobState {
    /// Whether the job has finished.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Done | JobState::Failed)
    }

    /// Whether a job in this state holds a worker slot.
    pub fn holds_slot(&self) -> bool {
        matches!(
            self,
            JobState::Fetching | JobState::Converting | JobState::Validating
        )
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JobState::Queued => "queued",
            JobState::Fetching => "fetching",
            JobState::Retrying => "retrying",
            JobState::Converting => "converting",
            JobState::Validating => "validating",
            JobState::Done => "done",
            JobState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// A state transition, published on the downloader's event channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobEvent {
    pub key: FetchKey,
    pub state: JobState,
    /// Attempt number the transition belongs to; 0 before the first fetch.
    pub attempt: u32,
}
