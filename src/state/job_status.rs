//! Crawl job status definitions
use std::fmt;

/// Represents the lifecycle state of a crawl job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum JobStatus {
    /// Job is defined and waiting for its next trigger
    #[default]
    Idle,

    /// A crawl run for this job is in progress
    Running,

    /// The last run drained its frontier, hit its page budget, or was cancelled
    Completed,

    /// The last run stopped on an unrecoverable error
    Failed,
}

impl JobStatus {
    /// Returns true if a new run may be triggered from this state
    pub fn can_trigger(&self) -> bool {
        !matches!(self, Self::Running)
    }

    /// Returns true if this is the outcome of a finished run
    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Converts the job status to a database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Parses a job status from a database string representation
    ///
    /// Returns None if the string doesn't match any known status.
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "idle" => Some(Self::Idle),
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.to_db_string())
    }
}
