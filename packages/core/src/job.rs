//! Job bookkeeping types for the synthesis queue.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Unique identifier for a job, using ULID for chronological sorting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub Ulid);

impl JobId {
    /// Create a new unique job ID.
    pub fn new() -> Self {
        Self(Ulid::new())
    }

    /// Parse a job ID from a string.
    pub fn parse(s: &str) -> Result<Self, ulid::DecodeError> {
        Ok(Self(Ulid::from_string(s)?))
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The job currently holding the queue's single execution slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveJob {
    pub job_id: JobId,
    pub enqueued_at: DateTime<Utc>,
    pub started_at: DateTime<Utc>,
}

impl ActiveJob {
    /// Milliseconds the job has been running as of `now`.
    pub fn elapsed_ms(&self, now: DateTime<Utc>) -> u64 {
        (now - self.started_at).num_milliseconds().max(0) as u64
    }
}

/// How a job's work function finished.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum JobOutcome {
    Completed,
    Failed { error: String },
}

impl JobOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, JobOutcome::Completed)
    }
}

/// Point-in-time view of the queue.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueSnapshot {
    /// Jobs waiting for the execution slot.
    pub pending: usize,
    /// The job currently executing, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<ActiveJob>,
    /// Jobs settled successfully since start.
    pub completed: u64,
    /// Jobs settled with an error since start.
    pub failed: u64,
}

impl QueueSnapshot {
    pub fn is_idle(&self) -> bool {
        self.pending == 0 && self.active.is_none()
    }

    /// Total settled jobs.
    pub fn processed(&self) -> u64 {
        self.completed + self.failed
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeDelta;

    use super::*;

    #[test]
    fn job_id_parses_its_display_form() -> Result<(), ulid::DecodeError> {
        let id = JobId::new();
        assert_eq!(JobId::parse(&id.to_string())?, id);
        assert!(JobId::parse("not-a-ulid").is_err());
        Ok(())
    }

    #[test]
    fn snapshot_counts_settled_jobs() {
        let now = Utc::now();
        let mut snapshot = QueueSnapshot {
            completed: 3,
            failed: 1,
            ..Default::default()
        };
        assert!(snapshot.is_idle());
        assert_eq!(snapshot.processed(), 4);

        snapshot.active = Some(ActiveJob {
            job_id: JobId::new(),
            enqueued_at: now - TimeDelta::milliseconds(500),
            started_at: now - TimeDelta::milliseconds(200),
        });
        assert!(!snapshot.is_idle());
        let active = snapshot.active.as_ref().map(|a| a.elapsed_ms(now));
        assert_eq!(active, Some(200));
    }

    #[test]
    fn outcome_reports_success() {
        assert!(JobOutcome::Completed.is_success());
        assert!(
            !JobOutcome::Failed {
                error: "timed out".into()
            }
            .is_success()
        );
    }
}
