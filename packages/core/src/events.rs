//! Event types for observing the synthesis pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Availability, JobId, SessionId};

/// Events emitted by the queue and session manager.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SynthesisEvent {
    // Job events
    /// A job joined the pending list.
    JobEnqueued {
        job_id: JobId,
        /// Jobs ahead of this one, including the running job.
        position: usize,
        timestamp: DateTime<Utc>,
    },
    /// A job took the execution slot.
    JobStarted {
        job_id: JobId,
        waited_ms: u64,
        timestamp: DateTime<Utc>,
    },
    /// A job's work resolved successfully.
    JobCompleted {
        job_id: JobId,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },
    /// A job's work rejected, timed out, or was aborted.
    JobFailed {
        job_id: JobId,
        error: String,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },

    // Session events
    /// The provider was probed.
    AvailabilityChecked {
        availability: Availability,
        timestamp: DateTime<Utc>,
    },
    /// A model session was created and cached.
    SessionCreated {
        session_id: SessionId,
        timestamp: DateTime<Utc>,
    },
    /// The cached model session was released.
    SessionDestroyed {
        session_id: SessionId,
        timestamp: DateTime<Utc>,
    },
}

impl SynthesisEvent {
    /// Get the timestamp of the event.
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            SynthesisEvent::JobEnqueued { timestamp, .. } => *timestamp,
            SynthesisEvent::JobStarted { timestamp, .. } => *timestamp,
            SynthesisEvent::JobCompleted { timestamp, .. } => *timestamp,
            SynthesisEvent::JobFailed { timestamp, .. } => *timestamp,
            SynthesisEvent::AvailabilityChecked { timestamp, .. } => *timestamp,
            SynthesisEvent::SessionCreated { timestamp, .. } => *timestamp,
            SynthesisEvent::SessionDestroyed { timestamp, .. } => *timestamp,
        }
    }

    /// Get the job ID associated with this event, if any.
    pub fn job_id(&self) -> Option<JobId> {
        match self {
            SynthesisEvent::JobEnqueued { job_id, .. } => Some(*job_id),
            SynthesisEvent::JobStarted { job_id, .. } => Some(*job_id),
            SynthesisEvent::JobCompleted { job_id, .. } => Some(*job_id),
            SynthesisEvent::JobFailed { job_id, .. } => Some(*job_id),
            _ => None,
        }
    }

    /// Get a short description of this event for logging.
    pub fn description(&self) -> String {
        match self {
            SynthesisEvent::JobEnqueued {
                job_id, position, ..
            } => format!("Job {} enqueued behind {}", job_id, position),
            SynthesisEvent::JobStarted {
                job_id, waited_ms, ..
            } => format!("Job {} started after {}ms", job_id, waited_ms),
            SynthesisEvent::JobCompleted {
                job_id,
                duration_ms,
                ..
            } => format!("Job {} completed in {}ms", job_id, duration_ms),
            SynthesisEvent::JobFailed { job_id, error, .. } => {
                format!("Job {} failed: {}", job_id, error)
            }
            SynthesisEvent::AvailabilityChecked { availability, .. } => {
                format!("Model availability: {}", availability)
            }
            SynthesisEvent::SessionCreated { session_id, .. } => {
                format!("Session {} created", session_id)
            }
            SynthesisEvent::SessionDestroyed { session_id, .. } => {
                format!("Session {} destroyed", session_id)
            }
        }
    }
}
