//! Message types for actor communication.

use ractor::RpcReplyPort;
use synthesis_core::{Availability, AvailabilityReport, JobId, QueueSnapshot, SessionHandle, SynthesisResult};

use crate::job::{QueuedJob, Settlement};
use crate::queue_actor::PendingTicket;

/// Messages for the QueueActor.
#[derive(Debug)]
pub enum QueueMessage {
    /// Append a job to the pending list.
    Enqueue {
        job: QueuedJob,
        ticket: PendingTicket,
    },

    /// A dispatched job's work has finished.
    JobSettled {
        job_id: JobId,
        settlement: Settlement,
    },

    /// Get the queue's current state.
    GetSnapshot { reply: RpcReplyPort<QueueSnapshot> },

    /// Drop pending jobs and stop.
    Shutdown,
}

/// Messages for the SessionActor.
#[derive(Debug)]
pub enum SessionMessage {
    /// Probe the provider and memoise the result.
    CheckAvailability { reply: RpcReplyPort<Availability> },

    /// Get the memoised probe result without contacting the provider.
    LastAvailability {
        reply: RpcReplyPort<Option<AvailabilityReport>>,
    },

    /// Create a new session, replacing any cached one.
    CreateSession {
        reply: RpcReplyPort<SynthesisResult<SessionHandle>>,
    },

    /// Return the cached session, creating one on first use.
    EnsureSession {
        reply: RpcReplyPort<SynthesisResult<SessionHandle>>,
    },

    /// Get the cached session, if any.
    CurrentSession {
        reply: RpcReplyPort<Option<SessionHandle>>,
    },

    /// Release the cached session, if any.
    DestroySession { reply: RpcReplyPort<()> },

    /// Release the cached session and stop.
    Shutdown { reply: RpcReplyPort<()> },
}
