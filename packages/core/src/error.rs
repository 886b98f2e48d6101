//! Error types shared by the synthesis pipeline.

use std::time::Duration;

use crate::Availability;

/// Result alias for synthesis operations.
pub type SynthesisResult<T> = Result<T, SynthesisError>;

/// Errors surfaced to callers of the synthesis pipeline.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SynthesisError {
    /// The request was malformed and never reached the queue.
    #[error("Invalid synthesis request: {0}")]
    Validation(String),

    /// The model provider is not ready to create sessions.
    #[error("Model is not available ({0})")]
    Unavailable(Availability),

    /// The provider reported availability but failed to create a session.
    #[error("Failed to create model session: {0}")]
    SessionCreation(String),

    /// The provider failed to start a streaming generation.
    #[error("Generation failed: {0}")]
    Generation(String),

    /// The job exceeded its configured deadline.
    #[error("Job timed out after {0:?}")]
    Timeout(Duration),

    /// The job's work was dropped before it produced a result.
    #[error("Job aborted: {0}")]
    JobAborted(String),

    /// The queue actor is no longer running.
    #[error("Synthesis queue is closed")]
    QueueClosed,

    #[error("Actor error: {0}")]
    Actor(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Errors reported by a model provider implementation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    #[error("Provider unavailable: {0}")]
    Unavailable(String),

    #[error("Session error: {0}")]
    Session(String),

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("Provider error: {0}")]
    Other(String),
}

impl ProviderError {
    /// The provider's message without the variant prefix.
    pub fn message(&self) -> &str {
        match self {
            ProviderError::Unavailable(msg)
            | ProviderError::Session(msg)
            | ProviderError::Generation(msg)
            | ProviderError::Other(msg) => msg,
        }
    }
}
