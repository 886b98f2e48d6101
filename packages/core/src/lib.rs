//! Core domain types for the note synthesis pipeline.
//!
//! This crate contains the plain types shared by the actors:
//! - PageContext, RelatedNote and SynthesisRequest for inputs
//! - JobId and QueueSnapshot for queue bookkeeping
//! - SessionHandle and Availability for the model session lifecycle
//! - Events, errors, configuration, and the prompt builder

mod config;
mod context;
mod error;
mod events;
mod job;
mod prompt;
mod session;

pub use config::{DEFAULT_SYSTEM_PROMPT, ENV_JOB_TIMEOUT_SECS, ENV_MAX_NOTES, SynthesisConfig};
pub use context::{PageContext, RelatedNote, SynthesisRequest, ValidatedRequest};
pub use error::{ProviderError, SynthesisError, SynthesisResult};
pub use events::SynthesisEvent;
pub use job::{ActiveJob, JobId, JobOutcome, QueueSnapshot};
pub use prompt::PromptBuilder;
pub use session::{Availability, AvailabilityReport, ModelStatus, SessionHandle, SessionId};
