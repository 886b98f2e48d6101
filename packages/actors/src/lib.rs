//! Actor system for the note synthesis pipeline.
//!
//! This crate provides the Ractor-based actors that serialize requests into
//! a shared on-device language model.
//!
//! # Architecture
//!
//! - `SynthesisService` - Entry point that validates requests and queues work
//! - `QueueActor` - Runs queued jobs one at a time in submission order
//! - `SessionActor` - Owns the single lazily created model session
//! - `ModelProvider` - Trait implemented by model backends
//!
//! # Usage
//!
//! ```ignore
//! use synthesis_actors::SynthesisService;
//! use synthesis_core::{PageContext, RelatedNote, SynthesisConfig, SynthesisRequest};
//!
//! let service = SynthesisService::start(provider, SynthesisConfig::default()).await?;
//! let request = SynthesisRequest::new(
//!     PageContext::new("Ownership in Rust"),
//!     vec![RelatedNote::new("Borrowing", "References must not outlive...")],
//! );
//! let mut stream = service.generate_synthesis(request)?.await?;
//! while let Some(chunk) = stream.next().await { /* render */ }
//! ```
//!
//! A job settles as soon as its generation stream is handed back, so the
//! queue serializes session setup and prompt submission, not the reading of
//! the stream. A job that never settles holds the queue until its deadline
//! (`job_timeout_secs`); with no deadline configured it holds it forever.

mod job;
mod messages;
mod provider;
mod queue_actor;
mod service;
mod session_actor;

pub use job::JobHandle;
pub use provider::{ModelProvider, ProviderFuture, TokenStream};
pub use queue_actor::JobQueue;
pub use service::SynthesisService;
pub use session_actor::ModelSessionManager;
