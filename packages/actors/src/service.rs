//! Synthesis service: the entry point that wires provider, session actor,
//! and queue actor together.

use std::sync::Arc;

use synthesis_core::{
    Availability, AvailabilityReport, PromptBuilder, QueueSnapshot, SynthesisConfig,
    SynthesisError, SynthesisEvent, SynthesisRequest, SynthesisResult,
};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::job::JobHandle;
use crate::provider::{ModelProvider, TokenStream};
use crate::queue_actor::JobQueue;
use crate::session_actor::ModelSessionManager;

/// Generates note syntheses through a single shared model session, one
/// request at a time.
///
/// Each service owns its own actors; construct one per provider and pass
/// it to whatever issues requests.
pub struct SynthesisService {
    provider: Arc<dyn ModelProvider>,
    sessions: ModelSessionManager,
    queue: JobQueue,
    prompts: PromptBuilder,
    event_tx: broadcast::Sender<SynthesisEvent>,
    actor_handles: Vec<JoinHandle<()>>,
}

impl SynthesisService {
    /// Start the session and queue actors for `provider`.
    pub async fn start(
        provider: Arc<dyn ModelProvider>,
        config: SynthesisConfig,
    ) -> SynthesisResult<Self> {
        config.validate()?;
        tracing::info!(
            max_notes = config.max_notes,
            job_timeout_secs = ?config.job_timeout_secs,
            "Starting synthesis service"
        );

        let (event_tx, _) = broadcast::channel(config.event_capacity);

        let (sessions, session_handle) = ModelSessionManager::start(
            provider.clone(),
            config.system_prompt.clone(),
            Some(event_tx.clone()),
        )
        .await
        .map_err(|e| SynthesisError::Actor(format!("Failed to spawn session actor: {}", e)))?;

        let (queue, queue_handle) = JobQueue::start(config.job_timeout(), Some(event_tx.clone()))
            .await
            .map_err(|e| SynthesisError::Actor(format!("Failed to spawn queue actor: {}", e)))?;

        Ok(Self {
            provider,
            sessions,
            queue,
            prompts: PromptBuilder::new(config.max_notes),
            event_tx,
            actor_handles: vec![session_handle, queue_handle],
        })
    }

    /// Queue a synthesis for the current page and its related notes.
    ///
    /// Invalid requests fail here and never reach the queue. Otherwise the
    /// returned handle resolves to the token stream as soon as generation
    /// has started; the stream itself is consumed outside the queue.
    pub fn generate_synthesis(
        &self,
        request: SynthesisRequest,
    ) -> SynthesisResult<JobHandle<TokenStream>> {
        let request = request.validate().inspect_err(|e| {
            tracing::warn!("Rejected synthesis request: {}", e);
        })?;
        tracing::info!(
            title = request.context().title().unwrap_or_default(),
            notes = request.notes().len(),
            "Queueing synthesis"
        );

        let sessions = self.sessions.clone();
        let provider = self.provider.clone();
        let prompts = self.prompts;

        Ok(self.queue.enqueue(move || async move {
            let session = sessions.ensure_session().await?;

            let prompt = prompts.construct_prompt(request.context(), request.notes());
            tracing::debug!(prompt_len = prompt.len(), "Constructed synthesis prompt");

            let stream = provider
                .stream_prompt(&session, &prompt)
                .await
                .map_err(|e| {
                    tracing::warn!("Synthesis generation failed: {}", e);
                    SynthesisError::Generation(e.message().to_string())
                })?;
            tracing::info!(session_id = %session.id, "Streaming synthesis started");
            Ok(stream)
        }))
    }

    /// Probe the model provider.
    pub async fn check_availability(&self) -> Availability {
        self.sessions.check_availability().await
    }

    /// Last probe result, without contacting the provider.
    pub async fn last_availability(&self) -> Option<AvailabilityReport> {
        self.sessions.last_availability().await
    }

    /// True while a synthesis job holds the queue. Meant for UI throttling.
    pub fn is_synthesizing(&self) -> bool {
        self.queue.is_active()
    }

    /// Jobs waiting behind the running one.
    pub fn pending_jobs(&self) -> usize {
        self.queue.pending_len()
    }

    pub async fn queue_snapshot(&self) -> SynthesisResult<QueueSnapshot> {
        self.queue.snapshot().await
    }

    /// Release the cached model session. The next synthesis creates a new one.
    pub async fn destroy_session(&self) {
        self.sessions.destroy_session().await
    }

    /// The session manager, for callers that manage sessions directly.
    pub fn sessions(&self) -> &ModelSessionManager {
        &self.sessions
    }

    /// Subscribe to queue and session events.
    pub fn subscribe(&self) -> broadcast::Receiver<SynthesisEvent> {
        self.event_tx.subscribe()
    }

    /// Release the session and stop both actors.
    pub async fn shutdown(self) {
        tracing::info!("Shutting down synthesis service");
        self.sessions.shutdown().await;
        self.queue.shutdown();
        for handle in self.actor_handles {
            if let Err(e) = handle.await {
                tracing::warn!("Actor task ended abnormally: {}", e);
            }
        }
    }
}
