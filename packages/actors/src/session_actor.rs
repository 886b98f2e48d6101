//! Session actor that owns the single model session.

use std::sync::Arc;

use chrono::Utc;
use ractor::{Actor, ActorProcessingErr, ActorRef, RpcReplyPort};
use synthesis_core::{
    Availability, AvailabilityReport, SessionHandle, SynthesisError, SynthesisEvent,
    SynthesisResult,
};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::messages::SessionMessage;
use crate::provider::ModelProvider;

/// State for the session actor.
pub struct SessionActorState {
    provider: Arc<dyn ModelProvider>,
    /// System instruction for new sessions.
    system_prompt: String,
    /// The cached session. At most one is live at a time.
    session: Option<SessionHandle>,
    /// Last probe result.
    last_report: Option<AvailabilityReport>,
    /// Event broadcaster.
    event_tx: Option<broadcast::Sender<SynthesisEvent>>,
}

impl SessionActorState {
    /// Create a new session actor state.
    fn new(provider: Arc<dyn ModelProvider>, system_prompt: impl Into<String>) -> Self {
        Self {
            provider,
            system_prompt: system_prompt.into(),
            session: None,
            last_report: None,
            event_tx: None,
        }
    }

    /// Set the event broadcaster.
    fn with_event_tx(mut self, tx: broadcast::Sender<SynthesisEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    fn broadcast(&self, event: SynthesisEvent) {
        tracing::trace!("{}", event.description());
        if let Some(ref tx) = self.event_tx {
            let _ = tx.send(event);
        }
    }

    async fn check_availability(&mut self) -> Availability {
        tracing::debug!("Checking model availability");
        let report = match self.provider.check_capabilities().await {
            Ok(status) => {
                tracing::info!(status = %status, "Model status reported");
                AvailabilityReport::from_status(status)
            }
            Err(e) => {
                tracing::warn!("Error checking model availability: {}", e);
                AvailabilityReport::probe_failed()
            }
        };

        self.last_report = Some(report);
        self.broadcast(SynthesisEvent::AvailabilityChecked {
            availability: report.availability,
            timestamp: report.checked_at,
        });
        report.availability
    }

    async fn create_session(&mut self) -> SynthesisResult<SessionHandle> {
        let availability = self
            .last_report
            .map_or(Availability::Unavailable, |r| r.availability);
        if !availability.is_available() {
            tracing::warn!("Cannot create session: model is {}", availability);
            return Err(SynthesisError::Unavailable(availability));
        }

        // Keep at most one live session.
        self.destroy_session().await;

        tracing::info!("Creating model session");
        let session = self
            .provider
            .create_session(&self.system_prompt)
            .await
            .map_err(|e| {
                tracing::warn!("Failed to create session: {}", e);
                SynthesisError::SessionCreation(e.message().to_string())
            })?;

        tracing::info!(session_id = %session.id, "Session created");
        self.session = Some(session.clone());
        self.broadcast(SynthesisEvent::SessionCreated {
            session_id: session.id,
            timestamp: session.created_at,
        });
        Ok(session)
    }

    async fn ensure_session(&mut self) -> SynthesisResult<SessionHandle> {
        if let Some(ref session) = self.session {
            return Ok(session.clone());
        }
        if self.last_report.is_none() {
            self.check_availability().await;
        }
        self.create_session().await
    }

    async fn destroy_session(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };
        let session_id = session.id;
        match self.provider.destroy_session(session).await {
            Ok(()) => tracing::info!(session_id = %session_id, "Session destroyed"),
            Err(e) => tracing::warn!(session_id = %session_id, "Error destroying session: {}", e),
        }
        self.broadcast(SynthesisEvent::SessionDestroyed {
            session_id,
            timestamp: Utc::now(),
        });
    }
}

/// Session actor that serializes all session lifecycle calls.
pub struct SessionActor;

impl Actor for SessionActor {
    type Msg = SessionMessage;
    type State = SessionActorState;
    type Arguments = SessionActorState;

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        args: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        tracing::info!("Starting model session actor");
        Ok(args)
    }

    async fn handle(
        &self,
        myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            SessionMessage::CheckAvailability { reply } => {
                let availability = state.check_availability().await;
                let _ = reply.send(availability);
            }

            SessionMessage::LastAvailability { reply } => {
                let _ = reply.send(state.last_report);
            }

            SessionMessage::CreateSession { reply } => {
                let result = state.create_session().await;
                let _ = reply.send(result);
            }

            SessionMessage::EnsureSession { reply } => {
                let result = state.ensure_session().await;
                let _ = reply.send(result);
            }

            SessionMessage::CurrentSession { reply } => {
                let _ = reply.send(state.session.clone());
            }

            SessionMessage::DestroySession { reply } => {
                state.destroy_session().await;
                let _ = reply.send(());
            }

            SessionMessage::Shutdown { reply } => {
                tracing::info!("Shutting down model session actor");
                state.destroy_session().await;
                let _ = reply.send(());
                myself.stop(None);
                return Ok(());
            }
        }

        Ok(())
    }
}

/// Handle to a running session actor.
///
/// Cheap to clone; all clones share the same cached session.
#[derive(Clone)]
pub struct ModelSessionManager {
    actor: ActorRef<SessionMessage>,
}

impl ModelSessionManager {
    /// Spawn a session actor for `provider`.
    pub async fn start(
        provider: Arc<dyn ModelProvider>,
        system_prompt: impl Into<String>,
        event_tx: Option<broadcast::Sender<SynthesisEvent>>,
    ) -> Result<(Self, JoinHandle<()>), ractor::SpawnErr> {
        let mut state = SessionActorState::new(provider, system_prompt);
        if let Some(tx) = event_tx {
            state = state.with_event_tx(tx);
        }

        let (actor, handle) = Actor::spawn(None, SessionActor, state).await?;
        Ok((Self { actor }, handle))
    }

    /// Probe the provider. Never fails: errors map to `Availability::Error`.
    pub async fn check_availability(&self) -> Availability {
        self.call(|reply| SessionMessage::CheckAvailability { reply })
            .await
            .unwrap_or(Availability::Error)
    }

    /// Last probe result, without contacting the provider.
    pub async fn last_availability(&self) -> Option<AvailabilityReport> {
        self.call(|reply| SessionMessage::LastAvailability { reply })
            .await
            .ok()
            .flatten()
    }

    /// Create and cache a new session, replacing any cached one.
    ///
    /// Fails with `Unavailable` unless the last probe reported the model
    /// available.
    pub async fn create_session(&self) -> SynthesisResult<SessionHandle> {
        self.call(|reply| SessionMessage::CreateSession { reply })
            .await?
    }

    /// Return the cached session, creating one on first use. Probes
    /// availability first if it has never been checked.
    pub async fn ensure_session(&self) -> SynthesisResult<SessionHandle> {
        self.call(|reply| SessionMessage::EnsureSession { reply })
            .await?
    }

    /// The cached session, if any.
    pub async fn current_session(&self) -> Option<SessionHandle> {
        self.call(|reply| SessionMessage::CurrentSession { reply })
            .await
            .ok()
            .flatten()
    }

    /// Release the cached session. No-op when none exists; provider
    /// teardown errors are logged, not returned.
    pub async fn destroy_session(&self) {
        if let Err(e) = self
            .call(|reply| SessionMessage::DestroySession { reply })
            .await
        {
            tracing::warn!("Could not reach session actor to destroy session: {}", e);
        }
    }

    /// Release the cached session and stop the actor.
    pub async fn shutdown(&self) {
        let _ = self.call(|reply| SessionMessage::Shutdown { reply }).await;
    }

    async fn call<T: Send + 'static>(
        &self,
        build: impl FnOnce(RpcReplyPort<T>) -> SessionMessage,
    ) -> SynthesisResult<T> {
        let (tx, rx) = ractor::concurrency::oneshot();
        self.actor
            .send_message(build(tx.into()))
            .map_err(|e| SynthesisError::Actor(format!("Failed to send message: {}", e)))?;
        rx.await
            .map_err(|_| SynthesisError::Actor("Session actor dropped the reply".into()))
    }
}
