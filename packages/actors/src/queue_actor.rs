//! Queue actor that runs jobs one at a time in submission order.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use chrono::Utc;
use ractor::{Actor, ActorProcessingErr, ActorRef, MessagingErr};
use synthesis_core::{
    ActiveJob, JobId, JobOutcome, QueueSnapshot, SynthesisError, SynthesisEvent, SynthesisResult,
};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::job::{JobHandle, QueuedJob, Settlement};
use crate::messages::QueueMessage;

/// Lock-free view of the queue for synchronous callers.
#[derive(Debug, Default)]
struct QueueGauge {
    active: AtomicBool,
    pending: AtomicUsize,
}

/// Counts one submitted job in `pending_len` until the job is dispatched or
/// dropped, including when the stopped actor discards it unprocessed.
#[derive(Debug)]
pub(crate) struct PendingTicket(Arc<QueueGauge>);

impl PendingTicket {
    fn issue(gauge: &Arc<QueueGauge>) -> Self {
        gauge.pending.fetch_add(1, Ordering::SeqCst);
        Self(gauge.clone())
    }
}

impl Drop for PendingTicket {
    fn drop(&mut self) {
        self.0.pending.fetch_sub(1, Ordering::SeqCst);
    }
}

/// State for the queue actor.
pub struct QueueActorState {
    /// Jobs waiting for the slot, head first.
    pending: VecDeque<(QueuedJob, PendingTicket)>,
    /// The single execution slot.
    active: Option<ActiveJob>,
    completed: u64,
    failed: u64,
    /// Deadline applied to every job.
    job_timeout: Option<Duration>,
    gauge: Arc<QueueGauge>,
    /// Event broadcaster.
    event_tx: Option<broadcast::Sender<SynthesisEvent>>,
}

impl QueueActorState {
    /// Create a new queue actor state.
    fn new(gauge: Arc<QueueGauge>) -> Self {
        Self {
            pending: VecDeque::new(),
            active: None,
            completed: 0,
            failed: 0,
            job_timeout: None,
            gauge,
            event_tx: None,
        }
    }

    /// Set the per-job deadline.
    fn with_job_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.job_timeout = timeout;
        self
    }

    /// Set the event broadcaster.
    fn with_event_tx(mut self, tx: broadcast::Sender<SynthesisEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    /// Broadcast an event.
    fn broadcast(&self, event: SynthesisEvent) {
        tracing::trace!("{}", event.description());
        if let Some(ref tx) = self.event_tx {
            let _ = tx.send(event);
        }
    }

    fn snapshot(&self) -> QueueSnapshot {
        QueueSnapshot {
            pending: self.pending.len(),
            active: self.active.clone(),
            completed: self.completed,
            failed: self.failed,
        }
    }

    /// Hand the slot to the head of the pending list if it is free.
    fn dispatch(&mut self, myself: &ActorRef<QueueMessage>) {
        if self.active.is_some() {
            return;
        }
        let Some((job, ticket)) = self.pending.pop_front() else {
            return;
        };
        drop(ticket);

        let now = Utc::now();
        let active = ActiveJob {
            job_id: job.id,
            enqueued_at: job.enqueued_at,
            started_at: now,
        };
        let waited_ms = (now - job.enqueued_at).num_milliseconds().max(0) as u64;
        tracing::debug!(job_id = %job.id, waited_ms, "Dispatching synthesis job");

        self.active = Some(active);
        self.gauge.active.store(true, Ordering::SeqCst);
        self.broadcast(SynthesisEvent::JobStarted {
            job_id: job.id,
            waited_ms,
            timestamp: now,
        });

        let job_id = job.id;
        let work = job.start(self.job_timeout);
        let queue = myself.clone();
        let gauge = self.gauge.clone();
        tokio::spawn(async move {
            // A panicking job must still free the slot.
            let settlement = match tokio::spawn(work).await {
                Ok(settlement) => settlement,
                Err(e) => Settlement::aborted(format!("job panicked: {}", e)),
            };
            // Cleared here so it also drops after the actor has stopped. The
            // next job is dispatched only once `JobSettled` is handled.
            gauge.active.store(false, Ordering::SeqCst);
            if let Err(e) = queue.send_message(QueueMessage::JobSettled { job_id, settlement }) {
                tracing::warn!("Queue stopped before job {} settled", job_id);
                if let MessagingErr::SendErr(QueueMessage::JobSettled { settlement, .. }) = e {
                    settlement.deliver();
                }
            }
        });
    }

    /// Free the slot and record how the job finished.
    fn settle(&mut self, job_id: JobId, outcome: &JobOutcome) {
        let now = Utc::now();
        let duration_ms = match self.active.take() {
            Some(active) if active.job_id == job_id => active.elapsed_ms(now),
            Some(other) => {
                tracing::warn!(
                    "Settled job {} does not hold the slot (held by {})",
                    job_id,
                    other.job_id
                );
                self.active = Some(other);
                return;
            }
            None => 0,
        };

        match outcome {
            JobOutcome::Completed => {
                self.completed += 1;
                tracing::info!(job_id = %job_id, duration_ms, "Synthesis job completed");
                self.broadcast(SynthesisEvent::JobCompleted {
                    job_id,
                    duration_ms,
                    timestamp: now,
                });
            }
            JobOutcome::Failed { error } => {
                self.failed += 1;
                tracing::warn!(job_id = %job_id, duration_ms, "Synthesis job failed: {}", error);
                self.broadcast(SynthesisEvent::JobFailed {
                    job_id,
                    error: error.clone(),
                    duration_ms,
                    timestamp: now,
                });
            }
        }
    }
}

/// Queue actor that owns the pending list and the execution slot.
pub struct QueueActor;

impl Actor for QueueActor {
    type Msg = QueueMessage;
    type State = QueueActorState;
    type Arguments = QueueActorState;

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        args: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        tracing::info!("Starting synthesis queue actor");
        Ok(args)
    }

    async fn handle(
        &self,
        myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            QueueMessage::Enqueue { job, ticket } => {
                let position = state.pending.len() + usize::from(state.active.is_some());
                state.broadcast(SynthesisEvent::JobEnqueued {
                    job_id: job.id,
                    position,
                    timestamp: Utc::now(),
                });
                state.pending.push_back((job, ticket));
                state.dispatch(&myself);
            }

            QueueMessage::JobSettled { job_id, settlement } => {
                state.settle(job_id, &settlement.outcome);
                settlement.deliver();
                state.dispatch(&myself);
            }

            QueueMessage::GetSnapshot { reply } => {
                let _ = reply.send(state.snapshot());
            }

            QueueMessage::Shutdown => {
                let dropped = state.pending.len();
                state.pending.clear();
                tracing::info!("Shutting down synthesis queue ({} pending jobs dropped)", dropped);
                myself.stop(None);
                return Ok(());
            }
        }

        Ok(())
    }
}

/// Handle to a running queue actor.
///
/// Cheap to clone; all clones feed the same queue.
#[derive(Clone)]
pub struct JobQueue {
    actor: ActorRef<QueueMessage>,
    gauge: Arc<QueueGauge>,
}

impl JobQueue {
    /// Spawn a queue actor.
    pub async fn start(
        job_timeout: Option<Duration>,
        event_tx: Option<broadcast::Sender<SynthesisEvent>>,
    ) -> Result<(Self, JoinHandle<()>), ractor::SpawnErr> {
        let gauge = Arc::new(QueueGauge::default());
        let mut state = QueueActorState::new(gauge.clone()).with_job_timeout(job_timeout);
        if let Some(tx) = event_tx {
            state = state.with_event_tx(tx);
        }

        let (actor, handle) = Actor::spawn(None, QueueActor, state).await?;
        Ok((Self { actor, gauge }, handle))
    }

    /// Submit work. Never fails up front: the returned handle settles with
    /// the work's own result, or with an error if the queue is closed.
    pub fn enqueue<T, F, Fut>(&self, work: F) -> JobHandle<T>
    where
        T: Send + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = SynthesisResult<T>> + Send + 'static,
    {
        let (job, handle) = QueuedJob::new(work);
        let job_id = job.id;

        let ticket = PendingTicket::issue(&self.gauge);
        if self.actor.send_message(QueueMessage::Enqueue { job, ticket }).is_err() {
            tracing::warn!("Rejected job {}: queue is closed", job_id);
            return handle.reject(SynthesisError::QueueClosed);
        }
        tracing::debug!(job_id = %job_id, "Enqueued synthesis job");
        handle
    }

    /// True while a job's work is executing.
    pub fn is_active(&self) -> bool {
        self.gauge.active.load(Ordering::SeqCst)
    }

    /// Jobs submitted but not yet started.
    pub fn pending_len(&self) -> usize {
        self.gauge.pending.load(Ordering::SeqCst)
    }

    /// Get the queue's current state from the actor.
    pub async fn snapshot(&self) -> SynthesisResult<QueueSnapshot> {
        let (tx, rx) = ractor::concurrency::oneshot();
        self.actor
            .send_message(QueueMessage::GetSnapshot { reply: tx.into() })
            .map_err(|_| SynthesisError::QueueClosed)?;
        rx.await.map_err(|_| SynthesisError::QueueClosed)
    }

    /// Stop the queue. Pending jobs, and jobs submitted after this call,
    /// resolve to `JobAborted` or `QueueClosed`. A running job is not
    /// interrupted; its submitter still receives its result.
    pub fn shutdown(&self) {
        let _ = self.actor.send_message(QueueMessage::Shutdown);
    }
}
