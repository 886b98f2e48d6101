//! Queued jobs and their completion handles.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use chrono::{DateTime, Utc};
use synthesis_core::{JobId, JobOutcome, SynthesisError, SynthesisResult};
use tokio::sync::oneshot;

/// Future type for a started job. Resolves once the work has settled.
pub(crate) type JobFuture = Pin<Box<dyn Future<Output = Settlement> + Send>>;

type StartFn = Box<dyn FnOnce(Option<Duration>) -> JobFuture + Send>;

/// A unit of work waiting for the queue's execution slot.
///
/// The work's output type is erased here; the typed result travels through
/// a oneshot channel owned by the job itself.
pub struct QueuedJob {
    pub(crate) id: JobId,
    pub(crate) enqueued_at: DateTime<Utc>,
    start: StartFn,
}

impl QueuedJob {
    /// Wrap a work function, returning the job and the handle its result
    /// will be delivered to.
    pub(crate) fn new<T, F, Fut>(work: F) -> (Self, JobHandle<T>)
    where
        T: Send + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = SynthesisResult<T>> + Send + 'static,
    {
        let id = JobId::new();
        let (tx, rx) = oneshot::channel();

        let start: StartFn = Box::new(move |deadline: Option<Duration>| -> JobFuture {
            Box::pin(async move {
                let result = match deadline {
                    Some(limit) => tokio::time::timeout(limit, work())
                        .await
                        .unwrap_or_else(|_| Err(SynthesisError::Timeout(limit))),
                    None => work().await,
                };
                let outcome = match &result {
                    Ok(_) => JobOutcome::Completed,
                    Err(e) => JobOutcome::Failed {
                        error: e.to_string(),
                    },
                };
                Settlement {
                    outcome,
                    deliver: Some(Box::new(move || {
                        let _ = tx.send(result);
                    })),
                }
            })
        });

        let job = Self {
            id,
            enqueued_at: Utc::now(),
            start,
        };
        let handle = JobHandle {
            job_id: id,
            rx,
            rejected: None,
        };
        (job, handle)
    }

    /// Begin executing the work, bounded by `deadline` if given.
    pub(crate) fn start(self, deadline: Option<Duration>) -> JobFuture {
        (self.start)(deadline)
    }
}

impl std::fmt::Debug for QueuedJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueuedJob")
            .field("id", &self.id)
            .field("enqueued_at", &self.enqueued_at)
            .finish_non_exhaustive()
    }
}

/// A finished job: its outcome for bookkeeping and the pending delivery of
/// its typed result to the submitter.
///
/// Dropping an undelivered settlement delivers it, so a result still reaches
/// its submitter when the queue stops before processing it.
pub struct Settlement {
    pub(crate) outcome: JobOutcome,
    deliver: Option<Box<dyn FnOnce() + Send>>,
}

impl Settlement {
    /// Settlement for work that never produced a result. The submitter's
    /// handle resolves to [`SynthesisError::JobAborted`].
    pub(crate) fn aborted(error: impl Into<String>) -> Self {
        Self {
            outcome: JobOutcome::Failed {
                error: error.into(),
            },
            deliver: None,
        }
    }

    /// Hand the result to the submitter.
    pub(crate) fn deliver(mut self) {
        if let Some(deliver) = self.deliver.take() {
            deliver();
        }
    }
}

impl Drop for Settlement {
    fn drop(&mut self) {
        if let Some(deliver) = self.deliver.take() {
            deliver();
        }
    }
}

impl std::fmt::Debug for Settlement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settlement")
            .field("outcome", &self.outcome)
            .finish_non_exhaustive()
    }
}

/// Completion handle for a queued job.
///
/// Resolves with the work's own result. If the job is dropped without
/// settling (queue shut down, work panicked) it resolves to
/// [`SynthesisError::JobAborted`].
#[must_use = "a job handle does nothing unless awaited"]
#[derive(Debug)]
pub struct JobHandle<T> {
    job_id: JobId,
    rx: oneshot::Receiver<SynthesisResult<T>>,
    rejected: Option<SynthesisError>,
}

impl<T> JobHandle<T> {
    pub fn job_id(&self) -> JobId {
        self.job_id
    }

    /// Mark the handle as refused before the job reached the queue.
    pub(crate) fn reject(mut self, error: SynthesisError) -> Self {
        self.rejected = Some(error);
        self
    }
}

impl<T> Future for JobHandle<T> {
    type Output = SynthesisResult<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        if let Some(error) = this.rejected.take() {
            return Poll::Ready(Err(error));
        }
        let job_id = this.job_id;
        Pin::new(&mut this.rx).poll(cx).map(|received| {
            received.unwrap_or_else(|_| {
                Err(SynthesisError::JobAborted(format!(
                    "job {} was dropped before settling",
                    job_id
                )))
            })
        })
    }
}
