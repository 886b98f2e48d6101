#![allow(clippy::disallowed_methods)]

mod common;

use std::error::Error;
use std::time::Duration;

use common::MockProvider;
use futures_util::TryStreamExt;
use synthesis_actors::{SynthesisService, TokenStream};
use synthesis_core::{
    Availability, ModelStatus, PageContext, RelatedNote, SynthesisConfig, SynthesisError,
    SynthesisEvent, SynthesisRequest, SynthesisResult,
};

fn request(title: &str, count: usize) -> SynthesisRequest {
    let notes = (1..=count)
        .map(|i| {
            RelatedNote::new(format!("Note {}", i), format!("Body of note {}", i))
                .with_similarity(0.9 - i as f64 * 0.05)
        })
        .collect();
    SynthesisRequest::new(PageContext::new(title), notes)
}

async fn service(provider: &MockProvider) -> Result<SynthesisService, Box<dyn Error>> {
    Ok(SynthesisService::start(provider.shared(), SynthesisConfig::default()).await?)
}

async fn collect(result: SynthesisResult<TokenStream>) -> Result<String, Box<dyn Error>> {
    let chunks: Vec<String> = result?.try_collect().await?;
    Ok(chunks.concat())
}

fn event_kind(event: &SynthesisEvent) -> &'static str {
    match event {
        SynthesisEvent::JobEnqueued { .. } => "enqueued",
        SynthesisEvent::JobStarted { .. } => "started",
        SynthesisEvent::JobCompleted { .. } => "completed",
        SynthesisEvent::JobFailed { .. } => "failed",
        SynthesisEvent::AvailabilityChecked { .. } => "checked",
        SynthesisEvent::SessionCreated { .. } => "created",
        SynthesisEvent::SessionDestroyed { .. } => "destroyed",
    }
}

fn error_of(result: SynthesisResult<TokenStream>) -> Option<SynthesisError> {
    result.err()
}

#[tokio::test]
async fn test_missing_title_is_rejected_before_queueing() -> Result<(), Box<dyn Error>> {
    let provider = MockProvider::new();
    let service = service(&provider).await?;

    let request = SynthesisRequest {
        current_context: Some(PageContext {
            title: None,
            url: Some("https://x".into()),
        }),
        related_notes: Some(vec![RelatedNote::new("n", "")]),
    };
    assert!(!service.is_synthesizing());
    let result = service.generate_synthesis(request);

    assert!(matches!(result, Err(SynthesisError::Validation(_))));
    assert!(!service.is_synthesizing());
    assert_eq!(service.pending_jobs(), 0);
    assert!(provider.calls().is_empty());
    assert_eq!(service.queue_snapshot().await?.processed(), 0);
    Ok(())
}

#[tokio::test]
async fn test_empty_notes_are_rejected() -> Result<(), Box<dyn Error>> {
    let provider = MockProvider::new();
    let service = service(&provider).await?;

    let empty = service.generate_synthesis(request("Ownership", 0));
    let missing = service.generate_synthesis(SynthesisRequest {
        current_context: Some(PageContext::new("Ownership")),
        related_notes: None,
    });

    for result in [empty, missing] {
        match result {
            Err(SynthesisError::Validation(message)) => {
                assert_eq!(message, "No related notes provided for synthesis")
            }
            _ => panic!("expected a validation error"),
        }
    }
    assert!(provider.calls().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_synthesis_streams_generated_text() -> Result<(), Box<dyn Error>> {
    let provider = MockProvider::new().with_chunks(&["Ownership ", "ties ", "them together."]);
    let service = service(&provider).await?;

    let text = collect(service.generate_synthesis(request("Ownership", 2))?.await).await?;

    assert_eq!(text, "Ownership ties them together.");
    assert!(!service.is_synthesizing());
    Ok(())
}

#[tokio::test]
async fn test_consecutive_syntheses_reuse_one_session() -> Result<(), Box<dyn Error>> {
    let provider = MockProvider::new();
    let service = service(&provider).await?;

    let first = service.generate_synthesis(request("Ownership", 2))?;
    let second = service.generate_synthesis(request("Lifetimes", 3))?;

    collect(first.await).await?;
    collect(second.await).await?;

    assert_eq!(provider.check_calls(), 1);
    assert_eq!(provider.create_calls(), 1);
    assert_eq!(provider.stream_calls(), 2);
    assert_eq!(provider.live_sessions().len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_prompt_includes_first_five_notes() -> Result<(), Box<dyn Error>> {
    let provider = MockProvider::new();
    let service = service(&provider).await?;

    let request = SynthesisRequest::new(
        PageContext::new("Ownership").with_url("https://example.com/ownership"),
        (1..=7)
            .map(|i| RelatedNote::new(format!("Note {}", i), format!("Body {}", i)))
            .collect(),
    );
    collect(service.generate_synthesis(request)?.await).await?;

    let prompts = provider.prompts();
    assert_eq!(prompts.len(), 1);
    let prompt = &prompts[0];
    assert!(prompt.starts_with("Current Page: **Ownership**\nURL: https://example.com/ownership\n"));
    assert!(prompt.contains("5. **Note 5**"));
    assert!(!prompt.contains("Note 6"));
    assert!(!prompt.contains("Note 7"));
    Ok(())
}

#[tokio::test]
async fn test_custom_note_limit_applies() -> Result<(), Box<dyn Error>> {
    let provider = MockProvider::new();
    let config = SynthesisConfig::default().with_max_notes(2);
    let service = SynthesisService::start(provider.shared(), config).await?;

    collect(service.generate_synthesis(request("Ownership", 4))?.await).await?;

    let prompt = provider.prompts().concat();
    assert!(prompt.contains("2. **Note 2**"));
    assert!(!prompt.contains("Note 3"));
    Ok(())
}

#[tokio::test]
async fn test_generation_failure_does_not_block_next_request() -> Result<(), Box<dyn Error>> {
    let provider = MockProvider::new();
    let service = service(&provider).await?;

    provider.set_fail_stream(true);
    let failed = service.generate_synthesis(request("Ownership", 1))?.await;
    assert!(matches!(
        error_of(failed),
        Some(SynthesisError::Generation(_))
    ));

    provider.set_fail_stream(false);
    let text = collect(service.generate_synthesis(request("Ownership", 1))?.await).await?;
    assert_eq!(text, "Both notes discuss ownership.");

    let snapshot = service.queue_snapshot().await?;
    assert_eq!(snapshot.failed, 1);
    assert_eq!(snapshot.completed, 1);
    Ok(())
}

#[tokio::test]
async fn test_unavailable_model_fails_synthesis() -> Result<(), Box<dyn Error>> {
    let provider = MockProvider::new().with_status(ModelStatus::Unavailable);
    let service = service(&provider).await?;

    let result = service.generate_synthesis(request("Ownership", 2))?.await;

    assert_eq!(
        error_of(result),
        Some(SynthesisError::Unavailable(Availability::Unavailable))
    );
    assert_eq!(provider.create_calls(), 0);
    assert_eq!(provider.stream_calls(), 0);
    assert!(!service.is_synthesizing());
    Ok(())
}

#[tokio::test]
async fn test_session_creation_failure_is_reported() -> Result<(), Box<dyn Error>> {
    let provider = MockProvider::new();
    let service = service(&provider).await?;
    provider.set_fail_create(true);

    let result = service.generate_synthesis(request("Ownership", 2))?.await;
    assert!(matches!(
        error_of(result),
        Some(SynthesisError::SessionCreation(_))
    ));

    provider.set_fail_create(false);
    collect(service.generate_synthesis(request("Ownership", 2))?.await).await?;
    assert_eq!(provider.create_calls(), 2);
    Ok(())
}

#[tokio::test]
async fn test_queue_releases_once_stream_is_returned() -> Result<(), Box<dyn Error>> {
    let provider = MockProvider::new().with_chunk_delay(Duration::from_millis(40));
    let service = service(&provider).await?;

    let stream = service.generate_synthesis(request("Ownership", 1))?.await?;
    assert!(!service.is_synthesizing());

    // A second request is admitted while the first stream is still unread.
    let second = service.generate_synthesis(request("Lifetimes", 1))?.await?;
    assert_eq!(provider.stream_calls(), 2);

    let (first, second): (Vec<String>, Vec<String>) =
        tokio::try_join!(stream.try_collect(), second.try_collect())?;
    assert_eq!(first.concat(), second.concat());
    Ok(())
}

#[tokio::test]
async fn test_is_synthesizing_while_generation_starts() -> Result<(), Box<dyn Error>> {
    let provider = MockProvider::new().with_stream_start_delay(Duration::from_millis(50));
    let service = service(&provider).await?;

    let first = service.generate_synthesis(request("Ownership", 1))?;
    let second = service.generate_synthesis(request("Lifetimes", 1))?;
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert!(service.is_synthesizing());
    assert_eq!(service.pending_jobs(), 1);

    collect(first.await).await?;
    collect(second.await).await?;
    assert!(!service.is_synthesizing());
    assert_eq!(service.pending_jobs(), 0);
    Ok(())
}

#[tokio::test]
async fn test_destroyed_session_is_recreated_on_next_request() -> Result<(), Box<dyn Error>> {
    let provider = MockProvider::new();
    let service = service(&provider).await?;

    collect(service.generate_synthesis(request("Ownership", 1))?.await).await?;
    service.destroy_session().await;
    assert!(service.sessions().current_session().await.is_none());

    collect(service.generate_synthesis(request("Ownership", 1))?.await).await?;
    assert_eq!(provider.create_calls(), 2);
    assert_eq!(provider.destroy_calls(), 1);
    Ok(())
}

#[tokio::test]
async fn test_check_availability_through_service() -> Result<(), Box<dyn Error>> {
    let provider = MockProvider::new().with_status(ModelStatus::Downloadable);
    let service = service(&provider).await?;

    assert!(service.last_availability().await.is_none());
    assert_eq!(service.check_availability().await, Availability::Available);
    let report = service.last_availability().await.ok_or("no report")?;
    assert_eq!(report.status, Some(ModelStatus::Downloadable));
    Ok(())
}

#[tokio::test]
async fn test_shutdown_destroys_session() -> Result<(), Box<dyn Error>> {
    let provider = MockProvider::new();
    let service = service(&provider).await?;

    collect(service.generate_synthesis(request("Ownership", 1))?.await).await?;
    service.shutdown().await;

    assert_eq!(provider.destroy_calls(), 1);
    assert!(provider.live_sessions().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_synthesis_events_are_broadcast() -> Result<(), Box<dyn Error>> {
    let provider = MockProvider::new();
    let service = service(&provider).await?;
    let mut events = service.subscribe();

    let handle = service.generate_synthesis(request("Ownership", 1))?;
    let job_id = handle.job_id();
    collect(handle.await).await?;

    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push(event);
    }

    let index_of = |kind: &str| {
        seen.iter()
            .position(|e| event_kind(e) == kind)
            .ok_or(format!("no {} event", kind))
    };
    let enqueued = index_of("enqueued")?;
    let checked = index_of("checked")?;
    let created = index_of("created")?;
    let completed = index_of("completed")?;

    assert!(enqueued < checked);
    assert!(checked < created);
    assert!(created < completed);
    assert!(
        seen.iter()
            .filter_map(SynthesisEvent::job_id)
            .all(|id| id == job_id)
    );
    Ok(())
}
