#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::{StreamExt, stream};
use synthesis_actors::{ModelProvider, ProviderFuture, TokenStream};
use synthesis_core::{ModelStatus, ProviderError, SessionHandle, SessionId};

/// A call recorded by [`MockProvider`].
#[derive(Debug, Clone, PartialEq)]
pub enum MockCall {
    CheckCapabilities,
    CreateSession { system_prompt: String },
    StreamPrompt { session_id: SessionId, prompt: String },
    DestroySession { session_id: SessionId },
}

#[derive(Debug, Clone)]
struct MockConfig {
    status: Result<ModelStatus, ProviderError>,
    chunks: Vec<String>,
    fail_create: bool,
    fail_stream: bool,
    fail_destroy: bool,
    stream_start_delay: Duration,
    chunk_delay: Duration,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            status: Ok(ModelStatus::Ready),
            chunks: vec!["Both notes ".to_string(), "discuss ownership.".to_string()],
            fail_create: false,
            fail_stream: false,
            fail_destroy: false,
            stream_start_delay: Duration::ZERO,
            chunk_delay: Duration::ZERO,
        }
    }
}

#[derive(Debug, Default)]
struct MockState {
    calls: Vec<MockCall>,
    live_sessions: Vec<SessionId>,
}

/// Scriptable in-memory model provider.
#[derive(Clone, Default)]
pub struct MockProvider {
    config: Arc<Mutex<MockConfig>>,
    state: Arc<Mutex<MockState>>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_status(self, status: ModelStatus) -> Self {
        self.config.lock().unwrap().status = Ok(status);
        self
    }

    pub fn with_capabilities_error(self) -> Self {
        self.config.lock().unwrap().status =
            Err(ProviderError::Other("capabilities probe crashed".into()));
        self
    }

    pub fn with_chunks(self, chunks: &[&str]) -> Self {
        self.config.lock().unwrap().chunks = chunks.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn with_stream_start_delay(self, delay: Duration) -> Self {
        self.config.lock().unwrap().stream_start_delay = delay;
        self
    }

    pub fn with_chunk_delay(self, delay: Duration) -> Self {
        self.config.lock().unwrap().chunk_delay = delay;
        self
    }

    pub fn set_fail_create(&self, fail: bool) {
        self.config.lock().unwrap().fail_create = fail;
    }

    pub fn set_fail_stream(&self, fail: bool) {
        self.config.lock().unwrap().fail_stream = fail;
    }

    pub fn set_fail_destroy(&self, fail: bool) {
        self.config.lock().unwrap().fail_destroy = fail;
    }

    pub fn shared(&self) -> Arc<dyn ModelProvider> {
        Arc::new(self.clone())
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn check_calls(&self) -> usize {
        self.count(|c| matches!(c, MockCall::CheckCapabilities))
    }

    pub fn create_calls(&self) -> usize {
        self.count(|c| matches!(c, MockCall::CreateSession { .. }))
    }

    pub fn stream_calls(&self) -> usize {
        self.count(|c| matches!(c, MockCall::StreamPrompt { .. }))
    }

    pub fn destroy_calls(&self) -> usize {
        self.count(|c| matches!(c, MockCall::DestroySession { .. }))
    }

    pub fn prompts(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                MockCall::StreamPrompt { prompt, .. } => Some(prompt),
                _ => None,
            })
            .collect()
    }

    pub fn live_sessions(&self) -> Vec<SessionId> {
        self.state.lock().unwrap().live_sessions.clone()
    }

    fn count(&self, pred: impl Fn(&MockCall) -> bool) -> usize {
        self.state.lock().unwrap().calls.iter().filter(|c| pred(c)).count()
    }

    fn record(&self, call: MockCall) {
        self.state.lock().unwrap().calls.push(call);
    }

    fn config(&self) -> MockConfig {
        self.config.lock().unwrap().clone()
    }
}

impl ModelProvider for MockProvider {
    fn check_capabilities(&self) -> ProviderFuture<'_, ModelStatus> {
        Box::pin(async move {
            self.record(MockCall::CheckCapabilities);
            self.config().status
        })
    }

    fn create_session<'a>(&'a self, system_prompt: &'a str) -> ProviderFuture<'a, SessionHandle> {
        Box::pin(async move {
            self.record(MockCall::CreateSession {
                system_prompt: system_prompt.to_string(),
            });
            if self.config().fail_create {
                return Err(ProviderError::Session("model failed to load".into()));
            }
            let session = SessionHandle::new();
            self.state.lock().unwrap().live_sessions.push(session.id);
            Ok(session)
        })
    }

    fn stream_prompt<'a>(
        &'a self,
        session: &'a SessionHandle,
        prompt: &'a str,
    ) -> ProviderFuture<'a, TokenStream> {
        Box::pin(async move {
            self.record(MockCall::StreamPrompt {
                session_id: session.id,
                prompt: prompt.to_string(),
            });
            let config = self.config();
            if !config.stream_start_delay.is_zero() {
                tokio::time::sleep(config.stream_start_delay).await;
            }
            if config.fail_stream {
                return Err(ProviderError::Generation("generation aborted".into()));
            }
            let delay = config.chunk_delay;
            let chunks = stream::iter(config.chunks).then(move |chunk| async move {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                Ok::<_, ProviderError>(chunk)
            });
            Ok(chunks.boxed())
        })
    }

    fn destroy_session(&self, session: SessionHandle) -> ProviderFuture<'_, ()> {
        Box::pin(async move {
            self.record(MockCall::DestroySession {
                session_id: session.id,
            });
            self.state
                .lock()
                .unwrap()
                .live_sessions
                .retain(|id| *id != session.id);
            if self.config().fail_destroy {
                return Err(ProviderError::Session("teardown failed".into()));
            }
            Ok(())
        })
    }
}
