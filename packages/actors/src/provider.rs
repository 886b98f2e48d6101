//! Model provider trait.

use std::future::Future;
use std::pin::Pin;

use futures_util::stream::BoxStream;
use synthesis_core::{ModelStatus, ProviderError, SessionHandle};

/// Stream of generated text chunks. Finite and not restartable.
pub type TokenStream = BoxStream<'static, Result<String, ProviderError>>;

/// Future type for provider calls.
pub type ProviderFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, ProviderError>> + Send + 'a>>;

/// Trait for on-device language model backends.
///
/// Implement this trait to plug a concrete model runtime into the
/// synthesis pipeline. Session state lives inside the provider, keyed by
/// the handle's id.
pub trait ModelProvider: Send + Sync + 'static {
    /// Report whether the model can serve sessions.
    fn check_capabilities(&self) -> ProviderFuture<'_, ModelStatus>;

    /// Create a session bound to a fixed system instruction.
    fn create_session<'a>(&'a self, system_prompt: &'a str) -> ProviderFuture<'a, SessionHandle>;

    /// Start a streaming generation. Resolves once the stream is available.
    fn stream_prompt<'a>(
        &'a self,
        session: &'a SessionHandle,
        prompt: &'a str,
    ) -> ProviderFuture<'a, TokenStream>;

    /// Release a session.
    fn destroy_session(&self, session: SessionHandle) -> ProviderFuture<'_, ()>;
}
