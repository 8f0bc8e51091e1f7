//! Chat-completion backend trait.

use std::pin::Pin;

use futures_util::Stream;

use aituber_types::llm::{CompletionRequest, CompletionResponse, LlmError, StreamEvent};

/// Boxed event stream returned by [`LlmProvider::stream`].
///
/// Boxed so that [`super::box_provider::BoxLlmProvider`] can forward it
/// without another allocation.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<StreamEvent, LlmError>> + Send + 'static>>;

/// A chat-completion backend (the hosted OpenAI API or a compatible server).
///
/// Implementations live in aituber-infra.
pub trait LlmProvider: Send + Sync {
    /// Name reported as `gen_ai.system` on generation spans.
    fn name(&self) -> &str;

    /// Send a completion request and receive the full response.
    fn complete(
        &self,
        request: &CompletionRequest,
    ) -> impl std::future::Future<Output = Result<CompletionResponse, LlmError>> + Send;

    /// Start a streaming completion.
    ///
    /// Nothing may be sent before the stream is first polled, and dropping
    /// the stream must abort the underlying request.
    fn stream(&self, request: CompletionRequest) -> EventStream;
}
