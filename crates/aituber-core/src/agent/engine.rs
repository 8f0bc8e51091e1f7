//! Generation engine for AITuber.
//!
//! `GenerationEngine` is the single facade over the chat-completion provider
//! and the embedder. It builds `CompletionRequest`s from prepared message
//! lists and wraps every call in an OTel GenAI span.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures_util::Stream;
use pin_project_lite::pin_project;
use tracing::{Instrument, debug, info_span, warn};

use aituber_types::config::LlmConfig;
use aituber_types::llm::{CompletionRequest, LlmError, Message, StopReason, StreamEvent};

use crate::llm::box_provider::BoxLlmProvider;
use crate::llm::provider::LlmProvider;
use crate::memory::box_embedder::BoxEmbedder;

/// Stream of text tokens from a generation call.
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String, LlmError>> + Send + 'static>>;

/// Per-request generation parameters.
#[derive(Debug, Clone)]
pub struct GenerationSettings {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: Option<f64>,
}

impl From<&LlmConfig> for GenerationSettings {
    fn from(config: &LlmConfig) -> Self {
        Self {
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: Some(config.temperature),
        }
    }
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self::from(&LlmConfig::default())
    }
}

/// Chat generation and embedding on behalf of the orchestrator.
pub struct GenerationEngine {
    provider: BoxLlmProvider,
    embedder: BoxEmbedder,
    settings: GenerationSettings,
}

impl GenerationEngine {
    pub fn new(
        provider: BoxLlmProvider,
        embedder: BoxEmbedder,
        settings: GenerationSettings,
    ) -> Self {
        Self {
            provider,
            embedder,
            settings,
        }
    }

    pub fn settings(&self) -> &GenerationSettings {
        &self.settings
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Batch completion. An empty reply counts as a failure.
    pub async fn generate(&self, messages: Vec<Message>) -> Result<String, LlmError> {
        let request = self.build_request(messages, false);

        let span = info_span!(
            "gen_ai.complete",
            gen_ai.system = self.provider.name(),
            gen_ai.request.model = %request.model,
            gen_ai.request.max_tokens = request.max_tokens,
            gen_ai.request.temperature = ?request.temperature,
            gen_ai.request.stream = false,
            gen_ai.response.finish_reason = tracing::field::Empty,
            gen_ai.usage.input_tokens = tracing::field::Empty,
            gen_ai.usage.output_tokens = tracing::field::Empty,
        );

        let response = self
            .provider
            .complete(&request)
            .instrument(span.clone())
            .await?;
        span.record("gen_ai.usage.input_tokens", response.usage.input_tokens);
        span.record("gen_ai.usage.output_tokens", response.usage.output_tokens);
        record_finish(&span, &response.stop_reason);

        if response.content.trim().is_empty() {
            return Err(LlmError::Provider {
                message: "model returned an empty response".to_string(),
            });
        }
        Ok(response.content)
    }

    /// Streaming completion yielding only text deltas.
    ///
    /// Nothing is sent to the provider until the stream is first polled.
    /// Finish reason and token usage are recorded on the `gen_ai.stream` span.
    pub fn generate_stream(&self, messages: Vec<Message>) -> TextStream {
        let request = self.build_request(messages, true);

        let span = info_span!(
            "gen_ai.stream",
            gen_ai.system = self.provider.name(),
            gen_ai.request.model = %request.model,
            gen_ai.request.max_tokens = request.max_tokens,
            gen_ai.request.temperature = ?request.temperature,
            gen_ai.request.stream = true,
            gen_ai.response.finish_reason = tracing::field::Empty,
            gen_ai.usage.input_tokens = tracing::field::Empty,
            gen_ai.usage.output_tokens = tracing::field::Empty,
        );

        let events = StreamInSpan {
            inner: self.provider.stream(request),
            span: span.clone(),
        };

        Box::pin(async_stream::try_stream! {
            for await event in events {
                match event? {
                    StreamEvent::TextDelta { text } => {
                        yield text;
                    }
                    StreamEvent::MessageDelta { stop_reason } => {
                        record_finish(&span, &stop_reason);
                    }
                    StreamEvent::Usage(usage) => {
                        span.record("gen_ai.usage.input_tokens", usage.input_tokens);
                        span.record("gen_ai.usage.output_tokens", usage.output_tokens);
                    }
                }
            }
        })
    }

    /// Render both templates, then run a batch completion with the results
    /// as the system and user messages.
    pub async fn generate_with_template(
        &self,
        system_template: &str,
        human_template: &str,
        variables: &[(&str, &str)],
    ) -> Result<String, LlmError> {
        let messages = vec![
            Message::system(render_template(system_template, variables)),
            Message::user(render_template(human_template, variables)),
        ];
        self.generate(messages).await
    }

    /// Embed a batch of texts with the configured embedding model.
    pub async fn get_embeddings(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, LlmError> {
        let span = info_span!(
            "gen_ai.embeddings",
            gen_ai.request.model = %self.embedder.model_name(),
            input_count = texts.len(),
        );
        self.embedder.embed(texts).instrument(span).await
    }

    fn build_request(&self, messages: Vec<Message>, stream: bool) -> CompletionRequest {
        debug!(message_count = messages.len(), stream, "Building completion request");
        CompletionRequest {
            model: self.settings.model.clone(),
            messages,
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
            stream,
        }
    }
}

fn record_finish(span: &tracing::Span, stop_reason: &StopReason) {
    span.record("gen_ai.response.finish_reason", tracing::field::display(stop_reason));
    if *stop_reason == StopReason::MaxTokens {
        warn!(parent: span, "Reply truncated by the max_tokens limit");
    }
}

/// Substitute `{name}` placeholders from `variables`.
///
/// Placeholders without a matching variable are left as written, and
/// substituted values are never re-scanned.
pub fn render_template(template: &str, variables: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let Some(end) = after.find('}') else {
            out.push_str(&rest[start..]);
            return out;
        };

        let key = &after[..end];
        match variables.iter().find(|(name, _)| *name == key) {
            Some((_, value)) => {
                out.push_str(value);
                rest = &after[end + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}

pin_project! {
    /// Keeps a span entered around every poll of the inner stream, so the
    /// span covers the whole streaming duration rather than just its creation.
    struct StreamInSpan<S> {
        #[pin]
        inner: S,
        span: tracing::Span,
    }
}

impl<S: Stream> Stream for StreamInSpan<S> {
    type Item = S::Item;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.project();
        let _enter = this.span.enter();
        this.inner.poll_next(cx)
    }
}
