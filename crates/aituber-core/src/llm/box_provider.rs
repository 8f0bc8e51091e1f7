//! Type-erased [`LlmProvider`] so the backend can be chosen from config at
//! startup while `GenerationEngine` stays non-generic.

use std::future::Future;
use std::pin::Pin;

use aituber_types::llm::{CompletionRequest, CompletionResponse, LlmError};

use super::provider::{EventStream, LlmProvider};

type CompleteFut<'a> =
    Pin<Box<dyn Future<Output = Result<CompletionResponse, LlmError>> + Send + 'a>>;

/// Object-safe mirror of [`LlmProvider`], implemented for every provider.
trait ErasedProvider: Send + Sync {
    fn erased_name(&self) -> &str;

    fn erased_complete<'a>(&'a self, request: &'a CompletionRequest) -> CompleteFut<'a>;

    fn erased_stream(&self, request: CompletionRequest) -> EventStream;
}

impl<P: LlmProvider> ErasedProvider for P {
    fn erased_name(&self) -> &str {
        self.name()
    }

    fn erased_complete<'a>(&'a self, request: &'a CompletionRequest) -> CompleteFut<'a> {
        Box::pin(self.complete(request))
    }

    fn erased_stream(&self, request: CompletionRequest) -> EventStream {
        self.stream(request)
    }
}

/// A boxed chat backend. Implements [`LlmProvider`] itself.
pub struct BoxLlmProvider(Box<dyn ErasedProvider>);

impl BoxLlmProvider {
    pub fn new<P: LlmProvider + 'static>(provider: P) -> Self {
        Self(Box::new(provider))
    }
}

impl LlmProvider for BoxLlmProvider {
    fn name(&self) -> &str {
        self.0.erased_name()
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        self.0.erased_complete(request).await
    }

    fn stream(&self, request: CompletionRequest) -> EventStream {
        self.0.erased_stream(request)
    }
}
