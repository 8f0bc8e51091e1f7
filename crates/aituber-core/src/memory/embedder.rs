//! Embedder trait for text-to-vector conversion.
//!
//! This is the embedding half of the generation backend. Implementations
//! (OpenAI embeddings, test doubles) live in aituber-infra or in tests.

use aituber_types::llm::LlmError;

/// Trait for converting text into embedding vectors.
///
/// Uses RPITIT (native async fn in traits, Rust 2024 edition).
pub trait Embedder: Send + Sync {
    /// Embed one or more texts. Returns exactly one vector per input, in order.
    fn embed(
        &self,
        texts: &[String],
    ) -> impl std::future::Future<Output = Result<Vec<Vec<f32>>, LlmError>> + Send;

    /// The model name used for embeddings (e.g., "text-embedding-3-small").
    fn model_name(&self) -> &str;

    /// The dimensionality of every output vector.
    fn dimension(&self) -> usize;
}
