//! Generation backend implementations.
//!
//! Contains the OpenAI-compatible [`LlmProvider`](aituber_core::llm::provider::LlmProvider)
//! and [`Embedder`](aituber_core::memory::embedder::Embedder) implementations,
//! plus factories ([`create_provider`], [`create_embedder`]) that build them
//! from configuration and a connectivity check ([`test_provider_connection`]).

pub mod embedding;
pub mod openai_compat;

use secrecy::SecretString;

use aituber_core::llm::box_provider::BoxLlmProvider;
use aituber_core::llm::provider::LlmProvider;
use aituber_types::config::{LlmConfig, MemoryConfig};
use aituber_types::llm::{CompletionRequest, LlmError, Message, ProviderType};

use self::embedding::OpenAiEmbedder;
use self::openai_compat::OpenAiCompatibleProvider;

/// Placeholder key for local servers that ignore authentication.
const UNAUTHENTICATED_KEY: &str = "not-needed";

fn require_key(
    config: &LlmConfig,
    api_key: Option<SecretString>,
) -> Result<SecretString, LlmError> {
    match (config.provider, api_key) {
        (_, Some(key)) => Ok(key),
        (ProviderType::OpenAi, None) => Err(LlmError::AuthenticationFailed),
        (ProviderType::OpenAiCompatible, None) => Ok(SecretString::from(UNAUTHENTICATED_KEY)),
    }
}

/// Create a [`BoxLlmProvider`] from an [`LlmConfig`].
///
/// The hosted OpenAI provider requires a key; OpenAI-compatible servers
/// are often local and run without one.
///
/// # Errors
///
/// Returns [`LlmError::AuthenticationFailed`] if `provider = "openai"` and no
/// key was resolved.
pub fn create_provider(
    config: &LlmConfig,
    api_key: Option<SecretString>,
) -> Result<BoxLlmProvider, LlmError> {
    let key = require_key(config, api_key)?;
    let oai_config = openai_compat::config::from_llm_config(config, key);
    Ok(BoxLlmProvider::new(OpenAiCompatibleProvider::new(oai_config)))
}

/// Create the embeddings client for long-term memory.
///
/// Embeddings are served from the same base URL and key as chat completions.
pub fn create_embedder(
    llm: &LlmConfig,
    memory: &MemoryConfig,
    api_key: Option<SecretString>,
) -> Result<OpenAiEmbedder, LlmError> {
    let key = require_key(llm, api_key)?;
    Ok(OpenAiEmbedder::new(
        key,
        &llm.base_url,
        &memory.embedding_model,
        memory.embedding_dimension,
    ))
}

/// Test provider connectivity by sending a minimal completion request.
///
/// # Errors
///
/// Returns the LLM error if the provider fails to respond.
pub async fn test_provider_connection(provider: &BoxLlmProvider) -> Result<(), LlmError> {
    let request = CompletionRequest {
        model: String::new(), // Provider uses its configured default
        messages: vec![Message::user("Hello")],
        max_tokens: 10,
        temperature: Some(0.0),
        stream: false,
    };
    provider.complete(&request).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use aituber_core::memory::embedder::Embedder;

    #[test]
    fn test_create_provider_openai() {
        let config = LlmConfig::default();
        let provider = create_provider(&config, Some(SecretString::from("sk-test"))).unwrap();
        assert_eq!(provider.name(), "openai");
    }

    #[test]
    fn test_create_provider_openai_missing_key() {
        let result = create_provider(&LlmConfig::default(), None);
        match result {
            Err(LlmError::AuthenticationFailed) => {}
            Err(other) => panic!("Expected AuthenticationFailed, got: {other}"),
            Ok(_) => panic!("Expected error but got Ok"),
        }
    }

    #[test]
    fn test_create_provider_compatible_without_key() {
        let config = LlmConfig {
            provider: ProviderType::OpenAiCompatible,
            base_url: "http://localhost:11434/v1".to_string(),
            model: "llama3".to_string(),
            ..Default::default()
        };
        let provider = create_provider(&config, None).unwrap();
        assert_eq!(provider.name(), "openai_compatible");
    }

    #[test]
    fn test_create_embedder_uses_memory_settings() {
        let memory = MemoryConfig {
            embedding_model: "text-embedding-3-large".to_string(),
            embedding_dimension: 3072,
            ..Default::default()
        };
        let key = Some(SecretString::from("sk"));
        let embedder = create_embedder(&LlmConfig::default(), &memory, key).unwrap();
        assert_eq!(embedder.model_name(), "text-embedding-3-large");
        assert_eq!(embedder.dimension(), 3072);
    }
}
