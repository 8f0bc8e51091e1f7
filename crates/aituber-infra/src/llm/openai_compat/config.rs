//! Configuration and defaults for OpenAI-compatible providers.
//!
//! The hosted OpenAI API and self-hosted servers that speak the same chat
//! completions protocol share one provider; only the base URL and the name
//! reported on spans differ.

use secrecy::SecretString;

use aituber_types::config::LlmConfig;
use aituber_types::llm::ProviderType;

pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Configuration for an [`super::OpenAiCompatibleProvider`].
///
/// Does not derive Debug; the API key must never reach logs.
pub struct OpenAiCompatConfig {
    /// Provider name reported in spans (e.g., "openai").
    pub provider_name: String,
    /// Base URL for the API (e.g., "https://api.openai.com/v1").
    pub base_url: String,
    pub api_key: SecretString,
    /// Default model when a request does not name one.
    pub model: String,
}

/// Hosted OpenAI.
pub fn openai_defaults(api_key: SecretString, model: &str) -> OpenAiCompatConfig {
    OpenAiCompatConfig {
        provider_name: "openai".into(),
        base_url: OPENAI_BASE_URL.into(),
        api_key,
        model: model.into(),
    }
}

/// Self-hosted or third-party OpenAI-compatible server.
pub fn compatible_defaults(
    base_url: &str,
    api_key: SecretString,
    model: &str,
) -> OpenAiCompatConfig {
    OpenAiCompatConfig {
        provider_name: "openai_compatible".into(),
        base_url: base_url.trim_end_matches('/').into(),
        api_key,
        model: model.into(),
    }
}

/// Pick the defaults matching `config.provider`.
///
/// A non-default `base_url` on the `openai` provider is honored so that
/// proxies keep working.
pub fn from_llm_config(config: &LlmConfig, api_key: SecretString) -> OpenAiCompatConfig {
    match config.provider {
        ProviderType::OpenAi => {
            let mut defaults = openai_defaults(api_key, &config.model);
            defaults.base_url = config.base_url.trim_end_matches('/').to_string();
            defaults
        }
        ProviderType::OpenAiCompatible => {
            compatible_defaults(&config.base_url, api_key, &config.model)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_openai_defaults() {
        let config = openai_defaults(SecretString::from("sk-test"), "gpt-4-turbo");
        assert_eq!(config.provider_name, "openai");
        assert_eq!(config.base_url, OPENAI_BASE_URL);
        assert_eq!(config.api_key.expose_secret(), "sk-test");
        assert_eq!(config.model, "gpt-4-turbo");
    }

    #[test]
    fn test_from_llm_config_compatible() {
        let llm = LlmConfig {
            provider: ProviderType::OpenAiCompatible,
            base_url: "http://localhost:11434/v1/".to_string(),
            model: "llama3".to_string(),
            ..Default::default()
        };
        let config = from_llm_config(&llm, SecretString::from("unused"));
        assert_eq!(config.provider_name, "openai_compatible");
        assert_eq!(config.base_url, "http://localhost:11434/v1");
        assert_eq!(config.model, "llama3");
    }

    #[test]
    fn test_from_llm_config_openai_keeps_custom_base() {
        let llm = LlmConfig {
            base_url: "https://proxy.example.com/v1".to_string(),
            ..Default::default()
        };
        let config = from_llm_config(&llm, SecretString::from("sk"));
        assert_eq!(config.provider_name, "openai");
        assert_eq!(config.base_url, "https://proxy.example.com/v1");
    }
}
