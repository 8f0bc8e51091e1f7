//! Configuration types for AITuber.
//!
//! `AppConfig` represents the top-level `config.toml`. Every section and
//! field has a default, so an empty file (or no file) is a valid config.

use serde::{Deserialize, Serialize};

use crate::llm::ProviderType;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub app: GeneralConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub memory: MemoryConfig,
    #[serde(default)]
    pub character: CharacterConfig,
    #[serde(default)]
    pub conversation: ConversationConfig,
}

/// Process-wide settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Default `RUST_LOG`-style filter when the env var is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Export spans through OpenTelemetry (stdout exporter).
    #[serde(default)]
    pub enable_otel: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            enable_otel: false,
        }
    }
}

/// Chat-completion backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_provider")]
    pub provider: ProviderType,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Name of the environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_provider() -> ProviderType {
    ProviderType::OpenAi
}

fn default_model() -> String {
    "gpt-4-turbo".to_string()
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_temperature() -> f64 {
    0.7
}

fn default_max_tokens() -> u32 {
    1024
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            base_url: default_base_url(),
            api_key_env: default_api_key_env(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

/// Long-term memory settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// SQLite file relative to the data directory, or `:memory:` for an
    /// ephemeral in-process store.
    #[serde(default = "default_database")]
    pub database: String,
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
    #[serde(default = "default_embedding_dimension")]
    pub embedding_dimension: usize,
    #[serde(default = "default_retrieval_limit")]
    pub retrieval_limit: usize,
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f32,
}

fn default_database() -> String {
    "memory.db".to_string()
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

fn default_embedding_dimension() -> usize {
    1536
}

fn default_retrieval_limit() -> usize {
    5
}

fn default_similarity_threshold() -> f32 {
    0.7
}

impl MemoryConfig {
    pub fn is_in_memory(&self) -> bool {
        self.database == ":memory:"
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            database: default_database(),
            embedding_model: default_embedding_model(),
            embedding_dimension: default_embedding_dimension(),
            retrieval_limit: default_retrieval_limit(),
            similarity_threshold: default_similarity_threshold(),
        }
    }
}

/// Where character definitions live.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CharacterConfig {
    /// Directory relative to the data directory.
    #[serde(default = "default_characters_dir")]
    pub characters_dir: String,
    #[serde(default)]
    pub default_character: Option<String>,
}

fn default_characters_dir() -> String {
    "characters".to_string()
}

impl Default for CharacterConfig {
    fn default() -> Self {
        Self {
            characters_dir: default_characters_dir(),
            default_character: None,
        }
    }
}

/// Conversation registry and prompt-window settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationConfig {
    /// Trailing turns included in each prompt.
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
    /// Upper bound on live conversations; least recently used are evicted.
    #[serde(default = "default_max_conversations")]
    pub max_conversations: usize,
    /// Idle time after which a conversation expires. `0` disables expiry.
    #[serde(default = "default_idle_ttl_secs")]
    pub idle_ttl_secs: u64,
}

fn default_history_limit() -> usize {
    10
}

fn default_max_conversations() -> usize {
    1000
}

fn default_idle_ttl_secs() -> u64 {
    86_400
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            history_limit: default_history_limit(),
            max_conversations: default_max_conversations(),
            idle_ttl_secs: default_idle_ttl_secs(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_config_default_values() {
        let config = AppConfig::default();
        assert_eq!(config.llm.provider, ProviderType::OpenAi);
        assert_eq!(config.llm.model, "gpt-4-turbo");
        assert!((config.llm.temperature - 0.7).abs() < f64::EPSILON);
        assert_eq!(config.memory.retrieval_limit, 5);
        assert!((config.memory.similarity_threshold - 0.7).abs() < f32::EPSILON);
        assert_eq!(config.conversation.history_limit, 10);
        assert_eq!(config.character.characters_dir, "characters");
        assert!(config.character.default_character.is_none());
    }

    #[test]
    fn test_app_config_deserialize_empty() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config.memory.embedding_model, "text-embedding-3-small");
        assert_eq!(config.memory.embedding_dimension, 1536);
        assert_eq!(config.conversation.max_conversations, 1000);
        assert_eq!(config.app.log_level, "info");
    }

    #[test]
    fn test_app_config_deserialize_partial_sections() {
        let toml_str = r#"
[llm]
provider = "openai_compatible"
model = "llama3"
base_url = "http://localhost:11434/v1"

[memory]
database = ":memory:"
similarity_threshold = 0.5

[character]
default_character = "hiyori"

[conversation]
idle_ttl_secs = 0
"#;
        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.llm.provider, ProviderType::OpenAiCompatible);
        assert_eq!(config.llm.model, "llama3");
        assert_eq!(config.llm.api_key_env, "OPENAI_API_KEY");
        assert!(config.memory.is_in_memory());
        assert!((config.memory.similarity_threshold - 0.5).abs() < f32::EPSILON);
        assert_eq!(config.memory.retrieval_limit, 5);
        assert_eq!(config.character.default_character.as_deref(), Some("hiyori"));
        assert_eq!(config.conversation.idle_ttl_secs, 0);
        assert_eq!(config.conversation.history_limit, 10);
    }

    #[test]
    fn test_app_config_rejects_unknown_provider() {
        let result: Result<AppConfig, _> = toml::from_str("[llm]\nprovider = \"carrier-pigeon\"\n");
        assert!(result.is_err());
    }
}
