use thiserror::Error;

use crate::llm::LlmError;

/// Errors from repository operations (used by trait definitions in aituber-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("malformed record: {0}")]
    Corrupt(String),
}

/// Errors raised by the long-term memory store.
#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("memory fragment not found: {0}")]
    NotFound(String),

    #[error("embedding failed: {0}")]
    Embedding(String),

    #[error("memory write failed: {0}")]
    Write(String),

    #[error("invalid memory input: {0}")]
    Validation(String),
}

/// Errors related to character definitions.
#[derive(Debug, Error)]
pub enum CharacterError {
    #[error("character not found: {0}")]
    NotFound(String),

    #[error("invalid character definition: {0}")]
    Invalid(String),

    #[error("character storage error: {0}")]
    Storage(String),
}

/// Errors surfaced by the conversation orchestrator.
///
/// Every variant maps onto one transport-level class (not found, upstream
/// failure, bad input), so callers never see an unexplained empty reply.
#[derive(Debug, Error)]
pub enum ConversationError {
    #[error("conversation not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Character(#[from] CharacterError),

    #[error("generation failed: {0}")]
    Generation(#[from] LlmError),

    #[error("embedding failed: {0}")]
    Embedding(String),

    #[error("memory write failed: {0}")]
    MemoryWrite(String),

    #[error("invalid input: {0}")]
    Validation(String),
}

impl ConversationError {
    /// Whether the error refers to a missing conversation, character, or fragment.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ConversationError::NotFound(_)
                | ConversationError::Character(CharacterError::NotFound(_))
        )
    }
}

impl From<MemoryError> for ConversationError {
    fn from(err: MemoryError) -> Self {
        match err {
            MemoryError::NotFound(id) => {
                ConversationError::NotFound(format!("memory fragment {id}"))
            }
            MemoryError::Embedding(msg) => ConversationError::Embedding(msg),
            MemoryError::Write(msg) => ConversationError::MemoryWrite(msg),
            MemoryError::Validation(msg) => ConversationError::Validation(msg),
        }
    }
}

/// Errors from loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    NotFound { path: String },

    #[error("failed to read config file '{path}': {message}")]
    Read { path: String, message: String },

    #[error("failed to parse config file '{path}': {message}")]
    Parse { path: String, message: String },
}
