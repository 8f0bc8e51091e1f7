//! Conversation turn and context types for AITuber.
//!
//! A [`ConversationContext`] is the per-session aggregate owned by the
//! orchestrator's registry: identity, an append-only log of [`Turn`]s, and
//! lifecycle timestamps.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;
use std::str::FromStr;

use crate::error::ConversationError;
use crate::llm::Message;

// Re-export MessageRole from llm module (it's used in both chat and llm contexts).
pub use crate::llm::MessageRole;

/// One role-tagged utterance. Never mutated after it is appended to a context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: MessageRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl Turn {
    /// Create a turn, rejecting blank user/assistant content.
    pub fn new(role: MessageRole, content: impl Into<String>) -> Result<Self, ConversationError> {
        let content = content.into();
        if role != MessageRole::System && content.trim().is_empty() {
            return Err(ConversationError::Validation(format!(
                "{role} turn content must not be empty"
            )));
        }
        Ok(Self {
            role,
            content,
            created_at: Utc::now(),
        })
    }

    pub fn user(content: impl Into<String>) -> Result<Self, ConversationError> {
        Self::new(MessageRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Result<Self, ConversationError> {
        Self::new(MessageRole::Assistant, content)
    }

    /// Convert into the provider-facing message shape.
    pub fn to_message(&self) -> Message {
        Message {
            role: self.role,
            content: self.content.clone(),
        }
    }
}

/// Lifecycle state of a live conversation.
///
/// Deletion removes the context from the registry, so there is no `Deleted`
/// variant: a deleted conversation simply stops resolving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversationStatus {
    /// Created, no exchange has completed yet.
    New,
    /// At least one user/assistant exchange has completed.
    Active,
}

impl fmt::Display for ConversationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConversationStatus::New => write!(f, "new"),
            ConversationStatus::Active => write!(f, "active"),
        }
    }
}

impl FromStr for ConversationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "new" => Ok(ConversationStatus::New),
            "active" => Ok(ConversationStatus::Active),
            other => Err(format!("invalid conversation status: '{other}'")),
        }
    }
}

impl Default for ConversationStatus {
    fn default() -> Self {
        ConversationStatus::New
    }
}

/// Mutable per-session state for one character/user pairing.
///
/// `character_id` and `user_id` are fixed at creation and `turns` is
/// append-only; neither is exposed mutably.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationContext {
    conversation_id: String,
    character_id: String,
    user_id: String,
    turns: Vec<Turn>,
    status: ConversationStatus,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ConversationContext {
    /// Start a new conversation. A caller-supplied id is kept verbatim,
    /// otherwise a time-sortable UUID v7 is generated.
    pub fn new(
        character_id: impl Into<String>,
        user_id: impl Into<String>,
        conversation_id: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            conversation_id: conversation_id.unwrap_or_else(|| Uuid::now_v7().to_string()),
            character_id: character_id.into(),
            user_id: user_id.into(),
            turns: Vec::new(),
            status: ConversationStatus::New,
            metadata: serde_json::Map::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }

    pub fn character_id(&self) -> &str {
        &self.character_id
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn status(&self) -> ConversationStatus {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Append a turn and refresh `updated_at`.
    pub fn append(&mut self, turn: Turn) {
        self.turns.push(turn);
        self.updated_at = Utc::now();
    }

    /// Record a completed exchange: `NEW -> ACTIVE`, idempotent afterwards.
    pub fn mark_active(&mut self) {
        self.status = ConversationStatus::Active;
    }

    /// The trailing `limit` turns in chronological order.
    pub fn recent_turns(&self, limit: usize) -> &[Turn] {
        let start = self.turns.len().saturating_sub(limit);
        &self.turns[start..]
    }

    /// Render the full history as `role: content` lines.
    pub fn transcript(&self) -> String {
        self.turns
            .iter()
            .map(|t| format!("{}: {}", t.role, t.content))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversation_status_roundtrip() {
        for status in [ConversationStatus::New, ConversationStatus::Active] {
            let parsed: ConversationStatus = status.to_string().parse().unwrap();
            assert_eq!(status, parsed);
        }
        assert_eq!(ConversationStatus::default(), ConversationStatus::New);
    }

    #[test]
    fn test_turn_rejects_blank_user_content() {
        assert!(Turn::user("   ").is_err());
        assert!(Turn::assistant("").is_err());
        assert!(Turn::new(MessageRole::System, "").is_ok());
        assert_eq!(Turn::user("hi").unwrap().role, MessageRole::User);
    }

    #[test]
    fn test_new_context_keeps_supplied_id() {
        let ctx = ConversationContext::new("hiyori", "u1", Some("conv-1".to_string()));
        assert_eq!(ctx.conversation_id(), "conv-1");
        assert_eq!(ctx.character_id(), "hiyori");
        assert_eq!(ctx.user_id(), "u1");
        assert!(ctx.turns().is_empty());
        assert_eq!(ctx.status(), ConversationStatus::New);
    }

    #[test]
    fn test_new_context_generates_id() {
        let a = ConversationContext::new("c", "u", None);
        let b = ConversationContext::new("c", "u", None);
        assert_ne!(a.conversation_id(), b.conversation_id());
        assert!(Uuid::parse_str(a.conversation_id()).is_ok());
    }

    #[test]
    fn test_append_refreshes_updated_at() {
        let mut ctx = ConversationContext::new("c", "u", None);
        let before = ctx.updated_at();
        std::thread::sleep(std::time::Duration::from_millis(2));
        ctx.append(Turn::user("hello").unwrap());
        assert_eq!(ctx.turns().len(), 1);
        assert!(ctx.updated_at() > before);
        assert_eq!(ctx.created_at(), before);
    }

    #[test]
    fn test_recent_turns_window() {
        let mut ctx = ConversationContext::new("c", "u", None);
        for i in 0..15 {
            ctx.append(Turn::user(format!("m{i}")).unwrap());
        }
        let recent = ctx.recent_turns(10);
        assert_eq!(recent.len(), 10);
        assert_eq!(recent[0].content, "m5");
        assert_eq!(recent[9].content, "m14");
        assert_eq!(ctx.recent_turns(50).len(), 15);
        assert_eq!(ctx.turns().len(), 15);
    }

    #[test]
    fn test_transcript_format() {
        let mut ctx = ConversationContext::new("c", "u", None);
        ctx.append(Turn::user("hi").unwrap());
        ctx.append(Turn::assistant("hello!").unwrap());
        assert_eq!(ctx.transcript(), "user: hi\nassistant: hello!");
    }
}
