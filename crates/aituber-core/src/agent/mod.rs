//! Conversation pipeline for AITuber.
//!
//! - `GenerationEngine`: chat completion, streaming, templates and embeddings
//! - `PromptBuilder`: character + memories + recent turns into a message list
//! - `ConversationSummarizer`: short summaries of a conversation transcript
//! - `ConversationOrchestrator`: the per-message control loop

pub mod engine;
pub mod orchestrator;
pub mod prompt;
pub mod summarizer;
