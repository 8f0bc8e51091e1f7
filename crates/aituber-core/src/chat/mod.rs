//! Live conversation state for AITuber.
//!
//! - `ConversationRegistry`: bounded, concurrent map of per-conversation contexts

pub mod registry;
