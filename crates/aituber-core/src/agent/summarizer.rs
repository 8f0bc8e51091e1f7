//! Conversation summarizer.
//!
//! Condenses a conversation transcript into a few sentences through the
//! generation engine's template call.

use aituber_types::chat::ConversationContext;
use aituber_types::llm::LlmError;

use super::engine::GenerationEngine;

/// Returned instead of a summary when there is too little to summarize.
pub const NOT_ENOUGH_CONVERSATION: &str = "Not enough conversation to summarize.";

/// Fewest turns worth summarizing.
pub const MIN_SUMMARY_TURNS: usize = 3;

const SUMMARY_SYSTEM_TEMPLATE: &str = "You are an assistant that summarizes conversations.\n\
Summarize the following conversation in 3-5 sentences. \
Include the main topics and any important information.";

const SUMMARY_HUMAN_TEMPLATE: &str = "{conversation}";

/// Stateless summarization helper.
pub struct ConversationSummarizer;

impl ConversationSummarizer {
    /// Summarize a conversation snapshot.
    ///
    /// Contexts with fewer than [`MIN_SUMMARY_TURNS`] turns get the
    /// [`NOT_ENOUGH_CONVERSATION`] sentinel without a model call.
    #[tracing::instrument(
        name = "summarize_conversation",
        skip(engine, context),
        fields(
            conversation_id = %context.conversation_id(),
            turn_count = context.turns().len(),
        )
    )]
    pub async fn summarize(
        engine: &GenerationEngine,
        context: &ConversationContext,
    ) -> Result<String, LlmError> {
        if context.turns().len() < MIN_SUMMARY_TURNS {
            return Ok(NOT_ENOUGH_CONVERSATION.to_string());
        }

        let transcript = context.transcript();
        let summary = engine
            .generate_with_template(
                SUMMARY_SYSTEM_TEMPLATE,
                SUMMARY_HUMAN_TEMPLATE,
                &[("conversation", transcript.as_str())],
            )
            .await?;
        Ok(summary.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::engine::GenerationSettings;
    use crate::llm::box_provider::BoxLlmProvider;
    use crate::memory::box_embedder::BoxEmbedder;
    use crate::testing::{HashEmbedder, ScriptedProvider};
    use aituber_types::chat::Turn;

    fn engine(provider: ScriptedProvider) -> GenerationEngine {
        GenerationEngine::new(
            BoxLlmProvider::new(provider),
            BoxEmbedder::new(HashEmbedder::new(8)),
            GenerationSettings::default(),
        )
    }

    #[tokio::test]
    async fn test_short_conversation_returns_sentinel() {
        let provider = ScriptedProvider::replying("should not be used");
        let engine = engine(provider.clone());

        let mut ctx = ConversationContext::new("hiyori", "u1", None);
        ctx.append(Turn::user("hi").unwrap());
        ctx.append(Turn::assistant("hello").unwrap());

        let summary = ConversationSummarizer::summarize(&engine, &ctx).await.unwrap();
        assert_eq!(summary, NOT_ENOUGH_CONVERSATION);
        assert!(provider.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_transcript_is_sent_as_user_message() {
        let provider = ScriptedProvider::replying("  They talked about tea.  ");
        let engine = engine(provider.clone());

        let mut ctx = ConversationContext::new("hiyori", "u1", None);
        ctx.append(Turn::user("do you like tea?").unwrap());
        ctx.append(Turn::assistant("I love it!").unwrap());
        ctx.append(Turn::user("me too").unwrap());

        let summary = ConversationSummarizer::summarize(&engine, &ctx).await.unwrap();
        assert_eq!(summary, "They talked about tea.");

        let request = provider.last_request();
        assert_eq!(request.messages[0].content, SUMMARY_SYSTEM_TEMPLATE);
        assert_eq!(
            request.messages[1].content,
            "user: do you like tea?\nassistant: I love it!\nuser: me too"
        );
    }
}
