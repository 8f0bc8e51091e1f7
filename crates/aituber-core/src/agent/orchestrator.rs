//! Conversation orchestrator.
//!
//! Resolves the live conversation, recalls relevant memories, assembles the
//! prompt, invokes generation (batch or streaming), then commits the reply to
//! the conversation and writes the exchange back into long-term memory.
//!
//! Context locks are only held for in-memory mutation, never across
//! generation or memory I/O.

use std::pin::Pin;
use std::sync::Arc;

use futures_util::{Stream, StreamExt};
use tracing::{debug, info, warn};

use aituber_types::chat::{ConversationContext, Turn};
use aituber_types::config::AppConfig;
use aituber_types::error::ConversationError;
use aituber_types::llm::{LlmError, Message};
use aituber_types::memory::MemoryMetadata;

use crate::character::{CharacterService, CharacterStore};
use crate::chat::registry::{ConversationHandle, ConversationRegistry};
use crate::memory::service::MemoryService;
use crate::memory::store::FragmentStore;

use super::engine::GenerationEngine;
use super::prompt::{DEFAULT_HISTORY_LIMIT, PromptBuilder};
use super::summarizer::{ConversationSummarizer, NOT_ENOUGH_CONVERSATION};

/// Reply tokens from [`ConversationOrchestrator::process_message_stream`].
pub type TokenStream =
    Pin<Box<dyn Stream<Item = Result<String, ConversationError>> + Send + 'static>>;

/// Tunables for one orchestrator.
#[derive(Debug, Clone)]
pub struct ConversationSettings {
    /// Trailing turns placed in each prompt.
    pub history_limit: usize,
    /// Memories recalled per message.
    pub retrieval_limit: usize,
    /// Minimum cosine similarity for a recalled memory.
    pub similarity_threshold: f32,
}

impl ConversationSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            history_limit: config.conversation.history_limit,
            retrieval_limit: config.memory.retrieval_limit,
            similarity_threshold: config.memory.similarity_threshold,
        }
    }
}

impl Default for ConversationSettings {
    fn default() -> Self {
        Self {
            history_limit: DEFAULT_HISTORY_LIMIT,
            retrieval_limit: 5,
            similarity_threshold: 0.7,
        }
    }
}

/// Everything the generation step needs, gathered before the model call.
struct PreparedTurn {
    handle: ConversationHandle,
    character_id: String,
    user_id: String,
    messages: Vec<Message>,
}

/// Stateful control loop over conversations, memory and generation.
pub struct ConversationOrchestrator<S: FragmentStore, C: CharacterStore> {
    memory: Arc<MemoryService<S>>,
    characters: Arc<CharacterService<C>>,
    engine: Arc<GenerationEngine>,
    registry: ConversationRegistry,
    settings: ConversationSettings,
}

impl<S, C> ConversationOrchestrator<S, C>
where
    S: FragmentStore + 'static,
    C: CharacterStore + 'static,
{
    pub fn new(
        memory: Arc<MemoryService<S>>,
        characters: Arc<CharacterService<C>>,
        engine: Arc<GenerationEngine>,
        registry: ConversationRegistry,
        settings: ConversationSettings,
    ) -> Self {
        Self {
            memory,
            characters,
            engine,
            registry,
            settings,
        }
    }

    pub fn memory(&self) -> &Arc<MemoryService<S>> {
        &self.memory
    }

    pub fn characters(&self) -> &Arc<CharacterService<C>> {
        &self.characters
    }

    pub fn engine(&self) -> &Arc<GenerationEngine> {
        &self.engine
    }

    pub fn settings(&self) -> &ConversationSettings {
        &self.settings
    }

    /// Return the live conversation for `conversation_id`, or start one.
    ///
    /// An existing conversation is returned unchanged even when
    /// `character_id`/`user_id` differ from the ones it was created with.
    pub async fn get_or_create_conversation(
        &self,
        character_id: &str,
        user_id: &str,
        conversation_id: Option<&str>,
    ) -> ConversationContext {
        let (handle, created) = self
            .registry
            .get_or_create(character_id, user_id, conversation_id);
        let snapshot = handle.lock().await.clone();
        if created {
            info!(
                conversation_id = %snapshot.conversation_id(),
                character_id = %character_id,
                user_id = %user_id,
                "Conversation started"
            );
        }
        snapshot
    }

    /// Snapshot of a live conversation.
    pub async fn get_conversation(&self, conversation_id: &str) -> Option<ConversationContext> {
        let handle = self.registry.get(conversation_id)?;
        let snapshot = handle.lock().await.clone();
        Some(snapshot)
    }

    /// Forget a conversation. `false` when it was not live.
    pub fn delete_conversation(&self, conversation_id: &str) -> bool {
        let removed = self.registry.remove(conversation_id);
        if removed {
            info!(conversation_id = %conversation_id, "Conversation deleted");
        }
        removed
    }

    /// Handle one user message and return the full reply.
    ///
    /// On generation failure the user turn stays in the conversation and no
    /// assistant turn or memory is written.
    #[tracing::instrument(name = "conversation.process", skip(self, user_text))]
    pub async fn process_message(
        &self,
        conversation_id: &str,
        user_text: &str,
    ) -> Result<String, ConversationError> {
        let prepared = self.prepare(conversation_id, user_text).await?;

        let reply = self.engine.generate(prepared.messages).await.map_err(|e| {
            warn!(error = %e, "Generation failed");
            ConversationError::Generation(e)
        })?;

        commit_reply(&prepared.handle, &reply).await?;
        write_back(
            self.memory.as_ref(),
            &prepared.character_id,
            &prepared.user_id,
            conversation_id,
            user_text,
            &reply,
        )
        .await;

        Ok(reply)
    }

    /// Handle one user message and stream the reply tokens.
    ///
    /// Lookup, validation, the user turn, memory recall and prompt assembly
    /// happen before this returns. The assistant turn and memory write-back
    /// are committed only once the stream has been read to the end; an early
    /// drop or a backend error commits nothing.
    #[tracing::instrument(name = "conversation.process_stream", skip(self, user_text))]
    pub async fn process_message_stream(
        &self,
        conversation_id: &str,
        user_text: &str,
    ) -> Result<TokenStream, ConversationError> {
        let PreparedTurn {
            handle,
            character_id,
            user_id,
            messages,
        } = self.prepare(conversation_id, user_text).await?;

        let mut tokens = self.engine.generate_stream(messages);
        let memory = self.memory.clone();
        let conversation_id = conversation_id.to_string();
        let user_text = user_text.to_string();

        Ok(Box::pin(async_stream::try_stream! {
            let mut reply = String::new();
            while let Some(token) = tokens.next().await {
                let token = token.map_err(|e| {
                    warn!(
                        conversation_id = %conversation_id,
                        error = %e,
                        "Generation stream failed"
                    );
                    ConversationError::Generation(e)
                })?;
                reply.push_str(&token);
                yield token;
            }

            if reply.trim().is_empty() {
                Err::<(), _>(ConversationError::Generation(LlmError::Provider {
                    message: "model returned an empty response".to_string(),
                }))?;
            }

            commit_reply(&handle, &reply).await?;
            write_back(
                memory.as_ref(),
                &character_id,
                &user_id,
                &conversation_id,
                &user_text,
                &reply,
            )
            .await;
        }))
    }

    /// Summarize a live conversation in a few sentences.
    ///
    /// Unknown conversations and ones with fewer than three turns yield the
    /// "not enough conversation" sentinel.
    pub async fn summarize_conversation(
        &self,
        conversation_id: &str,
    ) -> Result<String, ConversationError> {
        let Some(snapshot) = self.get_conversation(conversation_id).await else {
            return Ok(NOT_ENOUGH_CONVERSATION.to_string());
        };
        Ok(ConversationSummarizer::summarize(&self.engine, &snapshot).await?)
    }

    /// Steps shared by the batch and streaming paths, up to the model call.
    async fn prepare(
        &self,
        conversation_id: &str,
        user_text: &str,
    ) -> Result<PreparedTurn, ConversationError> {
        let handle = self
            .registry
            .get(conversation_id)
            .ok_or_else(|| ConversationError::NotFound(conversation_id.to_string()))?;

        let user_turn = Turn::user(user_text)?;

        let (character_id, user_id) = {
            let ctx = handle.lock().await;
            (ctx.character_id().to_string(), ctx.user_id().to_string())
        };
        let character = self.characters.load_character(&character_id).await?;

        let window: Vec<Turn> = {
            let mut ctx = handle.lock().await;
            ctx.append(user_turn);
            ctx.recent_turns(self.settings.history_limit).to_vec()
        };

        let memories = self
            .memory
            .retrieve_relevant(
                &character_id,
                user_text,
                self.settings.retrieval_limit,
                self.settings.similarity_threshold,
            )
            .await;
        debug!(
            conversation_id = %conversation_id,
            memory_count = memories.len(),
            history_count = window.len(),
            "Prompt context gathered"
        );

        let messages =
            PromptBuilder::build(&character, &memories, &window, self.settings.history_limit);

        Ok(PreparedTurn {
            handle,
            character_id,
            user_id,
            messages,
        })
    }
}

/// Append the assistant turn and mark the conversation active.
async fn commit_reply(handle: &ConversationHandle, reply: &str) -> Result<(), ConversationError> {
    let turn = Turn::assistant(reply)?;
    let mut ctx = handle.lock().await;
    ctx.append(turn);
    ctx.mark_active();
    Ok(())
}

/// Store the exchange as a memory of the character. Failures are logged only.
async fn write_back<S: FragmentStore>(
    memory: &MemoryService<S>,
    character_id: &str,
    user_id: &str,
    conversation_id: &str,
    user_text: &str,
    reply: &str,
) {
    let text = format!("User: {user_text}\nAssistant: {reply}");
    let metadata = MemoryMetadata::from([
        ("source".to_string(), "conversation".to_string()),
        ("conversation_id".to_string(), conversation_id.to_string()),
    ]);

    if let Err(e) = memory.add(character_id, user_id, &text, Some(metadata)).await {
        warn!(
            conversation_id = %conversation_id,
            character_id = %character_id,
            error = %e,
            "Failed to store conversation memory"
        );
    }
}
