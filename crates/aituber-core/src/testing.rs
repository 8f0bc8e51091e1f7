//! Test doubles shared by the unit tests in this crate.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use aituber_types::character::{Character, Interest, Persona, PersonalityTrait};
use aituber_types::error::{CharacterError, RepositoryError};
use aituber_types::llm::{
    CompletionRequest, CompletionResponse, LlmError, StopReason, StreamEvent, Usage,
};
use aituber_types::memory::{FragmentCandidate, MemoryFragment};

use crate::character::CharacterStore;
use crate::llm::provider::{EventStream, LlmProvider};
use crate::memory::embedder::Embedder;
use crate::memory::in_memory::InMemoryFragmentStore;
use crate::memory::store::FragmentStore;

/// Deterministic bag-of-words embedder: each lowercase word is hashed into
/// one of `dimension` buckets.
pub struct HashEmbedder {
    pub dimension: usize,
    pub calls: Arc<AtomicUsize>,
}

impl HashEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn vector_for(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; self.dimension];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let mut hash: u64 = 0xcbf29ce484222325;
            for b in word.to_lowercase().bytes() {
                hash ^= b as u64;
                hash = hash.wrapping_mul(0x100000001b3);
            }
            v[(hash % self.dimension as u64) as usize] += 1.0;
        }
        v
    }
}

impl Embedder for HashEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts.iter().map(|t| self.vector_for(t)).collect())
    }

    fn model_name(&self) -> &str {
        "hash-bow"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Embedder that always fails.
pub struct FailingEmbedder;

impl Embedder for FailingEmbedder {
    async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, LlmError> {
        Err(LlmError::Embedding("embedding service offline".to_string()))
    }

    fn model_name(&self) -> &str {
        "failing"
    }

    fn dimension(&self) -> usize {
        8
    }
}

/// Embedder that advertises one dimension and returns another.
pub struct LyingEmbedder;

impl Embedder for LyingEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, LlmError> {
        Ok(texts.iter().map(|_| vec![1.0; 3]).collect())
    }

    fn model_name(&self) -> &str {
        "lying"
    }

    fn dimension(&self) -> usize {
        8
    }
}

/// Wraps the in-memory store with switchable failures.
#[derive(Clone, Default)]
pub struct FlakyStore {
    pub inner: InMemoryFragmentStore,
    pub fail_writes: Arc<AtomicBool>,
    pub fail_reads: Arc<AtomicBool>,
}

impl FlakyStore {
    fn check(flag: &AtomicBool) -> Result<(), RepositoryError> {
        if flag.load(Ordering::SeqCst) {
            Err(RepositoryError::Connection)
        } else {
            Ok(())
        }
    }
}

impl FragmentStore for FlakyStore {
    async fn insert(&self, fragment: &MemoryFragment) -> Result<(), RepositoryError> {
        Self::check(&self.fail_writes)?;
        self.inner.insert(fragment).await
    }

    async fn get(&self, id: &str) -> Result<Option<MemoryFragment>, RepositoryError> {
        Self::check(&self.fail_reads)?;
        self.inner.get(id).await
    }

    async fn list(
        &self,
        owner_id: &str,
        author_id: Option<&str>,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<MemoryFragment>, RepositoryError> {
        Self::check(&self.fail_reads)?;
        self.inner.list(owner_id, author_id, limit, offset).await
    }

    async fn update(&self, fragment: &MemoryFragment) -> Result<bool, RepositoryError> {
        Self::check(&self.fail_writes)?;
        self.inner.update(fragment).await
    }

    async fn delete(&self, id: &str) -> Result<bool, RepositoryError> {
        Self::check(&self.fail_writes)?;
        self.inner.delete(id).await
    }

    async fn delete_all(
        &self,
        owner_id: &str,
        author_id: Option<&str>,
    ) -> Result<u64, RepositoryError> {
        Self::check(&self.fail_writes)?;
        self.inner.delete_all(owner_id, author_id).await
    }

    async fn count(&self, owner_id: &str, author_id: Option<&str>) -> Result<u64, RepositoryError> {
        Self::check(&self.fail_reads)?;
        self.inner.count(owner_id, author_id).await
    }

    async fn search(
        &self,
        owner_id: &str,
        query_embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<FragmentCandidate>, RepositoryError> {
        Self::check(&self.fail_reads)?;
        self.inner.search(owner_id, query_embedding, limit).await
    }
}

/// What the scripted provider does on the next call.
#[derive(Clone)]
pub enum Script {
    Reply(String),
    Tokens(Vec<String>),
    Fail,
    /// Yield the tokens, then a stream error.
    TokensThenFail(Vec<String>),
    /// Reply cut off by the output token limit.
    Truncated(String),
}

/// LLM provider that replays scripted outcomes and records every request.
#[derive(Clone)]
pub struct ScriptedProvider {
    scripts: Arc<Mutex<VecDeque<Script>>>,
    pub requests: Arc<Mutex<Vec<CompletionRequest>>>,
}

impl ScriptedProvider {
    pub fn new(scripts: Vec<Script>) -> Self {
        Self {
            scripts: Arc::new(Mutex::new(scripts.into())),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn replying(text: &str) -> Self {
        Self::new(vec![Script::Reply(text.to_string())])
    }

    fn next_script(&self, request: &CompletionRequest) -> Script {
        self.requests.lock().unwrap().push(request.clone());
        self.scripts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Script::Reply("(no script)".to_string()))
    }

    pub fn last_request(&self) -> CompletionRequest {
        self.requests.lock().unwrap().last().cloned().unwrap()
    }
}

impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let mut stop_reason = StopReason::EndTurn;
        let content = match self.next_script(request) {
            Script::Reply(text) => text,
            Script::Tokens(tokens) => tokens.concat(),
            Script::Truncated(text) => {
                stop_reason = StopReason::MaxTokens;
                text
            }
            Script::Fail | Script::TokensThenFail(_) => {
                return Err(LlmError::Provider {
                    message: "scripted failure".to_string(),
                });
            }
        };
        Ok(CompletionResponse {
            id: "resp-1".to_string(),
            content,
            model: request.model.clone(),
            stop_reason,
            usage: Usage {
                input_tokens: 12,
                output_tokens: 3,
            },
        })
    }

    fn stream(&self, request: CompletionRequest) -> EventStream {
        let script = self.next_script(&request);
        Box::pin(async_stream::stream! {
            let mut stop_reason = StopReason::EndTurn;
            match script {
                Script::Reply(text) => yield Ok(StreamEvent::TextDelta { text }),
                Script::Truncated(text) => {
                    stop_reason = StopReason::MaxTokens;
                    yield Ok(StreamEvent::TextDelta { text });
                }
                Script::Tokens(tokens) => {
                    for text in tokens {
                        yield Ok(StreamEvent::TextDelta { text });
                    }
                }
                Script::Fail => {
                    yield Err(LlmError::Stream("scripted failure".to_string()));
                    return;
                }
                Script::TokensThenFail(tokens) => {
                    for text in tokens {
                        yield Ok(StreamEvent::TextDelta { text });
                    }
                    yield Err(LlmError::Stream("connection reset".to_string()));
                    return;
                }
            }
            yield Ok(StreamEvent::MessageDelta { stop_reason });
            yield Ok(StreamEvent::Usage(Usage { input_tokens: 12, output_tokens: 3 }));
        })
    }
}

/// Character store over a fixed list.
#[derive(Clone, Default)]
pub struct StaticCharacters {
    pub characters: Vec<Character>,
    pub loads: Arc<AtomicUsize>,
}

impl StaticCharacters {
    pub fn with(characters: Vec<Character>) -> Self {
        Self {
            characters,
            loads: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl CharacterStore for StaticCharacters {
    async fn load(&self, id: &str) -> Result<Option<Character>, CharacterError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        Ok(self.characters.iter().find(|c| c.id == id).cloned())
    }

    async fn load_all(&self) -> Result<Vec<Character>, CharacterError> {
        Ok(self.characters.clone())
    }
}

/// A fully populated character.
pub fn sample_character() -> Character {
    Character {
        id: "hiyori".to_string(),
        name: "Hiyori".to_string(),
        description: "A cheerful virtual streamer.".to_string(),
        system_prompt: "You are Hiyori, a virtual streamer.".to_string(),
        persona: Persona {
            age: Some(17),
            gender: Some("female".to_string()),
            occupation: Some("streamer".to_string()),
            background: None,
            appearance: Some("silver hair".to_string()),
            speech_style: None,
        },
        personality_traits: vec![PersonalityTrait {
            name: "cheerful".to_string(),
            description: "always upbeat".to_string(),
            score: 0.9,
        }],
        interests: vec![Interest {
            name: "tea".to_string(),
            description: "loves green tea".to_string(),
            level: 0.8,
        }],
        metadata: Default::default(),
    }
}
