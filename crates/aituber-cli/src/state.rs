//! Application state wiring all services together.
//!
//! Services are generic over store traits; AppState pins them to the
//! concrete infra implementations chosen by configuration.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use aituber_core::agent::engine::{GenerationEngine, GenerationSettings};
use aituber_core::agent::orchestrator::{ConversationOrchestrator, ConversationSettings};
use aituber_core::character::CharacterService;
use aituber_core::chat::registry::ConversationRegistry;
use aituber_core::memory::box_embedder::BoxEmbedder;
use aituber_core::memory::box_store::BoxFragmentStore;
use aituber_core::memory::in_memory::InMemoryFragmentStore;
use aituber_core::memory::service::MemoryService;
use aituber_infra::config::resolve_api_key;
use aituber_infra::filesystem::character::FileCharacterStore;
use aituber_infra::filesystem::resolve_data_path;
use aituber_infra::llm::{create_embedder, create_provider};
use aituber_infra::sqlite::fragment::SqliteFragmentStore;
use aituber_infra::sqlite::pool::{DatabasePool, database_url};
use aituber_types::config::AppConfig;

/// Concrete type aliases for the service generics pinned to infra implementations.
pub type ConcreteMemoryService = MemoryService<BoxFragmentStore>;
pub type ConcreteCharacterService = CharacterService<FileCharacterStore>;
pub type ConcreteOrchestrator = ConversationOrchestrator<BoxFragmentStore, FileCharacterStore>;

/// Shared application state holding all services.
pub struct AppState {
    pub config: AppConfig,
    pub data_dir: PathBuf,
    pub memory: Arc<ConcreteMemoryService>,
    pub characters: Arc<ConcreteCharacterService>,
    pub orchestrator: ConcreteOrchestrator,
    db_pool: Option<DatabasePool>,
}

impl AppState {
    /// Open storage, load characters and wire the conversation pipeline.
    pub async fn init(config: AppConfig, data_dir: PathBuf) -> anyhow::Result<Self> {
        tokio::fs::create_dir_all(&data_dir)
            .await
            .with_context(|| format!("failed to create data directory {}", data_dir.display()))?;

        let api_key = resolve_api_key(&config.llm);
        let provider = create_provider(&config.llm, api_key.clone()).with_context(|| {
            format!(
                "no API key found; set the {} environment variable",
                config.llm.api_key_env
            )
        })?;
        let embedder = create_embedder(&config.llm, &config.memory, api_key)?;

        // Memory embeds on write and on recall; the engine embeds on request.
        let engine = GenerationEngine::new(
            provider,
            BoxEmbedder::new(embedder.clone()),
            GenerationSettings::from(&config.llm),
        );

        let (store, db_pool) = if config.memory.is_in_memory() {
            info!("Using in-process memory store; memories are lost on exit");
            (BoxFragmentStore::new(InMemoryFragmentStore::new()), None)
        } else {
            let db_path = resolve_data_path(&data_dir, &config.memory.database);
            let pool = DatabasePool::new(&database_url(&db_path))
                .await
                .with_context(|| format!("failed to open memory database {}", db_path.display()))?;
            info!(path = %db_path.display(), "Memory database opened");
            (
                BoxFragmentStore::new(SqliteFragmentStore::new(pool.clone())),
                Some(pool),
            )
        };
        let memory = Arc::new(MemoryService::new(store, BoxEmbedder::new(embedder)));

        let characters_dir = resolve_data_path(&data_dir, &config.character.characters_dir);
        let characters = Arc::new(CharacterService::new(FileCharacterStore::new(characters_dir)));
        characters
            .reload()
            .await
            .context("failed to load character definitions")?;

        let orchestrator = ConversationOrchestrator::new(
            memory.clone(),
            characters.clone(),
            Arc::new(engine),
            ConversationRegistry::from_config(&config.conversation),
            ConversationSettings::from_config(&config),
        );

        Ok(Self {
            config,
            data_dir,
            memory,
            characters,
            orchestrator,
            db_pool,
        })
    }

    /// Pick the character for a command: the explicit one, else the configured default.
    pub fn character_id(&self, explicit: Option<String>) -> anyhow::Result<String> {
        explicit
            .or_else(|| self.config.character.default_character.clone())
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "no character given and no [character] default_character configured"
                )
            })
    }

    /// Close the database pool.
    pub async fn shutdown(&self) {
        if let Some(pool) = &self.db_pool {
            pool.close().await;
        }
    }
}
