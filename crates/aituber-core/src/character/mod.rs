//! Character lookup for AITuber.
//!
//! `CharacterStore` is the persistence port (YAML files in aituber-infra).
//! `CharacterService` keeps validated characters in a concurrent cache and
//! falls back to the store on a miss.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::{debug, info, warn};

use aituber_types::character::Character;
use aituber_types::error::CharacterError;

/// Storage for character definitions.
///
/// Uses RPITIT (native async fn in traits, Rust 2024 edition).
pub trait CharacterStore: Send + Sync {
    /// Load one character. `Ok(None)` means no definition exists for `id`.
    fn load(
        &self,
        id: &str,
    ) -> impl std::future::Future<Output = Result<Option<Character>, CharacterError>> + Send;

    /// Load every readable character definition.
    fn load_all(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<Character>, CharacterError>> + Send;
}

/// Cached character lookup with store fallback.
pub struct CharacterService<C: CharacterStore> {
    store: C,
    cache: Arc<DashMap<String, Character>>,
}

impl<C: CharacterStore> CharacterService<C> {
    pub fn new(store: C) -> Self {
        Self {
            store,
            cache: Arc::new(DashMap::new()),
        }
    }

    /// Populate the cache from every definition in the store.
    ///
    /// Invalid definitions are skipped with a warning. Returns how many
    /// characters were cached.
    pub async fn reload(&self) -> Result<usize, CharacterError> {
        let characters = self.store.load_all().await?;
        self.cache.clear();
        for character in characters {
            match character.validate() {
                Ok(()) => {
                    self.cache.insert(character.id.clone(), character);
                }
                Err(e) => {
                    warn!(character_id = %character.id, error = %e, "Skipping invalid character")
                }
            }
        }
        info!(count = self.cache.len(), "Characters loaded");
        Ok(self.cache.len())
    }

    /// Cached lookup only.
    pub fn get_character(&self, id: &str) -> Result<Character, CharacterError> {
        self.cache
            .get(id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| CharacterError::NotFound(id.to_string()))
    }

    /// Two-tier lookup: the cache first, then the store.
    ///
    /// A store hit is validated and cached. Store errors propagate as-is;
    /// only a definite miss becomes `NotFound`.
    pub async fn load_character(&self, id: &str) -> Result<Character, CharacterError> {
        if let Some(cached) = self.cache.get(id) {
            return Ok(cached.value().clone());
        }

        debug!(character_id = %id, "Character cache miss, reading store");
        let character = self
            .store
            .load(id)
            .await?
            .ok_or_else(|| CharacterError::NotFound(id.to_string()))?;
        character.validate()?;

        self.cache.insert(id.to_string(), character.clone());
        Ok(character)
    }

    /// Cached characters sorted by id.
    pub fn list_characters(&self) -> Vec<Character> {
        let mut characters: Vec<Character> =
            self.cache.iter().map(|entry| entry.value().clone()).collect();
        characters.sort_by(|a, b| a.id.cmp(&b.id));
        characters
    }

    /// Borrow the underlying store.
    pub fn store(&self) -> &C {
        &self.store
    }
}
