//! Process-local fragment store backed by a `DashMap`.
//!
//! Used for ephemeral sessions (`memory.database = ":memory:"`) and as the
//! store under test. Search is an exact cosine scan over the owner's rows
//! whose embedding has the query's dimension.
//! Values are cloned out of the map; no guard outlives a method call.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::warn;

use aituber_types::error::RepositoryError;
use aituber_types::memory::{FragmentCandidate, MemoryFragment};

use super::similarity::{compare_candidates, cosine_distance};
use super::store::FragmentStore;

/// In-process [`FragmentStore`]. Cloning shares the same underlying map.
#[derive(Clone, Default)]
pub struct InMemoryFragmentStore {
    fragments: Arc<DashMap<String, MemoryFragment>>,
}

impl InMemoryFragmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn in_scope(&self, owner_id: &str, author_id: Option<&str>) -> Vec<MemoryFragment> {
        self.fragments
            .iter()
            .filter(|entry| in_scope(entry.value(), owner_id, author_id))
            .map(|entry| entry.value().clone())
            .collect()
    }
}

fn in_scope(fragment: &MemoryFragment, owner_id: &str, author_id: Option<&str>) -> bool {
    fragment.owner_id == owner_id && author_id.is_none_or(|a| fragment.author_id == a)
}

impl FragmentStore for InMemoryFragmentStore {
    async fn insert(&self, fragment: &MemoryFragment) -> Result<(), RepositoryError> {
        if self.fragments.contains_key(&fragment.id) {
            return Err(RepositoryError::Conflict(format!(
                "fragment '{}' already exists",
                fragment.id
            )));
        }
        self.fragments.insert(fragment.id.clone(), fragment.clone());
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<MemoryFragment>, RepositoryError> {
        Ok(self.fragments.get(id).map(|entry| entry.value().clone()))
    }

    async fn list(
        &self,
        owner_id: &str,
        author_id: Option<&str>,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<MemoryFragment>, RepositoryError> {
        let mut rows = self.in_scope(owner_id, author_id);
        rows.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(rows.into_iter().skip(offset).take(limit).collect())
    }

    async fn update(&self, fragment: &MemoryFragment) -> Result<bool, RepositoryError> {
        match self.fragments.get_mut(&fragment.id) {
            Some(mut existing) => {
                let existing = existing.value_mut();
                existing.text = fragment.text.clone();
                existing.embedding = fragment.embedding.clone();
                existing.metadata = fragment.metadata.clone();
                existing.updated_at = fragment.updated_at;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: &str) -> Result<bool, RepositoryError> {
        Ok(self.fragments.remove(id).is_some())
    }

    async fn delete_all(
        &self,
        owner_id: &str,
        author_id: Option<&str>,
    ) -> Result<u64, RepositoryError> {
        let before = self.fragments.len();
        self.fragments.retain(|_, f| !in_scope(f, owner_id, author_id));
        Ok((before - self.fragments.len()) as u64)
    }

    async fn count(&self, owner_id: &str, author_id: Option<&str>) -> Result<u64, RepositoryError> {
        Ok(self
            .fragments
            .iter()
            .filter(|entry| in_scope(entry.value(), owner_id, author_id))
            .count() as u64)
    }

    async fn search(
        &self,
        owner_id: &str,
        query_embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<FragmentCandidate>, RepositoryError> {
        let mut candidates: Vec<FragmentCandidate> = self
            .in_scope(owner_id, None)
            .into_iter()
            .filter(|fragment| {
                let matches = fragment.embedding.len() == query_embedding.len();
                if !matches {
                    warn!(
                        memory_id = %fragment.id,
                        stored = fragment.embedding.len(),
                        query = query_embedding.len(),
                        "Skipping memory fragment with mismatched embedding dimension"
                    );
                }
                matches
            })
            .map(|fragment| {
                let distance = cosine_distance(&fragment.embedding, query_embedding);
                FragmentCandidate { fragment, distance }
            })
            .collect();
        candidates.sort_by(compare_candidates);
        candidates.truncate(limit);
        Ok(candidates)
    }
}
