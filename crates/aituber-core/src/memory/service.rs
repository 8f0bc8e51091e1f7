//! Long-term memory service: embedding, persistence, and relevance retrieval.
//!
//! Write operations (`add`, `update`, `delete`) propagate typed errors.
//! Read operations degrade: a failing backend or embedder yields an empty
//! result and a warning, so a conversation can always proceed.

use chrono::Utc;
use tracing::{debug, warn};
use uuid::Uuid;

use aituber_types::error::MemoryError;
use aituber_types::memory::{MemoryFragment, MemoryMetadata, ScoredFragment};

use super::box_embedder::BoxEmbedder;
use super::similarity::compare_scored;
use super::store::FragmentStore;

/// Default page size for [`MemoryService::list`].
pub const DEFAULT_LIST_LIMIT: usize = 100;

/// Memory store over a [`FragmentStore`] and an embedder.
pub struct MemoryService<S: FragmentStore> {
    store: S,
    embedder: BoxEmbedder,
}

impl<S: FragmentStore> MemoryService<S> {
    pub fn new(store: S, embedder: BoxEmbedder) -> Self {
        Self { store, embedder }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn embedder(&self) -> &BoxEmbedder {
        &self.embedder
    }

    /// Embed `text` and enforce the embedder's advertised dimension.
    async fn embed_checked(&self, text: &str) -> Result<Vec<f32>, MemoryError> {
        let embedding = self
            .embedder
            .embed_one(text)
            .await
            .map_err(|e| MemoryError::Embedding(e.to_string()))?;

        let expected = self.embedder.dimension();
        if embedding.len() != expected {
            return Err(MemoryError::Validation(format!(
                "embedding dimension {} does not match model '{}' dimension {expected}",
                embedding.len(),
                self.embedder.model_name()
            )));
        }
        Ok(embedding)
    }

    /// Embed and persist a new fragment.
    ///
    /// The fragment is returned only after the store accepted it.
    pub async fn add(
        &self,
        owner_id: &str,
        author_id: &str,
        text: &str,
        metadata: Option<MemoryMetadata>,
    ) -> Result<MemoryFragment, MemoryError> {
        if owner_id.trim().is_empty() {
            return Err(MemoryError::Validation("owner_id must not be empty".to_string()));
        }
        if text.trim().is_empty() {
            return Err(MemoryError::Validation("memory text must not be empty".to_string()));
        }

        let embedding = self.embed_checked(text).await?;
        let now = Utc::now();
        let fragment = MemoryFragment {
            id: Uuid::now_v7().to_string(),
            owner_id: owner_id.to_string(),
            author_id: author_id.to_string(),
            text: text.to_string(),
            embedding,
            metadata: metadata.unwrap_or_default(),
            created_at: now,
            updated_at: now,
        };

        self.store
            .insert(&fragment)
            .await
            .map_err(|e| MemoryError::Write(e.to_string()))?;

        debug!(memory_id = %fragment.id, owner_id = %owner_id, "Memory fragment stored");
        Ok(fragment)
    }

    /// Fetch one fragment. Backend failures are logged and read as absent.
    pub async fn get(&self, id: &str) -> Option<MemoryFragment> {
        match self.store.get(id).await {
            Ok(found) => found,
            Err(e) => {
                warn!(memory_id = %id, error = %e, "Memory lookup failed");
                None
            }
        }
    }

    /// An owner's fragments in creation order. Failures read as empty.
    pub async fn list(
        &self,
        owner_id: &str,
        limit: Option<usize>,
        offset: Option<usize>,
    ) -> Vec<MemoryFragment> {
        self.list_scoped(owner_id, None, limit, offset).await
    }

    /// Like [`Self::list`], restricted to fragments written for one user.
    pub async fn list_for_author(
        &self,
        owner_id: &str,
        author_id: &str,
        limit: Option<usize>,
        offset: Option<usize>,
    ) -> Vec<MemoryFragment> {
        self.list_scoped(owner_id, Some(author_id), limit, offset).await
    }

    async fn list_scoped(
        &self,
        owner_id: &str,
        author_id: Option<&str>,
        limit: Option<usize>,
        offset: Option<usize>,
    ) -> Vec<MemoryFragment> {
        let limit = limit.unwrap_or(DEFAULT_LIST_LIMIT);
        let offset = offset.unwrap_or(0);
        match self.store.list(owner_id, author_id, limit, offset).await {
            Ok(rows) => rows,
            Err(e) => {
                warn!(owner_id = %owner_id, error = %e, "Memory listing failed");
                Vec::new()
            }
        }
    }

    /// Top `limit` fragments for `owner_id` whose cosine similarity to
    /// `query_text` is at least `similarity_threshold`, most similar first.
    ///
    /// Equal similarities are ordered most recent first. Fragments whose
    /// embedding dimension differs from the query's are logged and excluded.
    /// Never fails: any embedding or backend error yields an empty result.
    #[tracing::instrument(
        name = "memory.retrieve",
        skip(self, query_text),
        fields(result_count = tracing::field::Empty)
    )]
    pub async fn retrieve_relevant(
        &self,
        owner_id: &str,
        query_text: &str,
        limit: usize,
        similarity_threshold: f32,
    ) -> Vec<ScoredFragment> {
        if limit == 0 || query_text.trim().is_empty() {
            return Vec::new();
        }

        let query = match self.embed_checked(query_text).await {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "Query embedding failed, continuing without memories");
                return Vec::new();
            }
        };

        let candidates = match self.store.search(owner_id, &query, limit).await {
            Ok(c) => c,
            Err(e) => {
                warn!(error = %e, "Memory search failed, continuing without memories");
                return Vec::new();
            }
        };

        let mut scored: Vec<ScoredFragment> = candidates
            .into_iter()
            .filter(|c| {
                let matches = c.fragment.embedding.len() == query.len();
                if !matches {
                    warn!(
                        memory_id = %c.fragment.id,
                        stored = c.fragment.embedding.len(),
                        query = query.len(),
                        "Dropping memory with mismatched embedding dimension"
                    );
                }
                matches
            })
            .map(|c| ScoredFragment {
                similarity: 1.0 - c.distance,
                fragment: c.fragment,
            })
            .filter(|s| s.similarity >= similarity_threshold)
            .collect();
        scored.sort_by(compare_scored);
        scored.truncate(limit);

        tracing::Span::current().record("result_count", scored.len());
        scored
    }

    /// Change a fragment's text and/or metadata.
    ///
    /// New text is re-embedded; identical text and metadata-only updates keep
    /// the stored embedding. Metadata keys are merged into the existing bag.
    pub async fn update(
        &self,
        id: &str,
        text: Option<&str>,
        metadata: Option<MemoryMetadata>,
    ) -> Result<MemoryFragment, MemoryError> {
        let mut fragment = self
            .store
            .get(id)
            .await
            .map_err(|e| MemoryError::Write(e.to_string()))?
            .ok_or_else(|| MemoryError::NotFound(id.to_string()))?;

        if let Some(text) = text {
            if text.trim().is_empty() {
                return Err(MemoryError::Validation("memory text must not be empty".to_string()));
            }
            if text != fragment.text {
                fragment.embedding = self.embed_checked(text).await?;
                fragment.text = text.to_string();
            }
        }
        if let Some(metadata) = metadata {
            fragment.metadata.extend(metadata);
        }
        fragment.updated_at = Utc::now();

        let updated = self
            .store
            .update(&fragment)
            .await
            .map_err(|e| MemoryError::Write(e.to_string()))?;
        if !updated {
            return Err(MemoryError::NotFound(id.to_string()));
        }
        Ok(fragment)
    }

    /// Remove a fragment. `Ok(false)` when it did not exist.
    pub async fn delete(&self, id: &str) -> Result<bool, MemoryError> {
        self.store
            .delete(id)
            .await
            .map_err(|e| MemoryError::Write(e.to_string()))
    }

    /// Remove every fragment for an owner.
    pub async fn delete_all(&self, owner_id: &str) -> Result<u64, MemoryError> {
        self.delete_scoped(owner_id, None).await
    }

    /// Remove an owner's fragments written for one user, keeping the rest.
    pub async fn delete_for_author(
        &self,
        owner_id: &str,
        author_id: &str,
    ) -> Result<u64, MemoryError> {
        self.delete_scoped(owner_id, Some(author_id)).await
    }

    async fn delete_scoped(
        &self,
        owner_id: &str,
        author_id: Option<&str>,
    ) -> Result<u64, MemoryError> {
        let removed = self
            .store
            .delete_all(owner_id, author_id)
            .await
            .map_err(|e| MemoryError::Write(e.to_string()))?;
        debug!(owner_id = %owner_id, author_id = ?author_id, removed, "Memories cleared");
        Ok(removed)
    }

    /// Number of fragments an owner has. Failures read as zero.
    pub async fn count(&self, owner_id: &str) -> u64 {
        self.count_scoped(owner_id, None).await
    }

    /// Number of an owner's fragments written for one user.
    pub async fn count_for_author(&self, owner_id: &str, author_id: &str) -> u64 {
        self.count_scoped(owner_id, Some(author_id)).await
    }

    async fn count_scoped(&self, owner_id: &str, author_id: Option<&str>) -> u64 {
        match self.store.count(owner_id, author_id).await {
            Ok(n) => n,
            Err(e) => {
                warn!(owner_id = %owner_id, error = %e, "Memory count failed");
                0
            }
        }
    }
}
