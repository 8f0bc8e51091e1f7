//! Fragment persistence trait.
//!
//! Defines the storage contract behind [`super::service::MemoryService`].
//! The SQLite implementation lives in aituber-infra; [`super::in_memory`]
//! is the process-local one.

use aituber_types::error::RepositoryError;
use aituber_types::memory::{FragmentCandidate, MemoryFragment};

/// Vector-capable persistence for memory fragments.
///
/// `list`, `delete_all` and `count` are scoped to an owner and, when
/// `author_id` is `Some`, further to that author's fragments.
///
/// Uses RPITIT (native async fn in traits, Rust 2024 edition).
pub trait FragmentStore: Send + Sync {
    /// Persist a new fragment (text, embedding, metadata) as one unit.
    fn insert(
        &self,
        fragment: &MemoryFragment,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Fetch a fragment by id.
    fn get(
        &self,
        id: &str,
    ) -> impl std::future::Future<Output = Result<Option<MemoryFragment>, RepositoryError>> + Send;

    /// List an owner's fragments in creation order (`created_at`, then `id`).
    fn list(
        &self,
        owner_id: &str,
        author_id: Option<&str>,
        limit: usize,
        offset: usize,
    ) -> impl std::future::Future<Output = Result<Vec<MemoryFragment>, RepositoryError>> + Send;

    /// Overwrite text, embedding, metadata and `updated_at` of an existing
    /// fragment. Returns `false` when the id does not exist.
    fn update(
        &self,
        fragment: &MemoryFragment,
    ) -> impl std::future::Future<Output = Result<bool, RepositoryError>> + Send;

    /// Remove a fragment and its vector. Returns whether a row was removed.
    fn delete(
        &self,
        id: &str,
    ) -> impl std::future::Future<Output = Result<bool, RepositoryError>> + Send;

    /// Remove every fragment in scope. Returns the number removed.
    fn delete_all(
        &self,
        owner_id: &str,
        author_id: Option<&str>,
    ) -> impl std::future::Future<Output = Result<u64, RepositoryError>> + Send;

    /// Count the fragments in scope.
    fn count(
        &self,
        owner_id: &str,
        author_id: Option<&str>,
    ) -> impl std::future::Future<Output = Result<u64, RepositoryError>> + Send;

    /// Nearest neighbours of `query_embedding` within an owner's fragments,
    /// at most `limit`, ordered by [`super::similarity::compare_candidates`].
    fn search(
        &self,
        owner_id: &str,
        query_embedding: &[f32],
        limit: usize,
    ) -> impl std::future::Future<Output = Result<Vec<FragmentCandidate>, RepositoryError>> + Send;
}
