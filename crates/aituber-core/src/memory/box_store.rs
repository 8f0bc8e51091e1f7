//! BoxFragmentStore -- object-safe dynamic dispatch wrapper for FragmentStore.
//!
//! Lets the binary pick SQLite or the in-process store at startup while the
//! services stay generic. `BoxFragmentStore` itself implements
//! `FragmentStore`, so it slots into `MemoryService<S>` directly.

use std::future::Future;
use std::pin::Pin;

use aituber_types::error::RepositoryError;
use aituber_types::memory::{FragmentCandidate, MemoryFragment};

use super::store::FragmentStore;

type BoxFut<'a, T> = Pin<Box<dyn Future<Output = Result<T, RepositoryError>> + Send + 'a>>;

/// Object-safe version of [`FragmentStore`] with boxed futures.
pub trait FragmentStoreDyn: Send + Sync {
    fn insert_boxed<'a>(&'a self, fragment: &'a MemoryFragment) -> BoxFut<'a, ()>;

    fn get_boxed<'a>(&'a self, id: &'a str) -> BoxFut<'a, Option<MemoryFragment>>;

    fn list_boxed<'a>(
        &'a self,
        owner_id: &'a str,
        author_id: Option<&'a str>,
        limit: usize,
        offset: usize,
    ) -> BoxFut<'a, Vec<MemoryFragment>>;

    fn update_boxed<'a>(&'a self, fragment: &'a MemoryFragment) -> BoxFut<'a, bool>;

    fn delete_boxed<'a>(&'a self, id: &'a str) -> BoxFut<'a, bool>;

    fn delete_all_boxed<'a>(
        &'a self,
        owner_id: &'a str,
        author_id: Option<&'a str>,
    ) -> BoxFut<'a, u64>;

    fn count_boxed<'a>(&'a self, owner_id: &'a str, author_id: Option<&'a str>) -> BoxFut<'a, u64>;

    fn search_boxed<'a>(
        &'a self,
        owner_id: &'a str,
        query_embedding: &'a [f32],
        limit: usize,
    ) -> BoxFut<'a, Vec<FragmentCandidate>>;
}

impl<T: FragmentStore> FragmentStoreDyn for T {
    fn insert_boxed<'a>(&'a self, fragment: &'a MemoryFragment) -> BoxFut<'a, ()> {
        Box::pin(self.insert(fragment))
    }

    fn get_boxed<'a>(&'a self, id: &'a str) -> BoxFut<'a, Option<MemoryFragment>> {
        Box::pin(self.get(id))
    }

    fn list_boxed<'a>(
        &'a self,
        owner_id: &'a str,
        author_id: Option<&'a str>,
        limit: usize,
        offset: usize,
    ) -> BoxFut<'a, Vec<MemoryFragment>> {
        Box::pin(self.list(owner_id, author_id, limit, offset))
    }

    fn update_boxed<'a>(&'a self, fragment: &'a MemoryFragment) -> BoxFut<'a, bool> {
        Box::pin(self.update(fragment))
    }

    fn delete_boxed<'a>(&'a self, id: &'a str) -> BoxFut<'a, bool> {
        Box::pin(self.delete(id))
    }

    fn delete_all_boxed<'a>(
        &'a self,
        owner_id: &'a str,
        author_id: Option<&'a str>,
    ) -> BoxFut<'a, u64> {
        Box::pin(self.delete_all(owner_id, author_id))
    }

    fn count_boxed<'a>(&'a self, owner_id: &'a str, author_id: Option<&'a str>) -> BoxFut<'a, u64> {
        Box::pin(self.count(owner_id, author_id))
    }

    fn search_boxed<'a>(
        &'a self,
        owner_id: &'a str,
        query_embedding: &'a [f32],
        limit: usize,
    ) -> BoxFut<'a, Vec<FragmentCandidate>> {
        Box::pin(self.search(owner_id, query_embedding, limit))
    }
}

/// Type-erased fragment store for runtime backend selection.
pub struct BoxFragmentStore {
    inner: Box<dyn FragmentStoreDyn + Send + Sync>,
}

impl BoxFragmentStore {
    /// Wrap a concrete `FragmentStore` in a type-erased box.
    pub fn new<T: FragmentStore + 'static>(store: T) -> Self {
        Self {
            inner: Box::new(store),
        }
    }
}

impl FragmentStore for BoxFragmentStore {
    async fn insert(&self, fragment: &MemoryFragment) -> Result<(), RepositoryError> {
        self.inner.insert_boxed(fragment).await
    }

    async fn get(&self, id: &str) -> Result<Option<MemoryFragment>, RepositoryError> {
        self.inner.get_boxed(id).await
    }

    async fn list(
        &self,
        owner_id: &str,
        author_id: Option<&str>,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<MemoryFragment>, RepositoryError> {
        self.inner.list_boxed(owner_id, author_id, limit, offset).await
    }

    async fn update(&self, fragment: &MemoryFragment) -> Result<bool, RepositoryError> {
        self.inner.update_boxed(fragment).await
    }

    async fn delete(&self, id: &str) -> Result<bool, RepositoryError> {
        self.inner.delete_boxed(id).await
    }

    async fn delete_all(
        &self,
        owner_id: &str,
        author_id: Option<&str>,
    ) -> Result<u64, RepositoryError> {
        self.inner.delete_all_boxed(owner_id, author_id).await
    }

    async fn count(&self, owner_id: &str, author_id: Option<&str>) -> Result<u64, RepositoryError> {
        self.inner.count_boxed(owner_id, author_id).await
    }

    async fn search(
        &self,
        owner_id: &str,
        query_embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<FragmentCandidate>, RepositoryError> {
        self.inner.search_boxed(owner_id, query_embedding, limit).await
    }
}
