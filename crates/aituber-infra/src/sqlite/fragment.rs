//! SQLite memory fragment store.
//!
//! Implements `FragmentStore` from `aituber-core`. Text, embedding and
//! metadata live in one row, so a fragment is written or removed as a unit.
//! Similarity search is an exact cosine scan over the owner's rows.

use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::Row;
use tracing::warn;

use aituber_core::memory::similarity::{compare_candidates, cosine_distance};
use aituber_core::memory::store::FragmentStore;
use aituber_types::error::RepositoryError;
use aituber_types::memory::{FragmentCandidate, MemoryFragment, MemoryMetadata};

use super::pool::DatabasePool;

/// SQLite-backed implementation of `FragmentStore`.
#[derive(Clone)]
pub struct SqliteFragmentStore {
    pool: DatabasePool,
}

impl SqliteFragmentStore {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DatabasePool {
        &self.pool
    }
}

// ---------------------------------------------------------------------------
// Private Row type for SQLite-to-domain mapping
// ---------------------------------------------------------------------------

struct FragmentRow {
    id: String,
    owner_id: String,
    author_id: String,
    text: String,
    embedding: Vec<u8>,
    dimension: i64,
    metadata: String,
    created_at: String,
    updated_at: String,
}

impl FragmentRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            owner_id: row.try_get("owner_id")?,
            author_id: row.try_get("author_id")?,
            text: row.try_get("text")?,
            embedding: row.try_get("embedding")?,
            dimension: row.try_get("dimension")?,
            metadata: row.try_get("metadata")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn into_fragment(self) -> Result<MemoryFragment, RepositoryError> {
        let embedding = decode_embedding(&self.embedding)?;
        if embedding.len() as i64 != self.dimension {
            return Err(RepositoryError::Corrupt(format!(
                "fragment {}: stored dimension {} but embedding has {} values",
                self.id,
                self.dimension,
                embedding.len()
            )));
        }
        let metadata: MemoryMetadata = serde_json::from_str(&self.metadata).map_err(|e| {
            RepositoryError::Corrupt(format!("fragment {}: invalid metadata: {e}", self.id))
        })?;

        Ok(MemoryFragment {
            created_at: parse_datetime(&self.created_at)?,
            updated_at: parse_datetime(&self.updated_at)?,
            id: self.id,
            owner_id: self.owner_id,
            author_id: self.author_id,
            text: self.text,
            embedding,
            metadata,
        })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn encode_embedding(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn decode_embedding(bytes: &[u8]) -> Result<Vec<f32>, RepositoryError> {
    if bytes.len() % 4 != 0 {
        return Err(RepositoryError::Corrupt(format!(
            "embedding blob length {} is not a multiple of 4",
            bytes.len()
        )));
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Corrupt(format!("invalid datetime: {e}")))
}

/// Fixed-width so that `ORDER BY created_at` sorts chronologically.
fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn encode_metadata(metadata: &MemoryMetadata) -> Result<String, RepositoryError> {
    serde_json::to_string(metadata).map_err(|e| RepositoryError::Query(e.to_string()))
}

fn query_error(e: sqlx::Error) -> RepositoryError {
    RepositoryError::Query(e.to_string())
}

fn rows_to_fragments(
    rows: &[sqlx::sqlite::SqliteRow],
) -> Result<Vec<MemoryFragment>, RepositoryError> {
    rows.iter()
        .map(|row| FragmentRow::from_row(row).map_err(query_error)?.into_fragment())
        .collect()
}

// ---------------------------------------------------------------------------
// FragmentStore implementation
// ---------------------------------------------------------------------------

impl FragmentStore for SqliteFragmentStore {
    async fn insert(&self, fragment: &MemoryFragment) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"INSERT INTO memory_fragments
                   (id, owner_id, author_id, text, embedding, dimension, metadata,
                    created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(&fragment.id)
        .bind(&fragment.owner_id)
        .bind(&fragment.author_id)
        .bind(&fragment.text)
        .bind(encode_embedding(&fragment.embedding))
        .bind(fragment.embedding.len() as i64)
        .bind(encode_metadata(&fragment.metadata)?)
        .bind(format_datetime(&fragment.created_at))
        .bind(format_datetime(&fragment.updated_at))
        .execute(&self.pool.writer)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                RepositoryError::Conflict(format!("fragment '{}' already exists", fragment.id))
            }
            other => query_error(other),
        })?;

        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<MemoryFragment>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM memory_fragments WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(query_error)?;

        match row {
            Some(row) => Ok(Some(
                FragmentRow::from_row(&row).map_err(query_error)?.into_fragment()?,
            )),
            None => Ok(None),
        }
    }

    async fn list(
        &self,
        owner_id: &str,
        author_id: Option<&str>,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<MemoryFragment>, RepositoryError> {
        let rows = sqlx::query(
            r#"SELECT * FROM memory_fragments
               WHERE owner_id = ? AND (? IS NULL OR author_id = ?)
               ORDER BY created_at ASC, id ASC
               LIMIT ? OFFSET ?"#,
        )
        .bind(owner_id)
        .bind(author_id)
        .bind(author_id)
        .bind(limit as i64)
        .bind(offset as i64)
        .fetch_all(&self.pool.reader)
        .await
        .map_err(query_error)?;

        rows_to_fragments(&rows)
    }

    async fn update(&self, fragment: &MemoryFragment) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r#"UPDATE memory_fragments
               SET text = ?, embedding = ?, dimension = ?, metadata = ?, updated_at = ?
               WHERE id = ?"#,
        )
        .bind(&fragment.text)
        .bind(encode_embedding(&fragment.embedding))
        .bind(fragment.embedding.len() as i64)
        .bind(encode_metadata(&fragment.metadata)?)
        .bind(format_datetime(&fragment.updated_at))
        .bind(&fragment.id)
        .execute(&self.pool.writer)
        .await
        .map_err(query_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, id: &str) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM memory_fragments WHERE id = ?")
            .bind(id)
            .execute(&self.pool.writer)
            .await
            .map_err(query_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_all(
        &self,
        owner_id: &str,
        author_id: Option<&str>,
    ) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            "DELETE FROM memory_fragments WHERE owner_id = ? AND (? IS NULL OR author_id = ?)",
        )
        .bind(owner_id)
        .bind(author_id)
        .bind(author_id)
        .execute(&self.pool.writer)
        .await
        .map_err(query_error)?;

        Ok(result.rows_affected())
    }

    async fn count(&self, owner_id: &str, author_id: Option<&str>) -> Result<u64, RepositoryError> {
        let (count,): (i64,) = sqlx::query_as(
            r#"SELECT COUNT(*) FROM memory_fragments
               WHERE owner_id = ? AND (? IS NULL OR author_id = ?)"#,
        )
        .bind(owner_id)
        .bind(author_id)
        .bind(author_id)
        .fetch_one(&self.pool.reader)
        .await
        .map_err(query_error)?;

        Ok(count as u64)
    }

    async fn search(
        &self,
        owner_id: &str,
        query_embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<FragmentCandidate>, RepositoryError> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let rows =
            sqlx::query("SELECT * FROM memory_fragments WHERE owner_id = ? AND dimension = ?")
                .bind(owner_id)
                .bind(query_embedding.len() as i64)
                .fetch_all(&self.pool.reader)
                .await
                .map_err(query_error)?;

        let mut candidates = Vec::with_capacity(rows.len());
        for row in &rows {
            let decoded = FragmentRow::from_row(row)
                .map_err(query_error)
                .and_then(FragmentRow::into_fragment);
            match decoded {
                Ok(fragment) => {
                    let distance = cosine_distance(&fragment.embedding, query_embedding);
                    candidates.push(FragmentCandidate { fragment, distance });
                }
                Err(e) => {
                    warn!(owner_id = %owner_id, error = %e, "Skipping unreadable memory fragment")
                }
            }
        }

        candidates.sort_by(compare_candidates);
        candidates.truncate(limit);
        Ok(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite::pool::database_url;
    use chrono::Duration;
    use tempfile::TempDir;

    async fn test_store() -> (SqliteFragmentStore, TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let pool = DatabasePool::new(&database_url(&dir.path().join("memory.db")))
            .await
            .unwrap();
        (SqliteFragmentStore::new(pool), dir)
    }

    fn fragment(id: &str, owner: &str, embedding: Vec<f32>, age_secs: i64) -> MemoryFragment {
        let at = Utc::now() - Duration::seconds(age_secs);
        MemoryFragment {
            id: id.to_string(),
            owner_id: owner.to_string(),
            author_id: "u1".to_string(),
            text: format!("text {id}"),
            embedding,
            metadata: MemoryMetadata::from([("source".to_string(), "test".to_string())]),
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn test_embedding_blob_layout() {
        let bytes = encode_embedding(&[1.0, -0.5]);
        assert_eq!(bytes.len(), 8);
        assert_eq!(&bytes[..4], &1.0f32.to_le_bytes());
        assert_eq!(decode_embedding(&bytes).unwrap(), vec![1.0, -0.5]);
        assert!(decode_embedding(&[0, 1, 2]).is_err());
    }

    #[test]
    fn test_datetime_format_is_fixed_width() {
        let a = format_datetime(&"2025-01-01T00:00:00Z".parse().unwrap());
        let b = format_datetime(&"2025-01-01T00:00:00.5Z".parse().unwrap());
        assert_eq!(a.len(), b.len());
        assert!(a < b);
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let (store, _dir) = test_store().await;
        let f = fragment("a", "c1", vec![0.25, 0.5, 1.0], 0);
        store.insert(&f).await.unwrap();

        let loaded = store.get("a").await.unwrap().unwrap();
        assert_eq!(loaded.text, f.text);
        assert_eq!(loaded.embedding, f.embedding);
        assert_eq!(loaded.metadata["source"], "test");
        assert_eq!(loaded.created_at.timestamp_micros(), f.created_at.timestamp_micros());
        assert!(store.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_insert_is_conflict() {
        let (store, _dir) = test_store().await;
        let f = fragment("a", "c1", vec![1.0], 0);
        store.insert(&f).await.unwrap();
        assert!(matches!(store.insert(&f).await, Err(RepositoryError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_list_pagination_in_creation_order() {
        let (store, _dir) = test_store().await;
        store.insert(&fragment("new", "c1", vec![1.0], 0)).await.unwrap();
        store.insert(&fragment("old", "c1", vec![1.0], 30)).await.unwrap();
        store.insert(&fragment("mid", "c1", vec![1.0], 10)).await.unwrap();
        store.insert(&fragment("else", "c2", vec![1.0], 20)).await.unwrap();

        let ids: Vec<String> = store
            .list("c1", None, 10, 0)
            .await
            .unwrap()
            .into_iter()
            .map(|f| f.id)
            .collect();
        assert_eq!(ids, vec!["old", "mid", "new"]);

        let page = store.list("c1", None, 2, 1).await.unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].id, "mid");
        assert_eq!(store.count("c1", None).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_search_orders_by_distance_and_scopes_owner() {
        let (store, _dir) = test_store().await;
        store.insert(&fragment("near", "c1", vec![1.0, 0.1], 0)).await.unwrap();
        store.insert(&fragment("far", "c1", vec![0.0, 1.0], 0)).await.unwrap();
        store.insert(&fragment("foreign", "c2", vec![1.0, 0.0], 0)).await.unwrap();
        store.insert(&fragment("wrong-dim", "c1", vec![1.0, 0.0, 0.0], 0)).await.unwrap();

        let hits = store.search("c1", &[1.0, 0.0], 10).await.unwrap();
        let ids: Vec<&str> = hits.iter().map(|h| h.fragment.id.as_str()).collect();
        assert_eq!(ids, vec!["near", "far"]);
        assert!(hits[0].distance < hits[1].distance);

        assert_eq!(store.search("c1", &[1.0, 0.0], 1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_search_tie_prefers_most_recent() {
        let (store, _dir) = test_store().await;
        store.insert(&fragment("older", "c1", vec![1.0, 0.0], 60)).await.unwrap();
        store.insert(&fragment("newer", "c1", vec![1.0, 0.0], 0)).await.unwrap();

        let hits = store.search("c1", &[1.0, 0.0], 10).await.unwrap();
        assert_eq!(hits[0].fragment.id, "newer");
        assert_eq!(hits[1].fragment.id, "older");
    }

    #[tokio::test]
    async fn test_update_delete_and_delete_all() {
        let (store, _dir) = test_store().await;
        let mut f = fragment("a", "c1", vec![1.0, 0.0], 0);
        store.insert(&f).await.unwrap();
        store.insert(&fragment("b", "c1", vec![1.0, 0.0], 0)).await.unwrap();

        f.text = "changed".to_string();
        f.embedding = vec![0.0, 1.0];
        assert!(store.update(&f).await.unwrap());
        let loaded = store.get("a").await.unwrap().unwrap();
        assert_eq!(loaded.text, "changed");
        assert_eq!(loaded.embedding, vec![0.0, 1.0]);

        assert!(!store.update(&fragment("zzz", "c1", vec![1.0], 0)).await.unwrap());

        assert!(store.delete("a").await.unwrap());
        assert!(!store.delete("a").await.unwrap());
        assert_eq!(store.delete_all("c1", None).await.unwrap(), 1);
        assert_eq!(store.count("c1", None).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_author_scoped_list_count_and_delete() {
        let (store, _dir) = test_store().await;
        let mut from_ken = fragment("k1", "c1", vec![1.0], 20);
        from_ken.author_id = "ken".to_string();
        store.insert(&from_ken).await.unwrap();
        store.insert(&fragment("a", "c1", vec![1.0], 10)).await.unwrap();
        store.insert(&fragment("b", "c1", vec![1.0], 0)).await.unwrap();

        let ken = store.list("c1", Some("ken"), 10, 0).await.unwrap();
        assert_eq!(ken.len(), 1);
        assert_eq!(ken[0].id, "k1");
        assert_eq!(store.count("c1", Some("u1")).await.unwrap(), 2);
        assert_eq!(store.count("c1", None).await.unwrap(), 3);

        assert_eq!(store.delete_all("c1", Some("u1")).await.unwrap(), 2);
        let left = store.list("c1", None, 10, 0).await.unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].author_id, "ken");
    }

    #[tokio::test]
    async fn test_corrupt_rows_are_skipped_by_search() {
        let (store, _dir) = test_store().await;
        store.insert(&fragment("good", "c1", vec![1.0, 0.0], 0)).await.unwrap();
        sqlx::query(
            r#"INSERT INTO memory_fragments
                   (id, owner_id, author_id, text, embedding, dimension, metadata,
                    created_at, updated_at)
               VALUES ('bad', 'c1', 'u1', 'x', x'00000000', 2, 'not json',
                       '2025-01-01T00:00:00.000000Z', '2025-01-01T00:00:00.000000Z')"#,
        )
        .execute(&store.pool().writer)
        .await
        .unwrap();

        let hits = store.search("c1", &[1.0, 0.0], 10).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].fragment.id, "good");
        assert!(matches!(store.get("bad").await, Err(RepositoryError::Corrupt(_))));
    }
}
