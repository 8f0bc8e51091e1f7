//! Long-term memory types for AITuber.
//!
//! A [`MemoryFragment`] is one embedded unit of long-term memory, partitioned
//! by owner (character) and author (user). Backends convert their native rows
//! into this single canonical shape at their boundary.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Flat string key/value annotations attached to a fragment.
pub type MemoryMetadata = BTreeMap<String, String>;

/// A stored memory with its embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryFragment {
    pub id: String,
    /// The character that owns this memory (retrieval partition key).
    pub owner_id: String,
    /// The user whose exchange produced this memory.
    pub author_id: String,
    pub text: String,
    /// Produced once at write time, regenerated only when `text` changes.
    pub embedding: Vec<f32>,
    #[serde(default)]
    pub metadata: MemoryMetadata,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A backend search hit: a fragment and its raw cosine distance to the query.
#[derive(Debug, Clone)]
pub struct FragmentCandidate {
    pub fragment: MemoryFragment,
    pub distance: f32,
}

/// A fragment returned by relevance retrieval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredFragment {
    pub fragment: MemoryFragment,
    /// Cosine similarity to the query (`1 - distance`), higher is closer.
    pub similarity: f32,
}

/// Flatten structured annotations into [`MemoryMetadata`].
///
/// Scalars become strings, nested objects become dotted keys (`a.b`),
/// arrays of scalars are comma-joined, and nulls are dropped.
pub fn flatten_metadata(value: &serde_json::Value) -> MemoryMetadata {
    let mut out = MemoryMetadata::new();
    if let serde_json::Value::Object(map) = value {
        for (key, v) in map {
            flatten_into(&mut out, key, v);
        }
    }
    out
}

fn flatten_into(out: &mut MemoryMetadata, key: &str, value: &serde_json::Value) {
    use serde_json::Value;

    match value {
        Value::Null => {}
        Value::String(s) => {
            out.insert(key.to_string(), s.clone());
        }
        Value::Bool(_) | Value::Number(_) => {
            out.insert(key.to_string(), value.to_string());
        }
        Value::Object(map) => {
            for (sub_key, sub) in map {
                flatten_into(out, &format!("{key}.{sub_key}"), sub);
            }
        }
        Value::Array(items) => {
            let joined = items
                .iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(s.clone()),
                    Value::Bool(_) | Value::Number(_) => Some(item.to_string()),
                    _ => None,
                })
                .collect::<Vec<_>>()
                .join(",");
            out.insert(key.to_string(), joined);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flatten_metadata_scalars_and_nesting() {
        let value = serde_json::json!({
            "source": "conversation",
            "turn": 3,
            "pinned": true,
            "skip": null,
            "emotion": { "label": "happy", "score": 0.5 },
            "tags": ["tea", "morning", 1],
        });

        let flat = flatten_metadata(&value);
        assert_eq!(flat["source"], "conversation");
        assert_eq!(flat["turn"], "3");
        assert_eq!(flat["pinned"], "true");
        assert_eq!(flat["emotion.label"], "happy");
        assert_eq!(flat["emotion.score"], "0.5");
        assert_eq!(flat["tags"], "tea,morning,1");
        assert!(!flat.contains_key("skip"));
    }

    #[test]
    fn test_flatten_metadata_non_object_is_empty() {
        assert!(flatten_metadata(&serde_json::json!("plain")).is_empty());
        assert!(flatten_metadata(&serde_json::Value::Null).is_empty());
    }

    #[test]
    fn test_fragment_serializes_metadata_map() {
        let now = Utc::now();
        let fragment = MemoryFragment {
            id: "m1".to_string(),
            owner_id: "hiyori".to_string(),
            author_id: "u1".to_string(),
            text: "User: hi\nAssistant: hello".to_string(),
            embedding: vec![0.1, 0.2],
            metadata: MemoryMetadata::from([("source".to_string(), "manual".to_string())]),
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_value(&fragment).unwrap();
        assert_eq!(json["metadata"]["source"], "manual");
        assert_eq!(json["owner_id"], "hiyori");
    }
}
