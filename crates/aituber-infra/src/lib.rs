//! Infrastructure layer for AITuber.
//!
//! Contains implementations of the ports defined in `aituber-core`:
//! SQLite fragment storage, YAML/JSON character files, the OpenAI-compatible
//! chat provider and embeddings client, plus configuration loading.

pub mod config;
pub mod filesystem;
pub mod llm;
pub mod sqlite;
