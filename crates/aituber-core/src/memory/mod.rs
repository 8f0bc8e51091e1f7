//! Long-term memory for AITuber characters.
//!
//! Fragments of text are embedded, stored per owner (character), and
//! retrieved by cosine similarity to ground replies.
//!
//! - `FragmentStore` / `BoxFragmentStore`: persistence port and its boxed form
//! - `Embedder` / `BoxEmbedder`: text-to-vector port and its boxed form
//! - `MemoryService`: validation, embedding, and thresholded retrieval

pub mod box_embedder;
pub mod box_store;
pub mod embedder;
pub mod in_memory;
pub mod service;
pub mod similarity;
pub mod store;
