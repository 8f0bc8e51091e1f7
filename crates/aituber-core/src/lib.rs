//! Business logic and port traits for AITuber.
//!
//! This crate defines the "ports" (`FragmentStore`, `Embedder`,
//! `LlmProvider`, `CharacterStore`) that the infrastructure layer
//! implements. It depends only on `aituber-types` -- never on
//! `aituber-infra` or any database/IO crate.

pub mod agent;
pub mod character;
pub mod chat;
pub mod llm;
pub mod memory;

#[cfg(test)]
mod testing;
