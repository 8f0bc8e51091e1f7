//! Chat-completion backend abstraction: the [`provider::LlmProvider`] trait
//! and its type-erased [`box_provider::BoxLlmProvider`].

pub mod box_provider;
pub mod provider;
