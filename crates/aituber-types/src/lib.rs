//! Shared domain types for AITuber.
//!
//! This crate contains the core domain types used across the workspace:
//! conversation turns and contexts, memory fragments, characters,
//! LLM request/response shapes, configuration, and their error types.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod character;
pub mod chat;
pub mod config;
pub mod error;
pub mod llm;
pub mod memory;
