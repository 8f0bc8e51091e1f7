//! Interactive CLI chat with a character.
//!
//! Streams replies token by token, supports slash commands (including
//! `/summary`), and leaves memory write-back to the orchestrator. Entry point:
//! `loop_runner::run_chat_loop`.

pub mod banner;
pub mod commands;
pub mod input;
pub mod loop_runner;
pub mod renderer;
