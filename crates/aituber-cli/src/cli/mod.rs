//! CLI command definitions and dispatch for the `aituber` binary.
//!
//! Uses clap derive macros for argument parsing. Resource commands follow a
//! noun-verb pattern (e.g., `aituber memory search hiyori "tea"`).

pub mod ask;
pub mod character;
pub mod chat;
pub mod config;
pub mod memory;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

/// Talk to AI streamer characters with long-term memory.
#[derive(Parser)]
#[command(name = "aituber", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start an interactive, streaming chat with a character.
    Chat {
        /// Character id (defaults to `default_character` from config).
        character: Option<String>,

        /// Who is talking; memories are attributed to this user.
        #[arg(long, short, default_value = "cli-user")]
        user: String,
    },

    /// Send one message and print the reply.
    Ask {
        /// The message to send.
        message: String,

        /// Character id (defaults to `default_character` from config).
        #[arg(long, short)]
        character: Option<String>,

        /// Who is asking.
        #[arg(long, short, default_value = "cli-user")]
        user: String,

        /// Wait for the full reply instead of streaming tokens.
        #[arg(long)]
        no_stream: bool,
    },

    /// Inspect and edit a character's long-term memory.
    Memory {
        #[command(subcommand)]
        action: memory::MemoryCommand,
    },

    /// List and inspect character definitions.
    Character {
        #[command(subcommand)]
        action: character::CharacterCommand,
    },

    /// Show or validate configuration.
    Config {
        #[command(subcommand)]
        action: config::ConfigCommand,
    },

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

/// Log filter for the verbosity flags, or `None` to defer to config.
pub fn verbosity_filter(verbose: u8, quiet: bool) -> Option<&'static str> {
    match verbose {
        0 if quiet => Some("error"),
        0 => None,
        1 => Some("info,aituber=debug"),
        _ => Some("trace"),
    }
}
