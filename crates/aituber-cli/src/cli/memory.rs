//! Memory management CLI commands: list, add, search, delete, clear.
//!
//! `list` and `clear` take `--user` to scope to memories written for one user.
//!
//! A character's memories are the fragments it owns; `search` runs the same
//! thresholded similarity retrieval the conversation pipeline uses.

use anyhow::{Context, Result};
use clap::Subcommand;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;
use dialoguer::Confirm;

use aituber_types::memory::{MemoryFragment, MemoryMetadata, flatten_metadata};

use crate::state::AppState;

#[derive(Subcommand)]
pub enum MemoryCommand {
    /// List a character's memories, oldest first.
    #[command(alias = "ls")]
    List {
        character: String,
        /// Only memories written for this user.
        #[arg(long)]
        user: Option<String>,
        #[arg(long)]
        limit: Option<usize>,
        #[arg(long)]
        offset: Option<usize>,
    },

    /// Store a memory for a character.
    Add {
        character: String,
        text: String,
        /// User the memory is attributed to.
        #[arg(long, default_value = "cli-user")]
        author: String,
        /// Metadata as a JSON object; nested keys are flattened to `a.b`.
        #[arg(long = "meta-json", value_parser = parse_metadata_json)]
        metadata_json: Option<MemoryMetadata>,
        /// Extra `key=value` metadata (repeatable, overrides `--meta-json`).
        #[arg(long = "meta", value_parser = parse_key_value)]
        metadata: Vec<(String, String)>,
    },

    /// Find memories relevant to a query.
    Search {
        character: String,
        query: String,
        /// Maximum results (defaults to `memory.retrieval_limit`).
        #[arg(long)]
        limit: Option<usize>,
        /// Minimum similarity (defaults to `memory.similarity_threshold`).
        #[arg(long)]
        threshold: Option<f32>,
    },

    /// Delete one memory by id.
    #[command(alias = "rm")]
    Delete {
        id: String,
        /// Skip confirmation prompt.
        #[arg(long)]
        force: bool,
    },

    /// Wipe all memories for a character.
    Clear {
        character: String,
        /// Only wipe memories written for this user.
        #[arg(long)]
        user: Option<String>,
        /// Skip confirmation prompt.
        #[arg(long)]
        force: bool,
    },
}

pub async fn run(state: &AppState, action: MemoryCommand, json: bool) -> Result<()> {
    match action {
        MemoryCommand::List {
            character,
            user,
            limit,
            offset,
        } => list_memories(state, &character, user.as_deref(), limit, offset, json).await,
        MemoryCommand::Add {
            character,
            text,
            author,
            metadata_json,
            metadata,
        } => {
            let meta = merge_metadata(metadata_json, metadata);
            add_memory(state, &character, &author, &text, meta, json).await
        }
        MemoryCommand::Search {
            character,
            query,
            limit,
            threshold,
        } => search_memories(state, &character, &query, limit, threshold, json).await,
        MemoryCommand::Delete { id, force } => delete_memory(state, &id, force, json).await,
        MemoryCommand::Clear {
            character,
            user,
            force,
        } => clear_memories(state, &character, user.as_deref(), force, json).await,
    }
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{raw}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty key in '{raw}'"));
    }
    Ok((key.to_string(), value.trim().to_string()))
}

fn parse_metadata_json(raw: &str) -> Result<MemoryMetadata, String> {
    let value: serde_json::Value =
        serde_json::from_str(raw).map_err(|e| format!("invalid JSON: {e}"))?;
    if !value.is_object() {
        return Err("expected a JSON object".to_string());
    }
    Ok(flatten_metadata(&value))
}

/// `--meta` pairs win over keys from `--meta-json`; `source` defaults to `manual`.
fn merge_metadata(
    from_json: Option<MemoryMetadata>,
    pairs: Vec<(String, String)>,
) -> MemoryMetadata {
    let mut meta = from_json.unwrap_or_default();
    meta.extend(pairs);
    meta.entry("source".to_string())
        .or_insert_with(|| "manual".to_string());
    meta
}

/// List a character's memories.
///
/// # Examples
///
/// ```bash
/// aituber memory list hiyori
/// aituber memory list hiyori --user ken --limit 20 --json
/// ```
async fn list_memories(
    state: &AppState,
    character: &str,
    user: Option<&str>,
    limit: Option<usize>,
    offset: Option<usize>,
    json: bool,
) -> Result<()> {
    let fragments = match user {
        Some(user) => state.memory.list_for_author(character, user, limit, offset).await,
        None => state.memory.list(character, limit, offset).await,
    };

    if json {
        let rows: Vec<_> = fragments.iter().map(without_embedding).collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    if fragments.is_empty() {
        println!();
        println!(
            "  {} No memories for '{}'. Memories are written after each exchange.",
            style("i").blue().bold(),
            style(character).cyan(),
        );
        println!();
        return Ok(());
    }

    let mut table = fragment_table(&["Id", "Text", "Author", "Date"]);
    for fragment in &fragments {
        table.add_row(vec![
            Cell::new(short_id(&fragment.id)).fg(Color::DarkGrey),
            Cell::new(truncate(&fragment.text, 60)).fg(Color::White),
            Cell::new(&fragment.author_id).fg(Color::Cyan),
            Cell::new(fragment.created_at.format("%Y-%m-%d %H:%M").to_string())
                .fg(Color::DarkGrey),
        ]);
    }

    let total = count_memories(state, character, user).await;
    println!();
    println!("  Memories for '{}'", style(character).cyan().bold());
    println!();
    println!("{table}");
    println!();
    println!(
        "  {} of {} memor{}",
        style(fragments.len()).bold(),
        total,
        if total == 1 { "y" } else { "ies" }
    );
    println!();

    Ok(())
}

/// Store a memory.
///
/// # Examples
///
/// ```bash
/// aituber memory add hiyori "The viewer Ken loves green tea" --meta topic=drinks
/// aituber memory add hiyori "Ken streams on Fridays" --meta-json '{"schedule":{"day":"fri"}}'
/// ```
async fn add_memory(
    state: &AppState,
    character: &str,
    author: &str,
    text: &str,
    meta: MemoryMetadata,
    json: bool,
) -> Result<()> {
    let fragment = state
        .memory
        .add(character, author, text, Some(meta))
        .await
        .context("failed to store memory")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&without_embedding(&fragment))?);
    } else {
        println!(
            "  {} Memory {} saved for '{}'",
            style("*").green().bold(),
            style(short_id(&fragment.id)).dim(),
            style(character).cyan()
        );
        println!("  {}", style(text).dim());
    }

    Ok(())
}

/// Similarity search.
///
/// # Examples
///
/// ```bash
/// aituber memory search hiyori "what drinks do I like" --threshold 0.3
/// ```
async fn search_memories(
    state: &AppState,
    character: &str,
    query: &str,
    limit: Option<usize>,
    threshold: Option<f32>,
    json: bool,
) -> Result<()> {
    let limit = limit.unwrap_or(state.config.memory.retrieval_limit);
    let threshold = threshold.unwrap_or(state.config.memory.similarity_threshold);
    let hits = state
        .memory
        .retrieve_relevant(character, query, limit, threshold)
        .await;

    if json {
        let rows: Vec<_> = hits
            .iter()
            .map(|hit| {
                serde_json::json!({
                    "similarity": hit.similarity,
                    "fragment": without_embedding(&hit.fragment),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    if hits.is_empty() {
        println!(
            "  {} No memories above similarity {threshold:.2}.",
            style("i").blue().bold()
        );
        return Ok(());
    }

    let mut table = fragment_table(&["Similarity", "Text", "Id"]);
    for hit in &hits {
        table.add_row(vec![
            Cell::new(format!("{:.3}", hit.similarity)).fg(Color::Yellow),
            Cell::new(truncate(&hit.fragment.text, 60)).fg(Color::White),
            Cell::new(short_id(&hit.fragment.id)).fg(Color::DarkGrey),
        ]);
    }
    println!();
    println!("{table}");
    println!();

    Ok(())
}

/// Delete one memory.
///
/// # Examples
///
/// ```bash
/// aituber memory delete 0192f3c4-... --force
/// ```
async fn delete_memory(state: &AppState, id: &str, force: bool, json: bool) -> Result<()> {
    let Some(fragment) = state.memory.get(id).await else {
        anyhow::bail!("memory '{id}' not found");
    };

    if !force && !json {
        let confirmed = Confirm::new()
            .with_prompt(format!(
                "Delete memory {} (\"{}\")?",
                style(short_id(id)).red().bold(),
                truncate(&fragment.text, 40)
            ))
            .default(false)
            .interact()?;

        if !confirmed {
            println!("  Cancelled.");
            return Ok(());
        }
    }

    let deleted = state.memory.delete(id).await?;

    if json {
        println!("{}", serde_json::json!({"deleted": deleted, "memory_id": id}));
    } else {
        println!(
            "  {} Memory {} deleted.",
            style("x").red().bold(),
            short_id(id)
        );
    }

    Ok(())
}

/// Wipe a character's memories.
///
/// # Examples
///
/// ```bash
/// aituber memory clear hiyori
/// aituber memory clear hiyori --user ken --force
/// ```
async fn clear_memories(
    state: &AppState,
    character: &str,
    user: Option<&str>,
    force: bool,
    json: bool,
) -> Result<()> {
    let total = count_memories(state, character, user).await;
    let scope = match user {
        Some(user) => format!("'{}' from user '{user}'", style(character).red().bold()),
        None => format!("'{}'", style(character).red().bold()),
    };

    if total == 0 {
        if json {
            println!(
                "{}",
                serde_json::json!({"deleted": 0, "character": character, "user": user})
            );
        } else {
            println!(
                "  {} No memories to delete for '{}'.",
                style("i").blue().bold(),
                style(character).cyan()
            );
        }
        return Ok(());
    }

    if !force && !json {
        let confirmed = Confirm::new()
            .with_prompt(format!(
                "Wipe all {} memories for {scope}? This cannot be undone.",
                style(total).bold(),
            ))
            .default(false)
            .interact()?;

        if !confirmed {
            println!("  Cancelled.");
            return Ok(());
        }
    }

    let count = match user {
        Some(user) => state.memory.delete_for_author(character, user).await?,
        None => state.memory.delete_all(character).await?,
    };

    if json {
        println!(
            "{}",
            serde_json::json!({"deleted": count, "character": character, "user": user})
        );
    } else {
        println!(
            "  {} Wiped {} memor{} for '{}'.",
            style("x").red().bold(),
            count,
            if count == 1 { "y" } else { "ies" },
            character
        );
    }

    Ok(())
}

async fn count_memories(state: &AppState, character: &str, user: Option<&str>) -> u64 {
    match user {
        Some(user) => state.memory.count_for_author(character, user).await,
        None => state.memory.count(character).await,
    }
}

// --- Formatting helpers ---

fn fragment_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(
        headers
            .iter()
            .map(|h| Cell::new(h).fg(Color::White))
            .collect::<Vec<_>>(),
    );
    table
}

/// Embeddings are long and meaningless on a terminal.
fn without_embedding(fragment: &MemoryFragment) -> serde_json::Value {
    serde_json::json!({
        "id": fragment.id,
        "owner_id": fragment.owner_id,
        "author_id": fragment.author_id,
        "text": fragment.text,
        "metadata": fragment.metadata,
        "created_at": fragment.created_at,
        "updated_at": fragment.updated_at,
    })
}

fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let kept: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{kept}...")
}
