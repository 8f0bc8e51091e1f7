//! Character CLI commands: list and show.
//!
//! These only read definition files, so they run without a generation
//! backend or memory database.

use std::path::Path;

use anyhow::Result;
use clap::Subcommand;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;

use aituber_core::character::CharacterStore;
use aituber_infra::filesystem::character::FileCharacterStore;
use aituber_infra::filesystem::resolve_data_path;
use aituber_types::character::Character;
use aituber_types::config::AppConfig;

#[derive(Subcommand)]
pub enum CharacterCommand {
    /// List every readable character definition.
    #[command(alias = "ls")]
    List,

    /// Show one character in full.
    Show {
        /// Character id (file name without extension).
        id: String,
    },
}

pub async fn run(
    config: &AppConfig,
    data_dir: &Path,
    action: CharacterCommand,
    json: bool,
) -> Result<()> {
    let store = FileCharacterStore::new(resolve_data_path(
        data_dir,
        &config.character.characters_dir,
    ));

    match action {
        CharacterCommand::List => list_characters(&store, config, json).await,
        CharacterCommand::Show { id } => show_character(&store, &id, json).await,
    }
}

async fn list_characters(store: &FileCharacterStore, config: &AppConfig, json: bool) -> Result<()> {
    let mut characters = store.load_all().await?;
    characters.sort_by(|a, b| a.id.cmp(&b.id));

    if json {
        println!("{}", serde_json::to_string_pretty(&characters)?);
        return Ok(());
    }

    if characters.is_empty() {
        println!();
        println!(
            "  {} No characters in {}. Add {{id}}.yaml files there.",
            style("i").blue().bold(),
            style(store.dir().display()).cyan()
        );
        println!();
        return Ok(());
    }

    let default_id = config.character.default_character.as_deref();

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Id").fg(Color::White),
        Cell::new("Name").fg(Color::White),
        Cell::new("Description").fg(Color::White),
    ]);

    for character in &characters {
        let id = if Some(character.id.as_str()) == default_id {
            format!("{} (default)", character.id)
        } else {
            character.id.clone()
        };
        table.add_row(vec![
            Cell::new(id).fg(Color::Cyan),
            Cell::new(&character.name).fg(Color::White),
            Cell::new(&character.description).fg(Color::DarkGrey),
        ]);
    }

    println!();
    println!("{table}");
    println!();
    println!(
        "  {} character{}",
        style(characters.len()).bold(),
        if characters.len() == 1 { "" } else { "s" }
    );
    println!();

    Ok(())
}

async fn show_character(store: &FileCharacterStore, id: &str, json: bool) -> Result<()> {
    let Some(character) = store.load(id).await? else {
        anyhow::bail!("character '{id}' not found in {}", store.dir().display());
    };
    character.validate()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&character)?);
    } else {
        print_character(&character);
    }
    Ok(())
}

fn print_character(character: &Character) {
    println!();
    println!(
        "  {} {}",
        style(&character.name).cyan().bold(),
        style(format!("({})", character.id)).dim()
    );
    if !character.description.is_empty() {
        println!("  {}", style(&character.description).dim());
    }
    println!();

    let persona = &character.persona;
    let fields = [
        ("Age", persona.age.map(|a| a.to_string())),
        ("Gender", persona.gender.clone()),
        ("Occupation", persona.occupation.clone()),
        ("Speech style", persona.speech_style.clone()),
        ("Background", persona.background.clone()),
        ("Appearance", persona.appearance.clone()),
    ];
    for (label, value) in fields {
        if let Some(value) = value {
            println!("  {}  {}", style(format!("{label}:")).bold(), value);
        }
    }

    if !character.personality_traits.is_empty() {
        println!();
        println!("  {}", style("Traits").bold());
        for t in &character.personality_traits {
            println!(
                "    {} {:.2}  {}",
                style(&t.name).yellow(),
                t.score,
                style(&t.description).dim()
            );
        }
    }

    if !character.interests.is_empty() {
        println!();
        println!("  {}", style("Interests").bold());
        for i in &character.interests {
            println!(
                "    {} {:.2}  {}",
                style(&i.name).yellow(),
                i.level,
                style(&i.description).dim()
            );
        }
    }

    println!();
    println!("  {}", style("System prompt").bold());
    for line in character.system_prompt.lines() {
        println!("    {}", style(line).dim());
    }
    println!();
}
