//! AITuber CLI entry point.
//!
//! Binary name: `aituber`
//!
//! Parses CLI arguments, loads configuration, initializes tracing and
//! services, then dispatches to the command handler.

mod cli;
mod state;

use std::path::PathBuf;

use clap::Parser;
use clap_complete::generate;

use aituber_infra::config::{load_config, resolve_config_path};
use aituber_infra::filesystem::resolve_data_dir;
use aituber_observe::tracing_setup::{init_tracing, shutdown_tracing};
use aituber_types::config::AppConfig;

use cli::{Cli, Commands};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Shell completions don't need config or app state
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "aituber", &mut std::io::stdout());
        return Ok(());
    }

    let data_dir = resolve_data_dir();
    let config_path = resolve_config_path(&data_dir);
    let config = load_config(&config_path).await;

    let filter = cli::verbosity_filter(cli.verbose, cli.quiet)
        .map(str::to_string)
        .unwrap_or_else(|| config.app.log_level.clone());
    init_tracing(config.app.enable_otel, &filter)
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

    let result = run(cli, config, config_path, data_dir).await;
    shutdown_tracing();
    result
}

async fn run(
    cli: Cli,
    config: AppConfig,
    config_path: PathBuf,
    data_dir: PathBuf,
) -> anyhow::Result<()> {
    let json = cli.json;
    match cli.command {
        // File-only commands run without a backend or database.
        Commands::Config { action } => {
            cli::config::run(&config, &config_path, &data_dir, action, json).await
        }
        Commands::Character { action } => {
            cli::character::run(&config, &data_dir, action, json).await
        }
        Commands::Completions { .. } => Ok(()),
        command => {
            let state = AppState::init(config, data_dir).await?;
            let result = dispatch(&state, command, json).await;
            state.shutdown().await;
            result
        }
    }
}

async fn dispatch(state: &AppState, command: Commands, json: bool) -> anyhow::Result<()> {
    match command {
        Commands::Chat { character, user } => {
            let character_id = state.character_id(character)?;
            cli::chat::loop_runner::run_chat_loop(state, &character_id, &user).await
        }
        Commands::Ask {
            message,
            character,
            user,
            no_stream,
        } => {
            let character_id = state.character_id(character)?;
            cli::ask::ask(state, &character_id, &user, &message, !no_stream, json).await
        }
        Commands::Memory { action } => cli::memory::run(state, action, json).await,
        Commands::Config { .. } | Commands::Character { .. } | Commands::Completions { .. } => {
            Ok(())
        }
    }
}
