//! Configuration CLI commands: show and check.

use std::path::Path;

use anyhow::Result;
use clap::Subcommand;
use console::style;

use aituber_infra::config::{load_config_strict, resolve_api_key};
use aituber_infra::llm::{create_provider, test_provider_connection};
use aituber_types::config::AppConfig;
use aituber_types::error::ConfigError;

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Print the effective configuration (defaults filled in).
    Show,

    /// Validate the config file and the API key.
    Check {
        /// Also send a tiny request to the chat backend.
        #[arg(long)]
        connect: bool,
    },
}

pub async fn run(
    config: &AppConfig,
    config_path: &Path,
    data_dir: &Path,
    action: ConfigCommand,
    json: bool,
) -> Result<()> {
    match action {
        ConfigCommand::Show => show(config, config_path, data_dir, json),
        ConfigCommand::Check { connect } => check(config_path, connect, json).await,
    }
}

fn show(config: &AppConfig, config_path: &Path, data_dir: &Path, json: bool) -> Result<()> {
    if json {
        let out = serde_json::json!({
            "config_path": config_path.display().to_string(),
            "data_dir": data_dir.display().to_string(),
            "config": config,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!();
    println!("  {}  {}", style("Config:").bold(), style(config_path.display()).dim());
    println!("  {}  {}", style("Data dir:").bold(), style(data_dir.display()).dim());
    println!();
    println!("{}", toml::to_string_pretty(config)?);
    Ok(())
}

async fn check(config_path: &Path, connect: bool, json: bool) -> Result<()> {
    let (config, file_status) = match load_config_strict(config_path).await {
        Ok(config) => (config, Ok("parsed")),
        Err(ConfigError::NotFound { .. }) => (AppConfig::default(), Ok("missing (defaults)")),
        Err(e) => (AppConfig::default(), Err(e.to_string())),
    };

    let has_key = resolve_api_key(&config.llm).is_some();

    let connection = if connect && file_status.is_ok() {
        let outcome = match create_provider(&config.llm, resolve_api_key(&config.llm)) {
            Ok(provider) => test_provider_connection(&provider).await.map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };
        Some(outcome)
    } else {
        None
    };

    let healthy = file_status.is_ok()
        && connection.as_ref().is_none_or(|c| c.is_ok());

    if json {
        let out = serde_json::json!({
            "config_path": config_path.display().to_string(),
            "file": match &file_status { Ok(s) => *s, Err(_) => "invalid" },
            "error": file_status.as_ref().err(),
            "api_key_env": config.llm.api_key_env,
            "api_key_present": has_key,
            "connection": connection.as_ref().map(|c| match c {
                Ok(()) => "ok".to_string(),
                Err(e) => e.clone(),
            }),
            "healthy": healthy,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        let mark = |ok: bool| {
            if ok {
                format!("{}", style("✓").green())
            } else {
                format!("{}", style("✗").red())
            }
        };

        println!();
        match &file_status {
            Ok(status) => println!(
                "  {} {} {}",
                mark(true),
                config_path.display(),
                style(status).dim()
            ),
            Err(e) => println!("  {} {}", mark(false), e),
        }
        println!(
            "  {} API key in ${}",
            mark(has_key),
            config.llm.api_key_env
        );
        if let Some(outcome) = &connection {
            match outcome {
                Ok(()) => println!("  {} {} responded", mark(true), config.llm.model),
                Err(e) => println!("  {} {}", mark(false), e),
            }
        }
        println!();
    }

    if !healthy {
        anyhow::bail!("configuration check failed");
    }
    Ok(())
}
