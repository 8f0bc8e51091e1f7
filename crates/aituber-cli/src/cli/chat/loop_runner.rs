//! Main chat loop.
//!
//! Resolves the character, starts a conversation, then reads lines until
//! EOF or `/exit`. Each message goes through the orchestrator's streaming
//! path; memory recall and write-back happen there.

use std::time::Instant;

use console::style;
use futures_util::StreamExt;
use tracing::warn;

use aituber_types::llm::MessageRole;

use crate::state::AppState;

use super::banner::print_welcome_banner;
use super::commands::{self, ChatCommand};
use super::input::{ChatInput, InputEvent};
use super::renderer::{print_stats_footer, print_streaming_token, thinking_spinner};

/// Run the interactive chat loop with a character.
pub async fn run_chat_loop(
    state: &AppState,
    character_id: &str,
    user_id: &str,
) -> anyhow::Result<()> {
    let orchestrator = &state.orchestrator;
    let character = orchestrator.characters().load_character(character_id).await?;
    let model = orchestrator.engine().settings().model.clone();

    let conversation = orchestrator
        .get_or_create_conversation(character_id, user_id, None)
        .await;
    let conversation_id = conversation.conversation_id().to_string();

    print_welcome_banner(
        &character.name,
        &character.description,
        &model,
        &conversation_id,
        state.memory.count(character_id).await,
    );

    let prompt = format!("  {} ", style("You >").green().bold());
    let (mut chat_input, _writer) =
        ChatInput::new(prompt).map_err(|e| anyhow::anyhow!("Failed to initialize input: {e}"))?;

    loop {
        let text = match chat_input.read_line().await {
            InputEvent::Eof => {
                println!("\n  {}", style("Chat ended.").dim());
                break;
            }
            InputEvent::Interrupted => {
                println!("\n  {}", style("Press Ctrl+D to exit, or keep chatting.").dim());
                continue;
            }
            InputEvent::Message(text) if text.is_empty() => continue,
            InputEvent::Message(text) => text,
        };

        if let Some(cmd) = commands::parse(&text) {
            match cmd {
                ChatCommand::Help => commands::print_help(),
                ChatCommand::Clear => chat_input.clear(),
                ChatCommand::Exit => {
                    println!("\n  {}", style("Chat ended.").dim());
                    break;
                }
                ChatCommand::Summary => {
                    let spinner = thinking_spinner();
                    let summary = orchestrator.summarize_conversation(&conversation_id).await;
                    spinner.finish_and_clear();
                    match summary {
                        Ok(summary) => println!("\n  {} {}\n", style("Summary:").bold(), summary),
                        Err(e) => {
                            println!("\n  {} Could not summarize: {e}\n", style("!").red().bold())
                        }
                    }
                }
                ChatCommand::History => {
                    print_history(state, &conversation_id, &character.name).await
                }
                ChatCommand::Remember(fact) => {
                    let mut metadata = aituber_types::memory::MemoryMetadata::new();
                    metadata.insert("source".to_string(), "manual".to_string());
                    metadata.insert("conversation_id".to_string(), conversation_id.clone());
                    match state.memory.add(character_id, user_id, &fact, Some(metadata)).await {
                        Ok(_) => println!(
                            "\n  {} Remembered: {}\n",
                            style("*").cyan().bold(),
                            style(&fact).dim()
                        ),
                        Err(e) => println!(
                            "\n  {} Failed to save memory: {e}\n",
                            style("!").red().bold()
                        ),
                    }
                }
                ChatCommand::Recall(query) => {
                    let settings = orchestrator.settings();
                    let hits = state
                        .memory
                        .retrieve_relevant(
                            character_id,
                            &query,
                            settings.retrieval_limit,
                            settings.similarity_threshold,
                        )
                        .await;
                    println!();
                    if hits.is_empty() {
                        println!("  {}", style("Nothing relevant remembered.").dim());
                    }
                    for hit in &hits {
                        println!(
                            "  {} {}",
                            style(format!("{:.2}", hit.similarity)).yellow(),
                            hit.fragment.text
                        );
                    }
                    println!();
                }
                ChatCommand::Unknown(cmd_name) => {
                    println!(
                        "\n  {} Unknown command: {}. Type /help for available commands.\n",
                        style("?").yellow().bold(),
                        style(cmd_name).dim()
                    );
                }
            }
            continue;
        }

        let spinner = thinking_spinner();
        let start_time = Instant::now();

        let mut stream = match orchestrator.process_message_stream(&conversation_id, &text).await {
            Ok(stream) => stream,
            Err(e) => {
                spinner.finish_and_clear();
                eprintln!("\n  {} {e}\n", style("!").red().bold());
                continue;
            }
        };

        let mut reply_chars = 0usize;
        let mut first_token_received = false;
        let mut had_error = false;

        while let Some(token) = stream.next().await {
            match token {
                Ok(token) => {
                    if !first_token_received {
                        spinner.finish_and_clear();
                        first_token_received = true;
                        print!("\n  {} ", style(&character.name).cyan().bold());
                    }
                    reply_chars += token.chars().count();
                    print_streaming_token(&token);
                }
                Err(e) => {
                    spinner.finish_and_clear();
                    warn!(error = %e, "Reply stream failed");
                    eprintln!("\n  {} Generation error: {e}", style("!").red().bold());
                    eprintln!("  {}", style("Type a message to retry, /exit to quit.").dim());
                    had_error = true;
                    break;
                }
            }
        }

        if !first_token_received {
            spinner.finish_and_clear();
        }
        if had_error {
            continue;
        }

        println!();
        print_stats_footer(reply_chars, start_time.elapsed().as_millis() as u64, &model);
        println!();
    }

    chat_input.flush();
    orchestrator.delete_conversation(&conversation_id);
    Ok(())
}

async fn print_history(state: &AppState, conversation_id: &str, character_name: &str) {
    let Some(conversation) = state.orchestrator.get_conversation(conversation_id).await else {
        return;
    };

    println!();
    for turn in conversation.turns() {
        let label = match turn.role {
            MessageRole::User => format!("{}", style("You").green()),
            MessageRole::Assistant => format!("{}", style(character_name).cyan()),
            MessageRole::System => "System".to_string(),
        };
        let preview = if turn.content.chars().count() > 100 {
            format!("{}...", turn.content.chars().take(97).collect::<String>())
        } else {
            turn.content.clone()
        };
        println!("  {} {}", style(label).bold(), preview);
    }
    println!();
}
