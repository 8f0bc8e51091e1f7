//! Slash command parsing for the chat loop.

use console::style;

/// Available slash commands in the chat loop.
#[derive(Debug, PartialEq)]
pub enum ChatCommand {
    /// Show available commands.
    Help,
    /// Clear the terminal screen.
    Clear,
    /// Exit the chat.
    Exit,
    /// Summarize the conversation so far.
    Summary,
    /// Show the turns of this conversation.
    History,
    /// Store a fact in the character's memory.
    Remember(String),
    /// Recall memories relevant to a query.
    Recall(String),
    /// Unknown command (or a known one missing its argument).
    Unknown(String),
}

/// Parse user input as a slash command.
///
/// Returns `None` if the input doesn't start with `/`.
pub fn parse(input: &str) -> Option<ChatCommand> {
    let trimmed = input.trim();
    if !trimmed.starts_with('/') {
        return None;
    }

    let (cmd, arg) = match trimmed.split_once(' ') {
        Some((cmd, arg)) => (cmd.to_lowercase(), arg.trim().to_string()),
        None => (trimmed.to_lowercase(), String::new()),
    };

    let command = match cmd.as_str() {
        "/help" | "/h" | "/?" => ChatCommand::Help,
        "/clear" | "/cls" => ChatCommand::Clear,
        "/exit" | "/quit" | "/q" => ChatCommand::Exit,
        "/summary" | "/sum" => ChatCommand::Summary,
        "/history" => ChatCommand::History,
        "/remember" | "/rem" if arg.is_empty() => {
            ChatCommand::Unknown("/remember requires a fact".to_string())
        }
        "/remember" | "/rem" => ChatCommand::Remember(arg),
        "/recall" if arg.is_empty() => ChatCommand::Unknown("/recall requires a query".to_string()),
        "/recall" => ChatCommand::Recall(arg),
        other => ChatCommand::Unknown(other.to_string()),
    };
    Some(command)
}

/// Print the help text listing all available commands.
pub fn print_help() {
    let rows = [
        ("/help", "Show this help message"),
        ("/clear", "Clear the screen"),
        ("/summary", "Summarize the conversation so far"),
        ("/history", "Show this conversation's turns"),
        ("/remember", "Save a fact to the character's memory"),
        ("/recall", "Search the character's memory"),
        ("/exit", "End the chat"),
    ];

    println!();
    println!("  {}", style("Available commands:").bold());
    println!();
    for (name, help) in rows {
        println!("  {:<12}{}", style(name).cyan(), help);
    }
    println!();
    println!(
        "  {}",
        style("Ctrl+D to exit, Ctrl+C safe (no message loss)").dim()
    );
    println!();
}
