//! Welcome banner display for chat sessions.

use console::style;

/// Print the welcome banner at the start of a chat session.
pub fn print_welcome_banner(
    name: &str,
    description: &str,
    model: &str,
    conversation_id: &str,
    memory_count: u64,
) {
    println!();
    println!("  {}", style(name).cyan().bold());
    if !description.is_empty() {
        println!("  {}", style(description).dim());
    }
    println!();
    println!("  {}  {}", style("Model:").bold(), style(model).dim());
    println!(
        "  {}  {}",
        style("Conversation:").bold(),
        style(conversation_id.get(..8).unwrap_or(conversation_id)).dim()
    );
    println!(
        "  {}  {}",
        style("Memories:").bold(),
        style(memory_count).dim()
    );
    println!();
    println!(
        "  {}",
        style("Type /help for commands, Ctrl+D to exit").dim()
    );
    println!("  {}", style("---").dim());
    println!();
}
