//! Streaming output helpers for the chat loop.

use std::io::Write;
use std::time::Duration;

use console::style;
use indicatif::{ProgressBar, ProgressStyle};

/// A "thinking..." spinner shown until the first token arrives.
pub fn thinking_spinner() -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(spinner_style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
        spinner.set_style(spinner_style);
    }
    spinner.set_message("thinking...");
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner
}

/// Print a single streaming token (raw, no formatting).
pub fn print_streaming_token(token: &str) {
    print!("{token}");
    let _ = std::io::stdout().flush();
}

/// Print the stats footer after a reply.
///
/// Format: "| {chars} chars . {time}s . {model}"
pub fn print_stats_footer(chars: usize, response_ms: u64, model: &str) {
    let seconds = response_ms as f64 / 1000.0;
    println!(
        "\n  {} {} chars {} {:.1}s {} {}",
        style("|").dim(),
        style(chars).dim(),
        style("\u{00b7}").dim(),
        style(seconds).dim(),
        style("\u{00b7}").dim(),
        style(model).dim(),
    );
}
