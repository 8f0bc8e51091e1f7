//! One-shot question: start a conversation, send one message, print the reply.

use anyhow::Result;
use futures_util::StreamExt;

use crate::cli::chat::renderer::print_streaming_token;
use crate::state::AppState;

/// # Examples
///
/// ```bash
/// aituber ask "What did I tell you about tea?" -c hiyori
/// aituber ask "Hi!" --no-stream --json
/// ```
pub async fn ask(
    state: &AppState,
    character_id: &str,
    user_id: &str,
    message: &str,
    stream: bool,
    json: bool,
) -> Result<()> {
    let orchestrator = &state.orchestrator;
    let conversation = orchestrator
        .get_or_create_conversation(character_id, user_id, None)
        .await;
    let conversation_id = conversation.conversation_id().to_string();

    // JSON output needs the whole reply anyway.
    let reply = if stream && !json {
        let mut tokens = orchestrator
            .process_message_stream(&conversation_id, message)
            .await?;
        let mut reply = String::new();
        while let Some(token) = tokens.next().await {
            let token = token?;
            print_streaming_token(&token);
            reply.push_str(&token);
        }
        println!();
        reply
    } else {
        orchestrator.process_message(&conversation_id, message).await?
    };

    if json {
        let out = serde_json::json!({
            "conversation_id": conversation_id,
            "character_id": character_id,
            "user_id": user_id,
            "reply": reply,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else if !stream {
        println!("{reply}");
    }

    orchestrator.delete_conversation(&conversation_id);
    Ok(())
}
