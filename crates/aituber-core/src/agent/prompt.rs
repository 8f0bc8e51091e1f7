//! Prompt assembly for AITuber characters.
//!
//! The system message is built from the character definition and any
//! recalled memories; recent conversation turns follow it in order.
//!
//! Layout:
//! ```text
//! {system_prompt}
//!
//! Your name is {name}.
//! {description}
//!
//! Persona:
//! - Age: ...
//! ...
//!
//! Personality:
//! - {trait}: {description}
//!
//! Interests:
//! - {interest}: {description}
//!
//! Here are your memories:
//! 1. {memory}
//! ```

use aituber_types::character::Character;
use aituber_types::chat::Turn;
use aituber_types::llm::Message;
use aituber_types::memory::ScoredFragment;

/// Default number of trailing turns placed after the system message.
pub const DEFAULT_HISTORY_LIMIT: usize = 10;

const UNKNOWN: &str = "unknown";
const NONE: &str = "none";

/// Deterministic prompt construction.
pub struct PromptBuilder;

impl PromptBuilder {
    /// The system message followed by the last `history_limit` turns.
    pub fn build(
        character: &Character,
        memories: &[ScoredFragment],
        turns: &[Turn],
        history_limit: usize,
    ) -> Vec<Message> {
        let start = turns.len().saturating_sub(history_limit);
        let history = &turns[start..];

        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.push(Message::system(Self::system_prompt(character, memories)));
        messages.extend(history.iter().map(Turn::to_message));
        messages
    }

    /// Render the system message text.
    pub fn system_prompt(character: &Character, memories: &[ScoredFragment]) -> String {
        let mut sections = Vec::with_capacity(6);

        sections.push(character.system_prompt.clone());
        sections.push(format!(
            "Your name is {}.\n{}",
            character.name, character.description
        ));
        sections.push(Self::persona_section(character));

        let traits: Vec<String> = character
            .personality_traits
            .iter()
            .map(|t| format!("- {}: {}", t.name, t.description))
            .collect();
        sections.push(Self::list_section("Personality:", &traits));

        let interests: Vec<String> = character
            .interests
            .iter()
            .map(|i| format!("- {}: {}", i.name, i.description))
            .collect();
        sections.push(Self::list_section("Interests:", &interests));

        if !memories.is_empty() {
            let lines: Vec<String> = memories
                .iter()
                .enumerate()
                .map(|(i, m)| format!("{}. {}", i + 1, m.fragment.text))
                .collect();
            sections.push(Self::list_section("Here are your memories:", &lines));
        }

        sections.join("\n\n")
    }

    fn persona_section(character: &Character) -> String {
        let persona = &character.persona;
        let or = |value: &Option<String>, fallback: &str| {
            value.clone().unwrap_or_else(|| fallback.to_string())
        };
        let age = persona
            .age
            .map(|a| a.to_string())
            .unwrap_or_else(|| UNKNOWN.to_string());

        format!(
            "Persona:\n\
             - Age: {age}\n\
             - Gender: {}\n\
             - Occupation: {}\n\
             - Background: {}\n\
             - Appearance: {}\n\
             - Speech style: {}",
            or(&persona.gender, UNKNOWN),
            or(&persona.occupation, UNKNOWN),
            or(&persona.background, NONE),
            or(&persona.appearance, NONE),
            or(&persona.speech_style, NONE),
        )
    }

    fn list_section(heading: &str, lines: &[String]) -> String {
        if lines.is_empty() {
            heading.to_string()
        } else {
            format!("{heading}\n{}", lines.join("\n"))
        }
    }
}
