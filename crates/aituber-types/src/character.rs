//! Character (persona) definitions.
//!
//! Characters are static, read-only inputs to prompt assembly. They are
//! loaded from `{data_dir}/characters/{id}.yaml` (or `.json`) and never
//! mutated by the conversation pipeline.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::CharacterError;

/// A single personality trait with an intensity in `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonalityTrait {
    pub name: String,
    pub description: String,
    pub score: f32,
}

/// A topic the character cares about, with an interest level in `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interest {
    pub name: String,
    pub description: String,
    pub level: f32,
}

/// Optional biographical attributes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Persona {
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub occupation: Option<String>,
    #[serde(default)]
    pub background: Option<String>,
    #[serde(default)]
    pub appearance: Option<String>,
    #[serde(default)]
    pub speech_style: Option<String>,
}

/// A complete character definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Character {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub system_prompt: String,
    #[serde(default)]
    pub persona: Persona,
    #[serde(default)]
    pub personality_traits: Vec<PersonalityTrait>,
    #[serde(default)]
    pub interests: Vec<Interest>,
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl Character {
    /// Check the invariants a loaded definition must satisfy.
    pub fn validate(&self) -> Result<(), CharacterError> {
        if self.id.trim().is_empty() {
            return Err(CharacterError::Invalid("id must not be empty".to_string()));
        }
        if self.name.trim().is_empty() {
            return Err(CharacterError::Invalid(format!(
                "character '{}' has an empty name",
                self.id
            )));
        }
        for t in &self.personality_traits {
            if !(0.0..=1.0).contains(&t.score) {
                return Err(CharacterError::Invalid(format!(
                    "trait '{}' score {} is outside [0, 1]",
                    t.name, t.score
                )));
            }
        }
        for i in &self.interests {
            if !(0.0..=1.0).contains(&i.level) {
                return Err(CharacterError::Invalid(format!(
                    "interest '{}' level {} is outside [0, 1]",
                    i.name, i.level
                )));
            }
        }
        Ok(())
    }
}
