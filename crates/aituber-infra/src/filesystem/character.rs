//! Character definitions stored as files.
//!
//! Layout: `{characters_dir}/{id}.yaml` (also `.yml` and `.json`). When
//! several files share an id, the first extension in [`EXTENSIONS`] wins.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use aituber_core::character::CharacterStore;
use aituber_types::character::Character;
use aituber_types::error::CharacterError;

const EXTENSIONS: [&str; 3] = ["yaml", "yml", "json"];

/// YAML/JSON character store rooted at one directory.
#[derive(Debug, Clone)]
pub struct FileCharacterStore {
    dir: PathBuf,
}

impl FileCharacterStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Ids of every definition file, sorted and de-duplicated.
    pub async fn list_ids(&self) -> Result<Vec<String>, CharacterError> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(storage_error(&self.dir, e)),
        };

        let mut ids = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| storage_error(&self.dir, e))?
        {
            let path = entry.path();
            let is_definition = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| EXTENSIONS.contains(&ext));
            if !is_definition {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                ids.push(stem.to_string());
            }
        }

        ids.sort();
        ids.dedup();
        Ok(ids)
    }

    /// Write `character` as `{id}.yaml`, creating the directory if needed.
    pub async fn save(&self, character: &Character) -> Result<PathBuf, CharacterError> {
        character.validate()?;
        check_id(&character.id)?;

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| storage_error(&self.dir, e))?;

        let yaml = serde_yaml_ng::to_string(character)
            .map_err(|e| CharacterError::Storage(format!("failed to serialize: {e}")))?;
        let path = self.dir.join(format!("{}.yaml", character.id));
        tokio::fs::write(&path, yaml)
            .await
            .map_err(|e| storage_error(&path, e))?;

        debug!(character_id = %character.id, path = %path.display(), "Character saved");
        Ok(path)
    }

    /// Remove every definition file for `id`. Returns whether any existed.
    pub async fn delete(&self, id: &str) -> Result<bool, CharacterError> {
        check_id(id)?;
        let mut removed = false;
        for path in self.candidate_paths(id) {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => removed = true,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(storage_error(&path, e)),
            }
        }
        Ok(removed)
    }

    fn candidate_paths(&self, id: &str) -> impl Iterator<Item = PathBuf> + '_ {
        let id = id.to_string();
        EXTENSIONS
            .iter()
            .map(move |ext| self.dir.join(format!("{id}.{ext}")))
    }
}

impl CharacterStore for FileCharacterStore {
    async fn load(&self, id: &str) -> Result<Option<Character>, CharacterError> {
        check_id(id)?;

        for path in self.candidate_paths(id) {
            let content = match tokio::fs::read_to_string(&path).await {
                Ok(content) => content,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(storage_error(&path, e)),
            };

            let character = parse_character(&path, &content)?;
            if character.id != id {
                return Err(CharacterError::Invalid(format!(
                    "{} declares id '{}'",
                    path.display(),
                    character.id
                )));
            }
            return Ok(Some(character));
        }

        Ok(None)
    }

    async fn load_all(&self) -> Result<Vec<Character>, CharacterError> {
        let mut characters = Vec::new();
        for id in self.list_ids().await? {
            match self.load(&id).await {
                Ok(Some(character)) => characters.push(character),
                Ok(None) => {}
                Err(e) => {
                    warn!(character_id = %id, error = %e, "Skipping unreadable character file")
                }
            }
        }
        Ok(characters)
    }
}

/// Ids become file names; anything that could escape the directory is rejected.
fn check_id(id: &str) -> Result<(), CharacterError> {
    let valid = !id.is_empty()
        && id != "."
        && id != ".."
        && !id.contains(['/', '\\'])
        && !id.starts_with('.');
    if valid {
        Ok(())
    } else {
        Err(CharacterError::Invalid(format!("invalid character id '{id}'")))
    }
}

fn parse_character(path: &Path, content: &str) -> Result<Character, CharacterError> {
    let is_json = path.extension().and_then(|e| e.to_str()) == Some("json");
    let parsed = if is_json {
        serde_json::from_str(content).map_err(|e| e.to_string())
    } else {
        serde_yaml_ng::from_str(content).map_err(|e| e.to_string())
    };
    parsed.map_err(|e| CharacterError::Invalid(format!("{}: {e}", path.display())))
}

fn storage_error(path: &Path, err: std::io::Error) -> CharacterError {
    CharacterError::Storage(format!("{}: {err}", path.display()))
}
