//! Filesystem adapters for AITuber.
//!
//! Data directory resolution and the YAML/JSON character store.

pub mod character;

use std::path::{Path, PathBuf};

/// Resolve the data directory from environment or platform defaults.
///
/// Priority:
/// 1. `AITUBER_DATA_DIR` environment variable
/// 2. `~/.aituber`
/// 3. `.aituber` in the current directory
pub fn resolve_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("AITUBER_DATA_DIR") {
        return PathBuf::from(dir);
    }

    if let Some(home) = dirs::home_dir() {
        return home.join(".aituber");
    }

    PathBuf::from(".aituber")
}

/// Join a configured path onto the data directory. Absolute paths win.
pub fn resolve_data_path(data_dir: &Path, relative: &str) -> PathBuf {
    let path = Path::new(relative);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        data_dir.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_data_path_relative() {
        let data_dir = PathBuf::from("/home/user/.aituber");
        assert_eq!(
            resolve_data_path(&data_dir, "characters"),
            PathBuf::from("/home/user/.aituber/characters")
        );
        assert_eq!(
            resolve_data_path(&data_dir, "memory.db"),
            PathBuf::from("/home/user/.aituber/memory.db")
        );
    }

    #[test]
    fn test_resolve_data_path_absolute() {
        let data_dir = PathBuf::from("/home/user/.aituber");
        assert_eq!(
            resolve_data_path(&data_dir, "/srv/aituber/memory.db"),
            PathBuf::from("/srv/aituber/memory.db")
        );
    }

    #[test]
    fn test_resolve_data_dir_from_env() {
        // SAFETY: This test is single-threaded and restores the env var immediately.
        unsafe {
            std::env::set_var("AITUBER_DATA_DIR", "/tmp/test-aituber");
        }
        let dir = resolve_data_dir();
        assert_eq!(dir, PathBuf::from("/tmp/test-aituber"));
        unsafe {
            std::env::remove_var("AITUBER_DATA_DIR");
        }
    }
}
