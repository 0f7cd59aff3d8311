//! Console runtime settings.

use crate::logging::default_log_level;
use crate::shell::DEFAULT_PROMPT;
use std::path::PathBuf;

pub const DEFAULT_STORAGE_FILE: &str = "file.json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellConfig {
    /// Backing JSON file, relative paths resolve against the working directory.
    pub storage_path: PathBuf,
    pub prompt: String,
    pub log_level: String,
    /// Must be absolute.
    pub log_dir: PathBuf,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            storage_path: PathBuf::from(DEFAULT_STORAGE_FILE),
            prompt: DEFAULT_PROMPT.to_string(),
            log_level: default_log_level().to_string(),
            log_dir: std::env::temp_dir().join("hbnb").join("logs"),
        }
    }
}

impl ShellConfig {
    pub fn with_storage_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.storage_path = path.into();
        self
    }

    pub fn with_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = dir.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_file_json_and_absolute_log_dir() {
        let config = ShellConfig::default();
        assert_eq!(config.storage_path, PathBuf::from("file.json"));
        assert_eq!(config.prompt, "(hbnb) ");
        assert!(config.log_dir.is_absolute());
    }

    #[test]
    fn builders_override_paths() {
        let config = ShellConfig::default()
            .with_storage_path("/tmp/objects.json")
            .with_log_dir("/tmp/hbnb-logs");
        assert_eq!(config.storage_path, PathBuf::from("/tmp/objects.json"));
        assert_eq!(config.log_dir, PathBuf::from("/tmp/hbnb-logs"));
    }
}
