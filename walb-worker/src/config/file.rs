//! Configuration file handling for `~/.walb/worker.ini`.
//!
//! Settings structs live in [`super::settings`], defaults in
//! [`super::defaults`] and parsing in [`super::parser`].

use ini::Ini;
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::settings::Config;

/// Configuration errors.
///
/// All of these are fatal: a worker must not start with a partially valid
/// policy.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read or tokenize the config file
    #[error("Failed to read config file: {0}")]
    Read(#[from] ini::Error),

    /// Failed to tokenize an in-memory config document
    #[error("Failed to parse config document: {0}")]
    Parse(#[from] ini::ParseError),

    /// Invalid configuration value
    #[error("Invalid configuration: {section}.{key} = '{value}' - {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },

    /// A required key is absent
    #[error("Missing configuration key: {section}.{key}")]
    MissingKey { section: String, key: String },

    /// A key that no section understands
    #[error("Unknown configuration key: {section}.{key}")]
    UnknownKey { section: String, key: String },

    /// A section that is not part of the document layout
    #[error("Unknown configuration section: [{0}]")]
    UnknownSection(String),
}

impl Config {
    /// Load configuration from the default path (`~/.walb/worker.ini`).
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&config_file_path())
    }

    /// Load configuration from a specific path.
    ///
    /// Unlike optional keys, the file itself is required: a missing file is
    /// reported as [`ConfigError::Read`].
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_file(path)?;
        super::parser::parse_ini(&ini)
    }

    /// Parse configuration from an INI document held in memory.
    pub fn from_ini_str(content: &str) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_str(content)?;
        super::parser::parse_ini(&ini)
    }
}

/// Get the path to the config directory (`~/.walb`).
pub fn config_directory() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".walb")
}

/// Get the path to the config file (`~/.walb/worker.ini`).
pub fn config_file_path() -> PathBuf {
    config_directory().join("worker.ini")
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
[general]
addr = 10.0.0.1
port = 10200
"#;

    #[test]
    fn test_config_file_path() {
        let path = config_file_path();
        assert!(path.ends_with(".walb/worker.ini"));
    }

    #[test]
    fn test_load_nonexistent_fails() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nonexistent.ini");

        let result = Config::load_from(&config_path);
        assert!(matches!(result, Err(ConfigError::Read(_))));
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let config_path = temp_dir.path().join("worker.ini");
        std::fs::write(&config_path, MINIMAL).unwrap();

        let config = Config::load_from(&config_path).unwrap();
        assert_eq!(config.general.addr, "10.0.0.1");
        assert_eq!(config.general.port, 10200);
        assert!(config.repl_servers.is_empty());
    }

    #[test]
    fn test_from_ini_str_matches_file() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let config_path = temp_dir.path().join("worker.ini");
        std::fs::write(&config_path, MINIMAL).unwrap();

        assert_eq!(
            Config::load_from(&config_path).unwrap(),
            Config::from_ini_str(MINIMAL).unwrap()
        );
    }
}
