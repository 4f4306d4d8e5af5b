//! Application settings loaded from `config.toml`.
//!
//! The file is optional. When present it may list users to seed on startup,
//! which is handy for local development and demos:
//!
//! ```toml
//! [[users]]
//! username = "alice"
//! email = "alice@example.com"
//! ```

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;

/// Environment variable naming an alternative config file.
pub const CONFIG_PATH_ENV: &str = "SPLITBOOK_CONFIG";

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// Users to create on startup if they do not exist yet
    #[serde(default)]
    pub users: Vec<SeedUser>,
}

/// A user entry in config.toml
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct SeedUser {
    /// Unique handle
    pub username: String,
    /// Unique email address
    pub email: String,
}

/// Loads settings from a TOML file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
/// - Required fields are missing
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let path_ref = path.as_ref();
    tracing::debug!("Attempting to load configuration from: {:?}", path_ref);
    let contents = std::fs::read_to_string(path_ref).map_err(|e| Error::Config {
        message: format!("Failed to read config file {path_ref:?}: {e}"),
    })?;

    toml::from_str(&contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config file {path_ref:?}: {e}"),
    })
}

/// Loads settings from `$SPLITBOOK_CONFIG` or `./config.toml`.
///
/// A missing file is not an error and yields the default (empty) settings.
pub fn load_default_config() -> Result<Config> {
    let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| "config.toml".to_string());
    if !Path::new(&path).exists() {
        tracing::info!("No config file at {}, using defaults", path);
        return Ok(Config::default());
    }
    load_config(path)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn test_parse_seed_users() {
        let toml_str = r#"
            [[users]]
            username = "alice"
            email = "alice@example.com"

            [[users]]
            username = "bob"
            email = "bob@example.com"
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.users.len(), 2);
        assert_eq!(config.users[0].username, "alice");
        assert_eq!(config.users[1].email, "bob@example.com");
    }

    #[test]
    fn test_parse_empty_config() {
        let config: Config = toml::from_str("").unwrap();
        assert!(config.users.is_empty());
    }

    #[test]
    fn test_load_config_missing_file() {
        let result = load_config("definitely/not/here.toml");
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[test]
    fn test_parse_rejects_missing_email() {
        let toml_str = r#"
            [[users]]
            username = "alice"
        "#;
        assert!(toml::from_str::<Config>(toml_str).is_err());
    }
}
