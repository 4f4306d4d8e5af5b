/// Database connection and schema bootstrap
pub mod database;

/// Application settings loaded from config.toml
pub mod settings;
