use rusqlite;
use std::env;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProfileError {
    #[error("SQLite error: {0}")]
    RusqliteError(#[from] rusqlite::Error),
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Environment variable error: {0}")]
    EnvVarError(#[from] env::VarError),
    #[error("Failed to attach store at {path}: {source}")]
    AttachError {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },
    #[error("A store is already attached: {0}")]
    AlreadyAttached(String),
    #[error("No store is attached")]
    NotAttached,
    #[error("Failed to destroy store: {0}")]
    DestroyError(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Invalid profile name: {0:?}")]
    InvalidName(String),
    #[error("Secret vault error: {0}")]
    VaultError(String),
}
