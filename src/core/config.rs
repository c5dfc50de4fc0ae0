//! Data-root configuration (`config.toml`).
//!
//! Every field is optional; a missing file yields the defaults.

use crate::core::error::ProfileError;
use crate::core::schemas;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_SERVICE: &str = "com.profilectl.app";
pub const ROOT_ENV_VAR: &str = "PROFILECTL_HOME";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultProfileConfig {
    pub id: String,
    pub display_name: String,
}

impl Default for DefaultProfileConfig {
    fn default() -> Self {
        Self {
            id: "player-one".to_string(),
            display_name: "Player One".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Namespace under which profile secrets are filed in the vault.
    pub service: String,
    pub store_file: String,
    pub documents_dir: String,
    /// Vault database location, relative to the data root.
    pub vault_path: PathBuf,
    pub default_profile: DefaultProfileConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service: DEFAULT_SERVICE.to_string(),
            store_file: schemas::DEFAULT_STORE_FILE_NAME.to_string(),
            documents_dir: schemas::DEFAULT_DOCUMENTS_DIR_NAME.to_string(),
            vault_path: PathBuf::from(schemas::DEFAULT_VAULT_FILE_NAME),
            default_profile: DefaultProfileConfig::default(),
        }
    }
}

impl Config {
    pub fn load(root: &Path) -> Result<Self, ProfileError> {
        let path = root.join(schemas::CONFIG_FILE_NAME);
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(&path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| ProfileError::ConfigError(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ProfileError> {
        if self.store_file.trim().is_empty() || self.store_file.contains(['/', '\\']) {
            return Err(ProfileError::ConfigError(format!(
                "store_file must be a plain file name, got {:?}",
                self.store_file
            )));
        }
        if self.documents_dir.trim().is_empty() || self.documents_dir.contains(['/', '\\']) {
            return Err(ProfileError::ConfigError(format!(
                "documents_dir must be a plain directory name, got {:?}",
                self.documents_dir
            )));
        }
        if self.default_profile.id.trim().is_empty() {
            return Err(ProfileError::ConfigError(
                "default_profile.id must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Resolves the data root: explicit flag, then `PROFILECTL_HOME`, then
/// `$HOME/Documents/Profilectl`.
pub fn resolve_root(explicit: Option<PathBuf>) -> Result<PathBuf, ProfileError> {
    if let Some(root) = explicit {
        return Ok(root);
    }
    if let Ok(root) = std::env::var(ROOT_ENV_VAR) {
        if !root.trim().is_empty() {
            return Ok(PathBuf::from(root));
        }
    }
    let home = std::env::var("HOME")?;
    Ok(PathBuf::from(home).join("Documents").join("Profilectl"))
}
