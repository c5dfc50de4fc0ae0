//! On-disk layout of the data root.
//!
//! A [`Layout`] is the only place that knows where a profile's storage root,
//! store file, documents folder and metadata sidecar live. Everything else
//! asks it for paths.

use crate::core::config::Config;
use crate::core::error::ProfileError;
use crate::core::schemas;
use std::fs;
use std::path::{Path, PathBuf};

/// Where a backend should attach.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLocation {
    /// A profile's primary database file.
    File(PathBuf),
    /// Transient store used while no persisted profile is selected.
    InMemory,
}

impl std::fmt::Display for StoreLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreLocation::File(path) => write!(f, "{}", path.display()),
            StoreLocation::InMemory => write!(f, ":memory:"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Layout {
    /// Absolute path to the data root directory
    pub root: PathBuf,
    pub config: Config,
}

impl Layout {
    pub fn new(root: impl Into<PathBuf>, config: Config) -> Self {
        Self {
            root: root.into(),
            config,
        }
    }

    /// Builds a layout for `root`, reading `config.toml` if present.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, ProfileError> {
        let root = root.into();
        let config = Config::load(&root)?;
        Ok(Self { root, config })
    }

    pub fn profiles_dir(&self) -> PathBuf {
        self.root.join(schemas::PROFILES_DIR_NAME)
    }

    pub fn archive_dir(&self) -> PathBuf {
        self.root.join(schemas::ARCHIVED_PROFILES_DIR_NAME)
    }

    pub fn profile_dir(&self, id: &str) -> PathBuf {
        self.profiles_dir().join(id)
    }

    pub fn store_path(&self, id: &str) -> PathBuf {
        self.profile_dir(id).join(&self.config.store_file)
    }

    pub fn store_location(&self, id: &str) -> StoreLocation {
        StoreLocation::File(self.store_path(id))
    }

    pub fn documents_dir(&self, id: &str) -> PathBuf {
        self.profile_dir(id).join(&self.config.documents_dir)
    }

    pub fn preferences_path(&self) -> PathBuf {
        self.root.join(schemas::PREFERENCES_FILE_NAME)
    }

    pub fn vault_path(&self) -> PathBuf {
        self.root.join(&self.config.vault_path)
    }

    pub fn journal_path(&self) -> PathBuf {
        self.root.join(schemas::JOURNAL_FILE_NAME)
    }

    /// Creates the profile's storage root and documents folder if missing.
    pub fn ensure_profile_folders(&self, id: &str) -> Result<PathBuf, ProfileError> {
        let dir = self.profile_dir(id);
        fs::create_dir_all(self.documents_dir(id))?;
        Ok(dir)
    }
}

pub fn meta_path(folder: &Path) -> PathBuf {
    folder.join(schemas::PROFILE_META_FILE_NAME)
}

/// Sidecar paths SQLite may leave next to `primary`.
pub fn sidecar_paths(primary: &Path) -> Vec<PathBuf> {
    schemas::STORE_SIDECAR_SUFFIXES
        .iter()
        .map(|suffix| {
            let mut name = primary.as_os_str().to_os_string();
            name.push(suffix);
            PathBuf::from(name)
        })
        .collect()
}
