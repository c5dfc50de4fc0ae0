//! General preference store plus per-profile key namespacing.
//!
//! Preferences live in one JSON object file at the data root. Profile-scoped
//! entries share that file; [`namespaced_key`] keeps them apart.

use crate::core::error::ProfileError;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

/// Global (not namespaced) key remembering the last active profile.
pub const LAST_PROFILE_ID_KEY: &str = "last_profile_id";

pub fn namespaced_key(raw: &str, profile_id: &str) -> String {
    format!("profile:{}:{}", profile_id, raw)
}

pub struct Preferences {
    path: PathBuf,
    values: Map<String, Value>,
}

impl Preferences {
    /// Loads `path`; a missing file is an empty store.
    pub fn load(path: &Path) -> Result<Self, ProfileError> {
        let values = if path.exists() {
            let content = fs::read_to_string(path)?;
            if content.trim().is_empty() {
                Map::new()
            } else {
                serde_json::from_str(&content)?
            }
        } else {
            Map::new()
        };
        Ok(Self {
            path: path.to_path_buf(),
            values,
        })
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(Value::as_str)
    }

    pub fn set(&mut self, key: &str, value: Value) -> Result<(), ProfileError> {
        self.values.insert(key.to_string(), value);
        self.save()
    }

    pub fn remove(&mut self, key: &str) -> Result<bool, ProfileError> {
        let existed = self.values.remove(key).is_some();
        if existed {
            self.save()?;
        }
        Ok(existed)
    }

    pub fn get_for(&self, raw: &str, profile_id: &str) -> Option<&Value> {
        self.get(&namespaced_key(raw, profile_id))
    }

    pub fn set_for(&mut self, raw: &str, profile_id: &str, value: Value) -> Result<(), ProfileError> {
        self.set(&namespaced_key(raw, profile_id), value)
    }

    pub fn remove_for(&mut self, raw: &str, profile_id: &str) -> Result<bool, ProfileError> {
        self.remove(&namespaced_key(raw, profile_id))
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.values.keys()
    }

    fn save(&self) -> Result<(), ProfileError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(&self.values)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}
