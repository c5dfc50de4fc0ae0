//! Profile identity and the metadata sidecar persisted next to each store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileInfo {
    pub id: String,
    pub display_name: String,
}

impl ProfileInfo {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
        }
    }
}

/// Contents of `profile.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileMetadata {
    pub id: String,
    pub display_name: String,
    pub created_at: DateTime<Utc>,
}

impl ProfileMetadata {
    pub fn for_profile(profile: &ProfileInfo, created_at: DateTime<Utc>) -> Self {
        Self {
            id: profile.id.clone(),
            display_name: profile.display_name.clone(),
            created_at,
        }
    }
}
