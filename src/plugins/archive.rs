use crate::core::error::ProfileError;
use crate::core::profile::{ProfileInfo, ProfileMetadata};
use crate::core::store::{Layout, meta_path};
use crate::core::time;
use crate::plugins::registry;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

static HYPHEN_RUNS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"-{2,}").unwrap());

/// Folder-safe form of a display name: lowercase alphanumerics joined by
/// single hyphens.
pub fn slug(name: &str) -> String {
    let mapped: String = name
        .trim()
        .to_lowercase()
        .chars()
        .filter_map(|ch| {
            if ch.is_alphanumeric() {
                Some(ch)
            } else if ch.is_whitespace() || ch == '-' || ch == '_' {
                Some('-')
            } else {
                None
            }
        })
        .collect();
    HYPHEN_RUNS
        .replace_all(&mapped, "-")
        .trim_matches('-')
        .to_string()
}

pub fn short_id(id: &str) -> String {
    id.chars().take(8).collect()
}

/// `<timestamp>-<slug>-<shortId>`; an empty slug becomes `profile`.
pub fn archive_folder_name(ts: DateTime<Utc>, profile: &ProfileInfo) -> String {
    let name_slug = slug(&profile.display_name);
    let name_slug = if name_slug.is_empty() {
        "profile".to_string()
    } else {
        name_slug
    };
    format!("{}-{}-{}", time::iso8601(ts), name_slug, short_id(&profile.id))
}

fn unique_destination(archive_dir: &Path, base: &str) -> PathBuf {
    let mut candidate = archive_dir.join(base);
    let mut n = 2;
    while candidate.exists() {
        candidate = archive_dir.join(format!("{}-{}", base, n));
        n += 1;
    }
    candidate
}

/// Moves the profile's storage root into the archive area.
///
/// Returns the new folder, or `None` when there was nothing to move. The
/// profile's secret is left alone so a manually restored folder can still
/// unlock.
pub fn archive(layout: &Layout, profile: &ProfileInfo) -> Result<Option<PathBuf>, ProfileError> {
    let src = layout.profile_dir(&profile.id);
    if !src.exists() {
        log::info!(
            "profile {} has no folder at {}; treating as already archived",
            profile.id,
            src.display()
        );
        return Ok(None);
    }

    let archive_dir = layout.archive_dir();
    fs::create_dir_all(&archive_dir)?;
    let dst = unique_destination(&archive_dir, &archive_folder_name(time::now(), profile));
    fs::rename(&src, &dst)?;
    log::info!("archived profile {} to {}", profile.id, dst.display());

    // Legacy profiles never had a sidecar; capture the friendly name now.
    if !meta_path(&dst).exists() {
        let meta = ProfileMetadata::for_profile(profile, time::now());
        if let Err(e) = registry::write_metadata(&dst, &meta) {
            log::warn!("could not write profile.json into {}: {}", dst.display(), e);
        }
    }
    Ok(Some(dst))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchivedProfile {
    pub folder: String,
    pub path: PathBuf,
    pub metadata: Option<ProfileMetadata>,
}

pub fn list_archived(layout: &Layout) -> Result<Vec<ArchivedProfile>, ProfileError> {
    let archive_dir = layout.archive_dir();
    if !archive_dir.exists() {
        return Ok(Vec::new());
    }
    let mut out = Vec::new();
    for entry in fs::read_dir(&archive_dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let folder = entry.file_name().to_string_lossy().to_string();
        if folder.starts_with('.') {
            continue;
        }
        let path = entry.path();
        let metadata = registry::read_metadata(&path);
        out.push(ArchivedProfile {
            folder,
            path,
            metadata,
        });
    }
    // Folder names start with the timestamp, so this is oldest first.
    out.sort_by(|a, b| a.folder.cmp(&b.folder));
    Ok(out)
}
