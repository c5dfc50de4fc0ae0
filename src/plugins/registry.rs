//! Profile registry: what profiles exist on disk and which one starts current.

use crate::core::error::ProfileError;
use crate::core::profile::{ProfileInfo, ProfileMetadata};
use crate::core::store::meta_path;
use crate::core::time;
use std::fs;
use std::path::Path;

/// Display name for legacy folders named with a generated identifier.
pub const LEGACY_PLACEHOLDER_NAME: &str = "Profile";

pub fn read_metadata(folder: &Path) -> Option<ProfileMetadata> {
    let path = meta_path(folder);
    let data = fs::read(&path).ok()?;
    match serde_json::from_slice(&data) {
        Ok(meta) => Some(meta),
        Err(e) => {
            log::warn!("ignoring unreadable {}: {}", path.display(), e);
            None
        }
    }
}

/// Writes `profile.json` atomically (temp file, then rename).
pub fn write_metadata(folder: &Path, meta: &ProfileMetadata) -> Result<(), ProfileError> {
    fs::create_dir_all(folder)?;
    let path = meta_path(folder);
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, serde_json::to_vec_pretty(meta)?)?;
    fs::rename(&tmp, &path)?;
    Ok(())
}

fn inferred_name(folder_name: &str) -> String {
    if time::is_generated_id(folder_name) {
        LEGACY_PLACEHOLDER_NAME.to_string()
    } else {
        folder_name.to_string()
    }
}

/// Lists profiles under `profiles_dir`, oldest first.
///
/// The folder name is the profile id. Folders without readable metadata are
/// legacy profiles and sort after the rest, by id.
pub fn enumerate(profiles_dir: &Path) -> Result<Vec<ProfileInfo>, ProfileError> {
    if !profiles_dir.exists() {
        return Ok(Vec::new());
    }

    let mut found = Vec::new();
    for entry in fs::read_dir(profiles_dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().to_string();
        if name.starts_with('.') || !entry.file_type()?.is_dir() {
            continue;
        }
        let folder = entry.path();
        match read_metadata(&folder) {
            Some(meta) => {
                if meta.id != name {
                    log::warn!(
                        "profile.json in {} names id {}; using folder name",
                        folder.display(),
                        meta.id
                    );
                }
                found.push((Some(meta.created_at), ProfileInfo::new(name, meta.display_name)));
            }
            None => {
                let display_name = inferred_name(&name);
                found.push((None, ProfileInfo::new(name, display_name)));
            }
        }
    }

    // Dated profiles first (`None` sorts before `Some`, so compare flipped).
    found.sort_by(|(a_ts, a), (b_ts, b)| {
        a_ts.is_none()
            .cmp(&b_ts.is_none())
            .then(a_ts.cmp(b_ts))
            .then_with(|| a.id.cmp(&b.id))
    });
    Ok(found.into_iter().map(|(_, info)| info).collect())
}

/// Picks the profile to start with: the remembered one, else the default if
/// it exists on disk, else the first one, else the synthesized default.
pub fn resolve_initial(
    roster: &[ProfileInfo],
    last_used_id: Option<&str>,
    default: &ProfileInfo,
) -> ProfileInfo {
    if let Some(saved) = last_used_id {
        if let Some(found) = roster.iter().find(|p| p.id == saved) {
            return found.clone();
        }
    }
    if let Some(found) = roster.iter().find(|p| p.id == default.id) {
        return found.clone();
    }
    roster.first().cloned().unwrap_or_else(|| default.clone())
}
