use crate::core::db::{DataContext, StorageBackend};
use crate::core::error::ProfileError;
use crate::core::profile::ProfileInfo;
use crate::core::store::{Layout, StoreLocation, meta_path, sidecar_paths};
use std::fs;
use std::path::{Path, PathBuf};

/// What a purge left behind.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PurgeReport {
    /// Store files that could not be removed.
    pub residual: Vec<PathBuf>,
    /// User documents kept because the folder was not empty.
    pub kept_documents: Option<PathBuf>,
    pub removed_folder: bool,
}

fn remove_if_empty(dir: &Path) -> bool {
    match fs::read_dir(dir) {
        Ok(mut entries) => entries.next().is_none() && fs::remove_dir(dir).is_ok(),
        Err(_) => false,
    }
}

/// Irreversibly destroys a profile's store. Secrets are not touched.
///
/// Detaching the profile's store is the only step whose failure is
/// returned; everything after it is best effort.
pub fn purge<B: StorageBackend>(
    ctx: &mut DataContext<B>,
    layout: &Layout,
    profile: &ProfileInfo,
) -> Result<PurgeReport, ProfileError> {
    let store = layout.store_path(&profile.id);
    if ctx.attached() == Some(&StoreLocation::File(store.clone())) {
        ctx.detach()?;
    }

    if let Err(e) = ctx.destroy(&store) {
        log::warn!("backend could not destroy {}: {}", store.display(), e);
    }

    let mut report = PurgeReport::default();
    let mut files = vec![store.clone()];
    files.extend(sidecar_paths(&store));
    for file in files {
        let _ = fs::remove_file(&file);
        if file.exists() {
            report.residual.push(file);
        }
    }

    let folder = layout.profile_dir(&profile.id);
    let documents = layout.documents_dir(&profile.id);
    if documents.exists() && !remove_if_empty(&documents) {
        // The sidecar stays with the documents so the folder keeps its name.
        log::warn!(
            "keeping non-empty documents folder {} of purged profile {}",
            documents.display(),
            profile.id
        );
        report.kept_documents = Some(documents);
    } else {
        let _ = fs::remove_file(meta_path(&folder));
    }
    report.removed_folder = remove_if_empty(&folder);

    for file in &report.residual {
        log::warn!("purge of {} left {}", profile.id, file.display());
    }
    log::info!("purged profile {} ({})", profile.id, profile.display_name);
    Ok(report)
}
