use crate::core::error::ProfileError;
use crate::core::time;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Append-only audit trail of lifecycle transitions (`lifecycle.events.jsonl`).
pub struct Journal {
    path: PathBuf,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct JournalEvent {
    pub ts: String,
    pub event_id: String,
    pub op: String,
    pub profile_id: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl Journal {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    pub fn record(
        &self,
        op: &str,
        profile_id: &str,
        status: &str,
        detail: Option<&str>,
    ) -> Result<(), ProfileError> {
        let ev = JournalEvent {
            ts: time::now_iso8601(),
            event_id: time::new_event_id(),
            op: op.to_string(),
            profile_id: profile_id.to_string(),
            status: status.to_string(),
            detail: detail.map(|s| s.to_string()),
        };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(f, "{}", serde_json::to_string(&ev)?)?;
        Ok(())
    }

    /// Journal writes never fail a transition; problems are only logged.
    pub fn note(&self, op: &str, profile_id: &str, status: &str, detail: Option<&str>) {
        if let Err(e) = self.record(op, profile_id, status, detail) {
            log::warn!("failed to journal {} for {}: {}", op, profile_id, e);
        }
    }

    pub fn read_all(&self) -> Result<Vec<JournalEvent>, ProfileError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&self.path)?;
        let mut out = Vec::new();
        for line in content.lines().filter(|l| !l.trim().is_empty()) {
            out.push(serde_json::from_str(line)?);
        }
        Ok(out)
    }
}
