//! Storage backend and the data-access context layered over it.
//!
//! A [`StorageBackend`] binds to at most one store at a time. The
//! [`DataContext`] owns the backend together with the merge policy and the
//! in-memory object cache; it is the only handle collaborators read and
//! write records through.

use crate::core::error::ProfileError;
use crate::core::schemas;
use crate::core::store::{StoreLocation, sidecar_paths};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::Path;

pub fn db_connect(db_path: &str) -> Result<Connection, rusqlite::Error> {
    let conn = Connection::open(db_path)?;
    conn.busy_timeout(std::time::Duration::from_secs(5))?;
    conn.query_row("PRAGMA journal_mode=WAL;", [], |_| Ok(()))?;
    conn.execute("PRAGMA foreign_keys=ON;", [])?;
    Ok(conn)
}

fn initialize_store_db(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute(schemas::STORE_DB_SCHEMA_RECORDS, [])?;
    conn.execute(schemas::STORE_DB_SCHEMA_INDEX, [])?;
    Ok(())
}

/// Seam between the lifecycle coordinator and a concrete store engine.
pub trait StorageBackend {
    /// Binds to `location`. Must fail with [`ProfileError::AlreadyAttached`]
    /// while another store is still bound.
    fn attach(&mut self, location: &StoreLocation) -> Result<(), ProfileError>;
    /// Unbinds the current store. No-op when nothing is attached.
    fn detach(&mut self) -> Result<(), ProfileError>;
    fn attached(&self) -> Option<&StoreLocation>;
    /// Removes the store file at `path` and its sidecars, detaching first
    /// if it is the attached store.
    fn destroy(&mut self, path: &Path) -> Result<(), ProfileError>;
    fn connection(&self) -> Result<&Connection, ProfileError>;
}

#[derive(Default)]
pub struct SqliteBackend {
    attached: Option<(StoreLocation, Connection)>,
}

impl SqliteBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StorageBackend for SqliteBackend {
    fn attach(&mut self, location: &StoreLocation) -> Result<(), ProfileError> {
        if let Some((current, _)) = &self.attached {
            return Err(ProfileError::AlreadyAttached(current.to_string()));
        }
        let conn = match location {
            StoreLocation::File(path) => {
                let conn = db_connect(&path.to_string_lossy()).map_err(|source| {
                    ProfileError::AttachError {
                        path: path.clone(),
                        source,
                    }
                })?;
                initialize_store_db(&conn).map_err(|source| ProfileError::AttachError {
                    path: path.clone(),
                    source,
                })?;
                conn
            }
            StoreLocation::InMemory => {
                let conn = Connection::open_in_memory()?;
                initialize_store_db(&conn)?;
                conn
            }
        };
        self.attached = Some((location.clone(), conn));
        Ok(())
    }

    fn detach(&mut self) -> Result<(), ProfileError> {
        if let Some((location, conn)) = self.attached.take() {
            if let Err((conn, e)) = conn.close() {
                // Keep the handle so the invariant still reflects reality.
                self.attached = Some((location, conn));
                return Err(ProfileError::RusqliteError(e));
            }
            log::debug!("detached store {}", location);
        }
        Ok(())
    }

    fn attached(&self) -> Option<&StoreLocation> {
        self.attached.as_ref().map(|(location, _)| location)
    }

    fn destroy(&mut self, path: &Path) -> Result<(), ProfileError> {
        let is_attached =
            matches!(self.attached(), Some(StoreLocation::File(p)) if p.as_path() == path);
        if is_attached {
            self.detach()?;
        }
        let mut targets = vec![path.to_path_buf()];
        targets.extend(sidecar_paths(path));
        for target in targets {
            match fs::remove_file(&target) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(ProfileError::DestroyError(format!(
                        "{}: {}",
                        target.display(),
                        e
                    )));
                }
            }
        }
        Ok(())
    }

    fn connection(&self) -> Result<&Connection, ProfileError> {
        self.attached
            .as_ref()
            .map(|(_, conn)| conn)
            .ok_or(ProfileError::NotAttached)
    }
}

/// How writes through the context reconcile with what is already stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConflictPolicy {
    /// A write replaces the stored row unless the stored row is newer.
    #[default]
    NewerLocalWins,
    /// An existing row is never overwritten.
    KeepStored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergePolicy {
    /// Re-read rows changed underneath the cache instead of serving stale copies.
    pub merge_external_changes: bool,
    pub conflict: ConflictPolicy,
}

impl Default for MergePolicy {
    fn default() -> Self {
        Self {
            merge_external_changes: true,
            conflict: ConflictPolicy::NewerLocalWins,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub kind: String,
    pub id: String,
    pub body: serde_json::Value,
    pub updated_at: DateTime<Utc>,
}

impl Record {
    pub fn new(kind: &str, id: &str, body: serde_json::Value) -> Self {
        Self {
            kind: kind.to_string(),
            id: id.to_string(),
            body,
            updated_at: Utc::now(),
        }
    }
}

fn stamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_stamp(raw: &str) -> Result<DateTime<Utc>, rusqlite::Error> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
        })
}

fn row_to_record(row: &rusqlite::Row<'_>) -> Result<Record, rusqlite::Error> {
    let body: String = row.get(2)?;
    let updated_at: String = row.get(3)?;
    Ok(Record {
        kind: row.get(0)?,
        id: row.get(1)?,
        body: serde_json::from_str(&body).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
        })?,
        updated_at: parse_stamp(&updated_at)?,
    })
}

type CacheKey = (String, String);

/// The live data-access layer: one backend, its merge policy and the cache
/// of records faulted in from the attached store.
pub struct DataContext<B: StorageBackend> {
    backend: B,
    policy: MergePolicy,
    cache: HashMap<CacheKey, Record>,
}

impl<B: StorageBackend> DataContext<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            policy: MergePolicy::default(),
            cache: HashMap::new(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn policy(&self) -> MergePolicy {
        self.policy
    }

    pub(crate) fn configure(&mut self, policy: MergePolicy) {
        self.policy = policy;
    }

    pub fn attached(&self) -> Option<&StoreLocation> {
        self.backend.attached()
    }

    pub(crate) fn attach(&mut self, location: &StoreLocation) -> Result<(), ProfileError> {
        self.backend.attach(location)
    }

    pub(crate) fn detach(&mut self) -> Result<(), ProfileError> {
        self.backend.detach()?;
        self.cache.clear();
        Ok(())
    }

    /// Discards every cached record.
    pub(crate) fn reset(&mut self) {
        self.cache.clear();
    }

    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }

    pub(crate) fn destroy(&mut self, path: &Path) -> Result<(), ProfileError> {
        let was_attached =
            matches!(self.backend.attached(), Some(StoreLocation::File(p)) if p.as_path() == path);
        self.backend.destroy(path)?;
        if was_attached {
            self.cache.clear();
        }
        Ok(())
    }

    /// Writes `record`. Returns false when the conflict policy kept the
    /// stored row instead.
    pub fn put(&mut self, record: &Record) -> Result<bool, ProfileError> {
        let conn = self.backend.connection()?;
        let body = serde_json::to_string(&record.body)?;
        let sql = match self.policy.conflict {
            ConflictPolicy::NewerLocalWins => {
                "INSERT INTO records(kind, id, body, updated_at) VALUES(?1, ?2, ?3, ?4)
                 ON CONFLICT(kind, id) DO UPDATE SET body = excluded.body, updated_at = excluded.updated_at
                 WHERE excluded.updated_at >= records.updated_at"
            }
            ConflictPolicy::KeepStored => {
                "INSERT INTO records(kind, id, body, updated_at) VALUES(?1, ?2, ?3, ?4)
                 ON CONFLICT(kind, id) DO NOTHING"
            }
        };
        let changed = conn.execute(
            sql,
            params![record.kind, record.id, body, stamp(&record.updated_at)],
        )?;
        let key = (record.kind.clone(), record.id.clone());
        if changed > 0 {
            self.cache.insert(key, record.clone());
        } else {
            self.cache.remove(&key);
        }
        Ok(changed > 0)
    }

    pub fn get(&mut self, kind: &str, id: &str) -> Result<Option<Record>, ProfileError> {
        let key = (kind.to_string(), id.to_string());
        let conn = self.backend.connection()?;
        if let Some(cached) = self.cache.get(&key) {
            if !self.policy.merge_external_changes {
                return Ok(Some(cached.clone()));
            }
            let stored: Option<String> = conn
                .query_row(
                    "SELECT updated_at FROM records WHERE kind = ?1 AND id = ?2",
                    params![kind, id],
                    |row| row.get(0),
                )
                .optional()?;
            if stored.as_deref() == Some(stamp(&cached.updated_at).as_str()) {
                return Ok(Some(cached.clone()));
            }
        }
        let fetched = conn
            .query_row(
                "SELECT kind, id, body, updated_at FROM records WHERE kind = ?1 AND id = ?2",
                params![kind, id],
                row_to_record,
            )
            .optional()?;
        match &fetched {
            Some(record) => {
                self.cache.insert(key, record.clone());
            }
            None => {
                self.cache.remove(&key);
            }
        }
        Ok(fetched)
    }

    pub fn list(&mut self, kind: &str) -> Result<Vec<Record>, ProfileError> {
        let conn = self.backend.connection()?;
        let mut stmt = conn.prepare(
            "SELECT kind, id, body, updated_at FROM records WHERE kind = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![kind], row_to_record)?;
        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        drop(stmt);
        for record in &out {
            self.cache
                .insert((record.kind.clone(), record.id.clone()), record.clone());
        }
        Ok(out)
    }

    pub fn remove(&mut self, kind: &str, id: &str) -> Result<bool, ProfileError> {
        let conn = self.backend.connection()?;
        let changed = conn.execute(
            "DELETE FROM records WHERE kind = ?1 AND id = ?2",
            params![kind, id],
        )?;
        self.cache.remove(&(kind.to_string(), id.to_string()));
        Ok(changed > 0)
    }
}
