//! Centralized file names and database schema definitions.
//!
//! Each profile owns one SQLite database ("the store") plus its WAL-mode
//! sidecars. The secret vault is a separate database at the data root.

// --- Data root layout ---
pub const PROFILES_DIR_NAME: &str = "Profiles";
pub const ARCHIVED_PROFILES_DIR_NAME: &str = "ArchivedProfiles";
pub const PROFILE_META_FILE_NAME: &str = "profile.json";
pub const PREFERENCES_FILE_NAME: &str = "preferences.json";
pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const JOURNAL_FILE_NAME: &str = "lifecycle.events.jsonl";

pub const DEFAULT_STORE_FILE_NAME: &str = "store.sqlite";
pub const DEFAULT_DOCUMENTS_DIR_NAME: &str = "Documents";
pub const DEFAULT_VAULT_FILE_NAME: &str = "secrets.sqlite";

/// Suffixes SQLite appends to the primary file name for its sidecars.
pub const STORE_SIDECAR_SUFFIXES: &[&str] = &["-wal", "-shm", "-journal"];

// --- Profile store ---
pub const STORE_DB_SCHEMA_RECORDS: &str = "
    CREATE TABLE IF NOT EXISTS records (
        kind TEXT NOT NULL,
        id TEXT NOT NULL,
        body TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        PRIMARY KEY (kind, id)
    )
";
pub const STORE_DB_SCHEMA_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_records_updated ON records(kind, updated_at)";

// --- Secret vault ---
pub const VAULT_DB_SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS secrets (
        service TEXT NOT NULL,
        account TEXT NOT NULL,
        secret BLOB NOT NULL,
        updated_at TEXT NOT NULL,
        PRIMARY KEY (service, account)
    )
";
