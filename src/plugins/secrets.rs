//! Per-profile credentials.
//!
//! [`SecretStore`] files one secret per profile under a fixed service
//! namespace in a [`SecretVault`]. The default vault is a SQLite file that
//! only the owning user can read; [`MemoryVault`] keeps secrets for the
//! lifetime of the process.

use crate::core::error::ProfileError;
use crate::core::schemas;
use crate::core::time;
use rusqlite::{Connection, OptionalExtension, params};
use sha2::{Digest, Sha256};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

pub trait SecretVault {
    /// Stores `secret`, replacing any existing entry.
    fn set(&self, service: &str, account: &str, secret: &[u8]) -> Result<(), ProfileError>;
    fn get(&self, service: &str, account: &str) -> Result<Option<Vec<u8>>, ProfileError>;
    /// Removes the entry. Absent entries are not an error.
    fn delete(&self, service: &str, account: &str) -> Result<(), ProfileError>;
}

fn vault_err(e: rusqlite::Error) -> ProfileError {
    ProfileError::VaultError(e.to_string())
}

pub struct SqliteVault {
    conn: Connection,
}

impl SqliteVault {
    pub fn open(path: &Path) -> Result<Self, ProfileError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path).map_err(vault_err)?;
        conn.busy_timeout(std::time::Duration::from_secs(5))
            .map_err(vault_err)?;
        conn.execute(schemas::VAULT_DB_SCHEMA, []).map_err(vault_err)?;
        restrict_to_owner(path)?;
        Ok(Self { conn })
    }
}

#[cfg(unix)]
fn restrict_to_owner(path: &Path) -> Result<(), ProfileError> {
    use std::os::unix::fs::PermissionsExt;
    if path.exists() {
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    }
    Ok(())
}

#[cfg(not(unix))]
fn restrict_to_owner(_path: &Path) -> Result<(), ProfileError> {
    Ok(())
}

impl SecretVault for SqliteVault {
    fn set(&self, service: &str, account: &str, secret: &[u8]) -> Result<(), ProfileError> {
        self.conn
            .execute(
                "INSERT INTO secrets(service, account, secret, updated_at) VALUES(?1, ?2, ?3, ?4)
                 ON CONFLICT(service, account) DO UPDATE SET secret = excluded.secret, updated_at = excluded.updated_at",
                params![service, account, secret, time::now_iso8601()],
            )
            .map_err(vault_err)?;
        Ok(())
    }

    fn get(&self, service: &str, account: &str) -> Result<Option<Vec<u8>>, ProfileError> {
        self.conn
            .query_row(
                "SELECT secret FROM secrets WHERE service = ?1 AND account = ?2",
                params![service, account],
                |row| row.get(0),
            )
            .optional()
            .map_err(vault_err)
    }

    fn delete(&self, service: &str, account: &str) -> Result<(), ProfileError> {
        self.conn
            .execute(
                "DELETE FROM secrets WHERE service = ?1 AND account = ?2",
                params![service, account],
            )
            .map_err(vault_err)?;
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryVault {
    entries: RefCell<HashMap<(String, String), Vec<u8>>>,
}

impl MemoryVault {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SecretVault for MemoryVault {
    fn set(&self, service: &str, account: &str, secret: &[u8]) -> Result<(), ProfileError> {
        self.entries
            .borrow_mut()
            .insert((service.to_string(), account.to_string()), secret.to_vec());
        Ok(())
    }

    fn get(&self, service: &str, account: &str) -> Result<Option<Vec<u8>>, ProfileError> {
        Ok(self
            .entries
            .borrow()
            .get(&(service.to_string(), account.to_string()))
            .cloned())
    }

    fn delete(&self, service: &str, account: &str) -> Result<(), ProfileError> {
        self.entries
            .borrow_mut()
            .remove(&(service.to_string(), account.to_string()));
        Ok(())
    }
}

pub fn password_account(profile_id: &str) -> String {
    format!("profile-password-{}", profile_id)
}

pub struct SecretStore<V: SecretVault> {
    vault: V,
    service: String,
}

impl<V: SecretVault> SecretStore<V> {
    pub fn new(vault: V, service: &str) -> Self {
        Self {
            vault,
            service: service.to_string(),
        }
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn vault(&self) -> &V {
        &self.vault
    }

    pub fn set(&self, secret: &[u8], profile_id: &str) -> Result<(), ProfileError> {
        self.vault
            .set(&self.service, &password_account(profile_id), secret)
    }

    pub fn get(&self, profile_id: &str) -> Result<Option<Vec<u8>>, ProfileError> {
        self.vault.get(&self.service, &password_account(profile_id))
    }

    pub fn exists(&self, profile_id: &str) -> Result<bool, ProfileError> {
        Ok(self.get(profile_id)?.is_some())
    }

    pub fn delete(&self, profile_id: &str) -> Result<(), ProfileError> {
        self.vault
            .delete(&self.service, &password_account(profile_id))
    }

    /// False when no secret is stored for the profile.
    pub fn verify(&self, candidate: &[u8], profile_id: &str) -> Result<bool, ProfileError> {
        let Some(stored) = self.get(profile_id)? else {
            return Ok(false);
        };
        Ok(Sha256::digest(candidate) == Sha256::digest(&stored))
    }
}
