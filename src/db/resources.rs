//! File resource registry.
//!
//! Maps stable integer refs to filesystem paths. The registry is the
//! authoritative indirection between picture/album records and the
//! filesystem; records never store raw paths.

use rusqlite::params;
use std::path::{Path, PathBuf};

use super::Database;
use crate::error::Result;

impl Database {
    /// Register a path, returning its ref. Re-registering an already known
    /// path returns the existing ref.
    pub fn register_resource(&self, path: &Path) -> Result<i64> {
        if let Some(id) = self.find_resource_by_path(path)? {
            return Ok(id);
        }
        let path_str = path.to_string_lossy();
        self.conn.execute(
            "INSERT INTO resources (path) VALUES (?)",
            params![path_str.as_ref()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Resolve a ref to its registered path. None when the ref is unknown;
    /// resolvability says nothing about on-disk existence.
    pub fn resolve_resource(&self, id: i64) -> Result<Option<PathBuf>> {
        let result = self.conn.query_row(
            "SELECT path FROM resources WHERE id = ?",
            [id],
            |row| row.get::<_, String>(0),
        );
        match result {
            Ok(path) => Ok(Some(PathBuf::from(path))),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn find_resource_by_path(&self, path: &Path) -> Result<Option<i64>> {
        let path_str = path.to_string_lossy();
        let result = self.conn.query_row(
            "SELECT id FROM resources WHERE path = ?",
            [path_str.as_ref()],
            |row| row.get(0),
        );
        match result {
            Ok(id) => Ok(Some(id)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn update_resource_path(&self, id: i64, new_path: &Path) -> Result<()> {
        let path_str = new_path.to_string_lossy();
        self.conn.execute(
            "UPDATE resources SET path = ? WHERE id = ?",
            params![path_str.as_ref(), id],
        )?;
        Ok(())
    }

    pub fn remove_resource(&self, id: i64) -> Result<()> {
        self.conn
            .execute("DELETE FROM resources WHERE id = ?", [id])?;
        Ok(())
    }
}
