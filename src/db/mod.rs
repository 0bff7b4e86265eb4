//! SQLite-backed metadata store.
//!
//! Three logical tables: `albums` and `pictures` (the relational description
//! of the gallery tree) and `resources` (the file resource registry mapping
//! stable refs to filesystem paths). Query implementations are grouped by
//! table in the submodules; all of them hang off [`Database`].

mod schema;
pub mod albums;
pub mod pictures;
pub mod resources;

use rusqlite::Connection;
use std::path::Path;

use crate::error::Result;

pub use albums::{Album, AlbumUpdate, CaptionType, SortKey};
pub use pictures::Picture;
pub use schema::{MIGRATIONS, SCHEMA};

pub struct Database {
    pub(crate) conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        Ok(Self { conn })
    }

    pub fn initialize(&self) -> Result<()> {
        self.conn.execute_batch(SCHEMA)?;
        self.run_migrations()?;
        Ok(())
    }

    fn run_migrations(&self) -> Result<()> {
        for migration in MIGRATIONS {
            let _ = self.conn.execute(migration, []);
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::Database;
    use std::path::Path;

    /// Open and initialize a database inside a test directory.
    pub fn open_db(dir: &Path) -> Database {
        let db = Database::open(&dir.join("gallerist.db")).unwrap();
        db.initialize().unwrap();
        db
    }
}
