//! Picture records and the picture table operations.

use rusqlite::params;

use super::Database;
use crate::error::Result;

/// A picture row: one file reference owned by one album.
#[derive(Debug, Clone)]
pub struct Picture {
    pub id: i64,
    /// Owning album id.
    pub pid: i64,
    /// File ref into the resource registry.
    pub resource_id: i64,
    /// Order weight; strictly increasing within an album, gaps of 10.
    pub sorting: i64,
    pub caption: Option<String>,
    pub owner: i64,
    pub created_at: String,
}

const PICTURE_COLUMNS: &str = "id, pid, resource_id, sorting, caption, owner, created_at";

fn map_picture(row: &rusqlite::Row<'_>) -> rusqlite::Result<Picture> {
    Ok(Picture {
        id: row.get(0)?,
        pid: row.get(1)?,
        resource_id: row.get(2)?,
        sorting: row.get(3)?,
        caption: row.get(4)?,
        owner: row.get(5)?,
        created_at: row.get(6)?,
    })
}

impl Database {
    pub fn insert_picture(
        &self,
        pid: i64,
        resource_id: i64,
        sorting: i64,
        owner: i64,
    ) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO pictures (pid, resource_id, sorting, owner) VALUES (?, ?, ?, ?)",
            params![pid, resource_id, sorting, owner],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn get_picture(&self, id: i64) -> Result<Option<Picture>> {
        let result = self.conn.query_row(
            &format!("SELECT {PICTURE_COLUMNS} FROM pictures WHERE id = ?"),
            [id],
            map_picture,
        );
        match result {
            Ok(picture) => Ok(Some(picture)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// All pictures of an album in manual order.
    pub fn pictures_in_album(&self, pid: i64) -> Result<Vec<Picture>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {PICTURE_COLUMNS} FROM pictures WHERE pid = ? ORDER BY sorting, id"
        ))?;
        let pictures = stmt
            .query_map([pid], map_picture)?
            .filter_map(|r| r.ok())
            .collect();
        Ok(pictures)
    }

    /// Next free order weight for an album (max + 10, starting at 10).
    pub fn next_sorting(&self, pid: i64) -> Result<i64> {
        let max: i64 = self.conn.query_row(
            "SELECT COALESCE(MAX(sorting), 0) FROM pictures WHERE pid = ?",
            [pid],
            |row| row.get(0),
        )?;
        Ok(max + 10)
    }

    pub fn set_picture_sorting(&self, id: i64, sorting: i64) -> Result<()> {
        self.conn.execute(
            "UPDATE pictures SET sorting = ? WHERE id = ?",
            params![sorting, id],
        )?;
        Ok(())
    }

    pub fn set_picture_caption(&self, id: i64, caption: Option<&str>) -> Result<()> {
        self.conn.execute(
            "UPDATE pictures SET caption = ? WHERE id = ?",
            params![caption, id],
        )?;
        Ok(())
    }

    pub fn delete_picture_record(&self, id: i64) -> Result<()> {
        self.conn
            .execute("DELETE FROM pictures WHERE id = ?", [id])?;
        Ok(())
    }

    /// Number of pictures (across all albums) referencing a file ref.
    pub fn count_pictures_for_resource(&self, resource_id: i64) -> Result<i64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(id) FROM pictures WHERE resource_id = ?",
            [resource_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Resolved paths of every file referenced by an album's pictures.
    pub fn picture_paths_in_album(&self, pid: i64) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT r.path FROM pictures p JOIN resources r ON p.resource_id = r.id WHERE p.pid = ?",
        )?;
        let paths = stmt
            .query_map([pid], |row| row.get(0))?
            .filter_map(|r| r.ok())
            .collect();
        Ok(paths)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::open_db;
    use std::path::Path;
    use tempfile::tempdir;

    #[test]
    fn test_sorting_starts_at_ten_and_steps_by_ten() {
        let dir = tempdir().unwrap();
        let db = open_db(dir.path());

        let album = db.insert_album(0, "a", 1).unwrap();
        assert_eq!(db.next_sorting(album).unwrap(), 10);

        let res = db.register_resource(Path::new("/tmp/a.jpg")).unwrap();
        db.insert_picture(album, res, 10, 1).unwrap();
        assert_eq!(db.next_sorting(album).unwrap(), 20);
    }

    #[test]
    fn test_pictures_in_album_ordered_by_sorting() {
        let dir = tempdir().unwrap();
        let db = open_db(dir.path());

        let album = db.insert_album(0, "a", 1).unwrap();
        let r1 = db.register_resource(Path::new("/tmp/x.jpg")).unwrap();
        let r2 = db.register_resource(Path::new("/tmp/y.jpg")).unwrap();
        let late = db.insert_picture(album, r1, 30, 1).unwrap();
        let early = db.insert_picture(album, r2, 10, 1).unwrap();

        let pictures = db.pictures_in_album(album).unwrap();
        assert_eq!(
            pictures.iter().map(|p| p.id).collect::<Vec<_>>(),
            vec![early, late]
        );
    }

    #[test]
    fn test_caption_can_be_set_and_cleared() {
        let dir = tempdir().unwrap();
        let db = open_db(dir.path());

        let album = db.insert_album(0, "a", 1).unwrap();
        let res = db.register_resource(Path::new("/tmp/c.jpg")).unwrap();
        let id = db.insert_picture(album, res, 10, 1).unwrap();

        db.set_picture_caption(id, Some("dawn over the bay")).unwrap();
        assert_eq!(
            db.get_picture(id).unwrap().unwrap().caption.as_deref(),
            Some("dawn over the bay")
        );

        db.set_picture_caption(id, None).unwrap();
        assert!(db.get_picture(id).unwrap().unwrap().caption.is_none());
    }

    #[test]
    fn test_count_pictures_for_resource_spans_albums() {
        let dir = tempdir().unwrap();
        let db = open_db(dir.path());

        let a = db.insert_album(0, "a", 1).unwrap();
        let b = db.insert_album(0, "b", 1).unwrap();
        let shared = db.register_resource(Path::new("/tmp/shared.jpg")).unwrap();
        db.insert_picture(a, shared, 10, 1).unwrap();
        db.insert_picture(b, shared, 10, 1).unwrap();

        assert_eq!(db.count_pictures_for_resource(shared).unwrap(), 2);
    }
}
