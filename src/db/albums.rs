//! Album records and the album table operations.

use rusqlite::params;

use super::Database;
use crate::error::Result;

/// How an album caption is interpreted by the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaptionType {
    #[default]
    Text,
    Markdown,
}

impl CaptionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CaptionType::Text => "text",
            CaptionType::Markdown => "markdown",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "text" => Some(CaptionType::Text),
            "markdown" => Some(CaptionType::Markdown),
            _ => None,
        }
    }
}

/// Sort key for recomputing picture order weights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    None,
    NameAsc,
    NameDesc,
    DateAsc,
    DateDesc,
}

impl SortKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::None => "none",
            SortKey::NameAsc => "name_asc",
            SortKey::NameDesc => "name_desc",
            SortKey::DateAsc => "date_asc",
            SortKey::DateDesc => "date_desc",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "none" => Some(SortKey::None),
            "name_asc" => Some(SortKey::NameAsc),
            "name_desc" => Some(SortKey::NameDesc),
            "date_asc" => Some(SortKey::DateAsc),
            "date_desc" => Some(SortKey::DateDesc),
            _ => None,
        }
    }
}

/// An album row: one node of the gallery tree.
#[derive(Debug, Clone)]
pub struct Album {
    pub id: i64,
    /// Parent album id, 0 = root.
    pub pid: i64,
    pub name: String,
    /// Globally unique slug; None until folder binding has run.
    pub alias: Option<String>,
    pub owner: i64,
    /// Resource ref of the bound directory; exactly one per bound album.
    pub assigned_dir: Option<i64>,
    /// Picture id of the thumbnail candidate, if any.
    pub thumb: Option<i64>,
    pub caption: Option<String>,
    pub caption_type: CaptionType,
    pub sort_key: SortKey,
    pub file_prefix: Option<String>,
    pub preserve_filenames: bool,
    pub published: bool,
    pub created_at: String,
}

/// Mutable album fields accepted by `AlbumStore::update`.
#[derive(Debug, Clone, Default)]
pub struct AlbumUpdate {
    pub name: Option<String>,
    pub caption: Option<String>,
    pub caption_type: Option<CaptionType>,
    pub file_prefix: Option<String>,
    pub preserve_filenames: Option<bool>,
    pub published: Option<bool>,
}

const ALBUM_COLUMNS: &str = "id, pid, name, alias, owner, assigned_dir, thumb, \
     caption, caption_type, sort_key, file_prefix, preserve_filenames, published, created_at";

fn map_album(row: &rusqlite::Row<'_>) -> rusqlite::Result<Album> {
    Ok(Album {
        id: row.get(0)?,
        pid: row.get(1)?,
        name: row.get(2)?,
        alias: row.get(3)?,
        owner: row.get(4)?,
        assigned_dir: row.get(5)?,
        thumb: row.get(6)?,
        caption: row.get(7)?,
        caption_type: CaptionType::from_str(&row.get::<_, String>(8)?).unwrap_or_default(),
        sort_key: SortKey::from_str(&row.get::<_, String>(9)?).unwrap_or_default(),
        file_prefix: row.get(10)?,
        preserve_filenames: row.get::<_, i64>(11)? != 0,
        published: row.get::<_, i64>(12)? != 0,
        created_at: row.get(13)?,
    })
}

impl Database {
    pub fn insert_album(&self, pid: i64, name: &str, owner: i64) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO albums (pid, name, owner) VALUES (?, ?, ?)",
            params![pid, name, owner],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn get_album(&self, id: i64) -> Result<Option<Album>> {
        let result = self.conn.query_row(
            &format!("SELECT {ALBUM_COLUMNS} FROM albums WHERE id = ?"),
            [id],
            map_album,
        );
        match result {
            Ok(album) => Ok(Some(album)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Ids of every album below `id`, the requested album excluded. Callers
    /// treat the result as a set; traversal order is not part of the
    /// contract.
    pub fn child_album_ids(&self, id: i64) -> Result<Vec<i64>> {
        let mut result = Vec::new();
        let mut frontier = vec![id];

        while let Some(current) = frontier.pop() {
            let mut stmt = self
                .conn
                .prepare("SELECT id FROM albums WHERE pid = ? ORDER BY id")?;
            let children: Vec<i64> = stmt
                .query_map([current], |row| row.get(0))?
                .filter_map(|r| r.ok())
                .collect();
            result.extend(&children);
            frontier.extend(children);
        }

        Ok(result)
    }

    /// True when another album already uses `alias`.
    pub fn alias_taken(&self, alias: &str, exclude_album: i64) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(id) FROM albums WHERE alias = ? AND id != ?",
            params![alias, exclude_album],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    pub fn set_album_alias(&self, id: i64, alias: &str) -> Result<()> {
        self.conn.execute(
            "UPDATE albums SET alias = ? WHERE id = ?",
            params![alias, id],
        )?;
        Ok(())
    }

    pub fn set_album_assigned_dir(&self, id: i64, resource_id: i64) -> Result<()> {
        self.conn.execute(
            "UPDATE albums SET assigned_dir = ? WHERE id = ?",
            params![resource_id, id],
        )?;
        Ok(())
    }

    pub fn set_album_thumb(&self, id: i64, picture_id: Option<i64>) -> Result<()> {
        self.conn.execute(
            "UPDATE albums SET thumb = ? WHERE id = ?",
            params![picture_id, id],
        )?;
        Ok(())
    }

    pub fn set_album_parent(&self, id: i64, pid: i64) -> Result<()> {
        self.conn
            .execute("UPDATE albums SET pid = ? WHERE id = ?", params![pid, id])?;
        Ok(())
    }

    pub fn set_album_sort_key(&self, id: i64, key: SortKey) -> Result<()> {
        self.conn.execute(
            "UPDATE albums SET sort_key = ? WHERE id = ?",
            params![key.as_str(), id],
        )?;
        Ok(())
    }

    pub fn update_album_fields(&self, id: i64, fields: &AlbumUpdate) -> Result<()> {
        if let Some(ref name) = fields.name {
            self.conn
                .execute("UPDATE albums SET name = ? WHERE id = ?", params![name, id])?;
        }
        if let Some(ref caption) = fields.caption {
            self.conn.execute(
                "UPDATE albums SET caption = ? WHERE id = ?",
                params![caption, id],
            )?;
        }
        if let Some(caption_type) = fields.caption_type {
            self.conn.execute(
                "UPDATE albums SET caption_type = ? WHERE id = ?",
                params![caption_type.as_str(), id],
            )?;
        }
        if let Some(ref prefix) = fields.file_prefix {
            self.conn.execute(
                "UPDATE albums SET file_prefix = ? WHERE id = ?",
                params![prefix, id],
            )?;
        }
        if let Some(preserve) = fields.preserve_filenames {
            self.conn.execute(
                "UPDATE albums SET preserve_filenames = ? WHERE id = ?",
                params![preserve as i64, id],
            )?;
        }
        if let Some(published) = fields.published {
            self.conn.execute(
                "UPDATE albums SET published = ? WHERE id = ?",
                params![published as i64, id],
            )?;
        }
        Ok(())
    }

    pub fn delete_album_record(&self, id: i64) -> Result<()> {
        self.conn
            .execute("DELETE FROM albums WHERE id = ?", [id])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::open_db;
    use tempfile::tempdir;

    #[test]
    fn test_insert_and_get_album() {
        let dir = tempdir().unwrap();
        let db = open_db(dir.path());

        let id = db.insert_album(0, "Holidays 2024", 7).unwrap();
        let album = db.get_album(id).unwrap().unwrap();

        assert_eq!(album.pid, 0);
        assert_eq!(album.name, "Holidays 2024");
        assert_eq!(album.owner, 7);
        assert!(album.alias.is_none());
        assert!(album.assigned_dir.is_none());
        assert_eq!(album.caption_type, CaptionType::Text);
        assert_eq!(album.sort_key, SortKey::None);
        assert!(!album.published);
    }

    #[test]
    fn test_child_album_ids_recursive() {
        let dir = tempdir().unwrap();
        let db = open_db(dir.path());

        let root = db.insert_album(0, "root", 1).unwrap();
        let a = db.insert_album(root, "a", 1).unwrap();
        let b = db.insert_album(root, "b", 1).unwrap();
        let a1 = db.insert_album(a, "a1", 1).unwrap();
        let _other = db.insert_album(0, "unrelated", 1).unwrap();

        let mut ids = db.child_album_ids(root).unwrap();
        ids.sort();
        assert_eq!(ids, vec![a, b, a1]);
    }

    #[test]
    fn test_alias_taken_excludes_own_row() {
        let dir = tempdir().unwrap();
        let db = open_db(dir.path());

        let first = db.insert_album(0, "one", 1).unwrap();
        let second = db.insert_album(0, "two", 1).unwrap();
        db.set_album_alias(first, "summer").unwrap();

        assert!(db.alias_taken("summer", second).unwrap());
        assert!(!db.alias_taken("summer", first).unwrap());
        assert!(!db.alias_taken("winter", second).unwrap());
    }

    #[test]
    fn test_update_album_fields_is_partial() {
        let dir = tempdir().unwrap();
        let db = open_db(dir.path());

        let id = db.insert_album(0, "trip", 1).unwrap();
        db.update_album_fields(
            id,
            &AlbumUpdate {
                caption: Some("A week in the Alps".to_string()),
                caption_type: Some(CaptionType::Markdown),
                published: Some(true),
                ..Default::default()
            },
        )
        .unwrap();

        let album = db.get_album(id).unwrap().unwrap();
        assert_eq!(album.name, "trip");
        assert_eq!(album.caption.as_deref(), Some("A week in the Alps"));
        assert_eq!(album.caption_type, CaptionType::Markdown);
        assert!(album.published);
    }
}
