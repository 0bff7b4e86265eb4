//! Recomputing picture order weights.
//!
//! Resort loads each picture's resolved file name and modification time,
//! orders by the requested key and rewrites the weights starting at 10 in
//! steps of 10. The sort is stable: ties keep their prior relative order,
//! which callers rely on when re-running after partial edits.

use std::cmp::Ordering;
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use tracing::info;

use crate::config::Config;
use crate::db::{Database, SortKey};
use crate::error::{GalleryError, Result};
use crate::guard::{Actor, PermissionGuard};

pub struct SortEngine {
    guard: PermissionGuard,
}

struct SortEntry {
    picture_id: i64,
    name: String,
    mtime: DateTime<Utc>,
}

impl SortEngine {
    pub fn new(config: Config) -> Self {
        Self {
            guard: PermissionGuard::from_config(&config),
        }
    }

    /// Rewrite an album's order weights under `key`.
    ///
    /// `SortKey::None` only resets the stored sort selector. After an actual
    /// resort the selector is reset as well: the key is a one-shot request,
    /// not a persistent mode (the manual order it produced persists).
    pub fn resort(&self, db: &Database, actor: &Actor, album_id: i64, key: SortKey) -> Result<()> {
        if db.get_album(album_id)?.is_none() {
            return Err(GalleryError::album_not_found(album_id));
        }
        self.guard.ensure_can_mutate(db, actor, album_id)?;

        if key == SortKey::None {
            return db.set_album_sort_key(album_id, SortKey::None);
        }

        // Loaded in manual order, so the stable sort preserves the prior
        // relative order of ties.
        let mut entries: Vec<SortEntry> = Vec::new();
        for picture in db.pictures_in_album(album_id)? {
            let path = db.resolve_resource(picture.resource_id)?;
            let (name, mtime) = match path {
                Some(path) => {
                    let name = path
                        .file_name()
                        .map(|n| n.to_string_lossy().to_string())
                        .unwrap_or_default();
                    let mtime = std::fs::metadata(&path)
                        .and_then(|m| m.modified())
                        .unwrap_or(SystemTime::UNIX_EPOCH);
                    (name, DateTime::<Utc>::from(mtime))
                }
                None => (String::new(), DateTime::<Utc>::from(SystemTime::UNIX_EPOCH)),
            };
            entries.push(SortEntry {
                picture_id: picture.id,
                name,
                mtime,
            });
        }

        match key {
            SortKey::None => unreachable!("handled above"),
            SortKey::NameAsc => entries.sort_by(|a, b| natural_cmp(&a.name, &b.name)),
            SortKey::NameDesc => entries.sort_by(|a, b| natural_cmp(&b.name, &a.name)),
            SortKey::DateAsc => entries.sort_by(|a, b| a.mtime.cmp(&b.mtime)),
            SortKey::DateDesc => entries.sort_by(|a, b| b.mtime.cmp(&a.mtime)),
        }

        let mut sorting = 10;
        for entry in &entries {
            db.set_picture_sorting(entry.picture_id, sorting)?;
            sorting += 10;
        }

        db.set_album_sort_key(album_id, SortKey::None)?;

        info!(album_id, key = key.as_str(), count = entries.len(), "resorted album");
        Ok(())
    }
}

/// Natural, case-insensitive ordering: digit runs compare numerically,
/// everything else character by character.
fn natural_cmp(a: &str, b: &str) -> Ordering {
    let a: Vec<char> = a.to_lowercase().chars().collect();
    let b: Vec<char> = b.to_lowercase().chars().collect();
    let (mut i, mut j) = (0, 0);

    while i < a.len() && j < b.len() {
        if a[i].is_ascii_digit() && b[j].is_ascii_digit() {
            let start_i = i;
            while i < a.len() && a[i].is_ascii_digit() {
                i += 1;
            }
            let start_j = j;
            while j < b.len() && b[j].is_ascii_digit() {
                j += 1;
            }
            let num_a: u64 = a[start_i..i].iter().collect::<String>().parse().unwrap_or(0);
            let num_b: u64 = b[start_j..j].iter().collect::<String>().parse().unwrap_or(0);
            match num_a.cmp(&num_b) {
                Ordering::Equal => {}
                other => return other,
            }
        } else {
            match a[i].cmp(&b[j]) {
                Ordering::Equal => {
                    i += 1;
                    j += 1;
                }
                other => return other,
            }
        }
    }

    a.len().cmp(&b.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::open_db;
    use crate::store::AlbumStore;
    use std::fs::File;
    use std::path::{Path, PathBuf};
    use tempfile::tempdir;

    fn test_config(root: &Path) -> Config {
        let mut config = Config::default();
        config.storage.upload_root = root.join("albums");
        config
    }

    fn make_album(db: &Database, config: &Config, name: &str) -> crate::db::Album {
        AlbumStore::new(config.clone())
            .create(db, &Actor::new(1), 0, name)
            .unwrap()
    }

    fn album_dir(db: &Database, album: &crate::db::Album) -> PathBuf {
        db.resolve_resource(album.assigned_dir.unwrap())
            .unwrap()
            .unwrap()
    }

    fn add_picture(db: &Database, album_id: i64, dir: &Path, filename: &str) -> i64 {
        let path = dir.join(filename);
        File::create(&path).unwrap();
        let resource_id = db.register_resource(&path).unwrap();
        let sorting = db.next_sorting(album_id).unwrap();
        db.insert_picture(album_id, resource_id, sorting, 1).unwrap()
    }

    fn weights(db: &Database, album_id: i64) -> Vec<(i64, i64)> {
        db.pictures_in_album(album_id)
            .unwrap()
            .iter()
            .map(|p| (p.id, p.sorting))
            .collect()
    }

    #[test]
    fn test_natural_cmp_orders_digit_runs_numerically() {
        assert_eq!(natural_cmp("img2.jpg", "img10.jpg"), Ordering::Less);
        assert_eq!(natural_cmp("IMG2.jpg", "img2.JPG"), Ordering::Equal);
        assert_eq!(natural_cmp("a.jpg", "b.jpg"), Ordering::Less);
    }

    #[test]
    fn test_resort_by_name_rewrites_weights() {
        let dir = tempdir().unwrap();
        let db = open_db(dir.path());
        let config = test_config(dir.path());
        let engine = SortEngine::new(config.clone());
        let album = make_album(&db, &config, "sorted");
        let target_dir = album_dir(&db, &album);

        let b = add_picture(&db, album.id, &target_dir, "b.jpg");
        let a = add_picture(&db, album.id, &target_dir, "a.jpg");
        let c = add_picture(&db, album.id, &target_dir, "c.jpg");

        engine
            .resort(&db, &Actor::new(1), album.id, SortKey::NameAsc)
            .unwrap();

        assert_eq!(weights(&db, album.id), vec![(a, 10), (b, 20), (c, 30)]);
    }

    #[test]
    fn test_resort_descending_reverses() {
        let dir = tempdir().unwrap();
        let db = open_db(dir.path());
        let config = test_config(dir.path());
        let engine = SortEngine::new(config.clone());
        let album = make_album(&db, &config, "sorted");
        let target_dir = album_dir(&db, &album);

        let a = add_picture(&db, album.id, &target_dir, "a.jpg");
        let b = add_picture(&db, album.id, &target_dir, "b.jpg");

        engine
            .resort(&db, &Actor::new(1), album.id, SortKey::NameDesc)
            .unwrap();

        // weights() returns manual order, so b now leads.
        assert_eq!(weights(&db, album.id), vec![(b, 10), (a, 20)]);
    }

    #[test]
    fn test_resort_ties_keep_prior_relative_order() {
        let dir = tempdir().unwrap();
        let db = open_db(dir.path());
        let config = test_config(dir.path());
        let engine = SortEngine::new(config.clone());
        let album = make_album(&db, &config, "sorted");
        let target_dir = album_dir(&db, &album);

        // Same name in different directories: a deliberate name tie.
        let sub = target_dir.join("sub");
        std::fs::create_dir_all(&sub).unwrap();
        let first = add_picture(&db, album.id, &target_dir, "same.jpg");
        let second = add_picture(&db, album.id, &sub, "same.jpg");

        engine
            .resort(&db, &Actor::new(1), album.id, SortKey::NameAsc)
            .unwrap();

        assert_eq!(weights(&db, album.id), vec![(first, 10), (second, 20)]);
    }

    #[test]
    fn test_resort_none_resets_selector_without_reordering() {
        let dir = tempdir().unwrap();
        let db = open_db(dir.path());
        let config = test_config(dir.path());
        let engine = SortEngine::new(config.clone());
        let album = make_album(&db, &config, "sorted");
        let target_dir = album_dir(&db, &album);

        let b = add_picture(&db, album.id, &target_dir, "b.jpg");
        let a = add_picture(&db, album.id, &target_dir, "a.jpg");

        engine
            .resort(&db, &Actor::new(1), album.id, SortKey::None)
            .unwrap();

        // Untouched weights, insertion order preserved.
        assert_eq!(weights(&db, album.id), vec![(b, 10), (a, 20)]);
        assert_eq!(
            db.get_album(album.id).unwrap().unwrap().sort_key,
            SortKey::None
        );
    }

    #[test]
    fn test_resort_denied_for_non_owner() {
        let dir = tempdir().unwrap();
        let db = open_db(dir.path());
        let config = test_config(dir.path());
        let engine = SortEngine::new(config.clone());
        let album = make_album(&db, &config, "sorted");

        let err = engine
            .resort(&db, &Actor::new(2), album.id, SortKey::NameAsc)
            .unwrap_err();
        assert!(matches!(err, GalleryError::PermissionDenied { .. }));
    }
}
