//! Drift detection and repair.
//!
//! Reconciles picture records against the filesystem and the resource
//! registry. Repair only ever removes stale metadata; files on disk are
//! never deleted here, however orphaned they look — file deletion is
//! reserved for the cascading album delete.

use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;

use tracing::{info, warn};

use crate::binding::PUBLIC_MARKER;
use crate::config::Config;
use crate::db::Database;
use crate::error::{GalleryError, Result};
use crate::guard::{Actor, PermissionGuard};

/// Findings of one revision run.
#[derive(Debug, Clone, Default)]
pub struct RevisionReport {
    /// Picture ids whose file ref does not resolve to an existing file.
    pub orphan_records: Vec<i64>,
    /// Files in bound directories no picture of the scanned albums references.
    pub orphan_files: Vec<PathBuf>,
    /// Bound directories holding nothing besides the visibility marker.
    pub empty_directories: Vec<PathBuf>,
    /// Per-record repair failures; the scan continues past them.
    pub errors: Vec<String>,
}

impl RevisionReport {
    pub fn is_clean(&self) -> bool {
        self.orphan_records.is_empty()
            && self.orphan_files.is_empty()
            && self.empty_directories.is_empty()
            && self.errors.is_empty()
    }
}

pub struct ReviseEngine {
    guard: PermissionGuard,
}

impl ReviseEngine {
    pub fn new(config: Config) -> Self {
        Self {
            guard: PermissionGuard::from_config(&config),
        }
    }

    /// Scan one album (optionally with its descendants) and classify drift.
    ///
    /// With `repair`, orphan records are deleted so a second run right after
    /// reports none. Scan-only mode is read-only and never permission-gated;
    /// repair is.
    pub fn revise(
        &self,
        db: &Database,
        actor: &Actor,
        album_id: i64,
        include_children: bool,
        repair: bool,
    ) -> Result<RevisionReport> {
        if db.get_album(album_id)?.is_none() {
            return Err(GalleryError::album_not_found(album_id));
        }
        if repair {
            self.guard.ensure_can_mutate(db, actor, album_id)?;
        }

        let mut ids = vec![album_id];
        if include_children {
            ids.extend(db.child_album_ids(album_id)?);
        }

        let mut report = RevisionReport::default();

        for id in ids {
            let album = match db.get_album(id)? {
                Some(album) => album,
                None => continue,
            };

            let mut referenced: HashSet<PathBuf> = HashSet::new();

            for picture in db.pictures_in_album(id)? {
                let resolved = db.resolve_resource(picture.resource_id)?;
                match resolved {
                    Some(path) if path.is_file() => {
                        referenced.insert(path);
                    }
                    _ => {
                        report.orphan_records.push(picture.id);
                        if repair {
                            self.repair_orphan_record(db, picture.id, picture.resource_id, &mut report);
                        }
                    }
                }
            }

            let Some(dir_ref) = album.assigned_dir else { continue };
            let Some(dir) = db.resolve_resource(dir_ref)? else { continue };
            if !dir.is_dir() {
                warn!(album_id = id, dir = %dir.display(), "bound directory is missing");
                continue;
            }

            let mut occupied = false;
            let entries = match fs::read_dir(&dir) {
                Ok(entries) => entries,
                Err(e) => {
                    report.errors.push(format!("cannot read {}: {e}", dir.display()));
                    continue;
                }
            };
            for entry in entries.flatten() {
                let path = entry.path();
                if entry.file_name().to_string_lossy() == PUBLIC_MARKER {
                    continue;
                }
                occupied = true;
                if path.is_file() && !referenced.contains(&path) {
                    // Never deleted here, only reported.
                    report.orphan_files.push(path);
                }
            }
            if !occupied {
                report.empty_directories.push(dir);
            }
        }

        info!(
            album_id,
            orphan_records = report.orphan_records.len(),
            orphan_files = report.orphan_files.len(),
            empty_directories = report.empty_directories.len(),
            repair,
            "revision finished"
        );

        Ok(report)
    }

    /// Drop the stale record and, when nothing else references it, its
    /// registry entry. A failure lands in the report, not on the caller.
    fn repair_orphan_record(
        &self,
        db: &Database,
        picture_id: i64,
        resource_id: i64,
        report: &mut RevisionReport,
    ) {
        if let Err(e) = db.delete_picture_record(picture_id) {
            report
                .errors
                .push(format!("failed to delete orphan record {picture_id}: {e}"));
            return;
        }
        match db.count_pictures_for_resource(resource_id) {
            Ok(0) => {
                if let Err(e) = db.remove_resource(resource_id) {
                    report
                        .errors
                        .push(format!("failed to remove registry entry {resource_id}: {e}"));
                }
            }
            Ok(_) => {}
            Err(e) => {
                report
                    .errors
                    .push(format!("failed to count references of {resource_id}: {e}"));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::open_db;
    use crate::store::AlbumStore;
    use std::fs::File;
    use std::path::Path;
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

    #[test]
    fn test_healthy_album_reports_clean_except_empty_dir() {
        let dir = tempdir().unwrap();
        let db = open_db(dir.path());
        let config = test_config(dir.path());
        let engine = ReviseEngine::new(config.clone());
        let album = make_album(&db, &config, "fresh");

        let report = engine
            .revise(&db, &Actor::new(1), album.id, false, false)
            .unwrap();

        assert!(report.orphan_records.is_empty());
        assert!(report.orphan_files.is_empty());
        // Freshly bound directory holds only the marker.
        assert_eq!(report.empty_directories, vec![album_dir(&db, &album)]);
    }

    #[test]
    fn test_detects_orphan_records_and_orphan_files() {
        let dir = tempdir().unwrap();
        let db = open_db(dir.path());
        let config = test_config(dir.path());
        let engine = ReviseEngine::new(config.clone());
        let album = make_album(&db, &config, "drifted");
        let target_dir = album_dir(&db, &album);

        // Orphan record: registered path never written to disk.
        let gone = db.register_resource(&target_dir.join("gone.jpg")).unwrap();
        let orphan = db.insert_picture(album.id, gone, 10, 1).unwrap();

        // Orphan file: on disk, not referenced by any picture.
        let stray = target_dir.join("stray.jpg");
        File::create(&stray).unwrap();

        let report = engine
            .revise(&db, &Actor::new(1), album.id, false, false)
            .unwrap();

        assert_eq!(report.orphan_records, vec![orphan]);
        assert_eq!(report.orphan_files, vec![stray.clone()]);

        // Scan-only mode touched nothing.
        assert!(db.get_picture(orphan).unwrap().is_some());
        assert!(stray.exists());
    }

    #[test]
    fn test_repair_is_idempotent_and_spares_files() {
        let dir = tempdir().unwrap();
        let db = open_db(dir.path());
        let config = test_config(dir.path());
        let engine = ReviseEngine::new(config.clone());
        let album = make_album(&db, &config, "drifted");
        let target_dir = album_dir(&db, &album);

        let gone = db.register_resource(&target_dir.join("gone.jpg")).unwrap();
        db.insert_picture(album.id, gone, 10, 1).unwrap();
        let stray = target_dir.join("stray.jpg");
        File::create(&stray).unwrap();

        let first = engine
            .revise(&db, &Actor::new(1), album.id, false, true)
            .unwrap();
        assert_eq!(first.orphan_records.len(), 1);
        assert!(first.errors.is_empty());

        let second = engine
            .revise(&db, &Actor::new(1), album.id, false, true)
            .unwrap();
        assert!(second.orphan_records.is_empty());

        // Repair removes metadata only; the stray user file survives.
        assert!(stray.exists());
        assert!(db.resolve_resource(gone).unwrap().is_none());
    }

    #[test]
    fn test_revise_covers_descendants_when_asked() {
        let dir = tempdir().unwrap();
        let db = open_db(dir.path());
        let config = test_config(dir.path());
        let engine = ReviseEngine::new(config.clone());
        let store = AlbumStore::new(config.clone());
        let actor = Actor::new(1);

        let parent = make_album(&db, &config, "parent");
        let child = store.create(&db, &actor, parent.id, "child").unwrap();

        let gone = db
            .register_resource(&album_dir(&db, &child).join("gone.jpg"))
            .unwrap();
        let orphan = db.insert_picture(child.id, gone, 10, 1).unwrap();

        let shallow = engine.revise(&db, &actor, parent.id, false, false).unwrap();
        assert!(shallow.orphan_records.is_empty());

        let deep = engine.revise(&db, &actor, parent.id, true, false).unwrap();
        assert_eq!(deep.orphan_records, vec![orphan]);
    }

    #[test]
    fn test_repair_requires_permission_scan_does_not() {
        let dir = tempdir().unwrap();
        let db = open_db(dir.path());
        let config = test_config(dir.path());
        let engine = ReviseEngine::new(config.clone());
        let album = make_album(&db, &config, "guarded");

        let stranger = Actor::new(2);
        engine.revise(&db, &stranger, album.id, false, false).unwrap();

        let err = engine
            .revise(&db, &stranger, album.id, false, true)
            .unwrap_err();
        assert!(matches!(err, GalleryError::PermissionDenied { .. }));
    }
}
