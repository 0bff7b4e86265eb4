//! High-level album operations: create, update, re-parent, thumb selection
//! and the cascading delete.
//!
//! The cascade purges pictures and descendant albums but leaves the
//! requested album's own row in place; the surrounding system removes that
//! row through its native deletion step. Descendants the actor may not
//! mutate are re-parented to root instead of deleted, and the skip is
//! surfaced as PermissionDenied once the walk has finished.

use std::fs;

use tracing::{info, warn};

use crate::binding::{FolderBinding, PUBLIC_MARKER};
use crate::config::Config;
use crate::db::{Album, AlbumUpdate, Database, Picture};
use crate::error::{GalleryError, Result};
use crate::guard::{Actor, PermissionGuard};

pub struct AlbumStore {
    config: Config,
    guard: PermissionGuard,
}

impl AlbumStore {
    pub fn new(config: Config) -> Self {
        let guard = PermissionGuard::from_config(&config);
        Self { config, guard }
    }

    /// Create an album under `parent_id` (0 = root), atomically reserving a
    /// unique alias and binding a fresh directory.
    pub fn create(&self, db: &Database, actor: &Actor, parent_id: i64, name: &str) -> Result<Album> {
        if parent_id != 0 {
            if db.get_album(parent_id)?.is_none() {
                return Err(GalleryError::album_not_found(parent_id));
            }
            self.guard.ensure_can_mutate(db, actor, parent_id)?;
        }

        let id = db.insert_album(parent_id, name, actor.id)?;

        let binding = FolderBinding::new(self.config.clone());
        let (alias, _) = binding.bind(db, actor, id, name, None)?;

        info!(album_id = id, %alias, parent_id, "created album");

        db.get_album(id)?.ok_or(GalleryError::album_not_found(id))
    }

    /// Apply field updates. A name change regenerates the alias (collision
    /// rules apply) but keeps the existing directory binding.
    pub fn update(
        &self,
        db: &Database,
        actor: &Actor,
        album_id: i64,
        fields: &AlbumUpdate,
    ) -> Result<Album> {
        let album = db
            .get_album(album_id)?
            .ok_or(GalleryError::album_not_found(album_id))?;
        self.guard.ensure_can_mutate(db, actor, album_id)?;

        db.update_album_fields(album_id, fields)?;

        if let Some(ref new_name) = fields.name {
            let mut alias = crate::binding::slugify(new_name);
            if alias.is_empty() {
                alias = crate::binding::slugify(&album.name);
            }
            if !alias.is_empty() && album.alias.as_deref() != Some(alias.as_str()) {
                if db.alias_taken(&alias, album_id)? {
                    alias = format!("id-{album_id}-{alias}");
                }
                db.set_album_alias(album_id, &alias)?;
            }
        }

        db.get_album(album_id)?
            .ok_or(GalleryError::album_not_found(album_id))
    }

    /// Move an album under a new parent (0 = root).
    pub fn reparent(&self, db: &Database, actor: &Actor, album_id: i64, new_parent: i64) -> Result<()> {
        if db.get_album(album_id)?.is_none() {
            return Err(GalleryError::album_not_found(album_id));
        }
        self.guard.ensure_can_mutate(db, actor, album_id)?;

        if new_parent != 0 {
            if db.get_album(new_parent)?.is_none() {
                return Err(GalleryError::album_not_found(new_parent));
            }
            self.guard.ensure_can_mutate(db, actor, new_parent)?;
            if new_parent == album_id || db.child_album_ids(album_id)?.contains(&new_parent) {
                return Err(GalleryError::Validation(format!(
                    "album {album_id} cannot become a child of its own subtree"
                )));
            }
        }

        db.set_album_parent(album_id, new_parent)
    }

    /// Select an album thumbnail. A picture id that does not resolve, or
    /// resolves outside the album subtree, clears the thumbnail instead of
    /// failing.
    pub fn set_thumb(&self, db: &Database, actor: &Actor, album_id: i64, picture_id: i64) -> Result<()> {
        if db.get_album(album_id)?.is_none() {
            return Err(GalleryError::album_not_found(album_id));
        }
        self.guard.ensure_can_mutate(db, actor, album_id)?;

        let candidate = db.get_picture(picture_id)?;
        let in_subtree = match candidate {
            Some(ref picture) => {
                picture.pid == album_id || db.child_album_ids(album_id)?.contains(&picture.pid)
            }
            None => false,
        };

        if in_subtree {
            db.set_album_thumb(album_id, Some(picture_id))
        } else {
            info!(album_id, picture_id, "thumb candidate does not resolve, clearing thumbnail");
            db.set_album_thumb(album_id, None)
        }
    }

    /// Delete a single picture, removing its file only when no other
    /// picture references the same file ref.
    pub fn delete_picture(&self, db: &Database, actor: &Actor, picture_id: i64) -> Result<()> {
        let picture = db
            .get_picture(picture_id)?
            .ok_or(GalleryError::picture_not_found(picture_id))?;
        self.guard.ensure_can_mutate(db, actor, picture.pid)?;

        self.destroy_picture(db, &picture);
        Ok(())
    }

    /// Delete an album's contents: its pictures, with `cascade` its full
    /// descendant subtree, and every directory that becomes empty. The
    /// requested album's own record is left for the caller to remove
    /// through its native deletion step.
    pub fn delete(&self, db: &Database, actor: &Actor, album_id: i64, cascade: bool) -> Result<()> {
        if db.get_album(album_id)?.is_none() {
            return Err(GalleryError::album_not_found(album_id));
        }
        self.guard.ensure_can_mutate(db, actor, album_id)?;

        let mut skipped = 0;
        let descendants = if cascade {
            db.child_album_ids(album_id)?
        } else {
            Vec::new()
        };

        for child_id in descendants {
            if !self.guard.can_mutate(db, actor, child_id)? {
                // Not ours to delete: detach to root and keep going.
                db.set_album_parent(child_id, 0)?;
                warn!(album_id = child_id, "re-parented to root, actor may not delete it");
                skipped += 1;
                continue;
            }
            self.purge_album_node(db, child_id, true)?;
        }

        self.purge_album_node(db, album_id, false)?;

        if skipped > 0 {
            return Err(GalleryError::PermissionDenied {
                actor: actor.id,
                album: album_id,
            });
        }
        Ok(())
    }

    fn purge_album_node(&self, db: &Database, album_id: i64, delete_record: bool) -> Result<()> {
        let album = match db.get_album(album_id)? {
            Some(album) => album,
            None => return Ok(()),
        };

        for picture in db.pictures_in_album(album_id)? {
            self.destroy_picture(db, &picture);
        }

        if let Some(dir_ref) = album.assigned_dir {
            if let Some(dir) = db.resolve_resource(dir_ref)? {
                remove_dir_if_empty(&dir);
            }
        }

        if delete_record {
            db.delete_album_record(album_id)?;
            info!(album_id, "deleted album record");
        } else {
            info!(album_id, "purged album contents, record left for the caller");
        }

        Ok(())
    }

    /// Remove the record, then the file and registry entry when the file
    /// ref is no longer referenced by any picture. File removal failures
    /// are cleanup, logged and not raised.
    fn destroy_picture(&self, db: &Database, picture: &Picture) {
        if let Err(e) = db.delete_picture_record(picture.id) {
            warn!(picture_id = picture.id, error = %e, "failed to delete picture record");
            return;
        }

        let remaining = match db.count_pictures_for_resource(picture.resource_id) {
            Ok(n) => n,
            Err(e) => {
                warn!(picture_id = picture.id, error = %e, "failed to count file references");
                return;
            }
        };
        if remaining > 0 {
            return;
        }

        match db.resolve_resource(picture.resource_id) {
            Ok(Some(path)) => {
                if path.is_file() {
                    if let Err(e) = fs::remove_file(&path) {
                        warn!(path = %path.display(), error = %e, "failed to remove unreferenced file");
                    }
                }
            }
            Ok(None) => {}
            Err(e) => {
                warn!(picture_id = picture.id, error = %e, "failed to resolve file ref");
            }
        }

        if let Err(e) = db.remove_resource(picture.resource_id) {
            warn!(resource_id = picture.resource_id, error = %e, "failed to remove registry entry");
        }
    }
}

/// Remove a directory that holds nothing besides its visibility marker.
/// Failure here is non-critical cleanup.
fn remove_dir_if_empty(dir: &std::path::Path) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(_) => return,
    };

    for entry in entries.flatten() {
        if entry.file_name().to_string_lossy() != PUBLIC_MARKER {
            return;
        }
    }

    let marker = dir.join(PUBLIC_MARKER);
    if marker.exists() {
        if let Err(e) = fs::remove_file(&marker) {
            warn!(dir = %dir.display(), error = %e, "failed to remove visibility marker");
            return;
        }
    }
    if let Err(e) = fs::remove_dir(dir) {
        warn!(dir = %dir.display(), error = %e, "failed to remove empty album directory");
    } else {
        info!(dir = %dir.display(), "removed empty album directory");
    }
}
