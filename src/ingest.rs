//! Ingest pipeline: turning files into picture records.
//!
//! Two entry points feed an album — uploaded files handed over by the
//! caller and a recursive import from registered directories. Both append
//! pictures at the next free order weight. The pipeline also applies a
//! filename prefix across an album, renaming the underlying files without
//! ever overwriting one that exists.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};
use walkdir::WalkDir;

use crate::binding::{slugify, transliterate, PUBLIC_MARKER};
use crate::config::Config;
use crate::db::{Database, Picture};
use crate::error::{GalleryError, Result};
use crate::guard::{Actor, PermissionGuard};

/// Upper bound for the prefix-rename suffix search.
const MAX_RENAME_SUFFIX: u32 = 9999;

pub struct IngestPipeline {
    config: Config,
    guard: PermissionGuard,
}

impl IngestPipeline {
    pub fn new(config: Config) -> Self {
        let guard = PermissionGuard::from_config(&config);
        Self { config, guard }
    }

    fn extension_allowed(&self, path: &Path) -> bool {
        match path.extension() {
            Some(ext) => {
                let ext = ext.to_string_lossy().to_lowercase();
                self.config
                    .ingest
                    .valid_extensions
                    .iter()
                    .any(|allowed| allowed.to_lowercase() == ext)
            }
            None => false,
        }
    }

    /// Move uploaded files into the album's bound directory and create one
    /// picture record per file, in the order supplied.
    pub fn ingest_uploaded(
        &self,
        db: &Database,
        actor: &Actor,
        album_id: i64,
        file_paths: &[PathBuf],
    ) -> Result<Vec<Picture>> {
        let album = db
            .get_album(album_id)?
            .ok_or(GalleryError::album_not_found(album_id))?;
        self.guard.ensure_can_mutate(db, actor, album_id)?;

        let dir_ref = album.assigned_dir.ok_or_else(|| {
            GalleryError::Validation(format!("album {album_id} has no bound directory"))
        })?;
        let album_dir = db
            .resolve_resource(dir_ref)?
            .ok_or(GalleryError::resource_not_found(dir_ref))?;
        if !album_dir.is_dir() {
            return Err(GalleryError::Validation(format!(
                "bound directory {} does not exist",
                album_dir.display()
            )));
        }

        // Validate the whole batch up front so a bad extension rejects the
        // request before any file has moved.
        for path in file_paths {
            if !self.extension_allowed(path) {
                return Err(GalleryError::Validation(format!(
                    "file extension of {} is not allowed",
                    path.display()
                )));
            }
        }

        let mut created = Vec::with_capacity(file_paths.len());

        for path in file_paths {
            let filename = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .ok_or_else(|| {
                    GalleryError::Validation(format!("{} has no filename", path.display()))
                })?;

            let target = if path.parent() == Some(album_dir.as_path()) {
                path.clone()
            } else {
                let target = unique_target(&album_dir, &filename);
                move_file(path, &target)?;
                target
            };

            let resource_id = db.register_resource(&target)?;
            let sorting = db.next_sorting(album_id)?;
            let picture_id = db.insert_picture(album_id, resource_id, sorting, actor.id)?;

            if let Some(picture) = db.get_picture(picture_id)? {
                created.push(picture);
            }
        }

        info!(album_id, count = created.len(), "ingested uploaded files");
        Ok(created)
    }

    /// Recursively import files from registered directories, skipping files
    /// the album already references. Returns the number of pictures created.
    ///
    /// With `preserve_filenames` set on the album, discovered files are
    /// registered in place; otherwise each file is copied into the bound
    /// directory under a slugged name.
    pub fn ingest_from_filesystem(
        &self,
        db: &Database,
        actor: &Actor,
        album_id: i64,
        directory_refs: &[i64],
    ) -> Result<usize> {
        let album = db
            .get_album(album_id)?
            .ok_or(GalleryError::album_not_found(album_id))?;
        self.guard.ensure_can_mutate(db, actor, album_id)?;

        let album_dir = match album.assigned_dir {
            Some(dir_ref) => db.resolve_resource(dir_ref)?,
            None => None,
        };
        if !album.preserve_filenames && album_dir.is_none() {
            return Err(GalleryError::Validation(format!(
                "album {album_id} has no bound directory to copy into"
            )));
        }

        let mut known: std::collections::HashSet<String> = db
            .picture_paths_in_album(album_id)?
            .into_iter()
            .collect();
        let mut count = 0;

        for &dir_ref in directory_refs {
            let dir = db
                .resolve_resource(dir_ref)?
                .ok_or(GalleryError::resource_not_found(dir_ref))?;

            for entry in WalkDir::new(&dir)
                .follow_links(false)
                .into_iter()
                .filter_map(|e| e.ok())
            {
                let path = entry.path();
                if !path.is_file()
                    || entry.file_name().to_string_lossy() == PUBLIC_MARKER
                    || !self.extension_allowed(path)
                {
                    continue;
                }
                if known.contains(path.to_string_lossy().as_ref()) {
                    continue;
                }

                let stored = if album.preserve_filenames {
                    path.to_path_buf()
                } else {
                    let album_dir = album_dir.as_ref().expect("checked above");
                    let filename = sanitize_filename(path);
                    let target = unique_target(album_dir, &filename);
                    if known.contains(target.to_string_lossy().as_ref()) {
                        continue;
                    }
                    fs::copy(path, &target)?;
                    target
                };

                let resource_id = db.register_resource(&stored)?;
                let sorting = db.next_sorting(album_id)?;
                db.insert_picture(album_id, resource_id, sorting, actor.id)?;
                known.insert(stored.to_string_lossy().to_string());
                count += 1;
            }
        }

        info!(album_id, count, "imported files from filesystem");
        Ok(count)
    }

    /// Rename every file of an album to `{prefix}_{n}.{ext}`, walking
    /// pictures in manual order. Each picture's suffix search starts at 1;
    /// since files are renamed immediately, later pictures skip names taken
    /// by earlier renames in the same run. Existing files are never
    /// overwritten.
    pub fn apply_filename_prefix(
        &self,
        db: &Database,
        actor: &Actor,
        album_id: i64,
        prefix: &str,
    ) -> Result<usize> {
        if db.get_album(album_id)?.is_none() {
            return Err(GalleryError::album_not_found(album_id));
        }
        self.guard.ensure_can_mutate(db, actor, album_id)?;

        let prefix = transliterate(prefix).replace('.', "_");
        if prefix.is_empty() {
            return Ok(0);
        }

        let mut renamed = 0;

        for picture in db.pictures_in_album(album_id)? {
            let path = match db.resolve_resource(picture.resource_id)? {
                Some(path) if path.is_file() => path,
                _ => {
                    warn!(picture_id = picture.id, "skipping rename, file does not resolve");
                    continue;
                }
            };

            let dir = path.parent().unwrap_or(Path::new("."));
            let ext = path
                .extension()
                .map(|e| e.to_string_lossy().to_lowercase())
                .unwrap_or_default();

            let mut n = 1u32;
            let new_path = loop {
                let candidate = dir.join(format!("{prefix}_{n}.{ext}"));
                if candidate == path {
                    // Already carries the name it would receive.
                    break None;
                }
                if !candidate.exists() {
                    break Some(candidate);
                }
                n += 1;
                if n > MAX_RENAME_SUFFIX {
                    return Err(GalleryError::Conflict(format!(
                        "no free filename for prefix {prefix:?} in {}",
                        dir.display()
                    )));
                }
            };

            let Some(new_path) = new_path else { continue };

            fs::rename(&path, &new_path)?;
            db.update_resource_path(picture.resource_id, &new_path)?;
            self.invalidate_derived(&path);
            renamed += 1;

            info!(
                picture_id = picture.id,
                new_path = %new_path.display(),
                "renamed picture file"
            );
        }

        Ok(renamed)
    }

    /// Drop cached derived renderings of a renamed file. Best effort; the
    /// cache is rebuilt on demand.
    fn invalidate_derived(&self, old_path: &Path) {
        let Some(stem) = old_path.file_stem().map(|s| s.to_string_lossy().to_string()) else {
            return;
        };
        let cache_dir = &self.config.ingest.cache_dir;
        let entries = match fs::read_dir(cache_dir) {
            Ok(entries) => entries,
            Err(_) => return,
        };

        for entry in entries.flatten() {
            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with(&format!("{stem}.")) || name.starts_with(&format!("{stem}-")) {
                if let Err(e) = fs::remove_file(entry.path()) {
                    warn!(entry = %name, error = %e, "failed to purge cached rendering");
                }
            }
        }
    }
}

/// Slug the stem, keep the (lowercased) extension.
fn sanitize_filename(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    let slug = slugify(&stem);
    let stem = if slug.is_empty() { "file".to_string() } else { slug };
    if ext.is_empty() {
        stem
    } else {
        format!("{stem}.{ext}")
    }
}

/// First non-existing target for `filename` inside `dir`, suffixing the
/// stem with `-1`, `-2`, … on collision.
fn unique_target(dir: &Path, filename: &str) -> PathBuf {
    let candidate = dir.join(filename);
    if !candidate.exists() {
        return candidate;
    }

    let path = Path::new(filename);
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "file".to_string());
    let ext = path.extension().map(|e| e.to_string_lossy().to_string());

    let mut n = 1u32;
    loop {
        let name = match &ext {
            Some(ext) => format!("{stem}-{n}.{ext}"),
            None => format!("{stem}-{n}"),
        };
        let candidate = dir.join(name);
        if !candidate.exists() {
            return candidate;
        }
        n += 1;
    }
}

/// Move a file, falling back to copy-and-remove across filesystems.
fn move_file(from: &Path, to: &Path) -> Result<()> {
    if fs::rename(from, to).is_ok() {
        return Ok(());
    }
    fs::copy(from, to)?;
    fs::remove_file(from)?;
    Ok(())
}
