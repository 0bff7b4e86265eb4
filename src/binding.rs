//! Folder binding: alias generation and directory provisioning.
//!
//! Binding is the only path through which an album acquires its assigned
//! directory. Aliases are lowercase ASCII slugs, globally unique across
//! albums; a collision is resolved by prefixing the numeric album id, which
//! is unique by construction.

use std::fs;
use std::path::Path;

use tracing::info;

use crate::config::Config;
use crate::db::Database;
use crate::error::{GalleryError, Result};
use crate::guard::{Actor, PermissionGuard};

/// Room is left for the `id-{n}-` disambiguation prefix.
pub const MAX_ALIAS_LEN: usize = 43;

/// Marker file flagging a directory as publicly visible. Emptiness checks
/// and orphan-file scans ignore it.
pub const PUBLIC_MARKER: &str = ".public";

/// Map an accented or otherwise decorated character to its ASCII base form.
fn transliterate_char(c: char) -> Option<char> {
    let mapped = match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'ā' => 'a',
        'ç' | 'ć' | 'č' => 'c',
        'è' | 'é' | 'ê' | 'ë' | 'ē' | 'ė' => 'e',
        'ì' | 'í' | 'î' | 'ï' | 'ī' => 'i',
        'ñ' | 'ń' => 'n',
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' | 'ō' => 'o',
        'š' | 'ś' => 's',
        'ù' | 'ú' | 'û' | 'ü' | 'ū' => 'u',
        'ý' | 'ÿ' => 'y',
        'ž' | 'ź' | 'ż' => 'z',
        'ß' => 's',
        _ => {
            if c.is_ascii() {
                c
            } else {
                return None;
            }
        }
    };
    Some(mapped)
}

/// Strip diacritics and drop characters with no ASCII base form.
pub fn transliterate(input: &str) -> String {
    input
        .to_lowercase()
        .chars()
        .filter_map(transliterate_char)
        .collect()
}

/// Normalize a name into a lowercase ASCII slug of at most
/// [`MAX_ALIAS_LEN`] characters. Whitespace becomes `-`; anything outside
/// `[a-z0-9_-]` is dropped.
pub fn slugify(input: &str) -> String {
    let mut slug = String::new();
    let mut last_dash = true;

    for c in transliterate(input).chars() {
        if c.is_ascii_alphanumeric() || c == '_' {
            slug.push(c);
            last_dash = false;
        } else if (c.is_ascii_whitespace() || c == '-' || c == '.' || c == '/') && !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }

    while slug.ends_with('-') {
        slug.pop();
    }

    slug.truncate(MAX_ALIAS_LEN);
    while slug.ends_with('-') {
        slug.pop();
    }

    slug
}

pub struct FolderBinding {
    config: Config,
    guard: PermissionGuard,
}

impl FolderBinding {
    pub fn new(config: Config) -> Self {
        let guard = PermissionGuard::from_config(&config);
        Self { config, guard }
    }

    /// Reserve a unique alias for an album and bind its directory.
    ///
    /// With `explicit_dir` the caller has chosen an existing directory
    /// (possibly shared); nothing is created. Otherwise a directory named
    /// after the alias is provisioned under the upload root, marked public
    /// and registered. Re-binding an unchanged alias on an already bound
    /// album is a no-op. Rewriting the binding is a mutation of the album,
    /// so it runs under the write policy.
    pub fn bind(
        &self,
        db: &Database,
        actor: &Actor,
        album_id: i64,
        desired_name: &str,
        explicit_dir: Option<i64>,
    ) -> Result<(String, i64)> {
        let album = db
            .get_album(album_id)?
            .ok_or(GalleryError::album_not_found(album_id))?;
        self.guard.ensure_can_mutate(db, actor, album_id)?;

        let mut alias = slugify(desired_name);
        if alias.is_empty() {
            alias = slugify(&album.name);
        }
        if alias.is_empty() {
            return Err(GalleryError::Validation(format!(
                "cannot derive an alias from {desired_name:?}"
            )));
        }

        // Collision: prefix the album id. Unique by construction, no
        // further check needed.
        if db.alias_taken(&alias, album_id)? {
            alias = format!("id-{album_id}-{alias}");
        }

        if let Some(resource_id) = explicit_dir {
            let path = db
                .resolve_resource(resource_id)?
                .ok_or(GalleryError::resource_not_found(resource_id))?;
            if !path.is_dir() {
                return Err(GalleryError::Validation(format!(
                    "assigned directory {} does not exist",
                    path.display()
                )));
            }
            db.set_album_alias(album_id, &alias)?;
            db.set_album_assigned_dir(album_id, resource_id)?;
            return Ok((alias, resource_id));
        }

        // Unchanged alias on a bound album: nothing to do.
        if album.alias.as_deref() == Some(alias.as_str()) {
            if let Some(existing) = album.assigned_dir {
                return Ok((alias, existing));
            }
        }

        let dir = self.config.storage.upload_root.join(&alias);
        fs::create_dir_all(&dir)?;
        mark_public(&dir)?;

        let resource_id = db.register_resource(&dir)?;
        db.set_album_alias(album_id, &alias)?;
        db.set_album_assigned_dir(album_id, resource_id)?;

        info!(album_id, %alias, dir = %dir.display(), "bound album directory");

        Ok((alias, resource_id))
    }

    /// Create and register the configured upload root.
    ///
    /// Run before any binding; failing to write the public marker means the
    /// root is not writable, which is a configuration problem.
    pub fn ensure_upload_root(&self, db: &Database) -> Result<i64> {
        let root = &self.config.storage.upload_root;
        fs::create_dir_all(root)
            .and_then(|_| mark_public_io(root))
            .map_err(|e| {
                GalleryError::Validation(format!(
                    "upload root {} is not writable: {e}",
                    root.display()
                ))
            })?;
        db.register_resource(root)
    }
}

fn mark_public_io(dir: &Path) -> std::io::Result<()> {
    let marker = dir.join(PUBLIC_MARKER);
    if !marker.exists() {
        fs::write(&marker, b"")?;
    }
    Ok(())
}

/// Drop the `.public` visibility marker into a directory.
pub fn mark_public(dir: &Path) -> Result<()> {
    mark_public_io(dir)?;
    Ok(())
}
