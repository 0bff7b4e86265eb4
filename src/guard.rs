//! Ownership-based write policy.
//!
//! Every mutating operation is gated through [`PermissionGuard`]; read-only
//! operations never are. Administrators bypass the check, as does everyone
//! when write protection is disabled in the configuration.

use crate::config::Config;
use crate::db::Database;
use crate::error::{GalleryError, Result};

/// The principal on whose behalf an operation runs.
#[derive(Debug, Clone, Copy)]
pub struct Actor {
    pub id: i64,
    pub is_admin: bool,
}

impl Actor {
    pub fn new(id: i64) -> Self {
        Self { id, is_admin: false }
    }

    pub fn admin(id: i64) -> Self {
        Self { id, is_admin: true }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PermissionGuard {
    write_protection: bool,
}

impl PermissionGuard {
    pub fn new(write_protection: bool) -> Self {
        Self { write_protection }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.security.write_protection)
    }

    /// May `actor` mutate `album_id`?
    ///
    /// An album without an owner row is not protected; the operation itself
    /// reports NotFound where that matters.
    pub fn can_mutate(&self, db: &Database, actor: &Actor, album_id: i64) -> Result<bool> {
        if actor.is_admin || !self.write_protection {
            return Ok(true);
        }

        match db.get_album(album_id)? {
            Some(album) => Ok(album.owner == actor.id),
            None => Ok(true),
        }
    }

    pub fn ensure_can_mutate(&self, db: &Database, actor: &Actor, album_id: i64) -> Result<()> {
        if self.can_mutate(db, actor, album_id)? {
            Ok(())
        } else {
            Err(GalleryError::PermissionDenied {
                actor: actor.id,
                album: album_id,
            })
        }
    }
}
