//! Error types for gallery operations.
//!
//! Permission and validation failures are always surfaced to the caller.
//! I/O failures during non-critical cleanup (removing an emptied directory,
//! purging a cached rendering) are logged at the call site instead of being
//! raised through this type.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GalleryError {
    #[error("{what} {id} not found")]
    NotFound { what: &'static str, id: i64 },

    #[error("actor {actor} is not permitted to modify album {album}")]
    PermissionDenied { actor: i64, album: i64 },

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Database(#[from] rusqlite::Error),
}

impl GalleryError {
    pub fn album_not_found(id: i64) -> Self {
        GalleryError::NotFound { what: "album", id }
    }

    pub fn picture_not_found(id: i64) -> Self {
        GalleryError::NotFound { what: "picture", id }
    }

    pub fn resource_not_found(id: i64) -> Self {
        GalleryError::NotFound { what: "resource", id }
    }
}

pub type Result<T> = std::result::Result<T, GalleryError>;
