//! gallerist — keeps a relational description of a hierarchical photo-album
//! tree consistent with the filesystem and a file resource registry.
//!
//! Albums form a tree, each bound to exactly one directory; pictures
//! associate file refs with an owning album under a stable manual order.
//! The engines on top of the store handle directory binding, ingestion,
//! drift repair, resorting and the ownership-based write policy. There is
//! no UI here: callers pass plain identifiers and get plain records back.

pub mod binding;
pub mod config;
pub mod db;
pub mod error;
pub mod guard;
pub mod ingest;
pub mod logging;
pub mod revise;
pub mod sort;
pub mod store;

pub use binding::FolderBinding;
pub use config::Config;
pub use db::{Album, AlbumUpdate, CaptionType, Database, Picture, SortKey};
pub use error::{GalleryError, Result};
pub use guard::{Actor, PermissionGuard};
pub use ingest::IngestPipeline;
pub use revise::{ReviseEngine, RevisionReport};
pub use sort::SortEngine;
pub use store::AlbumStore;
