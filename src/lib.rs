//! Woxel: local file-management core
//!
//! The pieces with real invariants live here:
//! - Classifier (MIME hint, extension, then signature sniffing)
//! - In-flight tracker (at most one derivation per key, e.g. thumbnails)
//! - File index (SQLite-backed upsert-by-path and recency-ordered search)
//! - Librarian (bulk indexing, stale record reconciliation, watching)
//!
//! `ffi` exposes all of it to the host application through a C ABI.

pub mod config;
pub mod core;
pub mod error;
pub mod ffi;
pub mod librarian;
pub mod listing;
pub mod state;
pub mod storage;

pub use crate::core::{classify, Category, Derivation, InFlightGuard, InFlightTracker, ThumbnailCoordinator};
pub use config::Config;
pub use error::{Result, WoxelError};
pub use librarian::{Librarian, ScanReport};
pub use listing::{list_directory, FileEntry};
pub use state::{GlobalState, SharedState};
pub use storage::{FileIndex, IndexRecord, SearchResult};
