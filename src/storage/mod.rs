// FILE: src/storage/mod.rs
pub mod connection;
pub mod file_index;

// Common exports
pub use connection::open_connection;
pub use file_index::FileIndex;

use serde::{Deserialize, Serialize};

// Data Types
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexRecord {
    pub path: String,
    pub name: String,
    pub modified_ms: i64,
    pub size: i64,
}

impl IndexRecord {
    pub fn new(path: impl Into<String>, name: impl Into<String>, modified_ms: i64, size: i64) -> Self {
        Self { path: path.into(), name: name.into(), modified_ms, size }
    }
}

impl std::fmt::Display for IndexRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (size: {}, mtime: {})", self.path, self.size, self.modified_ms)
    }
}

/// A single hit returned by [`FileIndex::query`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub path: String,
    pub name: String,
}
