// FILE: src/listing.rs
//! Directory listing in the shape the rest of Woxel consumes.
//!
//! This is thin glue over `std::fs`; the interesting part is the path check,
//! which refuses anything that could escape the directory the host asked for.

use std::fs;
use std::path::{Component, Path};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::{Result, WoxelError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    pub path: String,
    pub name: String,
    pub size: u64,
    pub modified_ms: i64,
    pub is_dir: bool,
}

impl FileEntry {
    /// Build an entry from metadata the caller already has.
    pub fn from_metadata(path: &Path, metadata: &fs::Metadata) -> Self {
        let is_dir = metadata.is_dir();
        Self {
            path: path.to_string_lossy().to_string(),
            name: display_name(path),
            size: if is_dir { 0 } else { metadata.len() },
            modified_ms: metadata.modified().map(to_epoch_ms).unwrap_or(0),
            is_dir,
        }
    }
}

/// Refuse empty paths, NUL bytes and `..` components.
pub fn check_path(path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(WoxelError::InvalidInput("Empty path".into()));
    }
    if path.contains('\0') {
        return Err(WoxelError::InvalidInput("NUL byte in path".into()));
    }
    if Path::new(path).components().any(|c| c == Component::ParentDir) {
        return Err(WoxelError::InvalidInput(format!("Unsafe path: {}", path)));
    }
    Ok(())
}

/// List the immediate children of `path`.
pub fn list_directory(path: &str) -> Result<Vec<FileEntry>> {
    check_path(path)?;

    let mut entries = Vec::new();
    for entry in fs::read_dir(path)? {
        let entry = entry?;
        let entry_path = entry.path();
        // Entries can vanish between read_dir and stat; skip them.
        let metadata = match entry.metadata() {
            Ok(m) => m,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
            Err(e) => return Err(WoxelError::Io(e)),
        };
        entries.push(FileEntry::from_metadata(&entry_path, &metadata));
    }
    Ok(entries)
}

/// Final path segment, or the whole path when there is none (e.g. `/`).
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string_lossy().to_string())
}

pub fn to_epoch_ms(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(d) => d.as_millis() as i64,
        Err(e) => -(e.duration().as_millis() as i64),
    }
}
