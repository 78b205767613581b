//! Error types for Woxel

use thiserror::Error;

#[derive(Error, Debug)]
pub enum WoxelError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Watch error: {0}")]
    Watch(#[from] notify::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl WoxelError {
    /// Integer code handed across the C boundary. 0 is reserved for success.
    pub fn code(&self) -> i32 {
        match self {
            WoxelError::InvalidInput(_) => 1,
            WoxelError::Io(_) | WoxelError::Database(_) | WoxelError::Watch(_) => 2,
            WoxelError::Conflict(_) => 3,
            WoxelError::NotFound(_) => 4,
            WoxelError::Other(_) => 5,
        }
    }
}

pub type Result<T> = std::result::Result<T, WoxelError>;
