//! Database connection management
//!
//! Every index operation opens its own connection through [`open_connection`]
//! and drops it when done. Nothing holds a long-lived handle, so there is no
//! shared connection state between threads; SQLite's own locking (WAL plus a
//! busy timeout) arbitrates concurrent writers, including other processes.

use std::path::Path;
use std::time::Duration;

use rusqlite::Connection;

use crate::error::{Result, WoxelError};

/// How long a writer waits on a locked database before giving up.
pub const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Open a configured connection to the store at `db_path`.
///
/// Creates the parent directory when `create_parent` is set.
pub fn open_connection(db_path: &Path, create_parent: bool) -> Result<Connection> {
    if db_path.as_os_str().is_empty() {
        return Err(WoxelError::InvalidInput("Empty database path".into()));
    }

    if create_parent {
        if let Some(dir) = db_path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(WoxelError::Io)?;
        }
    }

    let conn = Connection::open(db_path).map_err(WoxelError::Database)?;
    conn.busy_timeout(BUSY_TIMEOUT)?;

    // Enable WAL mode for better concurrent access
    let mode: String =
        conn.pragma_update_and_check(None, "journal_mode", WAL, |row| row.get(0))?;
    if !mode.eq_ignore_ascii_case(WAL) {
        tracing::debug!("[FileIndex] journal_mode is {} for {}", mode, db_path.display());
    }

    // Optimize for performance
    conn.pragma_update(None, "synchronous", NORMAL)?;

    Ok(conn)
}

// SQL pragma constants
const WAL: &str = "WAL";
const NORMAL: &str = "NORMAL";
