//! The persisted file index
//!
//! One row per indexed path in the `file_index` table:
//! - Upserting records (re-indexing a path overwrites it in place)
//! - Substring search on `name`, newest first
//! - Lookup, removal and full scans for reconciliation
//!
//! Name matching is case-sensitive and literal: `instr` is used rather than
//! `LIKE`, so `%` and `_` in the search text match themselves.

use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, OptionalExtension};

use super::connection::open_connection;
use super::{IndexRecord, SearchResult};
use crate::error::{Result, WoxelError};

const UPSERT_SQL: &str = "INSERT INTO file_index (path, name, modified_ms, size)
     VALUES (?1, ?2, ?3, ?4)
     ON CONFLICT(path) DO UPDATE SET
         name = excluded.name,
         modified_ms = excluded.modified_ms,
         size = excluded.size";

#[derive(Debug, Clone)]
pub struct FileIndex {
    db_path: PathBuf,
}

impl FileIndex {
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self { db_path: db_path.into() }
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn connect(&self) -> Result<Connection> {
        open_connection(&self.db_path, false)
    }

    /// Ensure the table and the `name` index exist. Safe to call repeatedly.
    pub fn init(&self) -> bool {
        match self.try_init() {
            Ok(()) => true,
            Err(e) => {
                tracing::error!("[FileIndex] Init failed for {}: {}", self.db_path.display(), e);
                false
            }
        }
    }

    /// Insert or overwrite the record for `path`. A `false` return means the
    /// index is stale for this file; the caller may retry.
    pub fn upsert(&self, path: &str, name: &str, modified_ms: i64, size: i64) -> bool {
        match self.try_upsert(path, name, modified_ms, size) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("[FileIndex] Upsert failed for {}: {}", path, e);
                false
            }
        }
    }

    /// Records whose name contains `text`, most recently modified first.
    /// Store failures are logged and produce an empty result.
    pub fn query(&self, text: &str, limit: i64) -> Vec<SearchResult> {
        self.try_query(text, limit).unwrap_or_else(|e| {
            tracing::warn!("[FileIndex] Query '{}' failed: {}", text, e);
            Vec::new()
        })
    }

    pub fn try_init(&self) -> Result<()> {
        let conn = open_connection(&self.db_path, true)?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS file_index (
                path TEXT PRIMARY KEY NOT NULL,
                name TEXT NOT NULL,
                modified_ms INTEGER NOT NULL,
                size INTEGER NOT NULL DEFAULT 0
            );

            CREATE INDEX IF NOT EXISTS idx_file_index_name ON file_index(name);
        "#,
        )?;
        tracing::debug!("[FileIndex] Initialized {}", self.db_path.display());
        Ok(())
    }

    pub fn try_upsert(&self, path: &str, name: &str, modified_ms: i64, size: i64) -> Result<()> {
        validate_path(path)?;
        let conn = self.connect()?;
        conn.execute(UPSERT_SQL, params![path, name, modified_ms, size])?;
        tracing::trace!("[FileIndex] Upserted {} ({} bytes, mtime {})", path, size, modified_ms);
        Ok(())
    }

    pub fn try_query(&self, text: &str, limit: i64) -> Result<Vec<SearchResult>> {
        if limit <= 0 {
            return Ok(Vec::new());
        }

        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT path, name FROM file_index
             WHERE (?1 = '' OR instr(name, ?1) > 0)
             ORDER BY modified_ms DESC, path ASC
             LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![text, limit], |row| {
            Ok(SearchResult { path: row.get(0)?, name: row.get(1)? })
        })?;

        let mut results = Vec::new();
        for r in rows {
            results.push(r?);
        }
        Ok(results)
    }

    /// Write every record in one transaction: either all land or none do.
    pub fn upsert_batch(&self, records: &[IndexRecord]) -> Result<usize> {
        for record in records {
            validate_path(&record.path)?;
        }

        let mut conn = self.connect()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(UPSERT_SQL)?;
            for record in records {
                stmt.execute(params![record.path, record.name, record.modified_ms, record.size])?;
            }
        }
        tx.commit()?;
        tracing::debug!("[FileIndex] Committed batch of {} records", records.len());
        Ok(records.len())
    }

    pub fn find(&self, path: &str) -> Result<Option<IndexRecord>> {
        let conn = self.connect()?;
        let record = conn
            .query_row(
                "SELECT path, name, modified_ms, size FROM file_index WHERE path = ?1",
                params![path],
                |row| {
                    Ok(IndexRecord {
                        path: row.get(0)?,
                        name: row.get(1)?,
                        modified_ms: row.get(2)?,
                        size: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(record)
    }

    pub fn get(&self, path: &str) -> Result<IndexRecord> {
        self.find(path)?.ok_or_else(|| WoxelError::NotFound(path.to_string()))
    }

    /// Returns whether a record was actually removed.
    pub fn remove(&self, path: &str) -> Result<bool> {
        let conn = self.connect()?;
        let rows = conn.execute("DELETE FROM file_index WHERE path = ?1", params![path])?;
        tracing::debug!("[FileIndex] Removed {} (rows affected: {})", path, rows);
        Ok(rows > 0)
    }

    /// Remove `path` and every record below it.
    pub fn remove_under(&self, path: &str) -> Result<usize> {
        let prefix = format!("{}{}", path.trim_end_matches(std::path::MAIN_SEPARATOR), std::path::MAIN_SEPARATOR);
        let conn = self.connect()?;
        let rows = conn.execute(
            "DELETE FROM file_index WHERE path = ?1 OR substr(path, 1, length(?2)) = ?2",
            params![path, prefix],
        )?;
        tracing::debug!("[FileIndex] Removed {} and descendants (rows affected: {})", path, rows);
        Ok(rows)
    }

    pub fn remove_many(&self, paths: &[String]) -> Result<usize> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;
        let mut removed = 0;
        {
            let mut stmt = tx.prepare("DELETE FROM file_index WHERE path = ?1")?;
            for path in paths {
                removed += stmt.execute(params![path])?;
            }
        }
        tx.commit()?;
        Ok(removed)
    }

    pub fn count(&self) -> Result<u64> {
        let conn = self.connect()?;
        let count = conn.query_row("SELECT COUNT(*) FROM file_index", [], |row| row.get::<_, i64>(0))?;
        Ok(count as u64)
    }

    /// Stream every record to `callback` without materializing the table.
    pub fn scan<F>(&self, mut callback: F) -> Result<()>
    where
        F: FnMut(IndexRecord) -> Result<()>,
    {
        let conn = self.connect()?;
        let mut stmt = conn.prepare("SELECT path, name, modified_ms, size FROM file_index")?;
        let rows = stmt.query_map([], |row| {
            Ok(IndexRecord {
                path: row.get(0)?,
                name: row.get(1)?,
                modified_ms: row.get(2)?,
                size: row.get(3)?,
            })
        })?;

        for row in rows {
            callback(row?)?;
        }
        Ok(())
    }

    pub fn paths(&self) -> Result<Vec<String>> {
        let mut paths = Vec::new();
        self.scan(|record| {
            paths.push(record.path);
            Ok(())
        })?;
        Ok(paths)
    }
}

fn validate_path(path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(WoxelError::InvalidInput("Empty index path".into()));
    }
    if path.contains('\0') {
        return Err(WoxelError::InvalidInput(format!("NUL byte in path: {:?}", path)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use tempfile::TempDir;

    fn setup() -> (TempDir, FileIndex) {
        let dir = TempDir::new().unwrap();
        let index = FileIndex::new(dir.path().join(".woxel").join("index.db"));
        assert!(index.init());
        (dir, index)
    }

    fn names(results: &[SearchResult]) -> Vec<&str> {
        results.iter().map(|r| r.name.as_str()).collect()
    }

    #[test]
    fn test_init_is_idempotent() {
        let (_dir, index) = setup();
        assert!(index.init());
        assert!(index.init());
        assert_eq!(index.count().unwrap(), 0);
    }

    #[test]
    fn test_init_fails_on_unusable_location() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, b"not a directory").unwrap();
        let index = FileIndex::new(blocker.join("index.db"));
        assert!(!index.init());
    }

    #[test]
    fn test_upsert_overwrites_in_place() {
        let (_dir, index) = setup();
        assert!(index.upsert("/sdcard/a.txt", "a.txt", 1000, 10));
        assert!(index.upsert("/sdcard/a.txt", "a.txt", 2000, 20));

        assert_eq!(index.count().unwrap(), 1);
        let record = index.get("/sdcard/a.txt").unwrap();
        assert_eq!(record.modified_ms, 2000);
        assert_eq!(record.size, 20);
    }

    #[test]
    fn test_upsert_renames_in_place() {
        let (_dir, index) = setup();
        assert!(index.upsert("/x/1", "old.txt", 1, 1));
        assert!(index.upsert("/x/1", "new.txt", 1, 1));
        assert!(index.query("old", 10).is_empty());
        assert_eq!(names(&index.query("new", 10)), vec!["new.txt"]);
    }

    #[test]
    fn test_upsert_without_init_fails() {
        let dir = TempDir::new().unwrap();
        let index = FileIndex::new(dir.path().join("index.db"));
        assert!(!index.upsert("/a", "a", 0, 0));
    }

    #[test]
    fn test_upsert_rejects_empty_path() {
        let (_dir, index) = setup();
        assert!(!index.upsert("", "a", 0, 0));
        assert!(matches!(index.try_upsert("", "a", 0, 0), Err(WoxelError::InvalidInput(_))));
    }

    #[test]
    fn test_query_orders_by_recency() {
        let (_dir, index) = setup();
        index.upsert("/p/cat.jpg", "cat.jpg", 100, 1);
        index.upsert("/p/bat.png", "bat.png", 200, 1);
        index.upsert("/p/dog.gif", "dog.gif", 300, 1);

        assert_eq!(names(&index.query("a", 10)), vec!["bat.png", "cat.jpg"]);
        assert_eq!(names(&index.query("", 10)), vec!["dog.gif", "bat.png", "cat.jpg"]);
        assert_eq!(names(&index.query("", 2)), vec!["dog.gif", "bat.png"]);
    }

    #[test]
    fn test_query_non_positive_limit_is_empty() {
        let (_dir, index) = setup();
        index.upsert("/p/a", "a", 1, 1);
        assert!(index.query("a", 0).is_empty());
        assert!(index.query("", -5).is_empty());
    }

    #[test]
    fn test_query_is_case_sensitive_and_literal() {
        let (_dir, index) = setup();
        index.upsert("/p/Report.pdf", "Report.pdf", 1, 1);
        index.upsert("/p/100%_done.txt", "100%_done.txt", 2, 1);
        index.upsert("/p/100x.txt", "100x.txt", 3, 1);

        assert!(index.query("report", 10).is_empty());
        assert_eq!(names(&index.query("Report", 10)), vec!["Report.pdf"]);
        assert_eq!(names(&index.query("%_", 10)), vec!["100%_done.txt"]);
    }

    #[test]
    fn test_query_reflects_last_upsert() {
        let (_dir, index) = setup();
        for i in 0..5 {
            index.upsert("/p/log.txt", "log.txt", i, i * 10);
        }
        let results = index.query("log", 10);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].path, "/p/log.txt");
        assert_eq!(index.get("/p/log.txt").unwrap().size, 40);
    }

    #[test]
    fn test_get_missing_is_not_found() {
        let (_dir, index) = setup();
        assert!(matches!(index.get("/nope"), Err(WoxelError::NotFound(_))));
        assert!(index.find("/nope").unwrap().is_none());
    }

    #[test]
    fn test_remove() {
        let (_dir, index) = setup();
        index.upsert("/p/a", "a", 1, 1);
        assert!(index.remove("/p/a").unwrap());
        assert!(!index.remove("/p/a").unwrap());
        assert_eq!(index.count().unwrap(), 0);
    }

    #[test]
    fn test_batch_is_all_or_nothing() {
        let (_dir, index) = setup();
        let good = IndexRecord::new("/p/a.txt", "a.txt", 1, 1);
        let bad = IndexRecord::new("", "ghost", 1, 1);

        assert!(index.upsert_batch(&[good.clone(), bad]).is_err());
        assert_eq!(index.count().unwrap(), 0);

        assert_eq!(index.upsert_batch(&[good.clone(), IndexRecord::new("/p/b.txt", "b.txt", 2, 2)]).unwrap(), 2);
        assert_eq!(index.get("/p/a.txt").unwrap(), good);
    }

    #[test]
    fn test_remove_under_keeps_siblings() {
        let (_dir, index) = setup();
        index.upsert("/p/album", "album", 1, 0);
        index.upsert("/p/album/t1.flac", "t1.flac", 1, 1);
        index.upsert("/p/album/cd2/t2.flac", "t2.flac", 1, 1);
        index.upsert("/p/album2/t3.flac", "t3.flac", 1, 1);

        assert_eq!(index.remove_under("/p/album").unwrap(), 3);
        assert_eq!(index.paths().unwrap(), vec!["/p/album2/t3.flac".to_string()]);
    }

    #[test]
    fn test_paths_and_remove_many() {
        let (_dir, index) = setup();
        index.upsert("/p/a", "a", 1, 1);
        index.upsert("/p/b", "b", 1, 1);
        let mut paths = index.paths().unwrap();
        paths.sort();
        assert_eq!(paths, vec!["/p/a".to_string(), "/p/b".to_string()]);

        assert_eq!(index.remove_many(&paths).unwrap(), 2);
        assert_eq!(index.count().unwrap(), 0);
    }

    #[test]
    fn test_concurrent_upserts_and_queries() {
        let (_dir, index) = setup();
        let index = Arc::new(index);

        let writers: Vec<_> = (0..4)
            .map(|t| {
                let index = Arc::clone(&index);
                thread::spawn(move || {
                    for i in 0..25 {
                        let path = format!("/t{}/file{}.txt", t, i);
                        assert!(index.upsert(&path, &format!("file{}.txt", i), i, i));
                    }
                })
            })
            .collect();

        let reader = {
            let index = Arc::clone(&index);
            thread::spawn(move || {
                for _ in 0..25 {
                    for result in index.query("file", 1000) {
                        assert!(result.path.ends_with(&result.name));
                    }
                }
            })
        };

        for w in writers {
            w.join().unwrap();
        }
        reader.join().unwrap();
        assert_eq!(index.count().unwrap(), 100);
    }
}
