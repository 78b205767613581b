// FILE: src/librarian.rs
//! The Librarian keeps the file index in step with the filesystem.
//!
//! - `index_tree`: bulk walk of a root, classifying and upserting every entry
//! - `purge_stale`: drop records whose file no longer exists
//! - `watch`: follow create/modify/remove events until told to stop, with a
//!   periodic `purge_stale` pass
//!
//! A failure on one path is logged and counted; it never aborts the batch.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::time::{Duration, Instant};

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use serde::Serialize;

use crate::core::{classify, Category};
use crate::error::{Result, WoxelError};
use crate::listing::FileEntry;
use crate::storage::{FileIndex, IndexRecord};

const BATCH_SIZE: usize = 500;
const PURGE_BATCH_SIZE: usize = 1000;
const DEBOUNCE: Duration = Duration::from_millis(500);
const IGNORE_FILE: &str = ".woxelignore";

/// SQLite writes these next to the store file; indexing them would make the
/// watcher react to its own writes.
const STORE_SUFFIXES: &[&str] = &["", "-wal", "-shm", "-journal"];

const DEFAULT_IGNORES: &[&str] = &[
    IGNORE_FILE,
    ".woxel",
    ".git",
    ".thumbnails",
    "thumbs.db",
    "desktop.ini",
];

struct IgnoreRules {
    rules: HashMap<PathBuf, HashSet<String>>,
}

impl IgnoreRules {
    fn new() -> Self {
        Self { rules: HashMap::new() }
    }

    fn load_rules_for_root(&mut self, root: &Path) {
        let mut new_rules: HashSet<String> = DEFAULT_IGNORES.iter().map(|s| s.to_string()).collect();

        if let Ok(content) = fs::read_to_string(root.join(IGNORE_FILE)) {
            for line in content.lines() {
                let rule = line.trim();
                if !rule.is_empty() && !rule.starts_with('#') {
                    new_rules.insert(rule.to_lowercase());
                }
            }
        }
        self.rules.insert(root.to_path_buf(), new_rules);
    }

    fn is_ignored(&self, path: &Path) -> bool {
        for (root, rules) in &self.rules {
            if let Ok(relative) = path.strip_prefix(root) {
                return relative.components().any(|c| {
                    rules.contains(&c.as_os_str().to_string_lossy().to_lowercase())
                });
            }
        }
        path.file_name()
            .map(|n| DEFAULT_IGNORES.contains(&n.to_string_lossy().to_lowercase().as_str()))
            .unwrap_or(false)
    }
}

/// The store file and its SQLite siblings, both as given and with the parent
/// directory canonicalized, since watched roots usually are.
fn store_files(db_path: &Path) -> Vec<PathBuf> {
    let mut bases = vec![db_path.to_path_buf()];
    if let (Some(parent), Some(name)) = (db_path.parent(), db_path.file_name()) {
        if let Ok(parent) = parent.canonicalize() {
            let canonical = parent.join(name);
            if canonical != db_path {
                bases.push(canonical);
            }
        }
    }

    bases
        .iter()
        .flat_map(|base| {
            STORE_SUFFIXES.iter().map(move |suffix| {
                let mut name = base.clone().into_os_string();
                name.push(suffix);
                PathBuf::from(name)
            })
        })
        .collect()
}

/// Outcome of one [`Librarian::index_tree`] pass.
#[derive(Debug, Default, Clone, Serialize)]
pub struct ScanReport {
    pub indexed: usize,
    pub unchanged: usize,
    pub failed: usize,
    pub directories: usize,
    pub by_category: HashMap<Category, usize>,
}

impl ScanReport {
    fn merge(&mut self, other: ScanReport) {
        self.indexed += other.indexed;
        self.unchanged += other.unchanged;
        self.failed += other.failed;
        self.directories += other.directories;
        for (category, n) in other.by_category {
            *self.by_category.entry(category).or_insert(0) += n;
        }
    }
}

pub struct Librarian {
    index: FileIndex,
    ignore: IgnoreRules,
    store_files: Vec<PathBuf>,
}

impl Librarian {
    pub fn new(index: FileIndex) -> Self {
        let store_files = store_files(index.db_path());
        Self { index, ignore: IgnoreRules::new(), store_files }
    }

    pub fn index(&self) -> &FileIndex {
        &self.index
    }

    /// Walk `root` and upsert every entry below it that changed since the
    /// last pass.
    pub fn index_tree(&mut self, root: &Path) -> Result<ScanReport> {
        if !root.is_dir() {
            return Err(WoxelError::NotFound(format!("Not a directory: {}", root.display())));
        }
        self.ignore.load_rules_for_root(root);
        self.scan_tree(root)
    }

    fn scan_tree(&self, root: &Path) -> Result<ScanReport> {
        tracing::info!("[Librarian] Scanning {}", root.display());
        let known = self.known_metadata(root)?;
        let mut report = ScanReport::default();
        let mut batch: Vec<IndexRecord> = Vec::with_capacity(BATCH_SIZE);

        let ignore = &self.ignore;
        let walker = walkdir::WalkDir::new(root)
            .min_depth(1)
            .follow_links(false)
            .into_iter()
            .filter_entry(|e| {
                !e.path_is_symlink() && !ignore.is_ignored(e.path()) && !self.is_store_file(e.path())
            });

        for entry in walker {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    tracing::warn!("[Librarian] Walk error under {}: {}", root.display(), e);
                    report.failed += 1;
                    continue;
                }
            };
            let metadata = match entry.metadata() {
                Ok(m) => m,
                Err(e) => {
                    tracing::warn!("[Librarian] Cannot stat {}: {}", entry.path().display(), e);
                    report.failed += 1;
                    continue;
                }
            };

            let file = FileEntry::from_metadata(entry.path(), &metadata);
            if file.is_dir {
                report.directories += 1;
            } else {
                *report.by_category.entry(classify(entry.path(), "")).or_insert(0) += 1;
            }

            let size = file.size as i64;
            if known.get(&file.path) == Some(&(file.modified_ms, size)) {
                report.unchanged += 1;
                continue;
            }

            batch.push(IndexRecord::new(file.path, file.name, file.modified_ms, size));
            if batch.len() >= BATCH_SIZE {
                self.flush(&mut batch, &mut report);
            }
        }
        self.flush(&mut batch, &mut report);

        tracing::info!(
            "[Librarian] Scan of {} complete: {} indexed, {} unchanged, {} failed",
            root.display(),
            report.indexed,
            report.unchanged,
            report.failed
        );
        Ok(report)
    }

    pub fn index_trees(&mut self, roots: &[PathBuf]) -> ScanReport {
        let mut total = ScanReport::default();
        for root in roots {
            match self.index_tree(root) {
                Ok(report) => total.merge(report),
                Err(e) => {
                    tracing::error!("[Librarian] Skipping root {}: {}", root.display(), e);
                    total.failed += 1;
                }
            }
        }
        total
    }

    /// Remove every record whose path no longer exists. Returns how many
    /// records were dropped.
    pub fn purge_stale(&self) -> Result<usize> {
        tracing::info!("[Librarian] Starting stale record scan...");

        let mut stale: Vec<String> = Vec::new();
        self.index.scan(|record| {
            if !Path::new(&record.path).exists() {
                stale.push(record.path);
            }
            Ok(())
        })?;

        let mut purged = 0;
        for chunk in stale.chunks(PURGE_BATCH_SIZE) {
            purged += self.index.remove_many(chunk)?;
        }

        tracing::info!("[Librarian] Stale record scan complete ({} purged)", purged);
        Ok(purged)
    }

    /// Follow filesystem events under `roots` until `stop` is set.
    pub fn watch(&mut self, roots: &[PathBuf], stop: &AtomicBool, resync_interval: Duration) -> Result<()> {
        for root in roots {
            self.ignore.load_rules_for_root(root);
        }

        let (tx, rx) = mpsc::channel();
        let mut watcher = RecommendedWatcher::new(tx, notify::Config::default())?;
        for root in roots {
            watcher.watch(root, RecursiveMode::Recursive)?;
            tracing::info!("[Librarian] Watching {}", root.display());
        }

        let mut pending: HashSet<PathBuf> = HashSet::new();
        let mut last_activity = Instant::now();
        let mut last_resync = Instant::now();

        while !stop.load(Ordering::Relaxed) {
            match rx.recv_timeout(Duration::from_millis(50)) {
                Ok(Ok(event)) => {
                    if Self::is_relevant(&event) {
                        pending.extend(event.paths);
                        last_activity = Instant::now();
                    }
                }
                Ok(Err(e)) => tracing::warn!("[Librarian] Watch error: {}", e),
                Err(mpsc::RecvTimeoutError::Timeout) => {}
                Err(mpsc::RecvTimeoutError::Disconnected) => {
                    tracing::warn!("[Librarian] Watcher channel closed");
                    break;
                }
            }

            if !pending.is_empty() && last_activity.elapsed() >= DEBOUNCE {
                let paths = std::mem::take(&mut pending);
                if paths.iter().any(|p| p.file_name().map_or(false, |n| n == IGNORE_FILE)) {
                    for root in roots {
                        self.ignore.load_rules_for_root(root);
                    }
                }
                for path in paths {
                    self.apply_change(&path);
                }
            }

            if last_resync.elapsed() >= resync_interval {
                if let Err(e) = self.purge_stale() {
                    tracing::error!("[Librarian] Periodic resync failed: {}", e);
                }
                last_resync = Instant::now();
            }
        }

        tracing::info!("[Librarian] Watch stopped");
        Ok(())
    }

    fn is_relevant(event: &Event) -> bool {
        matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_))
    }

    /// Bring the index in line with whatever is at `path` now. Renames arrive
    /// as separate old/new paths, so "exists" decides between upsert and
    /// removal regardless of the event kind.
    pub(crate) fn apply_change(&self, path: &Path) {
        if self.ignore.is_ignored(path) || self.is_store_file(path) {
            return;
        }
        let path_str = path.to_string_lossy().to_string();

        match fs::symlink_metadata(path) {
            Ok(metadata) if metadata.file_type().is_symlink() => {}
            Ok(metadata) if metadata.is_dir() => {
                let file = FileEntry::from_metadata(path, &metadata);
                self.index.upsert(&file.path, &file.name, file.modified_ms, 0);
                if let Err(e) = self.scan_tree(path) {
                    tracing::warn!("[Librarian] Rescan of {} failed: {}", path_str, e);
                }
            }
            Ok(metadata) => {
                let file = FileEntry::from_metadata(path, &metadata);
                tracing::debug!("[Librarian] Indexing {}", path_str);
                self.index.upsert(&file.path, &file.name, file.modified_ms, file.size as i64);
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!("[Librarian] Dropping {}", path_str);
                if let Err(e) = self.index.remove_under(&path_str) {
                    tracing::warn!("[Librarian] Failed to drop {}: {}", path_str, e);
                }
            }
            Err(e) => {
                tracing::warn!("[Librarian] Cannot stat {}, leaving index as is: {}", path_str, e);
            }
        }
    }

    fn is_store_file(&self, path: &Path) -> bool {
        self.store_files.iter().any(|f| f == path)
    }

    fn known_metadata(&self, root: &Path) -> Result<HashMap<String, (i64, i64)>> {
        let mut known = HashMap::new();
        self.index.scan(|record| {
            if Path::new(&record.path).starts_with(root) {
                known.insert(record.path, (record.modified_ms, record.size));
            }
            Ok(())
        })?;
        Ok(known)
    }

    fn flush(&self, batch: &mut Vec<IndexRecord>, report: &mut ScanReport) {
        if batch.is_empty() {
            return;
        }
        let records = std::mem::take(batch);
        match self.index.upsert_batch(&records) {
            Ok(n) => report.indexed += n,
            Err(e) => {
                // Fall back to one-by-one so a single bad record only costs itself.
                tracing::warn!("[Librarian] Batch of {} failed ({}), retrying individually", records.len(), e);
                for record in &records {
                    if self.index.upsert(&record.path, &record.name, record.modified_ms, record.size) {
                        report.indexed += 1;
                    } else {
                        report.failed += 1;
                    }
                }
            }
        }
    }
}
