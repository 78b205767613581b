// FILE: src/core/in_flight.rs
//! In-flight tracking for expensive derivations.
//!
//! At most one caller may hold a given key between `try_begin` and
//! `complete`. The lock only guards the set operation itself and is never
//! held while the derivation runs.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, OnceLock};

#[derive(Debug, Default)]
pub struct InFlightTracker {
    keys: Mutex<HashSet<String>>,
}

impl InFlightTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `key` as in flight. Returns `false` if another caller already
    /// holds it; that caller owns the obligation to call [`complete`].
    ///
    /// [`complete`]: InFlightTracker::complete
    pub fn try_begin(&self, key: &str) -> bool {
        let mut keys = self.lock();
        if keys.contains(key) {
            return false;
        }
        keys.insert(key.to_string())
    }

    /// Releases `key`. Releasing a key that was never taken is a no-op.
    pub fn complete(&self, key: &str) {
        self.lock().remove(key);
    }

    /// Scoped form of [`try_begin`]: the returned guard releases the key when
    /// dropped, including while unwinding.
    ///
    /// [`try_begin`]: InFlightTracker::try_begin
    pub fn acquire(&self, key: &str) -> Option<InFlightGuard<'_>> {
        if self.try_begin(key) {
            Some(InFlightGuard { tracker: self, key: key.to_string() })
        } else {
            None
        }
    }

    pub fn is_in_flight(&self, key: &str) -> bool {
        self.lock().contains(key)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // The set is never left half-updated, so a poisoned lock is still usable.
    fn lock(&self) -> MutexGuard<'_, HashSet<String>> {
        self.keys.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Holds one in-flight key until dropped.
#[derive(Debug)]
pub struct InFlightGuard<'a> {
    tracker: &'a InFlightTracker,
    key: String,
}

impl InFlightGuard<'_> {
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.tracker.complete(&self.key);
    }
}

/// The process-wide tracker used by the C boundary.
pub fn global() -> &'static InFlightTracker {
    static TRACKER: OnceLock<InFlightTracker> = OnceLock::new();
    TRACKER.get_or_init(InFlightTracker::new)
}
