// FILE: src/core/thumbnails.rs
//! Thumbnail coordination.
//!
//! Woxel never renders a thumbnail itself; the host supplies the derivation.
//! This module only makes sure the same `(path, size)` is not derived twice
//! at the same time.

use std::path::Path;
use std::sync::Arc;

use super::in_flight::{self, InFlightTracker};
use crate::error::Result;

/// Outcome of a [`ThumbnailCoordinator::request`].
#[derive(Debug, PartialEq, Eq)]
pub enum Derivation<T> {
    /// This caller ran the derivation.
    Derived(T),
    /// Someone else is already deriving this key; nothing was run.
    AlreadyInFlight,
}

impl<T> Derivation<T> {
    pub fn into_derived(self) -> Option<T> {
        match self {
            Derivation::Derived(value) => Some(value),
            Derivation::AlreadyInFlight => None,
        }
    }
}

pub fn thumbnail_key(path: &Path, size: u32) -> String {
    format!("{}@{}", path.display(), size)
}

#[derive(Debug, Clone)]
enum Tracker {
    /// The process-wide tracker, shared with `woxel_thumb_try_begin`.
    Global,
    Owned(Arc<InFlightTracker>),
}

#[derive(Debug, Clone)]
pub struct ThumbnailCoordinator {
    tracker: Tracker,
}

/// Coordinates against [`in_flight::global`], so every default coordinator
/// in the process (and the C boundary) sees the same keys.
impl Default for ThumbnailCoordinator {
    fn default() -> Self {
        Self { tracker: Tracker::Global }
    }
}

impl ThumbnailCoordinator {
    /// A coordinator bound to its own tracker, isolated from the global one.
    pub fn new(tracker: Arc<InFlightTracker>) -> Self {
        Self { tracker: Tracker::Owned(tracker) }
    }

    pub fn tracker(&self) -> &InFlightTracker {
        match &self.tracker {
            Tracker::Global => in_flight::global(),
            Tracker::Owned(tracker) => tracker.as_ref(),
        }
    }

    /// Runs `derive` unless the same thumbnail is already being produced.
    /// The key is released on every exit path of `derive`.
    pub fn request<T, F>(&self, path: &Path, size: u32, derive: F) -> Result<Derivation<T>>
    where
        F: FnOnce() -> Result<T>,
    {
        let key = thumbnail_key(path, size);
        let Some(_guard) = self.tracker().acquire(&key) else {
            tracing::debug!("[Thumbnails] Already in flight: {}", key);
            return Ok(Derivation::AlreadyInFlight);
        };

        tracing::debug!("[Thumbnails] Deriving: {}", key);
        match derive() {
            Ok(value) => Ok(Derivation::Derived(value)),
            Err(e) => {
                tracing::warn!("[Thumbnails] Derivation failed for {}: {}", key, e);
                Err(e)
            }
        }
    }
}
