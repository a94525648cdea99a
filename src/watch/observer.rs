// src/watch/observer.rs

//! Source of filesystem change notifications.
//!
//! The rebuild loops consume changes through [`ChangeObserver`], so tests
//! and embedders can substitute a scripted source for the real notify-backed
//! watcher.

use std::any::Any;
use std::fmt;
use std::path::{Path, PathBuf};

use tokio::sync::mpsc;

use crate::errors::Result;
use crate::watch::patterns::WatchPatterns;

/// One batch of matched changes. Paths are relative to the observed root.
#[derive(Debug, Clone)]
pub struct ChangeEvent {
    pub paths: Vec<PathBuf>,
}

/// Stream of change events for one observed root.
///
/// Dropping the subscription ends the stream and releases whatever resource
/// the observer holds behind it.
pub struct ChangeSubscription {
    events: mpsc::Receiver<ChangeEvent>,
    _guard: Box<dyn Any + Send>,
}

impl ChangeSubscription {
    /// Wrap a receiver together with the guard value that keeps the
    /// underlying watcher alive.
    pub fn new(events: mpsc::Receiver<ChangeEvent>, guard: Box<dyn Any + Send>) -> Self {
        Self {
            events,
            _guard: guard,
        }
    }

    /// Next batch of changes, or `None` when the observer shut down.
    pub async fn next_change(&mut self) -> Option<ChangeEvent> {
        self.events.recv().await
    }
}

impl fmt::Debug for ChangeSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeSubscription").finish_non_exhaustive()
    }
}

/// Filesystem observation seam.
pub trait ChangeObserver: Send + Sync {
    /// Start observing `root` recursively, delivering batches of paths that
    /// match `patterns`.
    fn observe(&self, root: &Path, patterns: &WatchPatterns) -> Result<ChangeSubscription>;
}
