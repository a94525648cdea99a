// src/events.rs

//! Build lifecycle events and the subscriber bus.
//!
//! Every run reports its progress here: one `TaskStarting` per planned task
//! as the plan is entered (root first), then `TaskFinished` / `TaskError` as
//! tasks settle. Each task failure additionally raises an application-level
//! `Error` event so a single observer can watch for any failure.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Instant;

use tracing::{info, warn};

use crate::errors::SharedTaskError;

/// Descriptor of a task as it appears in lifecycle events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskMeta {
    pub name: String,
    pub deps: Vec<String>,
}

/// Lifecycle events emitted while a build runs.
#[derive(Debug, Clone)]
pub enum BuildEvent {
    /// The plan walk entered this task; fires root first, before any
    /// dependency has run.
    TaskStarting { task: TaskMeta },
    /// The task's action (and every dependency before it) succeeded.
    TaskFinished { task: TaskMeta },
    /// The task's action failed or panicked.
    TaskError {
        task: TaskMeta,
        error: SharedTaskError,
    },
    /// Application-level failure notification. Raised once per task failure
    /// in addition to `TaskError`, and for watch-triggered builds whose
    /// request could not be expanded at all.
    Error { error: SharedTaskError },
}

/// Observer of build lifecycle events.
///
/// Listeners run synchronously on the emitting run's own loop, in
/// subscription order; they should return quickly.
pub trait EventListener: Send + Sync {
    fn on_event(&self, event: &BuildEvent);
}

/// Subscriber list shared between a scheduler and its application.
///
/// `subscribe` is idempotent per listener instance: subscribing the same
/// `Arc` twice keeps a single entry, so re-wiring an application does not
/// double-deliver events.
#[derive(Default)]
pub struct EventBus {
    listeners: RwLock<Vec<Arc<dyn EventListener>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, listener: Arc<dyn EventListener>) {
        let mut listeners = self
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if listeners
            .iter()
            .any(|existing| Arc::ptr_eq(existing, &listener))
        {
            return;
        }
        listeners.push(listener);
    }

    pub fn emit(&self, event: &BuildEvent) {
        // Snapshot outside the lock; listeners may subscribe re-entrantly.
        let listeners: Vec<Arc<dyn EventListener>> = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for listener in &listeners {
            listener.on_event(event);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

/// Logs task lifecycle with elapsed times through `tracing`.
///
/// The opt-in runtime reporter: enable it via `AppOptions::runtimes` or
/// subscribe one directly. Elapsed time is measured from plan entry, so it
/// includes time spent waiting on dependencies.
#[derive(Default)]
pub struct TimingReporter {
    started: Mutex<HashMap<String, Instant>>,
}

impl TimingReporter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EventListener for TimingReporter {
    fn on_event(&self, event: &BuildEvent) {
        match event {
            BuildEvent::TaskStarting { task } => {
                self.started
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .insert(task.name.clone(), Instant::now());
                info!(task = %task.name, "starting");
            }
            BuildEvent::TaskFinished { task } => {
                let elapsed = self
                    .started
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .remove(&task.name)
                    .map(|entered| entered.elapsed());
                match elapsed {
                    Some(elapsed) => {
                        info!(task = %task.name, elapsed_ms = elapsed.as_millis() as u64, "finished")
                    }
                    None => info!(task = %task.name, "finished"),
                }
            }
            BuildEvent::TaskError { task, error } => {
                self.started
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .remove(&task.name);
                warn!(task = %task.name, error = %error, "task failed");
            }
            BuildEvent::Error { .. } => {}
        }
    }
}
