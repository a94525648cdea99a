// src/errors.rs

//! Error types.
//!
//! [`BuildError`] is the scheduler's taxonomy: everything that can go wrong
//! registering a task, expanding a plan or running one. [`Error`] covers the
//! glue surfaces around the scheduler (config, watch setup, rendering, file
//! access) and wraps `BuildError` where the two meet.

use std::sync::Arc;

use thiserror::Error;

/// Boxed error type task actions are allowed to fail with.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A task failure shared between the run outcome and emitted events.
pub type SharedTaskError = Arc<dyn std::error::Error + Send + Sync + 'static>;

/// Errors produced by the task scheduler.
///
/// `InvalidTask`, `UnknownTask`, `CyclicDependency` and `InvalidArgument` are
/// all detected before any task runs and before any event fires. `TaskFailed`
/// is only ever delivered through a finished run (and the event bus), never
/// eagerly.
#[derive(Debug, Clone, Error)]
pub enum BuildError {
    /// Malformed registration, e.g. an empty task name.
    #[error("invalid task definition: {0}")]
    InvalidTask(String),

    /// A requested task or dependency has no registry entry.
    #[error("unknown task '{name}'{}", required_by_suffix(.required_by))]
    UnknownTask {
        name: String,
        /// The task whose dependency list referenced `name`, or `None` when
        /// the build request itself named an unregistered task.
        required_by: Option<String>,
    },

    /// The dependency walk re-entered a task still on the stack.
    #[error("task dependency cycle: {}", .cycle.join(" -> "))]
    CyclicDependency {
        /// Cycle members in walk order, closing back on the first member.
        cycle: Vec<String>,
    },

    /// Malformed build request, e.g. an empty task selection.
    #[error("invalid build request: {0}")]
    InvalidArgument(String),

    /// A task action returned an error or panicked.
    #[error("task '{task}' failed: {error}")]
    TaskFailed {
        task: String,
        error: SharedTaskError,
    },
}

fn required_by_suffix(required_by: &Option<String>) -> String {
    match required_by {
        Some(parent) => format!(" (dependency of '{parent}')"),
        None => String::new(),
    }
}

/// Crate-level error for the application glue around the scheduler.
#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("watch error: {0}")]
    Watch(String),

    #[error("render error: {0}")]
    Render(String),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<notify::Error> for Error {
    fn from(err: notify::Error) -> Self {
        Error::Watch(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
