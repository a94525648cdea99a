// src/scheduler/task.rs

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::errors::BoxError;

/// Future returned by one invocation of a task action.
pub type TaskFuture = Pin<Box<dyn Future<Output = Result<(), BoxError>> + Send>>;

/// A task's unit of work. Invoked once per run the task participates in; it
/// must be re-invokable because watch-triggered rebuilds re-run the plan.
pub type TaskAction = dyn Fn() -> TaskFuture + Send + Sync;

/// A task definition as registered with the scheduler.
///
/// The action is optional: a task may be registered as a bare dependency
/// list (an aggregation target such as `default`), in which case it finishes
/// as soon as its dependencies have.
#[derive(Clone)]
pub struct TaskSpec {
    name: String,
    deps: Vec<String>,
    action: Option<Arc<TaskAction>>,
}

impl TaskSpec {
    /// Start a definition with no dependencies and no action.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            deps: Vec::new(),
            action: None,
        }
    }

    /// Declare the tasks that must complete before this one starts.
    pub fn after<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.deps = deps.into_iter().map(Into::into).collect();
        self
    }

    /// Attach the unit of work.
    pub fn action<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        self.action = Some(Arc::new(move || -> TaskFuture { Box::pin(f()) }));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn deps(&self) -> &[String] {
        &self.deps
    }

    pub fn has_action(&self) -> bool {
        self.action.is_some()
    }

    pub(crate) fn action_arc(&self) -> Option<Arc<TaskAction>> {
        self.action.clone()
    }
}

impl fmt::Debug for TaskSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskSpec")
            .field("name", &self.name)
            .field("deps", &self.deps)
            .field("has_action", &self.has_action())
            .finish()
    }
}

/// Conversion for build selections: a single task name or any list of names.
pub trait IntoTaskNames {
    fn into_task_names(self) -> Vec<String>;
}

impl IntoTaskNames for &str {
    fn into_task_names(self) -> Vec<String> {
        vec![self.to_string()]
    }
}

impl IntoTaskNames for String {
    fn into_task_names(self) -> Vec<String> {
        vec![self]
    }
}

impl<S: Into<String>> IntoTaskNames for Vec<S> {
    fn into_task_names(self) -> Vec<String> {
        self.into_iter().map(Into::into).collect()
    }
}

impl<S: Into<String> + Clone> IntoTaskNames for &[S] {
    fn into_task_names(self) -> Vec<String> {
        self.iter().cloned().map(Into::into).collect()
    }
}

impl<S: Into<String>, const N: usize> IntoTaskNames for [S; N] {
    fn into_task_names(self) -> Vec<String> {
        self.into_iter().map(Into::into).collect()
    }
}
