// src/scheduler/mod.rs

//! Task registration and build orchestration.
//!
//! The [`Scheduler`] owns a registry of named tasks and an event bus. A
//! build request expands into an [`ExecutionPlan`] (dependencies before
//! dependents, cycles and unknown names rejected up front) and then runs
//! it, fanning independent tasks out onto the tokio runtime.

mod registry;
mod runner;
pub mod plan;
pub mod task;

pub use plan::ExecutionPlan;
pub use task::{IntoTaskNames, TaskAction, TaskFuture, TaskSpec};

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use tracing::info;

use crate::errors::{BoxError, BuildError};
use crate::events::{EventBus, EventListener};

use registry::Registry;
use runner::BuildRun;

/// Task registry plus the event bus its runs report on.
///
/// Cloning is cheap and clones share state: tasks registered through one
/// handle are visible to builds started through another, which is how an
/// application hands its scheduler to plugins and watch loops.
#[derive(Clone, Default)]
pub struct Scheduler {
    inner: Arc<SchedulerInner>,
}

#[derive(Default)]
struct SchedulerInner {
    registry: Registry,
    bus: Arc<EventBus>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a task definition. Registering a name again replaces the
    /// earlier definition.
    pub fn register(&self, spec: TaskSpec) -> Result<(), BuildError> {
        self.inner.registry.insert(spec)
    }

    /// Shorthand for the common registration: a name, a fixed dependency
    /// list and one action.
    pub fn task<F, Fut>(&self, name: &str, deps: &[&str], f: F) -> Result<(), BuildError>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        self.register(TaskSpec::new(name).after(deps.iter().copied()).action(f))
    }

    pub fn has_task(&self, name: &str) -> bool {
        self.inner.registry.contains(name)
    }

    /// Expand a selection into its dependency-ordered plan without running
    /// anything.
    pub fn plan(&self, tasks: impl IntoTaskNames) -> Result<ExecutionPlan, BuildError> {
        let roots = selection(tasks)?;
        plan::resolve(&roots, &self.inner.registry.snapshot())
    }

    /// Run the named tasks and everything they transitively depend on.
    ///
    /// Resolves `Ok` once every planned task has finished, or with the
    /// first failure once tasks already in flight have settled.
    pub async fn build(&self, tasks: impl IntoTaskNames) -> Result<(), BuildError> {
        let roots = selection(tasks)?;
        info!(tasks = ?roots, "build requested");
        let plan = plan::resolve(&roots, &self.inner.registry.snapshot())?;
        BuildRun::new(plan, self.inner.bus.clone()).execute().await
    }

    /// Alias for [`build`](Self::build).
    pub async fn run(&self, tasks: impl IntoTaskNames) -> Result<(), BuildError> {
        self.build(tasks).await
    }

    /// Attach a listener to every future run on this scheduler.
    pub fn subscribe(&self, listener: Arc<dyn EventListener>) {
        self.inner.bus.subscribe(listener);
    }

    pub(crate) fn bus(&self) -> Arc<EventBus> {
        self.inner.bus.clone()
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("listeners", &self.inner.bus.listener_count())
            .finish_non_exhaustive()
    }
}

fn selection(tasks: impl IntoTaskNames) -> Result<Vec<String>, BuildError> {
    let roots = tasks.into_task_names();
    if roots.is_empty() {
        return Err(BuildError::InvalidArgument(
            "build request names no tasks".to_string(),
        ));
    }
    Ok(roots)
}
