// src/scheduler/runner.rs

//! Plan execution.
//!
//! A run announces every planned task up front (walk order, root first),
//! then repeatedly dispatches tasks whose dependencies have all finished.
//! Independent tasks run concurrently on spawned tokio tasks; completions
//! come back over a channel. The first failure stops further dispatch, but
//! tasks already in flight settle before the run resolves, and the outcome
//! reports that first failure.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinError;
use tracing::{debug, warn};

use crate::errors::{BoxError, BuildError, SharedTaskError};
use crate::events::{BuildEvent, EventBus, TaskMeta};
use crate::scheduler::plan::ExecutionPlan;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum RunState {
    Pending,
    Running,
    Done,
    Failed,
}

struct Completion {
    task: String,
    result: Result<(), BoxError>,
}

pub(crate) struct BuildRun {
    plan: ExecutionPlan,
    bus: Arc<EventBus>,
    states: HashMap<String, RunState>,
    first_error: Option<BuildError>,
    running: usize,
}

impl BuildRun {
    pub(crate) fn new(plan: ExecutionPlan, bus: Arc<EventBus>) -> Self {
        Self {
            plan,
            bus,
            states: HashMap::new(),
            first_error: None,
            running: 0,
        }
    }

    pub(crate) async fn execute(mut self) -> Result<(), BuildError> {
        for name in self.plan.discovery() {
            self.bus.emit(&BuildEvent::TaskStarting {
                task: self.meta(name),
            });
        }

        let (tx, mut rx) = mpsc::channel::<Completion>(64);
        self.dispatch_ready(&tx);

        while self.running > 0 {
            let Some(done) = rx.recv().await else { break };
            self.running -= 1;
            self.apply(done);
            self.dispatch_ready(&tx);
        }

        match self.first_error.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Dispatch every pending task whose dependencies are all done. Tasks
    /// without an action finish inline, which can ready their dependents,
    /// so the scan repeats until it makes no progress.
    fn dispatch_ready(&mut self, tx: &mpsc::Sender<Completion>) {
        if self.first_error.is_some() {
            return;
        }

        loop {
            let ready: Vec<String> = self
                .plan
                .order()
                .iter()
                .filter(|name| self.state(name) == RunState::Pending && self.deps_done(name))
                .cloned()
                .collect();
            if ready.is_empty() {
                break;
            }

            for name in ready {
                let action = match self.plan.task(&name) {
                    Some(planned) => planned.action.clone(),
                    None => continue,
                };
                match action {
                    None => self.complete_ok(&name),
                    Some(action) => {
                        debug!(task = %name, "dispatching task");
                        self.states.insert(name.clone(), RunState::Running);
                        self.running += 1;
                        let tx = tx.clone();
                        let task = name.clone();
                        tokio::spawn(async move {
                            // The inner spawn isolates panics: a panicking
                            // action surfaces here as a JoinError instead of
                            // tearing down the completion loop.
                            let handle = tokio::spawn(async move { action().await });
                            let result = match handle.await {
                                Ok(outcome) => outcome,
                                Err(join) => Err(join_failure(join)),
                            };
                            let _ = tx.send(Completion { task, result }).await;
                        });
                    }
                }
            }
        }
    }

    fn apply(&mut self, done: Completion) {
        match done.result {
            Ok(()) => self.complete_ok(&done.task),
            Err(err) => self.complete_err(&done.task, err),
        }
    }

    fn complete_ok(&mut self, name: &str) {
        debug!(task = %name, "task finished");
        self.states.insert(name.to_string(), RunState::Done);
        self.bus.emit(&BuildEvent::TaskFinished {
            task: self.meta(name),
        });
    }

    fn complete_err(&mut self, name: &str, err: BoxError) {
        let shared: SharedTaskError = Arc::from(err);
        warn!(task = %name, error = %shared, "task failed");
        self.states.insert(name.to_string(), RunState::Failed);
        self.bus.emit(&BuildEvent::TaskError {
            task: self.meta(name),
            error: shared.clone(),
        });
        self.bus.emit(&BuildEvent::Error {
            error: shared.clone(),
        });
        if self.first_error.is_none() {
            self.first_error = Some(BuildError::TaskFailed {
                task: name.to_string(),
                error: shared,
            });
        }
    }

    fn meta(&self, name: &str) -> TaskMeta {
        match self.plan.task(name) {
            Some(planned) => TaskMeta {
                name: planned.name.clone(),
                deps: planned.deps.clone(),
            },
            None => TaskMeta {
                name: name.to_string(),
                deps: Vec::new(),
            },
        }
    }

    fn deps_done(&self, name: &str) -> bool {
        match self.plan.task(name) {
            Some(planned) => planned
                .deps
                .iter()
                .all(|dep| self.state(dep) == RunState::Done),
            None => false,
        }
    }

    fn state(&self, name: &str) -> RunState {
        self.states
            .get(name)
            .copied()
            .unwrap_or(RunState::Pending)
    }
}

fn join_failure(join: JoinError) -> BoxError {
    if join.is_panic() {
        let payload = join.into_panic();
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "task panicked".to_string());
        format!("panic: {message}").into()
    } else {
        join.to_string().into()
    }
}
