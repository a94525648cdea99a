// src/scheduler/registry.rs

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use tracing::debug;

use crate::errors::BuildError;
use crate::scheduler::task::TaskSpec;

/// Name-keyed task definitions.
///
/// Registration is last-wins: re-registering a name replaces its dependency
/// list and action. Plans snapshot the table at expansion time, so a run in
/// flight never observes later registrations.
#[derive(Default)]
pub(crate) struct Registry {
    tasks: RwLock<HashMap<String, TaskSpec>>,
}

impl Registry {
    pub(crate) fn insert(&self, spec: TaskSpec) -> Result<(), BuildError> {
        if spec.name().is_empty() {
            return Err(BuildError::InvalidTask(
                "task name must be non-empty".into(),
            ));
        }

        let name = spec.name().to_string();
        let mut tasks = self.tasks.write().unwrap_or_else(PoisonError::into_inner);
        let replaced = tasks.insert(name.clone(), spec).is_some();
        if replaced {
            debug!(task = %name, "task re-registered, previous definition replaced");
        } else {
            debug!(task = %name, "task registered");
        }
        Ok(())
    }

    pub(crate) fn contains(&self, name: &str) -> bool {
        self.tasks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    pub(crate) fn snapshot(&self) -> HashMap<String, TaskSpec> {
        self.tasks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
