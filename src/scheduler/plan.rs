// src/scheduler/plan.rs

//! Execution-plan expansion.
//!
//! A build selection is expanded depth-first into the transitive closure of
//! the requested tasks: dependencies land before their dependents (post
//! order), repeated visits collapse to one entry, and the walk fails before
//! anything runs if it meets an unregistered name or re-enters a task that
//! is still on the stack.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::errors::BuildError;
use crate::scheduler::task::{TaskAction, TaskSpec};

/// One task as captured inside a plan: deduplicated dependencies plus a
/// snapshot of its action.
#[derive(Clone)]
pub(crate) struct PlannedTask {
    pub(crate) name: String,
    pub(crate) deps: Vec<String>,
    pub(crate) action: Option<Arc<TaskAction>>,
}

impl fmt::Debug for PlannedTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlannedTask")
            .field("name", &self.name)
            .field("deps", &self.deps)
            .field("has_action", &self.action.is_some())
            .finish()
    }
}

/// Dependency-ordered expansion of one build selection.
///
/// `order` is post-order (leaf first): every task appears after all of its
/// dependencies. `discovery` is the matching pre-order walk (root first),
/// which is the order starting events fire in.
#[derive(Debug)]
pub struct ExecutionPlan {
    order: Vec<String>,
    discovery: Vec<String>,
    tasks: HashMap<String, PlannedTask>,
}

impl ExecutionPlan {
    /// Task names in execution order: dependencies before dependents.
    pub fn order(&self) -> &[String] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tasks.contains_key(name)
    }

    pub(crate) fn discovery(&self) -> &[String] {
        &self.discovery
    }

    pub(crate) fn task(&self, name: &str) -> Option<&PlannedTask> {
        self.tasks.get(name)
    }
}

/// Expand `roots` against a registry snapshot.
pub(crate) fn resolve(
    roots: &[String],
    registry: &HashMap<String, TaskSpec>,
) -> Result<ExecutionPlan, BuildError> {
    let mut resolver = Resolver {
        registry,
        states: HashMap::new(),
        stack: Vec::new(),
        order: Vec::new(),
        discovery: Vec::new(),
        tasks: HashMap::new(),
    };

    for root in roots {
        resolver.visit(root, None)?;
    }

    debug!(
        roots = roots.len(),
        tasks = resolver.order.len(),
        "expanded execution plan"
    );

    Ok(ExecutionPlan {
        order: resolver.order,
        discovery: resolver.discovery,
        tasks: resolver.tasks,
    })
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum VisitState {
    InProgress,
    Done,
}

struct Resolver<'a> {
    registry: &'a HashMap<String, TaskSpec>,
    states: HashMap<String, VisitState>,
    stack: Vec<String>,
    order: Vec<String>,
    discovery: Vec<String>,
    tasks: HashMap<String, PlannedTask>,
}

impl Resolver<'_> {
    fn visit(&mut self, name: &str, required_by: Option<&str>) -> Result<(), BuildError> {
        match self.states.get(name) {
            Some(VisitState::Done) => return Ok(()),
            Some(VisitState::InProgress) => {
                return Err(BuildError::CyclicDependency {
                    cycle: self.cycle_members(name),
                });
            }
            None => {}
        }

        let Some(spec) = self.registry.get(name) else {
            return Err(BuildError::UnknownTask {
                name: name.to_string(),
                required_by: required_by.map(str::to_string),
            });
        };

        self.states.insert(name.to_string(), VisitState::InProgress);
        self.stack.push(name.to_string());
        self.discovery.push(name.to_string());

        // Duplicate dependency declarations collapse to a single edge.
        let mut deps: Vec<String> = Vec::new();
        for dep in spec.deps() {
            if !deps.iter().any(|seen| seen == dep) {
                deps.push(dep.clone());
            }
        }

        for dep in &deps {
            self.visit(dep, Some(name))?;
        }

        self.stack.pop();
        self.states.insert(name.to_string(), VisitState::Done);
        self.order.push(name.to_string());
        self.tasks.insert(
            name.to_string(),
            PlannedTask {
                name: name.to_string(),
                deps,
                action: spec.action_arc(),
            },
        );

        Ok(())
    }

    /// Cycle members in walk order, from the first occurrence of the
    /// re-entered task back around to it.
    fn cycle_members(&self, reentered: &str) -> Vec<String> {
        let start = self
            .stack
            .iter()
            .position(|entry| entry == reentered)
            .unwrap_or(0);
        let mut cycle: Vec<String> = self.stack[start..].to_vec();
        cycle.push(reentered.to_string());
        cycle
    }
}
