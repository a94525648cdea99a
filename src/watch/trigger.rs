// src/watch/trigger.rs

//! Rebuild triggering.
//!
//! A watch registration couples a change subscription to a task selection.
//! The policy decides what happens when changes arrive while a rebuild is
//! still running: `Immediate` starts another build alongside it, `Queued`
//! remembers that something changed and runs one follow-up build once the
//! current one finishes, however many changes arrived in between.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Deserialize;
use tokio::sync::{Notify, mpsc};
use tracing::{debug, warn};

use crate::errors::{BuildError, SharedTaskError};
use crate::events::BuildEvent;
use crate::scheduler::Scheduler;
use crate::watch::observer::{ChangeEvent, ChangeSubscription};

/// Behaviour when changes arrive while a triggered build is in progress.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RebuildPolicy {
    /// Start a build for every change batch, even if one is running.
    #[default]
    Immediate,
    /// Coalesce changes that arrive mid-build into one follow-up build.
    Queued,
}

impl FromStr for RebuildPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "immediate" => Ok(RebuildPolicy::Immediate),
            "queued" | "queue" => Ok(RebuildPolicy::Queued),
            other => Err(format!(
                "invalid rebuild policy: {other} (expected \"immediate\" or \"queued\")"
            )),
        }
    }
}

/// Handle for stopping a watch registration.
///
/// Cloning shares the registration; dropping every clone does NOT stop it,
/// only [`close`](Self::close) does. Closing twice is harmless.
#[derive(Clone)]
pub struct WatchHandle {
    closed: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl WatchHandle {
    fn new() -> Self {
        Self {
            closed: Arc::new(AtomicBool::new(false)),
            notify: Arc::new(Notify::new()),
        }
    }

    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            debug!("watch registration closed");
            self.notify.notify_one();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    async fn wait_closed(&self) {
        while !self.is_closed() {
            self.notify.notified().await;
        }
    }
}

impl fmt::Debug for WatchHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchHandle")
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Drive a subscription until its handle is closed or the observer ends.
pub(crate) fn spawn_watch_loop(
    scheduler: Scheduler,
    subscription: ChangeSubscription,
    tasks: Vec<String>,
    policy: RebuildPolicy,
) -> WatchHandle {
    let handle = WatchHandle::new();
    let loop_handle = handle.clone();
    tokio::spawn(async move {
        match policy {
            RebuildPolicy::Immediate => {
                immediate_loop(scheduler, subscription, tasks, loop_handle).await;
            }
            RebuildPolicy::Queued => {
                queued_loop(scheduler, subscription, tasks, loop_handle).await;
            }
        }
        debug!("watch loop ended");
    });
    handle
}

async fn immediate_loop(
    scheduler: Scheduler,
    mut subscription: ChangeSubscription,
    tasks: Vec<String>,
    handle: WatchHandle,
) {
    loop {
        tokio::select! {
            _ = handle.wait_closed() => break,
            maybe = subscription.next_change() => {
                let Some(change) = maybe else { break };
                // close() may race the change; the flag is set before the
                // wake-up, so this check is enough to drop late changes.
                if handle.is_closed() {
                    break;
                }
                log_change(&change);
                let scheduler = scheduler.clone();
                let tasks = tasks.clone();
                tokio::spawn(async move {
                    run_triggered_build(&scheduler, &tasks).await;
                });
            }
        }
    }
}

async fn queued_loop(
    scheduler: Scheduler,
    mut subscription: ChangeSubscription,
    tasks: Vec<String>,
    handle: WatchHandle,
) {
    let (done_tx, mut done_rx) = mpsc::channel::<()>(1);
    let mut in_flight = false;
    let mut pending = false;

    loop {
        tokio::select! {
            _ = handle.wait_closed() => break,
            maybe = subscription.next_change() => {
                let Some(change) = maybe else { break };
                if handle.is_closed() {
                    break;
                }
                log_change(&change);
                if in_flight {
                    pending = true;
                } else {
                    in_flight = true;
                    start_build(&scheduler, &tasks, done_tx.clone());
                }
            }
            _ = done_rx.recv(), if in_flight => {
                in_flight = false;
                if pending && !handle.is_closed() {
                    pending = false;
                    in_flight = true;
                    start_build(&scheduler, &tasks, done_tx.clone());
                }
            }
        }
    }
}

fn start_build(scheduler: &Scheduler, tasks: &[String], done_tx: mpsc::Sender<()>) {
    let scheduler = scheduler.clone();
    let tasks = tasks.to_vec();
    tokio::spawn(async move {
        run_triggered_build(&scheduler, &tasks).await;
        let _ = done_tx.send(()).await;
    });
}

async fn run_triggered_build(scheduler: &Scheduler, tasks: &[String]) {
    if let Err(err) = scheduler.build(tasks.to_vec()).await {
        match err {
            // Task failures were already reported through the task events
            // of the run itself.
            BuildError::TaskFailed { .. } => {}
            other => {
                warn!(error = %other, "watch-triggered build could not run");
                let error: SharedTaskError = Arc::new(other);
                scheduler.bus().emit(&BuildEvent::Error { error });
            }
        }
    }
}

fn log_change(change: &ChangeEvent) {
    debug!(paths = ?change.paths, "filesystem change");
}
