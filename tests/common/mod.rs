// tests/common/mod.rs
#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use tokio::sync::mpsc;
use tracing_subscriber::{EnvFilter, fmt};

use sitesmith::{
    BuildEvent, ChangeEvent, ChangeObserver, ChangeSubscription, EventListener, WatchPatterns,
};

static INIT: Once = Once::new();

/// Initialise tracing for tests.
///
/// Uses `with_test_writer()`, so logs print only for failing tests unless
/// the suite runs with `-- --nocapture`. Enable levels with e.g.
/// `RUST_LOG=debug cargo test`.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .init();
    });
}

/// Run a test body under a generous timeout so a scheduling bug fails the
/// test instead of hanging the whole suite.
pub async fn with_timeout<F, T>(fut: F) -> T
where
    F: std::future::Future<Output = T>,
{
    tokio::time::timeout(Duration::from_secs(30), fut)
        .await
        .expect("test timed out")
}

/// Listener recording events as compact labels: `starting.css`,
/// `finished.css`, `error.css` and a bare `error` for the application-level
/// event.
#[derive(Default)]
pub struct RecordingListener {
    events: Mutex<Vec<String>>,
}

impl RecordingListener {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn labels(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

impl EventListener for RecordingListener {
    fn on_event(&self, event: &BuildEvent) {
        let label = match event {
            BuildEvent::TaskStarting { task } => format!("starting.{}", task.name),
            BuildEvent::TaskFinished { task } => format!("finished.{}", task.name),
            BuildEvent::TaskError { task, .. } => format!("error.{}", task.name),
            BuildEvent::Error { .. } => "error".to_string(),
        };
        self.events.lock().unwrap().push(label);
    }
}

/// Shared list test actions append their name to, for asserting execution
/// order.
pub type ActionLog = Arc<Mutex<Vec<String>>>;

pub fn action_log() -> ActionLog {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn log_entries(log: &ActionLog) -> Vec<String> {
    log.lock().unwrap().clone()
}

/// Change source driven by the test instead of the filesystem.
#[derive(Default)]
pub struct ScriptedObserver {
    sender: Mutex<Option<mpsc::Sender<ChangeEvent>>>,
}

impl ScriptedObserver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Push one change; returns false once the watch loop is gone.
    pub async fn emit(&self, path: &str) -> bool {
        let tx = self.sender.lock().unwrap().clone();
        match tx {
            Some(tx) => tx
                .send(ChangeEvent {
                    paths: vec![PathBuf::from(path)],
                })
                .await
                .is_ok(),
            None => false,
        }
    }
}

impl ChangeObserver for ScriptedObserver {
    fn observe(
        &self,
        _root: &Path,
        _patterns: &WatchPatterns,
    ) -> sitesmith::Result<ChangeSubscription> {
        let (tx, rx) = mpsc::channel(16);
        *self.sender.lock().unwrap() = Some(tx);
        Ok(ChangeSubscription::new(rx, Box::new(())))
    }
}

/// Poll `cond` at a short interval until it holds or `timeout` elapses.
pub async fn wait_until<F>(mut cond: F, timeout: Duration) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    cond()
}
