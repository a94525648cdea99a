// src/lib.rs

//! Task-scheduled static-site building.
//!
//! The core is a dependency-aware task scheduler: tasks are registered by
//! name with a dependency list and an async action, a build request expands
//! into a cycle-checked execution plan, and the plan runs with independent
//! tasks fanned out concurrently while lifecycle events stream to
//! subscribed listeners. Around that core, [`App`] wires the collaborators
//! a site build needs: pluggable render engines keyed by file extension, a
//! virtual-file layer for reading and writing content, and a file watcher
//! that re-runs a task selection on change.
//!
//! ```no_run
//! use sitesmith::App;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let app = App::new();
//!
//!     app.task("css", &[], || async {
//!         // compile stylesheets
//!         Ok(())
//!     })?;
//!     app.task("html", &["css"], || async {
//!         // render templates
//!         Ok(())
//!     })?;
//!
//!     app.build("html").await?;
//!     Ok(())
//! }
//! ```

pub mod app;
pub mod config;
pub mod errors;
pub mod events;
pub mod logging;
pub mod plugin;
pub mod render;
pub mod scheduler;
pub mod vfs;
pub mod watch;

pub use app::{App, AppOptions};
pub use config::SiteConfig;
pub use errors::{BoxError, BuildError, Error, Result, SharedTaskError};
pub use events::{BuildEvent, EventBus, EventListener, TaskMeta, TimingReporter};
pub use plugin::Plugin;
pub use render::{EngineRegistry, RenderEngine, merge_data};
pub use scheduler::{ExecutionPlan, IntoTaskNames, Scheduler, TaskSpec};
pub use vfs::{StdVfs, Vfs, VirtualFile};
pub use watch::{
    ChangeEvent, ChangeObserver, ChangeSubscription, NotifyObserver, RebuildPolicy, WatchHandle,
    WatchPatterns,
};
