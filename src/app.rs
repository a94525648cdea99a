// src/app.rs

//! Application assembly.
//!
//! [`App`] composes the pieces a site build needs: one [`Scheduler`], the
//! per-extension render-engine registry, a virtual-file collaborator, the
//! change observer used for watching, and site-wide template data. All
//! task-running calls delegate to the scheduler; file and render calls
//! delegate to their collaborators.

use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use serde_json::{Map, Value};
use tracing::info;

use crate::config::{self, SiteConfig};
use crate::errors::{BoxError, BuildError, Result};
use crate::events::{EventListener, TimingReporter};
use crate::plugin::Plugin;
use crate::render::{EngineRegistry, RenderEngine};
use crate::scheduler::{ExecutionPlan, IntoTaskNames, Scheduler, TaskSpec};
use crate::vfs::{StdVfs, Vfs, VirtualFile};
use crate::watch::{
    ChangeObserver, NotifyObserver, RebuildPolicy, WatchHandle, WatchPatterns, spawn_watch_loop,
};

#[derive(Debug, Clone)]
pub struct AppOptions {
    /// Log per-task runtimes through the event bus.
    pub runtimes: bool,
    /// Project root that source, destination and watch paths resolve
    /// against.
    pub root: PathBuf,
    /// Default rebuild policy for watch registrations.
    pub rebuild: RebuildPolicy,
}

impl Default for AppOptions {
    fn default() -> Self {
        Self {
            runtimes: false,
            root: PathBuf::from("."),
            rebuild: RebuildPolicy::default(),
        }
    }
}

pub struct App {
    scheduler: Scheduler,
    engines: EngineRegistry,
    vfs: Arc<dyn Vfs>,
    observer: Arc<dyn ChangeObserver>,
    data: RwLock<Map<String, Value>>,
    options: AppOptions,
}

impl App {
    pub fn new() -> Self {
        Self::with_options(AppOptions::default())
    }

    pub fn with_options(options: AppOptions) -> Self {
        let scheduler = Scheduler::new();
        if options.runtimes {
            scheduler.subscribe(Arc::new(TimingReporter::new()));
        }
        Self {
            scheduler,
            engines: EngineRegistry::new(),
            vfs: Arc::new(StdVfs),
            observer: Arc::new(NotifyObserver::new()),
            data: RwLock::new(Map::new()),
            options,
        }
    }

    /// Build an application from a validated config, rooted at `root`.
    pub fn from_config(config: &SiteConfig, root: impl Into<PathBuf>) -> Result<Self> {
        let app = Self::with_options(AppOptions {
            runtimes: config.build.runtimes,
            root: root.into(),
            rebuild: config.watch.rebuild,
        });
        app.set_data(config::data_to_json(&config.site.data)?);
        Ok(app)
    }

    /// Load, validate and apply a config file; the project root becomes the
    /// directory containing the file.
    pub fn from_config_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config = config::load_and_validate(path)?;
        let root = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        Self::from_config(&config, root)
    }

    /// Replace the virtual-file collaborator.
    pub fn with_vfs(mut self, vfs: Arc<dyn Vfs>) -> Self {
        self.vfs = vfs;
        self
    }

    /// Replace the change observer used by `watch`.
    pub fn with_observer(mut self, observer: Arc<dyn ChangeObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn options(&self) -> &AppOptions {
        &self.options
    }

    /// Register a task; see [`Scheduler::task`].
    pub fn task<F, Fut>(&self, name: &str, deps: &[&str], f: F) -> Result<()>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<(), BoxError>> + Send + 'static,
    {
        self.scheduler.task(name, deps, f)?;
        Ok(())
    }

    pub fn register(&self, spec: TaskSpec) -> Result<()> {
        self.scheduler.register(spec)?;
        Ok(())
    }

    pub fn has_task(&self, name: &str) -> bool {
        self.scheduler.has_task(name)
    }

    pub fn plan(&self, tasks: impl IntoTaskNames) -> Result<ExecutionPlan> {
        Ok(self.scheduler.plan(tasks)?)
    }

    /// Run the named tasks and their dependencies to completion once.
    pub async fn build(&self, tasks: impl IntoTaskNames) -> Result<()> {
        self.scheduler.build(tasks).await?;
        Ok(())
    }

    /// Alias for [`build`](Self::build).
    pub async fn run(&self, tasks: impl IntoTaskNames) -> Result<()> {
        self.build(tasks).await
    }

    pub fn subscribe(&self, listener: Arc<dyn EventListener>) {
        self.scheduler.subscribe(listener);
    }

    /// Apply a plugin's configuration step.
    pub fn install(&self, plugin: &dyn Plugin) -> Result<()> {
        info!(plugin = %plugin.name(), "installing plugin");
        plugin.install(self)
    }

    /// Register a render engine for a file extension.
    pub fn engine(&self, ext: &str, engine: Arc<dyn RenderEngine>) {
        self.engines.insert(ext, engine);
    }

    /// Replace the site-wide template data.
    pub fn set_data(&self, data: Map<String, Value>) {
        *self.data.write().unwrap_or_else(PoisonError::into_inner) = data;
    }

    pub fn data(&self) -> Map<String, Value> {
        self.data
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Render `file` in place: site data, then `locals`, then the file's
    /// own data form the template context.
    pub fn render_file(&self, file: &mut VirtualFile, locals: &Map<String, Value>) -> Result<()> {
        let site = self.data();
        self.engines.render_file(file, &site, locals)
    }

    /// Read source files matching `patterns`, relative to the project root.
    pub async fn src(&self, patterns: &[&str]) -> Result<Vec<VirtualFile>> {
        let vfs = self.vfs.clone();
        let root = self.options.root.clone();
        let patterns: Vec<String> = patterns.iter().map(|p| p.to_string()).collect();
        let files = tokio::task::spawn_blocking(move || vfs.read(&root, &patterns))
            .await
            .map_err(anyhow::Error::from)??;
        Ok(files)
    }

    /// Write files under `dir`, relative to the project root.
    pub async fn dest(&self, dir: &str, files: Vec<VirtualFile>) -> Result<()> {
        let vfs = self.vfs.clone();
        let target = self.options.root.join(dir);
        tokio::task::spawn_blocking(move || vfs.write(&target, &files))
            .await
            .map_err(anyhow::Error::from)??;
        Ok(())
    }

    /// Copy everything matching `patterns` into `dir` untouched.
    pub async fn copy(&self, patterns: &[&str], dir: &str) -> Result<()> {
        let files = self.src(patterns).await?;
        self.dest(dir, files).await
    }

    /// Symlink `dst` pointing at `src`, both relative to the project root.
    pub async fn symlink(&self, src: &str, dst: &str) -> Result<()> {
        let vfs = self.vfs.clone();
        let src = self.options.root.join(src);
        let dst = self.options.root.join(dst);
        tokio::task::spawn_blocking(move || vfs.link(&src, &dst))
            .await
            .map_err(anyhow::Error::from)??;
        Ok(())
    }

    /// Watch `patterns` under the project root; each change rebuilds
    /// `tasks` under the application's default rebuild policy.
    pub fn watch(&self, patterns: &[&str], tasks: impl IntoTaskNames) -> Result<WatchHandle> {
        let include: Vec<String> = patterns.iter().map(|p| p.to_string()).collect();
        self.watch_with(&include, &[], tasks, self.options.rebuild)
    }

    /// `watch` with explicit excludes and policy.
    pub fn watch_with(
        &self,
        include: &[String],
        exclude: &[String],
        tasks: impl IntoTaskNames,
        policy: RebuildPolicy,
    ) -> Result<WatchHandle> {
        let tasks = tasks.into_task_names();
        if tasks.is_empty() {
            return Err(
                BuildError::InvalidArgument("watch request names no tasks".to_string()).into(),
            );
        }
        let patterns = WatchPatterns::compile(include, exclude)?;
        let subscription = self.observer.observe(&self.options.root, &patterns)?;
        info!(tasks = ?tasks, policy = ?policy, "watch registered");
        Ok(spawn_watch_loop(
            self.scheduler.clone(),
            subscription,
            tasks,
            policy,
        ))
    }

    /// Watch as described by a config's `[watch]` section.
    pub fn watch_from_config(&self, config: &SiteConfig) -> Result<WatchHandle> {
        self.watch_with(
            &config.watch.patterns,
            &config.watch.exclude,
            config.watch.tasks.clone(),
            config.watch.rebuild,
        )
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for App {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("App")
            .field("root", &self.options.root)
            .field("runtimes", &self.options.runtimes)
            .finish_non_exhaustive()
    }
}
