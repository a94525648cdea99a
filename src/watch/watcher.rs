// src/watch/watcher.rs

use std::path::{Path, PathBuf};

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::errors::Result;
use crate::watch::observer::{ChangeEvent, ChangeObserver, ChangeSubscription};
use crate::watch::patterns::WatchPatterns;

/// Notify-backed [`ChangeObserver`].
///
/// Raw events hop from notify's callback onto the async side over an
/// unbounded channel, get relativized against the observed root and
/// filtered through the patterns, and only matching batches reach the
/// subscription. The `RecommendedWatcher` rides along as the subscription
/// guard, so dropping the subscription stops watching.
#[derive(Debug, Default, Clone, Copy)]
pub struct NotifyObserver;

impl NotifyObserver {
    pub fn new() -> Self {
        Self
    }
}

impl ChangeObserver for NotifyObserver {
    fn observe(&self, root: &Path, patterns: &WatchPatterns) -> Result<ChangeSubscription> {
        // Canonicalize so relativization survives symlinked roots.
        let root = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());

        let (raw_tx, mut raw_rx) = mpsc::unbounded_channel::<Event>();

        // Called synchronously by notify whenever an event arrives.
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if let Err(err) = raw_tx.send(event) {
                        // Tracing is not safely usable from this thread.
                        eprintln!("sitesmith: failed to forward notify event: {err}");
                    }
                }
                Err(err) => {
                    eprintln!("sitesmith: file watch error: {err}");
                }
            },
            Config::default(),
        )?;

        watcher.watch(&root, RecursiveMode::Recursive)?;
        info!(root = %root.display(), "file watcher started");

        let (tx, rx) = mpsc::channel::<ChangeEvent>(64);
        let patterns = patterns.clone();
        tokio::spawn(async move {
            while let Some(event) = raw_rx.recv().await {
                debug!(?event, "notify event");

                let mut matched: Vec<PathBuf> = Vec::new();
                for path in &event.paths {
                    match relative_str(&root, path) {
                        Some(rel) => {
                            if patterns.matches(&rel) {
                                matched.push(PathBuf::from(rel));
                            }
                        }
                        None => {
                            warn!(path = ?path, root = ?root, "changed path is outside the watched root");
                        }
                    }
                }

                if matched.is_empty() {
                    continue;
                }
                if tx.send(ChangeEvent { paths: matched }).await.is_err() {
                    // Subscription dropped; stop forwarding.
                    break;
                }
            }
            debug!("file watcher loop ended");
        });

        Ok(ChangeSubscription::new(rx, Box::new(watcher)))
    }
}

/// Path relative to `root` with forward slashes, or `None` when the path is
/// not under `root`.
fn relative_str(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    Some(rel.to_string_lossy().replace('\\', "/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_str_strips_the_root() {
        let root = Path::new("/project");
        assert_eq!(
            relative_str(root, Path::new("/project/content/post.md")).as_deref(),
            Some("content/post.md")
        );
        assert_eq!(relative_str(root, Path::new("/elsewhere/file")), None);
    }
}
