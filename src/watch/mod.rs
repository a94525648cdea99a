// src/watch/mod.rs

//! Filesystem watching and rebuild triggering.

pub mod observer;
pub mod patterns;
pub mod trigger;
pub mod watcher;

pub use observer::{ChangeEvent, ChangeObserver, ChangeSubscription};
pub use patterns::WatchPatterns;
pub use trigger::{RebuildPolicy, WatchHandle};
pub use watcher::NotifyObserver;

pub(crate) use trigger::spawn_watch_loop;
