// src/plugin.rs

//! Application extension point.
//!
//! A plugin is a named configuration step: it receives the application and
//! registers whatever tasks, engines or listeners it contributes. Nothing
//! here is dynamic self-mutation; a plugin can only use the same public
//! surface any caller has.

use crate::app::App;
use crate::errors::Result;

pub trait Plugin: Send + Sync {
    /// Stable name used in logs.
    fn name(&self) -> &str;

    /// Apply this plugin's configuration to the application.
    fn install(&self, app: &App) -> Result<()>;
}
