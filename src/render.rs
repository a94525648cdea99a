// src/render.rs

//! Template-engine collaborator.
//!
//! Rendering is delegated to whatever [`RenderEngine`] is registered for a
//! file's extension. The registry also owns the context-merge rule: site
//! data first, call-site locals over it, per-file data last.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use serde_json::{Map, Value};
use tracing::debug;

use crate::errors::{Error, Result};
use crate::vfs::VirtualFile;

/// A pluggable template renderer.
pub trait RenderEngine: Send + Sync {
    /// Render `template` against `data` (always a JSON object).
    fn render(&self, template: &str, data: &Value) -> Result<String>;
}

/// Per-extension engine lookup.
#[derive(Default)]
pub struct EngineRegistry {
    engines: RwLock<HashMap<String, Arc<dyn RenderEngine>>>,
}

impl EngineRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an engine for an extension. A leading dot is accepted and
    /// ignored, so `".hbs"` and `"hbs"` name the same slot.
    pub fn insert(&self, ext: &str, engine: Arc<dyn RenderEngine>) {
        let key = normalize_ext(ext);
        debug!(ext = %key, "registered render engine");
        self.engines
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, engine);
    }

    pub fn lookup(&self, ext: &str) -> Option<Arc<dyn RenderEngine>> {
        self.engines
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&normalize_ext(ext))
            .cloned()
    }

    /// Render `file` in place with the engine registered for its extension.
    ///
    /// The template context is the shallow merge of `site`, then `locals`,
    /// then the file's own data; later layers win per key.
    pub fn render_file(
        &self,
        file: &mut VirtualFile,
        site: &Map<String, Value>,
        locals: &Map<String, Value>,
    ) -> Result<()> {
        let Some(ext) = file.extension() else {
            return Err(Error::Render(format!(
                "file {} has no extension to select an engine by",
                file.path().display()
            )));
        };
        let Some(engine) = self.lookup(&ext) else {
            return Err(Error::Render(format!(
                "no render engine registered for extension '{ext}'"
            )));
        };

        let context = merge_data(&[site, locals, file.data()]);
        let rendered = engine.render(&file.contents_utf8(), &Value::Object(context))?;
        file.set_contents(rendered.into_bytes());
        Ok(())
    }
}

impl fmt::Debug for EngineRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let extensions: Vec<String> = self
            .engines
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        f.debug_struct("EngineRegistry")
            .field("extensions", &extensions)
            .finish_non_exhaustive()
    }
}

/// Shallow merge of context layers; later layers win per key.
pub fn merge_data(layers: &[&Map<String, Value>]) -> Map<String, Value> {
    let mut merged = Map::new();
    for layer in layers {
        for (key, value) in layer.iter() {
            merged.insert(key.clone(), value.clone());
        }
    }
    merged
}

fn normalize_ext(ext: &str) -> String {
    ext.trim_start_matches('.').to_string()
}
