// src/vfs.rs

//! Virtual-file collaborator.
//!
//! Task bodies move content around through the [`Vfs`] seam instead of
//! touching the filesystem directly, so tests can swap in an in-memory
//! implementation and the application's `src`/`dest`/`copy`/`symlink`
//! delegates stay thin.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use globset::GlobSet;
use serde_json::{Map, Value};
use tracing::debug;

use crate::errors::Result;
use crate::watch::patterns::build_globset;

/// One file flowing through the build, held in memory.
///
/// `path` is relative to the root it was read from (or will be written
/// under); `data` carries per-file template context, which outranks site
/// data and call-site locals when rendering.
#[derive(Debug, Clone)]
pub struct VirtualFile {
    path: PathBuf,
    contents: Vec<u8>,
    data: Map<String, Value>,
}

impl VirtualFile {
    pub fn new(path: impl Into<PathBuf>, contents: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into(),
            contents: contents.into(),
            data: Map::new(),
        }
    }

    pub fn with_data(mut self, data: Map<String, Value>) -> Self {
        self.data = data;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File extension without the dot, as written in the path.
    pub fn extension(&self) -> Option<String> {
        self.path
            .extension()
            .map(|ext| ext.to_string_lossy().into_owned())
    }

    pub fn contents(&self) -> &[u8] {
        &self.contents
    }

    /// Contents as text, lossily decoded.
    pub fn contents_utf8(&self) -> String {
        String::from_utf8_lossy(&self.contents).into_owned()
    }

    pub fn set_contents(&mut self, contents: Vec<u8>) {
        self.contents = contents;
    }

    pub fn data(&self) -> &Map<String, Value> {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.data
    }
}

/// Batch file operations behind `src`/`dest`/`symlink`.
pub trait Vfs: Send + Sync {
    /// Read every file under `root` whose root-relative path matches one of
    /// `patterns`. Returned paths are relative, sorted for determinism.
    fn read(&self, root: &Path, patterns: &[String]) -> Result<Vec<VirtualFile>>;

    /// Write files under `dir`, creating parent directories as needed.
    fn write(&self, dir: &Path, files: &[VirtualFile]) -> Result<()>;

    /// Symlink `dst` pointing at `src`.
    fn link(&self, src: &Path, dst: &Path) -> Result<()>;
}

/// Filesystem-backed default.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdVfs;

impl Vfs for StdVfs {
    fn read(&self, root: &Path, patterns: &[String]) -> Result<Vec<VirtualFile>> {
        let set = build_globset(patterns).context("compiling source patterns")?;
        let mut files = Vec::new();
        collect(root, root, &set, &mut files)?;
        files.sort_by(|a, b| a.path.cmp(&b.path));
        debug!(root = %root.display(), files = files.len(), "read source files");
        Ok(files)
    }

    fn write(&self, dir: &Path, files: &[VirtualFile]) -> Result<()> {
        for file in files {
            let target = dir.join(&file.path);
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&target, &file.contents)?;
        }
        debug!(dir = %dir.display(), files = files.len(), "wrote output files");
        Ok(())
    }

    fn link(&self, src: &Path, dst: &Path) -> Result<()> {
        if let Some(parent) = dst.parent() {
            fs::create_dir_all(parent)?;
        }
        symlink(src, dst)?;
        debug!(src = %src.display(), dst = %dst.display(), "created symlink");
        Ok(())
    }
}

fn collect(root: &Path, dir: &Path, set: &GlobSet, out: &mut Vec<VirtualFile>) -> Result<()> {
    let entries =
        fs::read_dir(dir).with_context(|| format!("reading directory {}", dir.display()))?;
    for entry in entries {
        let entry = entry.with_context(|| format!("reading directory {}", dir.display()))?;
        let path = entry.path();
        let file_type = entry
            .file_type()
            .with_context(|| format!("inspecting {}", path.display()))?;

        if file_type.is_dir() {
            collect(root, &path, set, out)?;
        } else if file_type.is_file() {
            let Ok(rel) = path.strip_prefix(root) else {
                continue;
            };
            let rel_str = rel.to_string_lossy().replace('\\', "/");
            if set.is_match(&rel_str) {
                let contents =
                    fs::read(&path).with_context(|| format!("reading {}", path.display()))?;
                out.push(VirtualFile::new(PathBuf::from(rel_str), contents));
            }
        }
    }
    Ok(())
}

#[cfg(unix)]
fn symlink(src: &Path, dst: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(src, dst)
}

#[cfg(windows)]
fn symlink(src: &Path, dst: &Path) -> std::io::Result<()> {
    if src.is_dir() {
        std::os::windows::fs::symlink_dir(src, dst)
    } else {
        std::os::windows::fs::symlink_file(src, dst)
    }
}
