use crate::config::DynamicParameterConfig;
use crate::error::ResourceError;
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Name used when a rebased path has no file name left.
pub const DEFAULT_ENTRY_NAME: &str = "_newClassPath";

/// Controller-side directory holding the classpath resource sets.
#[derive(Debug, Clone)]
pub struct ResourceStore {
    base_directory: PathBuf,
}

impl ResourceStore {
    pub fn new(base_directory: impl Into<PathBuf>) -> Self {
        Self {
            base_directory: base_directory.into(),
        }
    }

    pub fn from_config(config: &DynamicParameterConfig) -> Self {
        Self::new(config.base_directory())
    }

    pub fn base_directory(&self) -> &Path {
        &self.base_directory
    }

    /// Resolves a relative resource path. Absolute paths and paths leaving the base are refused.
    pub fn resolve(&self, path: &str) -> Result<PathBuf, ResourceError> {
        if path.trim().is_empty() {
            return Err(ResourceError::EmptyPath);
        }
        let relative = Path::new(path);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            return Err(ResourceError::OutsideBase {
                path: path.to_string(),
                base: self.base_directory.clone(),
            });
        }
        Ok(self.base_directory.join(relative))
    }

    pub fn resolve_all(&self, paths: &[String]) -> Result<Vec<PathBuf>, ResourceError> {
        paths.iter().map(|p| self.resolve(p)).collect()
    }

    /// Maps any user supplied path into the base directory. A path that would leave the base
    /// keeps only its file name.
    pub fn rebase(&self, path: &str) -> PathBuf {
        let base = normalize(&self.base_directory);
        let candidate = Path::new(path);
        let file = if candidate.is_absolute() {
            normalize(candidate)
        } else {
            normalize(&base.join(candidate))
        };

        if is_descendant(&base, &file) {
            return file;
        }
        let name = file
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| DEFAULT_ENTRY_NAME.into());
        base.join(name)
    }

    /// Entry names below `path`, sorted. Empty when `path` is not a directory.
    pub fn list(&self, path: &str) -> Vec<String> {
        let dir = if path.is_empty() {
            self.base_directory.clone()
        } else {
            self.rebase(path)
        };
        let Ok(entries) = fs::read_dir(&dir) else {
            return Vec::new();
        };
        let mut names: Vec<String> = entries
            .flatten()
            .filter_map(|entry| entry.file_name().into_string().ok())
            .collect();
        names.sort();
        names
    }

    pub fn list_classpath_dirs(&self) -> Vec<String> {
        self.list("")
    }
}

/// `true` when `descendant` lies strictly below `root`. Purely lexical; callers normalize first.
pub fn is_descendant(root: &Path, descendant: &Path) -> bool {
    descendant != root && descendant.starts_with(root)
}

fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}
