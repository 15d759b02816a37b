//! Filesystem side of namespace resolution.

use std::fs;
use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use tracing::{debug, instrument};

use crate::core::error::ResolveError;
use crate::core::namespace::{Layout, namespace_for, search_candidates};

/// A manifest location together with its namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    /// Path under the resolver root.
    pub path: PathBuf,
    pub namespace: String,
}

#[derive(Debug, Clone)]
pub struct Resolver {
    root: PathBuf,
    layout: Layout,
}

impl Resolver {
    pub fn new(root: impl Into<PathBuf>, layout: Layout) -> Self {
        Self {
            root: root.into(),
            layout,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Find the manifest for a (possibly colon-qualified) name.
    ///
    /// The first existing candidate wins; several matches are not an error.
    #[instrument(skip(self))]
    pub fn resolve_to_path(&self, name: &str) -> Result<Resolved, ResolveError> {
        let candidates = search_candidates(&self.layout, name);
        for rel in &candidates {
            let path = self.root.join(rel);
            if path.is_file() {
                let namespace = namespace_for(&self.layout, rel).unwrap_or_default();
                debug!(path = %path.display(), namespace, "resolved");
                return Ok(Resolved { path, namespace });
            }
        }
        Err(ResolveError::NotFound {
            name: name.to_string(),
            searched: candidates,
        })
    }

    /// Namespace of a manifest path (absolute, or relative to the root).
    pub fn resolve_path(&self, path: &Path) -> Result<String> {
        let rel = self.relative_to_root(path)?;
        self.namespace_of(&rel, path)
    }

    /// Accept either a manifest path or a namespace name.
    ///
    /// A relative path is looked up from the working directory first, then
    /// under the root. The returned path is always root-joined.
    pub fn resolve_target(&self, target: &str) -> Result<Resolved> {
        if looks_like_path(target) {
            let given = PathBuf::from(target);
            let path = if given.is_absolute() || given.exists() {
                lexical_absolute(&given)?
            } else {
                self.root.join(&given)
            };
            if !path.is_file() {
                return Err(anyhow!("manifest not found: {}", path.display()));
            }
            let rel = self.relative_to_root(&path)?;
            let namespace = self.namespace_of(&rel, &path)?;
            return Ok(Resolved {
                path: self.root.join(rel),
                namespace,
            });
        }
        Ok(self.resolve_to_path(target)?)
    }

    fn namespace_of(&self, rel: &Path, shown: &Path) -> Result<String> {
        namespace_for(&self.layout, rel).ok_or_else(|| {
            anyhow!(
                "{} is not a Taskfile manifest (expected Taskfile.<name>.yml)",
                shown.display()
            )
        })
    }

    /// `path` relative to the root, comparing absolute forms.
    ///
    /// Falls back to canonical paths so a root reached through a symlink
    /// still matches. Paths outside the root are an error.
    fn relative_to_root(&self, path: &Path) -> Result<PathBuf> {
        let joined = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        };
        let root = lexical_absolute(&self.root)?;
        let full = lexical_absolute(&joined)?;
        if let Ok(rel) = full.strip_prefix(&root) {
            return Ok(rel.to_path_buf());
        }
        if let (Ok(root), Ok(full)) = (fs::canonicalize(&self.root), fs::canonicalize(&joined))
            && let Ok(rel) = full.strip_prefix(&root)
        {
            return Ok(rel.to_path_buf());
        }
        Err(anyhow!(
            "{} is outside the repository root {}",
            path.display(),
            root.display()
        ))
    }
}

/// Absolute form of `path` with `.` and `..` folded away, without touching
/// the filesystem.
fn lexical_absolute(path: &Path) -> Result<PathBuf> {
    let absolute =
        std::path::absolute(path).with_context(|| format!("resolve {}", path.display()))?;
    let mut out = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    Ok(out)
}

fn looks_like_path(target: &str) -> bool {
    target.contains('/')
        || target.contains(std::path::MAIN_SEPARATOR)
        || target.ends_with(".yml")
        || target.ends_with(".yaml")
}
