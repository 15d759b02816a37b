//! Mapping between manifest locations and logical namespaces.
//!
//! Canonical manifests are named `Taskfile.<name>.yml` (or `.yaml`). The
//! namespace is the name, prefixed by the sub-directories it lives in under the
//! reserved `taskfiles/` directory, except that the tools directory adds no
//! prefix. The repo-root `Taskfile.yml` is the empty namespace.
//!
//! Everything here works on paths relative to the repository root; checking
//! which candidate exists is left to `io::resolver`.

use std::path::{Component, Path, PathBuf};

use serde::Deserialize;

const FILE_PREFIX: &str = "Taskfile";
const EXTENSIONS: [&str; 2] = ["yml", "yaml"];

/// Directory layout, relative to the repository root.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Layout {
    /// Reserved directory holding namespaced manifests.
    pub taskfiles_dir: PathBuf,
    /// Tool manifests; no namespace prefix.
    pub tools_dir: PathBuf,
    /// Toolchain manifests; prefixed with the directory's own name.
    pub toolchain_dir: PathBuf,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            taskfiles_dir: PathBuf::from("taskfiles"),
            tools_dir: PathBuf::from("taskfiles/tools"),
            toolchain_dir: PathBuf::from("taskfiles/toolchain"),
        }
    }
}

impl Layout {
    /// Namespace segment contributed by the toolchain directory.
    pub fn toolchain_prefix(&self) -> Option<&str> {
        self.toolchain_dir.file_name().and_then(|name| name.to_str())
    }
}

/// Name part of a canonical manifest file name.
///
/// `Taskfile.yml` gives `Some("")`, `Taskfile.golang.yml` gives
/// `Some("golang")`, anything else gives `None`.
pub fn manifest_stem(file_name: &str) -> Option<&str> {
    let rest = file_name.strip_prefix(FILE_PREFIX)?;
    let rest = EXTENSIONS
        .iter()
        .find_map(|ext| rest.strip_suffix(ext).and_then(|r| r.strip_suffix('.')))?;
    if rest.is_empty() {
        return Some("");
    }
    rest.strip_prefix('.').filter(|name| !name.is_empty())
}

pub fn is_manifest_file_name(file_name: &str) -> bool {
    manifest_stem(file_name).is_some()
}

/// Namespace for a manifest at `rel_path` (relative to the repo root).
///
/// Returns `None` when the file name is not a canonical manifest name.
pub fn namespace_for(layout: &Layout, rel_path: &Path) -> Option<String> {
    let file_name = rel_path.file_name()?.to_str()?;
    let stem = manifest_stem(file_name)?;
    let dir = rel_path.parent().unwrap_or_else(|| Path::new(""));

    let mut segments: Vec<String> = Vec::new();
    if let Ok(rest) = dir.strip_prefix(&layout.toolchain_dir) {
        segments.extend(layout.toolchain_prefix().map(str::to_string));
        segments.extend(dir_segments(rest));
    } else if let Ok(rest) = dir.strip_prefix(&layout.tools_dir) {
        segments.extend(dir_segments(rest));
    } else if let Ok(rest) = dir.strip_prefix(&layout.taskfiles_dir) {
        segments.extend(dir_segments(rest));
    } else {
        segments.extend(dir_segments(dir));
    }
    if !stem.is_empty() {
        segments.push(stem.to_string());
    }
    Some(segments.join(":"))
}

fn dir_segments(dir: &Path) -> Vec<String> {
    dir.components()
        .filter_map(|component| match component {
            Component::Normal(part) => part.to_str().map(str::to_string),
            _ => None,
        })
        .collect()
}

/// Canonical file names for `name`, preferred extension first.
pub fn file_names(name: &str) -> Vec<String> {
    EXTENSIONS
        .iter()
        .map(|ext| {
            if name.is_empty() {
                format!("{FILE_PREFIX}.{ext}")
            } else {
                format!("{FILE_PREFIX}.{name}.{ext}")
            }
        })
        .collect()
}

/// Candidate relative paths for `name`, in priority order.
///
/// A qualified name (`toolchain:golang`) first looks in the qualifier's
/// directory, then falls back to the bare-name order for the remainder. Bare
/// names search the reserved dir, the tools dir, the toolchain dir, and
/// finally the repo root.
pub fn search_candidates(layout: &Layout, name: &str) -> Vec<PathBuf> {
    let mut candidates = Vec::new();
    let bare = match name.split_once(':') {
        Some((qualifier, rest)) => {
            let (sub_dirs, leaf) = match rest.rsplit_once(':') {
                Some((dirs, leaf)) => (dirs.split(':').collect::<Vec<_>>(), leaf),
                None => (Vec::new(), rest),
            };
            let mut dir = qualifier_dir(layout, qualifier);
            for sub in sub_dirs {
                dir.push(sub);
            }
            for file in file_names(leaf) {
                candidates.push(dir.join(file));
            }
            rest
        }
        None => name,
    };

    if !bare.is_empty() {
        for dir in [&layout.taskfiles_dir, &layout.tools_dir, &layout.toolchain_dir] {
            for file in file_names(bare) {
                candidates.push(dir.join(file));
            }
        }
    }
    for file in file_names(bare) {
        candidates.push(PathBuf::from(file));
    }
    dedup_in_order(candidates)
}

fn qualifier_dir(layout: &Layout, qualifier: &str) -> PathBuf {
    if layout.toolchain_prefix() == Some(qualifier) {
        layout.toolchain_dir.clone()
    } else {
        layout.taskfiles_dir.join(qualifier)
    }
}

fn dedup_in_order(paths: Vec<PathBuf>) -> Vec<PathBuf> {
    let mut seen = Vec::with_capacity(paths.len());
    for path in paths {
        if !seen.contains(&path) {
            seen.push(path);
        }
    }
    seen
}

/// Fully qualified task name: `<ns>:<task>`, or the bare task at the root.
pub fn qualify(namespace: &str, task: &str) -> String {
    if namespace.is_empty() {
        task.to_string()
    } else {
        format!("{namespace}:{task}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ns(path: &str) -> Option<String> {
        namespace_for(&Layout::default(), Path::new(path))
    }

    #[test]
    fn stems() {
        assert_eq!(manifest_stem("Taskfile.yml"), Some(""));
        assert_eq!(manifest_stem("Taskfile.yaml"), Some(""));
        assert_eq!(manifest_stem("Taskfile.golang.yml"), Some("golang"));
        assert_eq!(manifest_stem("Taskfile.a.b.yaml"), Some("a.b"));
        assert_eq!(manifest_stem("Taskfile..yml"), None);
        assert_eq!(manifest_stem("taskfile.yml"), None);
        assert_eq!(manifest_stem("Taskfile.golang.toml"), None);
        assert_eq!(manifest_stem("Taskfileyml"), None);
    }

    #[test]
    fn namespaces_follow_layout() {
        assert_eq!(ns("Taskfile.yml").as_deref(), Some(""));
        assert_eq!(ns("taskfiles/Taskfile.golang.yml").as_deref(), Some("golang"));
        assert_eq!(ns("taskfiles/tools/Taskfile.jq.yml").as_deref(), Some("jq"));
        assert_eq!(
            ns("taskfiles/toolchain/Taskfile.golang.yml").as_deref(),
            Some("toolchain:golang")
        );
        assert_eq!(ns("taskfiles/lang/Taskfile.bun.yaml").as_deref(), Some("lang:bun"));
        assert_eq!(ns("taskfiles/README.md"), None);
    }

    #[test]
    fn bare_name_search_order() {
        let candidates = search_candidates(&Layout::default(), "jq");
        let expected: Vec<PathBuf> = [
            "taskfiles/Taskfile.jq.yml",
            "taskfiles/Taskfile.jq.yaml",
            "taskfiles/tools/Taskfile.jq.yml",
            "taskfiles/tools/Taskfile.jq.yaml",
            "taskfiles/toolchain/Taskfile.jq.yml",
            "taskfiles/toolchain/Taskfile.jq.yaml",
            "Taskfile.jq.yml",
            "Taskfile.jq.yaml",
        ]
        .iter()
        .map(PathBuf::from)
        .collect();
        assert_eq!(candidates, expected);
    }

    #[test]
    fn qualified_name_searches_qualifier_first() {
        let candidates = search_candidates(&Layout::default(), "toolchain:golang");
        assert_eq!(candidates[0], PathBuf::from("taskfiles/toolchain/Taskfile.golang.yml"));
        assert_eq!(candidates[2], PathBuf::from("taskfiles/Taskfile.golang.yml"));
        assert_eq!(candidates.len(), 8);

        let nested = search_candidates(&Layout::default(), "lang:web:bun");
        assert_eq!(nested[0], PathBuf::from("taskfiles/lang/web/Taskfile.bun.yml"));
        assert_eq!(nested[2], PathBuf::from("taskfiles/Taskfile.web:bun.yml"));
    }

    #[test]
    fn empty_name_is_the_root_manifest() {
        assert_eq!(
            search_candidates(&Layout::default(), ""),
            vec![PathBuf::from("Taskfile.yml"), PathBuf::from("Taskfile.yaml")]
        );
    }

    #[test]
    fn namespace_round_trips_through_search() {
        let layout = Layout::default();
        for path in [
            "Taskfile.yml",
            "Taskfile.extra.yml",
            "taskfiles/Taskfile.golang.yml",
            "taskfiles/tools/Taskfile.jq.yml",
            "taskfiles/toolchain/Taskfile.rust.yaml",
            "taskfiles/lang/web/Taskfile.bun.yml",
        ] {
            let namespace = namespace_for(&layout, Path::new(path)).expect("namespace");
            let candidates = search_candidates(&layout, &namespace);
            assert!(
                candidates.contains(&PathBuf::from(path)),
                "{path} not reachable from {namespace}"
            );
        }
    }

    #[test]
    fn qualify_task_names() {
        assert_eq!(qualify("", "build"), "build");
        assert_eq!(qualify("toolchain:golang", "check:deps"), "toolchain:golang:check:deps");
    }
}
