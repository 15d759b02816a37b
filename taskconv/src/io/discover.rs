//! Expansion of CLI path arguments into manifest files.

use std::collections::HashSet;
use std::path::PathBuf;

use walkdir::WalkDir;

use crate::core::namespace::is_manifest_file_name;

fn should_walk_dir_entry(entry: &walkdir::DirEntry) -> bool {
    if entry.depth() == 0 || !entry.file_type().is_dir() {
        return true;
    }
    let name = entry.file_name().to_string_lossy();
    !(name.starts_with('.') || matches!(name.as_ref(), "node_modules" | "target"))
}

/// Expand `inputs` in order. Directories contribute their `Taskfile*.yml`
/// files in sorted order; files (and paths that do not exist) are kept as
/// given so the loader can report them. Duplicates are dropped.
pub fn collect_manifests(inputs: &[PathBuf]) -> Vec<PathBuf> {
    let mut out: Vec<PathBuf> = Vec::new();
    let mut seen: HashSet<PathBuf> = HashSet::new();

    for input in inputs {
        if !input.is_dir() {
            if seen.insert(input.clone()) {
                out.push(input.clone());
            }
            continue;
        }

        let mut files: Vec<PathBuf> = Vec::new();
        for entry in WalkDir::new(input)
            .follow_links(false)
            .into_iter()
            .filter_entry(should_walk_dir_entry)
            .flatten()
        {
            if !entry.file_type().is_file() {
                continue;
            }
            if entry
                .file_name()
                .to_str()
                .is_some_and(is_manifest_file_name)
            {
                files.push(entry.into_path());
            }
        }
        files.sort();
        for file in files {
            if seen.insert(file.clone()) {
                out.push(file);
            }
        }
    }

    out
}
