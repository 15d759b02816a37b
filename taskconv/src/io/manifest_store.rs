//! Reading and writing manifest files.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, instrument};

use crate::core::error::ManifestError;
use crate::core::manifest::Manifest;

/// Read `path` into a [`Manifest`].
///
/// Unparseable YAML is not an error here; see [`require_structured`].
#[instrument(skip_all, fields(path = %path.display()))]
pub fn load_manifest(path: &Path) -> Result<Manifest, ManifestError> {
    let raw = fs::read_to_string(path).map_err(|source| match source.kind() {
        ErrorKind::NotFound => ManifestError::NotFound {
            path: path.to_path_buf(),
        },
        _ => ManifestError::Read {
            path: path.to_path_buf(),
            source,
        },
    })?;
    let manifest = Manifest::from_source(path, raw);
    debug!(
        lines = manifest.lines().len(),
        structured = manifest.is_structured(),
        "loaded manifest"
    );
    Ok(manifest)
}

/// Fail with [`ManifestError::Parse`] when the variable/task map is unavailable.
pub fn require_structured(manifest: &Manifest) -> Result<&Manifest, ManifestError> {
    match manifest.parse_error() {
        Some(message) => Err(ManifestError::Parse {
            path: manifest.path().to_path_buf(),
            message: message.to_string(),
        }),
        None => Ok(manifest),
    }
}

/// Overwrite the manifest's file with its raw content.
#[instrument(skip_all, fields(path = %manifest.path().display()))]
pub fn write_manifest(manifest: &Manifest) -> Result<()> {
    fs::write(manifest.path(), manifest.raw())
        .with_context(|| format!("write manifest {}", manifest.path().display()))?;
    debug!(bytes = manifest.raw().len(), "wrote manifest");
    Ok(())
}
