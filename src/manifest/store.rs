//! Reading and writing `modules.json`
//!
//! The rendered document is deterministic: 4-space indentation, sorted keys
//! and a trailing newline. Writes go to a sibling temporary file that is
//! flushed to disk and renamed over the target.

use std::fs;
use std::io::Write;

use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};
use tempfile::NamedTempFile;

use super::Manifest;
use crate::error::{RegistryError, Result};
use crate::paths::{MANIFEST_FILE, ProjectPaths};

/// Result of reading the manifest from disk
#[derive(Debug)]
pub enum LoadState {
    /// No manifest file yet
    Missing,
    /// Parsed successfully
    Loaded(Manifest),
    /// Present but unreadable or structurally invalid
    Invalid(String),
}

impl Manifest {
    /// Parse a manifest from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| RegistryError::ManifestInvalid {
            path: MANIFEST_FILE.to_string(),
            reason: e.to_string(),
        })
    }

    /// Render the manifest as deterministic JSON with a trailing newline
    pub fn to_json(&self) -> Result<String> {
        let mut buf = Vec::new();
        let formatter = PrettyFormatter::with_indent(b"    ");
        let mut serializer = Serializer::with_formatter(&mut buf, formatter);
        self.serialize(&mut serializer)
            .map_err(|e| RegistryError::ManifestInvalid {
                path: MANIFEST_FILE.to_string(),
                reason: e.to_string(),
            })?;
        buf.push(b'\n');
        String::from_utf8(buf).map_err(|e| RegistryError::ManifestInvalid {
            path: MANIFEST_FILE.to_string(),
            reason: e.to_string(),
        })
    }
}

/// Read `modules.json` from the project root
pub fn load(paths: &ProjectPaths) -> LoadState {
    let path = paths.manifest();
    if !path.exists() {
        return LoadState::Missing;
    }
    let content = match fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) => return LoadState::Invalid(e.to_string()),
    };
    match Manifest::from_json(&content) {
        Ok(manifest) => LoadState::Loaded(manifest),
        Err(RegistryError::ManifestInvalid { reason, .. }) => LoadState::Invalid(reason),
        Err(other) => LoadState::Invalid(other.to_string()),
    }
}

/// Write the manifest atomically
///
/// Callers check invariants first (see [`super::invariants`]); this only
/// does the I/O. On any error the previous file is left in place.
pub fn write(manifest: &Manifest, paths: &ProjectPaths) -> Result<()> {
    let target = paths.manifest();
    let json = manifest.to_json()?;
    let write_failed = |e: std::io::Error| RegistryError::FileWriteFailed {
        path: target.display().to_string(),
        reason: e.to_string(),
    };

    let mut temp = NamedTempFile::new_in(paths.root()).map_err(write_failed)?;
    temp.write_all(json.as_bytes()).map_err(write_failed)?;
    temp.as_file().sync_all().map_err(write_failed)?;
    temp.persist(&target)
        .map_err(|e| write_failed(e.error))?;

    tracing::debug!(path = %target.display(), "wrote manifest");
    Ok(())
}
