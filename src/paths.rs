//! Canonical paths inside a pipeline project
//!
//! Pure path arithmetic over the project root. Nothing in this module touches
//! the disk except [`ProjectPaths::ensure_pipeline`], which checks the two
//! marker files.

use std::path::{Path, PathBuf};

use crate::component::{ComponentId, ComponentKind};
use crate::error::{RegistryError, Result};

/// Manifest file name
pub const MANIFEST_FILE: &str = "modules.json";

/// Config file names, in order of precedence
pub const CONFIG_FILES: [&str; 2] = [".nf-core.yml", ".nf-core.yaml"];

/// Main script of a pipeline
pub const MAIN_SCRIPT: &str = "main.nf";

/// Nextflow config of a pipeline
pub const NEXTFLOW_CONFIG: &str = "nextflow.config";

/// Per-component test subdirectory, never installed or compared
pub const TESTS_DIR: &str = "tests";

/// Paths of one project
#[derive(Debug, Clone)]
pub struct ProjectPaths {
    root: PathBuf,
}

impl ProjectPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn manifest(&self) -> PathBuf {
        self.root.join(MANIFEST_FILE)
    }

    /// The config file that is read: `.nf-core.yml` wins over `.nf-core.yaml`
    ///
    /// Falls back to the `.yml` location when neither exists.
    pub fn config(&self) -> PathBuf {
        CONFIG_FILES
            .iter()
            .map(|name| self.root.join(name))
            .find(|path| path.is_file())
            .unwrap_or_else(|| self.root.join(CONFIG_FILES[0]))
    }

    pub fn nextflow_config(&self) -> PathBuf {
        self.root.join(NEXTFLOW_CONFIG)
    }

    /// `<root>/<kind>`
    pub fn kind_dir(&self, kind: ComponentKind) -> PathBuf {
        self.root.join(kind.dir_name())
    }

    /// `<root>/<kind>/<org>`
    pub fn org_dir(&self, kind: ComponentKind, org: &str) -> PathBuf {
        self.kind_dir(kind).join(org)
    }

    /// Install directory of a component
    pub fn component_dir(&self, id: &ComponentId) -> PathBuf {
        self.root.join(id.rel_dir())
    }

    /// Patch file location of a component
    pub fn patch_file(&self, id: &ComponentId) -> PathBuf {
        self.component_dir(id).join(id.patch_file_name())
    }

    /// Patch path as recorded in the manifest (relative to the project root)
    pub fn patch_rel_path(&self, id: &ComponentId) -> String {
        format!("{}/{}", id.rel_dir_string(), id.patch_file_name())
    }

    /// Resolve a manifest-relative path against the project root
    pub fn resolve(&self, rel: &str) -> PathBuf {
        rel.split('/')
            .filter(|part| !part.is_empty())
            .fold(self.root.clone(), |path, part| path.join(part))
    }

    /// Include path used in pipeline scripts at the project root
    pub fn include_path(id: &ComponentId) -> String {
        format!("../{}/main", id.rel_dir_string())
    }

    /// Fail with `NotAPipeline` unless the root has a main script or Nextflow config
    pub fn ensure_pipeline(&self) -> Result<()> {
        if self.root.join(MAIN_SCRIPT).is_file() || self.nextflow_config().is_file() {
            Ok(())
        } else {
            Err(RegistryError::NotAPipeline {
                path: self.root.display().to_string(),
            })
        }
    }
}
