//! Project configuration
//!
//! This module contains data structures for:
//! - `.nf-core.yml` / `.nf-core.yaml` - project config (`repository_type`, `org_path`, `update`)
//! - `nextflow.config` - the pipeline `manifest { }` block (name and home page)

pub mod update;

use std::fs;
use std::path::Path;

use regex::Regex;
use serde::Deserialize;

use crate::error::{RegistryError, Result};
use crate::paths::ProjectPaths;
use crate::remote::NF_CORE_MODULES_NAME;

pub use update::{Pin, UpdatePolicy};

/// Role of the repository the command runs in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepositoryType {
    /// Consumer of components
    Pipeline,
    /// Producer of components
    Modules,
}

/// Project config file (`.nf-core.yml`)
///
/// Unknown keys belong to other tools and are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub repository_type: Option<RepositoryType>,

    #[serde(default)]
    pub org_path: Option<String>,

    #[serde(default)]
    pub update: UpdatePolicy,
}

impl ProjectConfig {
    /// Parse config from a YAML string
    pub fn from_yaml(yaml: &str) -> std::result::Result<Self, serde_yaml::Error> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(yaml)
    }

    /// Load the project config, or the defaults when there is none
    pub fn load(paths: &ProjectPaths) -> Result<Self> {
        let path = paths.config();
        if !path.is_file() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(&path).map_err(|e| RegistryError::FileReadFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let config = Self::from_yaml(&content).map_err(|e| RegistryError::ConfigInvalid {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        tracing::debug!(path = %path.display(), "loaded project config");
        Ok(config)
    }

    /// `org_path`, defaulting to `nf-core`
    pub fn org_path(&self) -> &str {
        self.org_path.as_deref().unwrap_or(NF_CORE_MODULES_NAME)
    }

    /// Fail when the project produces components instead of consuming them
    pub fn ensure_consumer(&self, action: &str) -> Result<()> {
        if self.repository_type == Some(RepositoryType::Modules) {
            return Err(RegistryError::ProducerRepository {
                action: action.to_string(),
            });
        }
        Ok(())
    }
}

/// Name and home page from the `manifest { }` block of `nextflow.config`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineMeta {
    pub name: String,
    pub home_page: String,
}

impl PipelineMeta {
    /// Read from `nextflow.config`; missing values fall back to the directory name
    pub fn load(paths: &ProjectPaths) -> Self {
        let content = fs::read_to_string(paths.nextflow_config()).unwrap_or_default();
        let mut meta = Self::parse(&content);
        if meta.name.is_empty() {
            meta.name = dir_name(paths.root());
        }
        meta
    }

    /// Parse the `manifest { }` block of a Nextflow config
    pub fn parse(config: &str) -> Self {
        let Some(block) = manifest_block(config) else {
            return Self::default();
        };
        Self {
            name: assignment(block, "name").unwrap_or_default(),
            home_page: assignment(block, "homePage").unwrap_or_default(),
        }
    }
}

fn dir_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn manifest_block(config: &str) -> Option<&str> {
    let re = Regex::new(r"(?m)^\s*manifest\s*\{").ok()?;
    let start = re.find(config)?.end();
    let mut depth = 1usize;
    for (offset, c) in config[start..].char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&config[start..start + offset]);
                }
            }
            _ => {}
        }
    }
    None
}

fn assignment(block: &str, key: &str) -> Option<String> {
    let pattern = format!(r#"(?m)^\s*{}\s*=\s*['"]([^'"]*)['"]"#, regex::escape(key));
    let re = Regex::new(&pattern).ok()?;
    re.captures(block).map(|c| c[1].to_string())
}
