//! Component kinds, identities and ownership edges
//!
//! A component is identified by `(remote_url, org_path, kind, name)`. The
//! derived ordering follows that tuple, which is the processing order for
//! bulk operations.

use std::fmt;
use std::path::PathBuf;

use crate::error::{RegistryError, Result};

/// Kind of an installable component
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ComponentKind {
    /// Leaf component: one process definition
    Module,
    /// Component that includes modules and other subworkflows
    Subworkflow,
}

impl ComponentKind {
    /// All kinds, in manifest order
    pub const ALL: [ComponentKind; 2] = [ComponentKind::Module, ComponentKind::Subworkflow];

    /// Top-level directory name, also used as manifest key and owner sentinel
    pub fn dir_name(self) -> &'static str {
        match self {
            ComponentKind::Module => "modules",
            ComponentKind::Subworkflow => "subworkflows",
        }
    }

    /// Singular, lower-case name for messages
    pub fn singular(self) -> &'static str {
        match self {
            ComponentKind::Module => "module",
            ComponentKind::Subworkflow => "subworkflow",
        }
    }

    /// Singular, capitalised name for messages
    pub fn title(self) -> &'static str {
        match self {
            ComponentKind::Module => "Module",
            ComponentKind::Subworkflow => "Subworkflow",
        }
    }

    /// Only subworkflows declare dependencies
    pub fn has_dependencies(self) -> bool {
        matches!(self, ComponentKind::Subworkflow)
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// Reason a component is present in a project
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Owner {
    /// Installed on request of the user; recorded as the kind sentinel
    User(ComponentKind),
    /// Installed as a dependency of the named subworkflow
    Subworkflow(String),
}

impl Owner {
    /// The value stored in `installed_by`
    pub fn as_edge(&self) -> &str {
        match self {
            Owner::User(kind) => kind.dir_name(),
            Owner::Subworkflow(name) => name,
        }
    }

    /// Whether this owner is the user sentinel
    pub fn is_user(&self) -> bool {
        matches!(self, Owner::User(_))
    }
}

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_edge())
    }
}

/// Full identity of an installed or installable component
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ComponentId {
    /// Remote git URL the component comes from
    pub remote: String,
    /// Component kind
    pub kind: ComponentKind,
    /// Organisation path (install directory under `modules/` or `subworkflows/`)
    pub org: String,
    /// Component name, possibly two-level (`tool/subtool`)
    pub name: String,
}

impl ComponentId {
    /// Create a new identity, validating the component name
    pub fn new(
        remote: impl Into<String>,
        kind: ComponentKind,
        org: impl Into<String>,
        name: impl Into<String>,
    ) -> Result<Self> {
        let name = name.into();
        validate_name(kind, &name)?;
        Ok(Self {
            remote: remote.into(),
            kind,
            org: org.into(),
            name,
        })
    }

    /// `org/name`, as shown to users
    pub fn display_name(&self) -> String {
        format!("{}/{}", self.org, self.name)
    }

    /// Directory of the component relative to the project root
    pub fn rel_dir(&self) -> PathBuf {
        let mut path = PathBuf::from(self.kind.dir_name());
        path.push(&self.org);
        for part in self.name.split('/') {
            path.push(part);
        }
        path
    }

    /// Project-relative directory with forward slashes, as written in patch headers
    pub fn rel_dir_string(&self) -> String {
        format!("{}/{}/{}", self.kind.dir_name(), self.org, self.name)
    }

    /// File-name friendly form of the name (`tool/subtool` -> `tool-subtool`)
    pub fn kebab_name(&self) -> String {
        self.name.replace('/', "-")
    }

    /// Name of the patch file inside the component directory
    pub fn patch_file_name(&self) -> String {
        format!("{}.diff", self.kebab_name())
    }

    /// Upper-case include name (`samtools/sort` -> `SAMTOOLS_SORT`)
    pub fn include_name(&self) -> String {
        self.name.replace('/', "_").to_uppercase()
    }

    /// Same component from a different remote or org
    pub fn with_name(&self, kind: ComponentKind, name: &str) -> Result<Self> {
        Self::new(self.remote.clone(), kind, self.org.clone(), name)
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.org, self.name)
    }
}

/// Validate a component name: one or two non-empty segments of safe characters
pub fn validate_name(kind: ComponentKind, name: &str) -> Result<()> {
    let invalid = || RegistryError::ComponentUnknown {
        kind: kind.title().to_string(),
        name: name.to_string(),
        location: "(invalid component name)".to_string(),
    };

    let segments: Vec<&str> = name.split('/').collect();
    if segments.len() > 2 {
        return Err(invalid());
    }
    for segment in segments {
        if segment.is_empty()
            || segment == "."
            || segment == ".."
            || !segment
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
        {
            return Err(invalid());
        }
    }
    Ok(())
}
