//! Dependencies of a subworkflow, read from its `include` declarations
//!
//! ```text
//! include { SAMTOOLS_SORT      } from '../../../modules/nf-core/samtools/sort/main'
//! include { BAM_STATS_SAMTOOLS } from '../bam_stats_samtools/main'
//! ```
//!
//! A path climbing three levels names a module, a path climbing one level a
//! sibling subworkflow. The component name is taken from the path when it has
//! the usual shape and from the declared name otherwise. Anything that does
//! not parse is not a dependency.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::component::{ComponentKind, validate_name};
use crate::files::FileSet;
use crate::paths::MAIN_SCRIPT;

static INCLUDE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*include\s*\{\s*([A-Za-z0-9_]+)(?:\s+as\s+[A-Za-z0-9_]+)?\s*\}\s*from\s*['"]([^'"]+)['"]"#)
        .expect("regex for include declarations")
});

static MODULE_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\.\./\.\./\.\./modules/[^/]+/(.+?)/main(?:\.nf)?$")
        .expect("regex for module include paths")
});

static SUBWORKFLOW_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\.\./([^/]+)/main(?:\.nf)?$")
        .expect("regex for subworkflow include paths")
});

/// Components a subworkflow includes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dependencies {
    pub modules: BTreeSet<String>,
    pub subworkflows: BTreeSet<String>,
}

impl Dependencies {
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty() && self.subworkflows.is_empty()
    }

    /// Every dependency with its kind, modules first
    pub fn iter(&self) -> impl Iterator<Item = (ComponentKind, &str)> {
        self.modules
            .iter()
            .map(|m| (ComponentKind::Module, m.as_str()))
            .chain(
                self.subworkflows
                    .iter()
                    .map(|s| (ComponentKind::Subworkflow, s.as_str())),
            )
    }

    pub fn contains(&self, kind: ComponentKind, name: &str) -> bool {
        match kind {
            ComponentKind::Module => self.modules.contains(name),
            ComponentKind::Subworkflow => self.subworkflows.contains(name),
        }
    }
}

/// Parse the include declarations of a subworkflow script
pub fn parse_includes(script: &str) -> Dependencies {
    let mut deps = Dependencies::default();
    for line in script.lines() {
        let Some(caps) = INCLUDE.captures(line) else {
            continue;
        };
        let declared = &caps[1];
        let link = &caps[2];

        let (kind, name) = if link.starts_with("../../../") {
            let name = MODULE_PATH
                .captures(link)
                .map(|c| c[1].to_string())
                .unwrap_or_else(|| name_from_declaration(declared));
            (ComponentKind::Module, name)
        } else if link.starts_with("../") {
            let name = SUBWORKFLOW_PATH
                .captures(link)
                .map(|c| c[1].to_string())
                .unwrap_or_else(|| name_from_declaration(declared));
            (ComponentKind::Subworkflow, name)
        } else {
            continue;
        };

        if validate_name(kind, &name).is_err() {
            tracing::debug!(line, "ignoring include with an unusable component name");
            continue;
        }
        match kind {
            ComponentKind::Module => deps.modules.insert(name),
            ComponentKind::Subworkflow => deps.subworkflows.insert(name),
        };
    }
    deps
}

/// Dependencies of a subworkflow given its files
pub fn dependencies(files: &FileSet) -> Dependencies {
    files
        .text(MAIN_SCRIPT)
        .map(parse_includes)
        .unwrap_or_default()
}

/// `SAMTOOLS_SORT` -> `samtools/sort`
fn name_from_declaration(declared: &str) -> String {
    declared.to_lowercase().split('_').collect::<Vec<_>>().join("/")
}
