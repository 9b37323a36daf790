//! Pipeline scripts that still include a component
//!
//! Only the pipeline's own scripts are searched: everything outside the
//! component trees plus the `local` org. Installed components are tracked
//! through `installed_by` edges instead.

use std::fs;
use std::sync::LazyLock;

use regex::Regex;
use walkdir::{DirEntry, WalkDir};

use crate::component::{ComponentId, ComponentKind};
use crate::error::{RegistryError, Result};
use crate::manifest::reconcile::LOCAL_ORG;
use crate::paths::ProjectPaths;

static INCLUDE_FROM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*include\s*\{[^}]*\}\s*from\s*['"]([^'"]+)['"]"#)
        .expect("regex for include paths")
});

/// Directories never searched
const SKIPPED_DIRS: [&str; 3] = ["work", "results", "node_modules"];

fn is_skipped(entry: &DirEntry, paths: &ProjectPaths) -> bool {
    let name = entry.file_name().to_string_lossy();
    if entry.depth() > 0 && name.starts_with('.') {
        return true;
    }
    if !entry.file_type().is_dir() {
        return false;
    }
    if entry.depth() == 1 && SKIPPED_DIRS.contains(&&*name) {
        return true;
    }
    // <kind>/<org> trees other than local
    entry.depth() == 2
        && name != LOCAL_ORG
        && ComponentKind::ALL
            .into_iter()
            .any(|kind| entry.path().parent() == Some(paths.kind_dir(kind).as_path()))
}

/// Whether an include path points into the component's directory
fn points_at(link: &str, segments: &[&str]) -> bool {
    let parts: Vec<&str> = link.split('/').collect();
    parts.windows(segments.len()).any(|window| window == segments)
}

/// `(file, line)` of every include of `id` in the pipeline's scripts
pub fn find_references(paths: &ProjectPaths, id: &ComponentId) -> Result<Vec<(String, usize)>> {
    let rel = id.rel_dir_string();
    let segments: Vec<&str> = rel.split('/').collect();

    let mut found = Vec::new();
    let walker = WalkDir::new(paths.root())
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_skipped(e, paths));
    for entry in walker {
        let entry = entry.map_err(|e| RegistryError::FileReadFailed {
            path: paths.root().display().to_string(),
            reason: e.to_string(),
        })?;
        if !entry.file_type().is_file() || entry.path().extension().is_none_or(|ext| ext != "nf") {
            continue;
        }
        // Scripts that are not valid UTF-8 cannot include anything we could parse
        let Ok(content) = fs::read_to_string(entry.path()) else {
            continue;
        };
        let file = entry
            .path()
            .strip_prefix(paths.root())
            .unwrap_or(entry.path())
            .display()
            .to_string();
        for (number, line) in content.lines().enumerate() {
            let hit = INCLUDE_FROM
                .captures(line)
                .is_some_and(|caps| points_at(&caps[1], &segments));
            if hit {
                found.push((file.clone(), number + 1));
            }
        }
    }
    Ok(found)
}
