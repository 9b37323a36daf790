//! Local modifications to installed components, recorded as unified diffs
//!
//! - [`document`] - the diff model, parser and renderer
//! - [`diff`] - producing documents from two file sets
//! - [`apply`] - applying documents to file sets, forward or in reverse

pub mod apply;
pub mod diff;
pub mod document;

use std::collections::BTreeSet;
use std::fs;

use crate::component::ComponentId;
use crate::error::{RegistryError, Result};
use crate::files::FileSet;
use crate::paths::ProjectPaths;

pub use apply::ConflictReport;
pub use document::PatchDocument;

/// Document turning the pristine files of `id` into the installed ones
///
/// Empty when nothing differs.
pub fn diff(id: &ComponentId, pristine: &FileSet, installed: &FileSet) -> Result<PatchDocument> {
    Ok(PatchDocument {
        header: Some(format!("Changes in component '{id}'")),
        files: diff::diff_sets(pristine, installed, &id.rel_dir_string())?,
    })
}

/// Document showing what moving from `old_rev` to `new_rev` changes
pub fn preview(
    id: &ComponentId,
    old: &FileSet,
    new: &FileSet,
    old_rev: &str,
    new_rev: &str,
) -> Result<PatchDocument> {
    Ok(PatchDocument {
        header: Some(format!(
            "Changes in component '{id}' between ({old_rev}) and ({new_rev})"
        )),
        files: diff::diff_sets(old, new, &id.rel_dir_string())?,
    })
}

/// Apply a component's patch to a file set of that component
pub fn try_apply(doc: &PatchDocument, id: &ComponentId, target: &FileSet) -> std::result::Result<FileSet, ConflictReport> {
    apply::apply(doc, target, &id.rel_dir_string())
}

/// Apply a component's patch to an upstream file set, taking patched binaries from `installed`
pub fn try_apply_with(
    doc: &PatchDocument,
    id: &ComponentId,
    upstream: &FileSet,
    installed: &FileSet,
) -> std::result::Result<FileSet, ConflictReport> {
    let mut files = try_apply(doc, id, upstream)?;
    apply::carry_binaries(doc, installed, &mut files, &id.rel_dir_string());
    Ok(files)
}

/// Undo a component's patch, recovering the pristine files from the installed ones
pub fn unapply(doc: &PatchDocument, id: &ComponentId, installed: &FileSet) -> std::result::Result<FileSet, ConflictReport> {
    apply::apply(&doc.reversed(), installed, &id.rel_dir_string())
}

/// Component-relative paths of the binary files a patch changes
pub fn binary_paths(doc: &PatchDocument, id: &ComponentId) -> BTreeSet<String> {
    let prefix = id.rel_dir_string();
    doc.files
        .iter()
        .filter(|f| matches!(f.change, document::FileChange::Binary { .. }))
        .map(|f| apply::strip_prefix(f.path(), &prefix).to_string())
        .collect()
}

/// Error for a patch that does not apply to `revision`
pub fn conflict(id: &ComponentId, revision: &str, report: &ConflictReport) -> RegistryError {
    RegistryError::PatchConflict {
        component: id.display_name(),
        revision: revision.to_string(),
        files: report.files(),
        report: report.render(),
    }
}

/// Read and parse a patch file given relative to the project root
pub fn read(paths: &ProjectPaths, rel: &str) -> Result<PatchDocument> {
    let path = paths.resolve(rel);
    let bytes = fs::read(&path).map_err(|e| RegistryError::FileReadFailed {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    PatchDocument::parse(&bytes).map_err(|e| match e {
        RegistryError::PatchInvalid { reason, .. } => RegistryError::PatchInvalid {
            path: rel.to_string(),
            reason,
        },
        other => other,
    })
}

/// Write the patch file of `id` and return its project-relative path
pub fn write(paths: &ProjectPaths, id: &ComponentId, doc: &PatchDocument) -> Result<String> {
    let path = paths.patch_file(id);
    fs::write(&path, doc.render()).map_err(|e| RegistryError::FileWriteFailed {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    tracing::debug!(path = %path.display(), files = doc.files.len(), "wrote patch");
    Ok(paths.patch_rel_path(id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::ComponentKind;
    use tempfile::TempDir;

    const URL: &str = "https://github.com/nf-core/modules.git";

    fn id() -> ComponentId {
        ComponentId::new(URL, ComponentKind::Module, "nf-core", "bismark/align").unwrap()
    }

    fn set(main: &str) -> FileSet {
        let mut files = FileSet::new();
        files.insert("main.nf", main.as_bytes().to_vec());
        files.insert("meta.yml", b"name: bismark_align\n".to_vec());
        files
    }

    #[test]
    fn test_diff_header_and_paths() {
        let doc = diff(&id(), &set("a\nb\n"), &set("a\nB\n")).unwrap();
        let text = doc.render_lossy();
        assert!(text.starts_with("Changes in component 'nf-core/bismark/align'\n"));
        assert!(text.contains("--- a/modules/nf-core/bismark/align/main.nf\n"));
        assert!(text.contains("+++ b/modules/nf-core/bismark/align/main.nf\n"));
        assert!(!text.contains("meta.yml"));
    }

    #[test]
    fn test_unchanged_component_has_empty_diff() {
        let doc = diff(&id(), &set("a\n"), &set("a\n")).unwrap();
        assert!(doc.is_empty());
        assert!(doc.render().is_empty());
    }

    #[test]
    fn test_write_then_read() {
        let temp = TempDir::new().unwrap();
        let paths = ProjectPaths::new(temp.path());
        std::fs::create_dir_all(paths.component_dir(&id())).unwrap();

        let doc = diff(&id(), &set("a\nb\n"), &set("a\nB\n")).unwrap();
        let rel = write(&paths, &id(), &doc).unwrap();
        assert_eq!(rel, "modules/nf-core/bismark/align/bismark-align.diff");
        assert_eq!(read(&paths, &rel).unwrap(), doc);
    }

    #[test]
    fn test_unapply_recovers_pristine() {
        let pristine = set("a\nb\nc\n");
        let installed = set("a\nchanged\nc\n");
        let doc = diff(&id(), &pristine, &installed).unwrap();
        assert_eq!(unapply(&doc, &id(), &installed).unwrap(), pristine);
        assert_eq!(try_apply(&doc, &id(), &pristine).unwrap(), installed);
    }

    fn with_logo(mut files: FileSet, logo: &[u8]) -> FileSet {
        files.insert("logo.png", logo.to_vec());
        files
    }

    #[test]
    fn test_binary_change_applies_both_ways() {
        let pristine = with_logo(set("a\n"), &[0, 1, 2]);
        let installed = with_logo(set("a\n"), &[0, 9, 9]);
        let doc = diff(&id(), &pristine, &installed).unwrap();
        assert!(doc.render_lossy().contains("logo.png"));

        assert!(try_apply(&doc, &id(), &pristine).is_ok());
        assert!(unapply(&doc, &id(), &installed).is_ok());
        assert_eq!(try_apply_with(&doc, &id(), &pristine, &installed).unwrap(), installed);
        assert_eq!(binary_paths(&doc, &id()).into_iter().collect::<Vec<_>>(), vec!["logo.png"]);
    }

    #[test]
    fn test_binary_change_with_text_change_on_new_upstream() {
        let pristine = with_logo(set("a\nb\n"), &[0, 1, 2]);
        let installed = with_logo(set("a\nB\n"), &[0, 9, 9]);
        let doc = diff(&id(), &pristine, &installed).unwrap();

        let mut upstream = with_logo(set("a\nb\n"), &[0, 1, 2]);
        upstream.insert("README.md", b"new\n".to_vec());
        let candidate = try_apply_with(&doc, &id(), &upstream, &installed).unwrap();
        assert_eq!(candidate.get("logo.png"), Some(&[0u8, 9, 9][..]));
        assert_eq!(candidate.text("main.nf"), Some("a\nB\n"));
        assert_eq!(candidate.text("README.md"), Some("new\n"));
    }

    #[test]
    fn test_conflict_error() {
        let doc = diff(&id(), &set("a\nb\n"), &set("a\nB\n")).unwrap();
        let report = try_apply(&doc, &id(), &set("x\ny\n")).unwrap_err();
        let err = conflict(&id(), "abc1234", &report);
        assert!(err.to_string().contains("modules/nf-core/bismark/align/main.nf"));
    }
}
