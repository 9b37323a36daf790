//! Patch operation
//!
//! Records the local changes of an installed component as a diff against its
//! pristine files at the installed revision, or undoes a recorded patch.

use std::fs;

use super::ProjectContext;
use crate::component::{ComponentId, ComponentKind};
use crate::error::{RegistryError, Result};
use crate::files::FileSet;
use crate::patch;
use crate::paths::{MANIFEST_FILE, TESTS_DIR};
use crate::ui::display;

#[derive(Debug, Clone)]
pub struct PatchOptions {
    pub kind: ComponentKind,
    pub remote: String,
    /// Undo the recorded patch instead of writing one
    pub remove: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchOutcome {
    /// Patch file written, path relative to the project root
    Written { id: ComponentId, path: String },
    Removed { id: ComponentId },
}

pub struct PatchOperation<'a> {
    ctx: &'a mut ProjectContext,
    options: PatchOptions,
}

impl<'a> PatchOperation<'a> {
    pub fn new(ctx: &'a mut ProjectContext, options: PatchOptions) -> Self {
        Self { ctx, options }
    }

    pub fn execute(self, name: &str) -> Result<PatchOutcome> {
        let id = self.ctx.locate(self.options.kind, name, &self.options.remote)?;
        if self.options.remove {
            self.remove_patch(id)
        } else {
            self.write_patch(id)
        }
    }

    fn write_patch(self, id: ComponentId) -> Result<PatchOutcome> {
        let (revision, branch) = match self.ctx.manifest.get(&id) {
            Some(entry) => (entry.git_sha.clone(), entry.branch.clone()),
            None => return Err(not_installed(&id)),
        };
        let remote = self.ctx.registry.get(&id.remote, Some(&branch))?;
        let pristine = remote.fetch_files(id.kind, &id.name, &revision)?;

        let patch_name = id.patch_file_name();
        let installed = FileSet::read_dir(&self.ctx.paths.component_dir(&id), &[patch_name.as_str()])?;
        let doc = patch::diff(&id, &pristine, &installed)?;

        if doc.is_empty() {
            if let Some(stale) = self.ctx.manifest.clear_patch(&id) {
                remove_file(&self.ctx.paths.resolve(&stale))?;
                self.ctx.persist()?;
                tracing::info!("Removed the patch of '{id}', the component is unchanged");
            }
            return Err(RegistryError::ComponentUnchanged {
                kind: id.kind.title().to_string(),
                name: id.to_string(),
            });
        }

        let path = patch::write(&self.ctx.paths, &id, &doc)?;
        self.ctx.manifest.set_patch(&id, path.clone());
        self.ctx.persist()?;

        display::print_patch(&doc);
        tracing::info!("Patch of {} '{}' written to '{}'", id.kind.singular(), id, path);
        Ok(PatchOutcome::Written { id, path })
    }

    fn remove_patch(self, id: ComponentId) -> Result<PatchOutcome> {
        let (rel, revision, branch) = match self.ctx.manifest.get(&id) {
            Some(entry) => match &entry.patch {
                Some(rel) => (rel.clone(), entry.git_sha.clone(), entry.branch.clone()),
                None => {
                    return Err(RegistryError::ComponentUnknown {
                        kind: id.kind.title().to_string(),
                        name: id.to_string(),
                        location: format!("with a patch in {MANIFEST_FILE}"),
                    });
                }
            },
            None => return Err(not_installed(&id)),
        };

        let remote = self.ctx.registry.get(&id.remote, Some(&branch))?;
        let pristine = remote.fetch_files(id.kind, &id.name, &revision)?;
        tracing::debug!(revision = %revision, "restoring pristine files of '{id}'");

        let dir = self.ctx.paths.component_dir(&id);
        pristine.replace_dir(&dir, &[TESTS_DIR])?;
        remove_file(&self.ctx.paths.resolve(&rel))?;
        self.ctx.manifest.clear_patch(&id);
        self.ctx.persist()?;

        tracing::info!("Removed the patch of {} '{}'", id.kind.singular(), id);
        Ok(PatchOutcome::Removed { id })
    }
}

fn not_installed(id: &ComponentId) -> RegistryError {
    RegistryError::ComponentUnknown {
        kind: id.kind.title().to_string(),
        name: id.to_string(),
        location: format!("in {MANIFEST_FILE}"),
    }
}

fn remove_file(path: &std::path::Path) -> Result<()> {
    if path.is_file() {
        fs::remove_file(path).map_err(|e| RegistryError::FileWriteFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
    }
    Ok(())
}
