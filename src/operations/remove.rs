//! Remove operation
//!
//! Removal drops one `installed_by` edge first; a component only leaves the
//! project once no edges remain. Removing a subworkflow cascades to the
//! components it installed, dependencies before the subworkflow itself.

use super::references::find_references;
use super::{ProjectContext, Summary};
use crate::component::{ComponentId, ComponentKind, Owner};
use crate::error::{RegistryError, Result};
use crate::files::remove_dir_and_empty_parents;
use crate::ui::display;

/// Configuration options for removal
#[derive(Debug, Clone)]
pub struct RemoveOptions {
    pub kind: ComponentKind,
    pub remote: String,
    /// Remove even when pipeline scripts still include the component
    pub force: bool,
}

/// What removing one component did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoveOutcome {
    Removed { id: ComponentId },
    /// Other owners still need the component
    Kept {
        id: ComponentId,
        owners: Vec<String>,
    },
}

/// High-level remove operation
pub struct RemoveOperation<'a> {
    ctx: &'a mut ProjectContext,
    options: RemoveOptions,
    summary: Summary,
}

impl<'a> RemoveOperation<'a> {
    pub fn new(ctx: &'a mut ProjectContext, options: RemoveOptions) -> Self {
        Self {
            ctx,
            options,
            summary: Summary::new(),
        }
    }

    /// Remove `name` on behalf of the user and write the manifest
    pub fn execute(mut self, name: &str) -> Result<RemoveOutcome> {
        let kind = self.options.kind;
        let id = self.ctx.locate(kind, name, &self.options.remote)?;
        let outcome = self.drop_owner(&id, &Owner::User(kind))?;
        self.ctx.persist()?;

        if let RemoveOutcome::Kept { id, owners } = &outcome {
            tracing::info!(
                "{} '{}' is still installed by {}, not removing it",
                id.kind.title(),
                id,
                owners.join(", ")
            );
        }
        self.summary.into_result()?;
        Ok(outcome)
    }

    /// Failures of cascaded removals collected so far
    pub fn into_summary(self) -> Summary {
        self.summary
    }

    /// Drop the `owner` edge of `id`, removing the component once no edges remain
    pub fn drop_owner(&mut self, id: &ComponentId, owner: &Owner) -> Result<RemoveOutcome> {
        if !self.ctx.manifest.remove_edge(id, owner) {
            let owners = self
                .ctx
                .manifest
                .get(id)
                .map(|entry| entry.installed_by.iter().cloned().collect())
                .unwrap_or_default();
            tracing::debug!(component = %id, owner = %owner, "edge dropped, component kept");
            return Ok(RemoveOutcome::Kept {
                id: id.clone(),
                owners,
            });
        }

        if !self.options.force {
            let references = find_references(&self.ctx.paths, id)?;
            if !references.is_empty() {
                display::print_references(id, &references);
                let message = format!("Remove {} '{}' anyway?", id.kind.singular(), id);
                if !self.ctx.prompter.confirm(&message, false)? {
                    self.ctx.manifest.add_owner(id, owner);
                    return Err(RegistryError::Refused {
                        action: format!("remove '{id}'"),
                    });
                }
            }
        }

        if id.kind.has_dependencies() {
            let owner = Owner::Subworkflow(id.name.clone());
            for dependency in self.ctx.manifest.dependents(id) {
                let result = self.drop_owner(&dependency, &owner);
                self.summary.record(&dependency.to_string(), result)?;
            }
        }

        self.delete(id)?;
        Ok(RemoveOutcome::Removed { id: id.clone() })
    }

    fn delete(&mut self, id: &ComponentId) -> Result<()> {
        let dir = self.ctx.paths.component_dir(id);
        let org_dir = self.ctx.paths.org_dir(id.kind, &id.org);
        remove_dir_and_empty_parents(&dir, &org_dir)?;
        self.ctx.manifest.remove_entry(id);
        tracing::info!("Removed {} '{}'", id.kind.singular(), id);
        Ok(())
    }
}
