//! Update operation
//!
//! Moves installed components to another revision. A registered patch is
//! carried over to the new files; if it no longer applies the component is
//! left alone and the conflict reported. Updating a subworkflow installs what
//! its new revision includes and releases what it no longer includes.

use std::collections::BTreeSet;
use std::fs::{self, OpenOptions};
use std::io::Write as _;
use std::path::{Path, PathBuf};

use super::install::{InstallOperation, InstallOptions};
use super::remove::{RemoveOperation, RemoveOptions};
use super::{ProjectContext, RevisionSelector, Summary, select_revision};
use crate::component::{ComponentId, ComponentKind, Owner};
use crate::config::Pin;
use crate::error::{RegistryError, Result};
use crate::files::FileSet;
use crate::patch::{self, ConflictReport, PatchDocument};
use crate::paths::TESTS_DIR;
use crate::remote::short_rev;
use crate::resolver;
use crate::ui::display;

/// Line closing each component's section in a diff file
const SECTION_END: &str = "************************************************************";

/// What an update does with the changes it computes
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum UpdateMode {
    /// Write the new files
    #[default]
    Apply,
    /// Show the changes and ask before writing them
    Preview,
    /// Append the changes to a file; the project is not touched
    WriteDiffFile(PathBuf),
}

#[derive(Debug, Clone)]
pub struct UpdateOptions {
    pub kind: ComponentKind,
    pub remote: String,
    /// Branch to update from; each entry's own branch when unset
    pub branch: Option<String>,
    pub selector: RevisionSelector,
    /// Rewrite components that are already at the target revision
    pub force: bool,
    pub mode: UpdateMode,
    /// Also update the components updated subworkflows include
    pub update_deps: bool,
}

/// What updating one component did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    Updated {
        id: ComponentId,
        from: String,
        to: String,
    },
    UpToDate { id: ComponentId },
    /// Pinned, declined or not applicable
    Skipped { id: ComponentId },
    /// Changes written to the diff file only
    Previewed { id: ComponentId },
}

/// Files computed for one component before anything is written
struct Candidate {
    branch: String,
    current: String,
    target: String,
    /// Installed files, without the patch file
    installed: FileSet,
    /// Pristine files at the target revision
    upstream: FileSet,
    /// Upstream files with the patch applied
    files: FileSet,
    patched: bool,
}

pub struct UpdateOperation<'a> {
    ctx: &'a mut ProjectContext,
    options: UpdateOptions,
    summary: Summary,
    /// Components already handled in this run
    visited: BTreeSet<ComponentId>,
}

impl<'a> UpdateOperation<'a> {
    pub fn new(ctx: &'a mut ProjectContext, options: UpdateOptions) -> Self {
        Self {
            ctx,
            options,
            summary: Summary::new(),
            visited: BTreeSet::new(),
        }
    }

    /// Update `name`, or every installed component of the kind when `None`
    pub fn execute(mut self, name: Option<&str>) -> Result<Vec<UpdateOutcome>> {
        if let UpdateMode::WriteDiffFile(path) = &self.options.mode {
            fs::File::create(path).map_err(|e| RegistryError::FileWriteFailed {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
        }

        let kind = self.options.kind;
        let targets: Vec<ComponentId> = match name {
            Some(name) => vec![self.ctx.locate(kind, name, &self.options.remote)?],
            None => self.ctx.manifest.of_kind(kind).map(|(id, _)| id).collect(),
        };
        if targets.is_empty() {
            tracing::info!("No {} installed", kind.dir_name());
        }

        let selector = self.options.selector.clone();
        let mut outcomes = Vec::new();
        for id in targets {
            if self.visited.contains(&id) {
                continue;
            }
            let result = self.update_one(&id, &selector);
            if let Some(outcome) = self.summary.record(&id.to_string(), result)? {
                outcomes.push(outcome);
            }
        }

        match &self.options.mode {
            UpdateMode::WriteDiffFile(path) => {
                tracing::info!("Wrote the changes to '{}'", path.display());
            }
            UpdateMode::Apply | UpdateMode::Preview => self.ctx.persist()?,
        }
        self.summary.into_result()?;
        Ok(outcomes)
    }

    fn update_one(&mut self, id: &ComponentId, selector: &RevisionSelector) -> Result<UpdateOutcome> {
        if !self.visited.insert(id.clone()) {
            return Ok(UpdateOutcome::Skipped { id: id.clone() });
        }
        let outcome = self.update_component(id, selector)?;
        if self.options.update_deps && id.kind.has_dependencies() {
            self.update_dependencies(id, &selector.for_dependencies())?;
        }
        Ok(outcome)
    }

    fn update_component(&mut self, id: &ComponentId, selector: &RevisionSelector) -> Result<UpdateOutcome> {
        let Some(selector) = self.pinned_selector(id, selector) else {
            return Ok(UpdateOutcome::Skipped { id: id.clone() });
        };

        let candidate = match self.prepare(id, &selector)? {
            Ok(candidate) => candidate,
            Err(outcome) => return Ok(outcome),
        };
        let preview = patch::preview(
            id,
            &candidate.installed,
            &candidate.files,
            short_rev(&candidate.current),
            short_rev(&candidate.target),
        )?;

        match &self.options.mode {
            UpdateMode::WriteDiffFile(path) => {
                if preview.is_empty() {
                    tracing::info!("'{id}' has no file changes");
                } else {
                    append_section(path, &preview.render())?;
                }
                return Ok(UpdateOutcome::Previewed { id: id.clone() });
            }
            UpdateMode::Preview => {
                if preview.is_empty() {
                    tracing::info!("'{id}' has no file changes");
                } else {
                    display::print_patch(&preview);
                }
                let message = format!("Update {} '{}'?", id.kind.singular(), id);
                if !self.ctx.prompter.confirm(&message, false)? {
                    tracing::info!("Skipped '{id}'");
                    return Ok(UpdateOutcome::Skipped { id: id.clone() });
                }
            }
            UpdateMode::Apply => {}
        }
        self.apply(id, candidate)
    }

    /// The selector after `update:` pins; `None` when the component is pinned off
    fn pinned_selector(&self, id: &ComponentId, selector: &RevisionSelector) -> Option<RevisionSelector> {
        match self.ctx.config.update.pin(&id.remote, &id.org, &id.name) {
            Pin::Skip => {
                tracing::info!("Skipping '{id}', updates are disabled in the project config");
                None
            }
            Pin::Revision(revision) => {
                if matches!(selector, RevisionSelector::Exact(requested) if *requested != revision) {
                    tracing::warn!("'{id}' is pinned to {revision} in the project config, ignoring the requested revision");
                }
                Some(RevisionSelector::Exact(revision))
            }
            Pin::Unpinned => Some(selector.clone()),
        }
    }

    /// Resolve the target and compute the new files
    ///
    /// The inner `Err` is an outcome that ends the update of this component.
    fn prepare(
        &mut self,
        id: &ComponentId,
        selector: &RevisionSelector,
    ) -> Result<std::result::Result<Candidate, UpdateOutcome>> {
        let Some(entry) = self.ctx.manifest.get(id).cloned() else {
            return Err(RegistryError::ComponentUnknown {
                kind: id.kind.title().to_string(),
                name: id.to_string(),
                location: "in the manifest".to_string(),
            });
        };
        let branch = self.options.branch.clone().unwrap_or(entry.branch);
        let current = entry.git_sha;

        let remote = self.ctx.registry.get(&id.remote, Some(&branch))?;
        let target = select_revision(
            remote,
            self.ctx.prompter.as_mut(),
            id.kind,
            &id.name,
            &branch,
            selector,
            Some(&current),
        )?;
        if target == current && !self.options.force {
            tracing::info!("'{id}' is already up to date");
            return Ok(Err(UpdateOutcome::UpToDate { id: id.clone() }));
        }

        let upstream = remote.fetch_files(id.kind, &id.name, &target)?;
        let patch_name = id.patch_file_name();
        let installed = FileSet::read_dir(&self.ctx.paths.component_dir(id), &[patch_name.as_str()])?;

        let Some(rel) = entry.patch else {
            return Ok(Ok(Candidate {
                branch,
                current,
                target,
                installed,
                files: upstream.clone(),
                upstream,
                patched: false,
            }));
        };

        let doc = patch::read(&self.ctx.paths, &rel)?;
        match patch::try_apply_with(&doc, id, &upstream, &installed) {
            Ok(files) => Ok(Ok(Candidate {
                branch,
                current,
                target,
                installed,
                upstream,
                files,
                patched: true,
            })),
            Err(report) => {
                let UpdateMode::WriteDiffFile(path) = &self.options.mode else {
                    return Err(patch::conflict(id, &target, &report));
                };
                let pristine = remote.fetch_files(id.kind, &id.name, &current)?;
                let changes = patch::preview(id, &pristine, &upstream, short_rev(&current), short_rev(&target))?;
                write_conflict_section(path, id, &target, &report, &changes, &doc)?;
                tracing::warn!("Patch of '{id}' does not apply to {}, skipping", short_rev(&target));
                Ok(Err(UpdateOutcome::Skipped { id: id.clone() }))
            }
        }
    }

    fn apply(&mut self, id: &ComponentId, candidate: Candidate) -> Result<UpdateOutcome> {
        let dir = self.ctx.paths.component_dir(id);
        let patch_name = id.patch_file_name();
        candidate
            .files
            .replace_dir(&dir, &[TESTS_DIR, patch_name.as_str()])?;
        self.ctx
            .manifest
            .set_revision(id, &candidate.target, &candidate.branch);
        self.ctx.touch(id);

        if candidate.patched {
            let doc = patch::diff(id, &candidate.upstream, &candidate.files)?;
            if doc.is_empty() {
                let path = self.ctx.paths.patch_file(id);
                if path.is_file() {
                    fs::remove_file(&path)?;
                }
                self.ctx.manifest.clear_patch(id);
                tracing::info!("The patch of '{id}' is part of the new revision, removed it");
            } else {
                let rel = patch::write(&self.ctx.paths, id, &doc)?;
                self.ctx.manifest.set_patch(id, rel);
            }
        }

        tracing::info!(
            "Updated {} '{}' from {} to {}",
            id.kind.singular(),
            id,
            short_rev(&candidate.current),
            short_rev(&candidate.target)
        );

        if id.kind.has_dependencies() {
            self.sync_dependencies(id, &candidate)?;
        }
        Ok(UpdateOutcome::Updated {
            id: id.clone(),
            from: candidate.current,
            to: candidate.target,
        })
    }

    /// Install what the new revision includes, release what it dropped
    fn sync_dependencies(&mut self, id: &ComponentId, candidate: &Candidate) -> Result<()> {
        let before = resolver::dependencies(&candidate.installed);
        let after = resolver::dependencies(&candidate.files);

        let install_options = InstallOptions {
            kind: id.kind,
            remote: id.remote.clone(),
            branch: Some(candidate.branch.clone()),
            selector: RevisionSelector::Latest,
            force: false,
        };
        let mut installer = InstallOperation::new(&mut *self.ctx, install_options);
        installer.install_dependencies(id, &candidate.files, &RevisionSelector::Latest)?;
        self.summary.absorb(installer.into_summary());

        let mut dropped = Vec::new();
        for (kind, name) in before.iter().filter(|(kind, name)| !after.contains(*kind, name)) {
            let dependency = id.with_name(kind, name)?;
            if self.ctx.manifest.contains(&dependency) {
                dropped.push(dependency);
            }
        }
        if dropped.is_empty() {
            return Ok(());
        }

        let owner = Owner::Subworkflow(id.name.clone());
        let remove_options = RemoveOptions {
            kind: id.kind,
            remote: id.remote.clone(),
            force: true,
        };
        let mut remover = RemoveOperation::new(&mut *self.ctx, remove_options);
        let mut failures = Summary::new();
        for dependency in dropped {
            let result = remover.drop_owner(&dependency, &owner);
            failures.record(&dependency.to_string(), result)?;
        }
        failures.absorb(remover.into_summary());
        self.summary.absorb(failures);
        Ok(())
    }

    fn update_dependencies(&mut self, id: &ComponentId, selector: &RevisionSelector) -> Result<()> {
        let files = FileSet::read_dir(&self.ctx.paths.component_dir(id), &[])?;
        for (kind, name) in resolver::dependencies(&files).iter() {
            let dependency = id.with_name(kind, name)?;
            if !self.ctx.manifest.contains(&dependency) {
                continue;
            }
            let result = self.update_one(&dependency, selector);
            self.summary.record(&dependency.to_string(), result)?;
        }
        Ok(())
    }
}

fn append_section(path: &Path, content: &[u8]) -> Result<()> {
    let write_failed = |e: std::io::Error| RegistryError::FileWriteFailed {
        path: path.display().to_string(),
        reason: e.to_string(),
    };
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(write_failed)?;
    file.write_all(content).map_err(write_failed)?;
    writeln!(file, "{SECTION_END}").map_err(write_failed)?;
    Ok(())
}

fn write_conflict_section(
    path: &Path,
    id: &ComponentId,
    target: &str,
    report: &ConflictReport,
    changes: &PatchDocument,
    doc: &PatchDocument,
) -> Result<()> {
    let mut content = format!(
        "Patch of component '{}' does not apply to ({}):\n{}\n",
        id,
        short_rev(target),
        report.render()
    );
    content.push_str(&changes.render_lossy());
    content.push_str("\nRecorded patch:\n");
    content.push_str(&doc.render_lossy());
    append_section(path, content.as_bytes())
}
