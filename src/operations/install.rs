//! Install operation
//!
//! Installs a component at a chosen revision, then the components a
//! subworkflow includes, each owned by that subworkflow. Dependencies are
//! installed before the parent's manifest entry is written.

use std::collections::BTreeSet;

use super::{ProjectContext, RevisionSelector, Summary, select_revision};
use crate::component::{ComponentId, ComponentKind, Owner};
use crate::error::{RegistryError, Result};
use crate::files::FileSet;
use crate::manifest::Entry;
use crate::paths::TESTS_DIR;
use crate::remote::{META_FILE, short_rev};
use crate::resolver;
use crate::ui::display;

/// Configuration options for installation
#[derive(Debug, Clone)]
pub struct InstallOptions {
    pub kind: ComponentKind,
    pub remote: String,
    /// Branch of the remote; the remote's default when unset
    pub branch: Option<String>,
    pub selector: RevisionSelector,
    /// Reinstall even when an entry exists
    pub force: bool,
}

/// What installing one component did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    Installed { id: ComponentId, revision: String },
    /// Nothing written, only the ownership edge recorded
    AlreadyInstalled { id: ComponentId },
}

impl InstallOutcome {
    pub fn id(&self) -> &ComponentId {
        match self {
            InstallOutcome::Installed { id, .. } | InstallOutcome::AlreadyInstalled { id } => id,
        }
    }
}

/// High-level install operation
pub struct InstallOperation<'a> {
    ctx: &'a mut ProjectContext,
    options: InstallOptions,
    summary: Summary,
    /// Components being installed further up the stack
    in_progress: BTreeSet<ComponentId>,
}

impl<'a> InstallOperation<'a> {
    pub fn new(ctx: &'a mut ProjectContext, options: InstallOptions) -> Self {
        Self {
            ctx,
            options,
            summary: Summary::new(),
            in_progress: BTreeSet::new(),
        }
    }

    /// Install `name` on behalf of the user and write the manifest
    pub fn execute(mut self, name: &str) -> Result<InstallOutcome> {
        let kind = self.options.kind;
        let selector = self.options.selector.clone();
        let force = self.options.force;
        let outcome = self.install(kind, name, &selector, &Owner::User(kind), force)?;
        self.ctx.persist()?;

        match &outcome {
            InstallOutcome::Installed { id, .. } => display::print_include_hint(id),
            InstallOutcome::AlreadyInstalled { id } => {
                tracing::info!("Use --force to reinstall {} '{}'", id.kind.singular(), id);
            }
        }
        self.summary.into_result()?;
        Ok(outcome)
    }

    /// Failures of dependencies collected so far
    pub fn into_summary(self) -> Summary {
        self.summary
    }

    /// Install one component for `owner`, without writing the manifest
    pub fn install(
        &mut self,
        kind: ComponentKind,
        name: &str,
        selector: &RevisionSelector,
        owner: &Owner,
        force: bool,
    ) -> Result<InstallOutcome> {
        let (id, branch) = self.identify(kind, name)?;
        if !self.in_progress.insert(id.clone()) {
            tracing::debug!(component = %id, "include cycle, not descending again");
            return Ok(InstallOutcome::AlreadyInstalled { id });
        }

        let result = if self.ctx.manifest.contains(&id) && !force {
            self.check_exact(&id, &branch, selector)
                .and_then(|()| self.record_existing(&id, owner))
        } else {
            self.install_at(&id, &branch, selector, owner, force)
        };
        self.in_progress.remove(&id);
        result
    }

    /// Identity and branch of a component available on the remote
    fn identify(&mut self, kind: ComponentKind, name: &str) -> Result<(ComponentId, String)> {
        let url = self.options.remote.clone();
        let remote = self.ctx.registry.get(&url, self.options.branch.as_deref())?;
        let branch = self
            .options
            .branch
            .clone()
            .unwrap_or_else(|| remote.branch().to_string());
        let org = remote.org_path().to_string();

        if let Some(existing) = self.ctx.manifest.remotes_using_org(&org, &url).into_iter().next() {
            return Err(RegistryError::OrgPathConflict { url, org, existing });
        }

        let id = ComponentId::new(url, kind, org, name)?;
        if !remote.component_exists(kind, name, &branch)? {
            return Err(RegistryError::ComponentUnknown {
                kind: kind.title().to_string(),
                name: name.to_string(),
                location: format!("in '{}' ({})", id.remote, branch),
            });
        }
        Ok((id, branch))
    }

    /// Fail on a requested commit the remote does not have, even when nothing gets installed
    fn check_exact(&mut self, id: &ComponentId, branch: &str, selector: &RevisionSelector) -> Result<()> {
        if let RevisionSelector::Exact(_) = selector {
            let remote = self.ctx.registry.get(&id.remote, Some(branch))?;
            select_revision(remote, self.ctx.prompter.as_mut(), id.kind, &id.name, branch, selector, None)?;
        }
        Ok(())
    }

    fn record_existing(&mut self, id: &ComponentId, owner: &Owner) -> Result<InstallOutcome> {
        if self.ctx.manifest.add_owner(id, owner) {
            tracing::debug!(component = %id, owner = %owner, "recorded installer");
        }
        if owner.is_user() {
            tracing::info!("{} '{}' is already installed", id.kind.title(), id);
        }

        if id.kind.has_dependencies() {
            let files = FileSet::read_dir(&self.ctx.paths.component_dir(id), &[])?;
            self.install_dependencies(id, &files, &RevisionSelector::Latest)?;
        }
        Ok(InstallOutcome::AlreadyInstalled { id: id.clone() })
    }

    fn install_at(
        &mut self,
        id: &ComponentId,
        branch: &str,
        selector: &RevisionSelector,
        owner: &Owner,
        force: bool,
    ) -> Result<InstallOutcome> {
        let installed = self.ctx.manifest.get_revision(id).map(str::to_string);
        let remote = self.ctx.registry.get(&id.remote, Some(branch))?;
        let revision = select_revision(
            remote,
            self.ctx.prompter.as_mut(),
            id.kind,
            &id.name,
            branch,
            selector,
            installed.as_deref(),
        )?;
        let files = remote.fetch_files(id.kind, &id.name, &revision)?;
        if remote.meta(id.kind, &id.name, &revision)?.is_none() {
            tracing::warn!("{} '{}' has no {META_FILE} at {}", id.kind.title(), id, short_rev(&revision));
        }

        let dir = self.ctx.paths.component_dir(id);
        if force && dir.exists() {
            let patch_name = id.patch_file_name();
            let changed: Vec<String> = remote
                .dir_identical(id.kind, &id.name, &dir, &[patch_name.as_str()], &revision)?
                .into_iter()
                .filter(|(_, same)| !same)
                .map(|(path, _)| path)
                .collect();
            if changed.is_empty() {
                tracing::info!("Reinstalling '{id}', its files already match {}", short_rev(&revision));
            } else {
                tracing::info!("Overwriting the installed version of '{id}': {}", changed.join(", "));
            }
        }
        files.replace_dir(&dir, &[TESTS_DIR])?;
        tracing::info!(
            "Installed {} '{}' at {}",
            id.kind.singular(),
            id,
            short_rev(&revision)
        );

        if id.kind.has_dependencies() {
            self.install_dependencies(id, &files, &selector.for_dependencies())?;
        }

        if force {
            let mut entry = Entry::new(&revision, branch);
            entry.installed_by.insert(owner.as_edge().to_string());
            self.ctx.manifest.replace(id, entry);
        } else {
            self.ctx.manifest.update(id, &revision, branch, owner);
        }
        self.ctx.touch(id);
        Ok(InstallOutcome::Installed {
            id: id.clone(),
            revision,
        })
    }

    /// Install what `files` of a subworkflow include, owned by that subworkflow
    pub fn install_dependencies(
        &mut self,
        subworkflow: &ComponentId,
        files: &FileSet,
        selector: &RevisionSelector,
    ) -> Result<()> {
        let dependencies = resolver::dependencies(files);
        if dependencies.is_empty() {
            return Ok(());
        }
        tracing::debug!(subworkflow = %subworkflow, "installing dependencies");

        let owner = Owner::Subworkflow(subworkflow.name.clone());
        for (kind, name) in dependencies.iter() {
            let result = self.install(kind, name, selector, &owner, false);
            self.summary
                .record(&format!("{}/{}", kind, name), result)?;
        }
        Ok(())
    }
}
