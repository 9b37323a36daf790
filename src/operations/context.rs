//! Shared state of one command run against a project
//!
//! [`ProjectContext`] checks the project, loads the config and the manifest,
//! reconciles the manifest with the directories on disk and owns the remote
//! mirrors for the rest of the command.

use std::collections::BTreeSet;
use std::path::Path;

use crate::component::{ComponentId, ComponentKind};
use crate::config::{PipelineMeta, ProjectConfig};
use crate::error::{RegistryError, Result};
use crate::manifest::store::{self, LoadState};
use crate::manifest::{Manifest, invariants, reconcile};
use crate::paths::{MANIFEST_FILE, ProjectPaths};
use crate::remote::registry::RemoteRegistry;
use crate::ui::{self, Prompter};

/// Everything an operation needs
pub struct ProjectContext {
    pub paths: ProjectPaths,
    pub config: ProjectConfig,
    pub manifest: Manifest,
    pub registry: RemoteRegistry,
    pub prompter: Box<dyn Prompter>,
    /// Entries whose revision was written by this command
    touched: BTreeSet<ComponentId>,
}

impl ProjectContext {
    /// Open the project at `root` for `action` (`install`, `remove`, ...)
    ///
    /// A missing manifest is created and an unreadable one rebuilt from the
    /// installed components. Either way the manifest is reconciled and
    /// written back when that changed anything.
    pub fn open(root: &Path, no_pull: bool, action: &str) -> Result<Self> {
        let paths = ProjectPaths::new(root);
        paths.ensure_pipeline()?;

        let config = ProjectConfig::load(&paths)?;
        config.ensure_consumer(action)?;

        let registry = RemoteRegistry::new(no_pull, config.org_path())
            .with_progress(ui::progress_reporter());

        Self::with_parts(paths, config, registry, ui::prompter())
    }

    /// Open with explicit collaborators
    pub fn with_parts(
        paths: ProjectPaths,
        config: ProjectConfig,
        registry: RemoteRegistry,
        prompter: Box<dyn Prompter>,
    ) -> Result<Self> {
        let (manifest, created, invalid) = match store::load(&paths) {
            LoadState::Loaded(manifest) => (manifest, false, None),
            LoadState::Missing => {
                tracing::info!("Creating {MANIFEST_FILE}");
                (new_manifest(&paths), true, None)
            }
            LoadState::Invalid(reason) => {
                tracing::warn!("{MANIFEST_FILE} is invalid ({reason}), rebuilding it from the installed components");
                (new_manifest(&paths), true, Some(reason))
            }
        };

        let mut ctx = Self {
            paths,
            config,
            manifest,
            registry,
            prompter,
            touched: BTreeSet::new(),
        };

        let org = ctx.config.org_path().to_string();
        let report = reconcile::reconcile(&mut ctx.manifest, &ctx.paths, &org, &mut ctx.registry)
            .map_err(|e| match invalid {
                Some(reason) => RegistryError::ManifestInvalid {
                    path: ctx.paths.manifest().display().to_string(),
                    reason: format!("{reason}; rebuilding failed: {e}"),
                },
                None => e,
            })?;
        report.log();
        ctx.touched
            .extend(report.added.iter().map(|(id, _)| id.clone()));

        if created || !report.is_empty() {
            ctx.persist()?;
        }
        Ok(ctx)
    }

    /// Record that the revision of `id` was written by this command
    pub fn touch(&mut self, id: &ComponentId) {
        self.touched.insert(id.clone());
    }

    /// Identity of an installed component of `remote`
    pub fn locate(&self, kind: ComponentKind, name: &str, remote: &str) -> Result<ComponentId> {
        self.manifest
            .of_kind(kind)
            .map(|(id, _)| id)
            .find(|id| id.remote == remote && id.name == name)
            .ok_or_else(|| RegistryError::ComponentUnknown {
                kind: kind.title().to_string(),
                name: name.to_string(),
                location: format!("in {MANIFEST_FILE} for '{remote}'"),
            })
    }

    /// Ask for one of the components `remote` offers
    pub fn choose_available(&mut self, kind: ComponentKind, remote: &str, branch: Option<&str>) -> Result<String> {
        let repo = self.registry.get(remote, branch)?;
        let names = repo.list_components(kind, repo.branch())?;
        self.choose(kind, names, &format!("offered by '{remote}'"))
    }

    /// Ask for one of the components installed from `remote`
    pub fn choose_installed(&mut self, kind: ComponentKind, remote: &str) -> Result<String> {
        let names = self
            .manifest
            .of_kind(kind)
            .filter(|(id, _)| id.remote == remote)
            .map(|(id, _)| id.name)
            .collect();
        self.choose(kind, names, &format!("installed from '{remote}'"))
    }

    fn choose(&mut self, kind: ComponentKind, names: Vec<String>, source: &str) -> Result<String> {
        if names.is_empty() {
            return Err(RegistryError::Refused {
                action: format!("choose a {}, none is {source}", kind.singular()),
            });
        }
        let message = format!("{} name:", kind.title());
        let index = self.prompter.select(&message, &names)?;
        let name = names.into_iter().nth(index).ok_or_else(|| RegistryError::Refused {
            action: format!("choose a {} outside the offered ones", kind.singular()),
        })?;
        tracing::debug!(kind = kind.singular(), source, "chose '{name}'");
        Ok(name)
    }

    /// Reconcile, check every invariant and write the manifest
    ///
    /// On a violation nothing is written.
    pub fn persist(&mut self) -> Result<()> {
        let org = self.config.org_path().to_string();
        let report = reconcile::reconcile(&mut self.manifest, &self.paths, &org, &mut self.registry)?;
        report.log();
        self.touched
            .extend(report.added.iter().map(|(id, _)| id.clone()));

        invariants::check(
            &self.manifest,
            &self.paths,
            &org,
            &self.touched,
            &mut self.registry,
        )?;
        store::write(&self.manifest, &self.paths)
    }
}

fn new_manifest(paths: &ProjectPaths) -> Manifest {
    let meta = PipelineMeta::load(paths);
    Manifest::new(meta.name, meta.home_page)
}
