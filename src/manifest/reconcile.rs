//! Bringing the manifest back in line with the component directories on disk
//!
//! Entries whose directory is gone are dropped. Directories without an entry
//! get one when a commit of the remote carries byte-identical files (after
//! undoing the component's patch, if it has one); the remote's other branches
//! are tried after its default branch. Directories that match nothing are
//! moved to `<kind>/local/`.

use std::collections::BTreeSet;
use std::fs;
use std::path::PathBuf;

use jiff::Timestamp;
use walkdir::WalkDir;

use super::Manifest;
use super::invariants::tracked_orgs;
use crate::component::{ComponentId, ComponentKind, Owner};
use crate::error::{RegistryError, Result};
use crate::files::{self, FileSet};
use crate::patch;
use crate::paths::{MAIN_SCRIPT, ProjectPaths, TESTS_DIR};
use crate::remote::registry::RemoteRegistry;
use crate::remote::{NF_CORE_MODULES_REMOTE, RemoteRepo, short_rev};
use crate::resolver;

/// Org directory for components that no remote provides
pub const LOCAL_ORG: &str = "local";

/// Commits inspected per branch when inferring a revision
const LOG_DEPTH: usize = 1000;

/// What a reconcile pass changed
#[derive(Debug, Default)]
pub struct ReconcileReport {
    pub dropped: Vec<ComponentId>,
    /// Newly tracked components with their inferred revision
    pub added: Vec<(ComponentId, String)>,
    /// Untracked directories moved aside: (old location, new location)
    pub moved_to_local: Vec<(String, String)>,
    pub patches_cleared: Vec<ComponentId>,
    pub patches_registered: Vec<ComponentId>,
    pub owners_repaired: Vec<ComponentId>,
    /// `installed_by` edges re-derived from subworkflow includes
    pub edges_recovered: usize,
}

impl ReconcileReport {
    pub fn is_empty(&self) -> bool {
        self.dropped.is_empty()
            && self.added.is_empty()
            && self.moved_to_local.is_empty()
            && self.patches_cleared.is_empty()
            && self.patches_registered.is_empty()
            && self.owners_repaired.is_empty()
            && self.edges_recovered == 0
    }

    /// Tell the user what changed
    pub fn log(&self) {
        for id in &self.dropped {
            tracing::warn!(
                "{} '{}' is in {} but not installed, removing its entry",
                id.kind.title(),
                id,
                crate::paths::MANIFEST_FILE
            );
        }
        for (id, revision) in &self.added {
            tracing::info!(
                "Tracking {} '{}' installed at {}",
                id.kind.singular(),
                id,
                short_rev(revision)
            );
        }
        for (from, to) in &self.moved_to_local {
            tracing::warn!("No remote commit matches '{from}', moved it to '{to}'");
        }
        for id in &self.patches_cleared {
            tracing::warn!("Patch file of '{id}' is missing, dropping the patch entry");
        }
        for id in &self.patches_registered {
            tracing::info!("Registered existing patch file of '{id}'");
        }
        for id in &self.owners_repaired {
            tracing::info!("'{id}' had no installer recorded, marking it as user-installed");
        }
        if self.edges_recovered > 0 {
            tracing::info!("Recovered {} subworkflow dependency edge(s)", self.edges_recovered);
        }
    }
}

/// Names of the installed components under `<kind>/<org>/`, sorted
///
/// A component is a directory holding a `main.nf`, one level deep (two for
/// modules with a `tool/subtool` name). Test directories are skipped.
pub fn component_dirs(paths: &ProjectPaths, kind: ComponentKind, org: &str) -> Result<Vec<String>> {
    let root = paths.org_dir(kind, org);
    if !root.is_dir() {
        return Ok(Vec::new());
    }
    let max_depth = match kind {
        ComponentKind::Module => 2,
        ComponentKind::Subworkflow => 1,
    };

    let mut names = Vec::new();
    let mut walker = WalkDir::new(&root)
        .min_depth(1)
        .max_depth(max_depth)
        .sort_by_file_name()
        .into_iter();
    while let Some(entry) = walker.next() {
        let entry = entry.map_err(|e| RegistryError::FileReadFailed {
            path: root.display().to_string(),
            reason: e.to_string(),
        })?;
        if !entry.file_type().is_dir() {
            continue;
        }
        if entry.file_name() == TESTS_DIR {
            walker.skip_current_dir();
            continue;
        }
        if entry.path().join(MAIN_SCRIPT).is_file() {
            let rel = entry
                .path()
                .strip_prefix(&root)
                .unwrap_or(entry.path())
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/");
            names.push(rel);
            walker.skip_current_dir();
        }
    }
    names.sort();
    Ok(names)
}

/// Run one reconcile pass over every tracked org
pub fn reconcile(
    manifest: &mut Manifest,
    paths: &ProjectPaths,
    project_org: &str,
    registry: &mut RemoteRegistry,
) -> Result<ReconcileReport> {
    let mut report = ReconcileReport::default();
    repair_entries(manifest, paths, &mut report);

    for kind in ComponentKind::ALL {
        for org in tracked_orgs(manifest, kind, project_org) {
            for name in component_dirs(paths, kind, &org)? {
                if !manifest.find(kind, &org, &name).is_empty() {
                    continue;
                }
                track_directory(manifest, paths, registry, kind, &org, &name, project_org, &mut report)?;
            }
        }
    }

    recover_subworkflow_edges(manifest, paths, &mut report)?;
    Ok(report)
}

fn repair_entries(manifest: &mut Manifest, paths: &ProjectPaths, report: &mut ReconcileReport) {
    let ids: Vec<ComponentId> = manifest.iter().map(|(id, _)| id).collect();
    for id in ids {
        if !paths.component_dir(&id).is_dir() {
            manifest.remove_entry(&id);
            report.dropped.push(id);
            continue;
        }

        match manifest.get_patch(&id).map(str::to_string) {
            Some(patch) if !paths.resolve(&patch).is_file() => {
                manifest.clear_patch(&id);
                report.patches_cleared.push(id.clone());
            }
            None if paths.patch_file(&id).is_file() => {
                manifest.set_patch(&id, paths.patch_rel_path(&id));
                report.patches_registered.push(id.clone());
            }
            _ => {}
        }

        if manifest.get(&id).is_some_and(|e| e.installed_by.is_empty()) {
            manifest.add_owner(&id, &Owner::User(id.kind));
            report.owners_repaired.push(id);
        }
    }
}

/// Remote an untracked directory under `org` most likely came from
fn remote_for_org(manifest: &Manifest, org: &str, project_org: &str) -> Option<String> {
    manifest
        .remote_for_org(org)
        .or_else(|| (org == project_org).then(|| NF_CORE_MODULES_REMOTE.to_string()))
}

#[allow(clippy::too_many_arguments)]
fn track_directory(
    manifest: &mut Manifest,
    paths: &ProjectPaths,
    registry: &mut RemoteRegistry,
    kind: ComponentKind,
    org: &str,
    name: &str,
    project_org: &str,
    report: &mut ReconcileReport,
) -> Result<()> {
    let dir = paths.org_dir(kind, org).join(name);
    let identified = match remote_for_org(manifest, org, project_org) {
        Some(url) => match ComponentId::new(url, kind, org, name) {
            Ok(id) => {
                let remote = registry.get(&id.remote, None)?;
                infer_revision(remote, paths, &id)?.map(|found| (id, found))
            }
            Err(_) => None,
        },
        None => None,
    };

    let Some((id, (revision, branch))) = identified else {
        let to = move_to_local(paths, kind, org, name)?;
        report.moved_to_local.push((
            format!("{}/{}/{}", kind.dir_name(), org, name),
            to.strip_prefix(paths.root()).unwrap_or(&to).display().to_string(),
        ));
        return Ok(());
    };

    tracing::debug!(dir = %dir.display(), revision = %revision, branch = %branch, "inferred revision");
    manifest.update(&id, &revision, &branch, &Owner::User(kind));
    if paths.patch_file(&id).is_file() {
        manifest.set_patch(&id, paths.patch_rel_path(&id));
    }
    report.added.push((id, revision));
    Ok(())
}

/// Newest (revision, branch) whose files equal the directory's pristine content
fn infer_revision(remote: &RemoteRepo, paths: &ProjectPaths, id: &ComponentId) -> Result<Option<(String, String)>> {
    if remote.org_path() != id.org {
        return Ok(None);
    }
    let (pristine, patched_binaries) = pristine_files(paths, id)?;

    let mut branches = vec![remote.branch().to_string()];
    branches.extend(remote.branches()?.into_iter().filter(|b| b != remote.branch()));

    for branch in branches {
        let log = match remote.commit_log(id.kind, &id.name, &branch) {
            Ok(log) => log,
            Err(RegistryError::BranchUnknown { .. }) => continue,
            Err(e) => return Err(e),
        };
        for info in log.take(LOG_DEPTH) {
            let info = info?;
            let identical = match remote.files_identical(id.kind, &id.name, &pristine, &info.revision) {
                Ok(identical) => identical,
                // the commit that deleted the component
                Err(RegistryError::ComponentUnknown { .. }) => continue,
                Err(e) => return Err(e),
            };
            if identical
                .iter()
                .all(|(path, same)| *same || patched_binaries.contains(path))
            {
                return Ok(Some((info.revision, branch)));
            }
        }
    }
    Ok(None)
}

/// Installed files with the component's patch undone, if it has one
///
/// Also returns the binary files the patch changed. Their bytes stay patched,
/// so they are left out of the comparison.
fn pristine_files(paths: &ProjectPaths, id: &ComponentId) -> Result<(FileSet, BTreeSet<String>)> {
    let patch_name = id.patch_file_name();
    let installed = FileSet::read_dir(&paths.component_dir(id), &[patch_name.as_str()])?;
    if !paths.patch_file(id).is_file() {
        return Ok((installed, BTreeSet::new()));
    }
    let doc = patch::read(paths, &paths.patch_rel_path(id))?;
    match patch::unapply(&doc, id, &installed) {
        Ok(pristine) => Ok((pristine, patch::binary_paths(&doc, id))),
        Err(conflict) => {
            tracing::warn!(
                "Patch of '{id}' does not reverse cleanly, matching the files as they are: {}",
                conflict.files().join(", ")
            );
            Ok((installed, BTreeSet::new()))
        }
    }
}

/// Move `<kind>/<org>/<name>` to `<kind>/local/<name>`, suffixing the name if taken
fn move_to_local(paths: &ProjectPaths, kind: ComponentKind, org: &str, name: &str) -> Result<PathBuf> {
    let org_dir = paths.org_dir(kind, org);
    let from = org_dir.join(name);
    let local_dir = paths.org_dir(kind, LOCAL_ORG);

    let mut to = local_dir.join(name);
    while to.exists() {
        let suffix = Timestamp::now().strftime("%y%m%d%H%M%S").to_string();
        let file_name = to
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        to.set_file_name(format!("{file_name}-{suffix}"));
    }

    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::rename(&from, &to).map_err(|e| RegistryError::FileWriteFailed {
        path: from.display().to_string(),
        reason: e.to_string(),
    })?;
    files::remove_dir_and_empty_parents(&from, &org_dir)?;
    Ok(to)
}

/// Add the edges from each subworkflow to the components it includes
///
/// A dependency that was tracked by this pass loses its user edge: it was
/// most likely installed by the subworkflow.
fn recover_subworkflow_edges(manifest: &mut Manifest, paths: &ProjectPaths, report: &mut ReconcileReport) -> Result<()> {
    let added: BTreeSet<ComponentId> = report.added.iter().map(|(id, _)| id.clone()).collect();
    let subworkflows: Vec<ComponentId> = manifest
        .of_kind(ComponentKind::Subworkflow)
        .map(|(id, _)| id)
        .filter(|id| added.contains(id))
        .collect();

    for subworkflow in subworkflows {
        let files = FileSet::read_dir(&paths.component_dir(&subworkflow), &[])?;
        let owner = Owner::Subworkflow(subworkflow.name.clone());
        for (kind, name) in resolver::dependencies(&files).iter() {
            let Ok(dep) = subworkflow.with_name(kind, name) else {
                continue;
            };
            if !manifest.contains(&dep) {
                continue;
            }
            if manifest.add_owner(&dep, &owner) {
                report.edges_recovered += 1;
            }
            if added.contains(&dep) {
                manifest.remove_edge(&dep, &Owner::User(kind));
            }
        }
    }
    Ok(())
}
