//! Consistency rules checked before every manifest write
//!
//! 1. Every component directory under a tracked org path has exactly one entry,
//!    and every entry has a directory.
//! 2. Every entry has at least one `installed_by` edge.
//! 3. A registered patch path is an existing regular file.
//! 4. The revision of every entry written by this command is reachable on its branch.
//!
//! Sorted serialisation holds by construction (`BTreeMap` / `BTreeSet`).

use std::collections::{BTreeMap, BTreeSet};

use super::Manifest;
use super::reconcile::component_dirs;
use crate::component::{ComponentId, ComponentKind};
use crate::error::{RegistryError, Result};
use crate::paths::ProjectPaths;
use crate::remote::registry::RemoteRegistry;

/// Answers whether a revision is reachable on a branch of a remote
pub trait RevisionVerifier {
    fn is_reachable(&mut self, url: &str, revision: &str, branch: &str) -> Result<bool>;
}

impl RevisionVerifier for RemoteRegistry {
    fn is_reachable(&mut self, url: &str, revision: &str, branch: &str) -> Result<bool> {
        let remote = self.get(url, None)?;
        remote.exists_on_branch(revision, branch)
    }
}

/// Org paths whose directories are tracked: every org in the manifest plus the project's own
pub fn tracked_orgs(manifest: &Manifest, kind: ComponentKind, project_org: &str) -> BTreeSet<String> {
    let mut orgs = manifest.orgs(kind);
    orgs.insert(project_org.to_string());
    orgs
}

/// Check every rule, collecting all violations into one error
pub fn check(
    manifest: &Manifest,
    paths: &ProjectPaths,
    project_org: &str,
    touched: &BTreeSet<ComponentId>,
    verifier: &mut dyn RevisionVerifier,
) -> Result<()> {
    let mut violations = Vec::new();

    for kind in ComponentKind::ALL {
        for org in tracked_orgs(manifest, kind, project_org) {
            let mut owners: BTreeMap<String, usize> = BTreeMap::new();
            for (id, _) in manifest.of_kind(kind).filter(|(id, _)| id.org == org) {
                *owners.entry(id.name).or_default() += 1;
            }
            for name in component_dirs(paths, kind, &org)? {
                match owners.get(&name).copied().unwrap_or(0) {
                    1 => {}
                    0 => violations.push(format!(
                        "'{}/{}/{}' is installed but has no manifest entry",
                        kind, org, name
                    )),
                    n => violations.push(format!(
                        "'{}/{}/{}' has {} manifest entries from different remotes",
                        kind, org, name, n
                    )),
                }
            }
        }
    }

    for (id, entry) in manifest.iter() {
        if !paths.component_dir(&id).is_dir() {
            violations.push(format!(
                "'{}' has a manifest entry but no directory",
                id.rel_dir_string()
            ));
        }
        if entry.installed_by.is_empty() {
            violations.push(format!("'{}' has an empty installed_by", id.rel_dir_string()));
        }
        if let Some(patch) = &entry.patch {
            if !paths.resolve(patch).is_file() {
                violations.push(format!(
                    "patch '{}' of '{}' does not exist",
                    patch,
                    id.rel_dir_string()
                ));
            }
        }
        if touched.contains(&id)
            && !verifier.is_reachable(&id.remote, &entry.git_sha, &entry.branch)?
        {
            violations.push(format!(
                "revision {} of '{}' is not on branch '{}'",
                entry.git_sha,
                id.rel_dir_string(),
                entry.branch
            ));
        }
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(RegistryError::ManifestInvariantViolation {
            reason: violations.join("; "),
        })
    }
}
