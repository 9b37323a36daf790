//! One remote component repository
//!
//! A [`RemoteRepo`] wraps a bare local mirror of a remote. All reads go
//! through git objects, never through a checkout, so looking at several
//! revisions of the same mirror needs no working-tree juggling.

pub mod log;
pub mod registry;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use git2::{Commit, ObjectType, Repository, Tree, TreeWalkMode, TreeWalkResult};
use serde::Deserialize;

use crate::cache;
use crate::component::ComponentKind;
use crate::error::{RegistryError, Result};
use crate::files::FileSet;
use crate::git;
use crate::hash;
use crate::paths::{MAIN_SCRIPT, TESTS_DIR};

pub use log::{CommitInfo, CommitLog};

/// The default component registry
pub const NF_CORE_MODULES_REMOTE: &str = "https://github.com/nf-core/modules.git";

/// Default branch of the default registry
pub const NF_CORE_MODULES_DEFAULT_BRANCH: &str = "master";

/// Default organisation path
pub const NF_CORE_MODULES_NAME: &str = "nf-core";

/// Descriptor file of a component
pub const META_FILE: &str = "meta.yml";

/// Subset of a remote's own `.nf-core.yml`
#[derive(Debug, Default, Deserialize)]
struct RemoteConfig {
    org_path: Option<String>,
}

/// A cloned mirror of one remote
pub struct RemoteRepo {
    url: String,
    repo: Repository,
    branch: String,
    org_path: String,
}

impl std::fmt::Debug for RemoteRepo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteRepo")
            .field("url", &self.url)
            .field("branch", &self.branch)
            .field("org_path", &self.org_path)
            .finish()
    }
}

impl RemoteRepo {
    /// Clone or refresh the mirror of `url` and check out its layout
    ///
    /// `branch` defaults to `master` for the nf-core registry and to the
    /// remote's HEAD branch otherwise. `fallback_org` is used when the remote
    /// does not declare its own `org_path`.
    pub fn open(url: &str, branch: Option<&str>, no_pull: bool, fallback_org: &str) -> Result<Self> {
        let mirror_dir = cache::mirror_dir(url)?;
        let repo = Self::sync_mirror(url, &mirror_dir, no_pull)?;

        let branch = match branch {
            Some(b) => b.to_string(),
            None if url == NF_CORE_MODULES_REMOTE => NF_CORE_MODULES_DEFAULT_BRANCH.to_string(),
            None => git::head_branch(&repo).unwrap_or_else(|| NF_CORE_MODULES_DEFAULT_BRANCH.to_string()),
        };

        let org_path = {
            let tip = git::branch_tip(&repo, &branch).ok_or_else(|| RegistryError::BranchUnknown {
                url: url.to_string(),
                branch: branch.clone(),
            })?;
            declared_org_path(&repo, url, &tip)?.unwrap_or_else(|| fallback_org.to_string())
        };

        let remote = Self {
            url: url.to_string(),
            repo,
            branch,
            org_path,
        };
        remote.verify_branch(&remote.branch)?;

        tracing::debug!(
            url = %remote.url,
            branch = %remote.branch,
            org_path = %remote.org_path,
            "remote ready"
        );
        Ok(remote)
    }

    fn sync_mirror(url: &str, mirror_dir: &Path, no_pull: bool) -> Result<Repository> {
        if mirror_dir.join("HEAD").is_file() {
            match git::open(mirror_dir) {
                Ok(repo) => {
                    if !no_pull {
                        git::fetch(&repo, url)?;
                    }
                    return Ok(repo);
                }
                Err(e) => {
                    tracing::warn!("Mirror of '{url}' is unusable, cloning again: {e}");
                }
            }
        }
        git::clone_mirror(url, mirror_dir)
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Branch selected when the remote was opened
    pub fn branch(&self) -> &str {
        &self.branch
    }

    pub fn org_path(&self) -> &str {
        &self.org_path
    }

    fn branch_tip(&self, branch: &str) -> Result<Commit<'_>> {
        git::branch_tip(&self.repo, branch).ok_or_else(|| RegistryError::BranchUnknown {
            url: self.url.clone(),
            branch: branch.to_string(),
        })
    }

    fn verify_layout(&self, tip: &Commit<'_>, branch: &str) -> Result<()> {
        let tree = tip.tree()?;
        let has_dir = |kind: ComponentKind| {
            tree.get_path(&Path::new(kind.dir_name()).join(&self.org_path))
                .map(|e| e.kind() == Some(ObjectType::Tree))
                .unwrap_or(false)
        };
        if ComponentKind::ALL.into_iter().any(has_dir) {
            return Ok(());
        }
        Err(RegistryError::LayoutInvalid {
            url: self.url.clone(),
            reason: format!(
                "branch '{branch}' has neither 'modules/{org}/' nor 'subworkflows/{org}/'",
                org = self.org_path
            ),
        })
    }

    /// Make sure `branch` exists and has the expected layout
    pub fn verify_branch(&self, branch: &str) -> Result<()> {
        let tip = self.branch_tip(branch)?;
        self.verify_layout(&tip, branch)
    }

    fn component_path(&self, kind: ComponentKind, name: &str) -> PathBuf {
        let mut path = PathBuf::from(kind.dir_name());
        path.push(&self.org_path);
        for part in name.split('/') {
            path.push(part);
        }
        path
    }

    fn subtree<'r>(&'r self, commit: &Commit<'r>, path: &Path) -> Result<Option<Tree<'r>>> {
        let tree = commit.tree()?;
        match tree.get_path(path) {
            Ok(entry) if entry.kind() == Some(ObjectType::Tree) => {
                Ok(Some(self.repo.find_tree(entry.id())?))
            }
            Ok(_) => Ok(None),
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn commit(&self, revision: &str) -> Result<Commit<'_>> {
        git::find_commit(&self.repo, revision).ok_or_else(|| RegistryError::RevisionUnknown {
            url: self.url.clone(),
            revision: revision.to_string(),
        })
    }

    /// Every component of `kind` on `branch`
    ///
    /// A component is a directory below `<kind>/<org>/` that contains a
    /// `main.nf`; test subtrees are skipped.
    pub fn list_components(&self, kind: ComponentKind, branch: &str) -> Result<Vec<String>> {
        let tip = self.branch_tip(branch)?;
        let root = Path::new(kind.dir_name()).join(&self.org_path);
        let Some(tree) = self.subtree(&tip, &root)? else {
            return Ok(Vec::new());
        };

        let mut names = Vec::new();
        tree.walk(TreeWalkMode::PreOrder, |dir, entry| {
            if entry.kind() == Some(ObjectType::Tree) && entry.name() == Some(TESTS_DIR) {
                return TreeWalkResult::Skip;
            }
            if entry.kind() == Some(ObjectType::Blob) && entry.name() == Some(MAIN_SCRIPT) && !dir.is_empty() {
                names.push(dir.trim_end_matches('/').to_string());
            }
            TreeWalkResult::Ok
        })?;
        names.sort();
        Ok(names)
    }

    /// Every branch of the mirror, sorted
    pub fn branches(&self) -> Result<Vec<String>> {
        git::branch_names(&self.repo)
    }

    /// Whether `name` is a component of `kind` on `branch`
    pub fn component_exists(&self, kind: ComponentKind, name: &str, branch: &str) -> Result<bool> {
        let tip = self.branch_tip(branch)?;
        let main = self.component_path(kind, name).join(MAIN_SCRIPT);
        Ok(blob_at(&self.repo, &tip, &main)?.is_some())
    }

    /// Commits on `branch` that touch the component, newest first
    ///
    /// Bound the walk with `.take(depth)`.
    pub fn commit_log(&self, kind: ComponentKind, name: &str, branch: &str) -> Result<CommitLog<'_>> {
        let tip = self.branch_tip(branch)?;
        CommitLog::new(&self.repo, tip.id(), self.component_path(kind, name))
    }

    /// Newest commit on `branch` that touches the component
    pub fn latest(&self, kind: ComponentKind, name: &str, branch: &str) -> Result<CommitInfo> {
        self.commit_log(kind, name, branch)?
            .next()
            .transpose()?
            .ok_or_else(|| RegistryError::ComponentUnknown {
                kind: kind.title().to_string(),
                name: name.to_string(),
                location: format!("in '{}' ({})", self.url, branch),
            })
    }

    /// Whether `revision` names a commit of the mirror
    pub fn exists(&self, revision: &str) -> bool {
        git::find_commit(&self.repo, revision).is_some()
    }

    /// Whether `revision` is reachable from the tip of `branch`
    pub fn exists_on_branch(&self, revision: &str, branch: &str) -> Result<bool> {
        let Some(commit) = git::find_commit(&self.repo, revision) else {
            return Ok(false);
        };
        let tip = self.branch_tip(branch)?;
        if tip.id() == commit.id() {
            return Ok(true);
        }
        Ok(self.repo.graph_descendant_of(tip.id(), commit.id())?)
    }

    /// Full hash of a (possibly abbreviated) revision
    pub fn resolve(&self, revision: &str) -> Result<String> {
        Ok(self.commit(revision)?.id().to_string())
    }

    /// Byte-exact files of a component at `revision`, without its test subtree
    pub fn fetch_files(&self, kind: ComponentKind, name: &str, revision: &str) -> Result<FileSet> {
        let commit = self.commit(revision)?;
        let path = self.component_path(kind, name);
        let tree = self.subtree(&commit, &path)?.ok_or_else(|| RegistryError::ComponentUnknown {
            kind: kind.title().to_string(),
            name: name.to_string(),
            location: format!("in '{}' at {}", self.url, short_rev(revision)),
        })?;

        let mut blobs = Vec::new();
        tree.walk(TreeWalkMode::PreOrder, |dir, entry| {
            match entry.kind() {
                Some(ObjectType::Tree) if dir.is_empty() && entry.name() == Some(TESTS_DIR) => {
                    return TreeWalkResult::Skip;
                }
                Some(ObjectType::Blob) => {
                    if let Some(file_name) = entry.name() {
                        blobs.push((format!("{dir}{file_name}"), entry.id()));
                    }
                }
                _ => {}
            }
            TreeWalkResult::Ok
        })?;

        let mut files = FileSet::new();
        for (rel, oid) in blobs {
            let blob = self.repo.find_blob(oid)?;
            files.insert(rel, blob.content().to_vec());
        }
        Ok(files)
    }

    /// Per-file identity of local files against `revision`
    ///
    /// Every path present on either side is reported; a file missing on one
    /// side is not identical.
    pub fn files_identical(
        &self,
        kind: ComponentKind,
        name: &str,
        local: &FileSet,
        revision: &str,
    ) -> Result<BTreeMap<String, bool>> {
        let upstream = self.fetch_files(kind, name, revision)?;
        Ok(compare_files(&upstream, local))
    }

    /// [`files_identical`](Self::files_identical) for a component directory on disk
    pub fn dir_identical(
        &self,
        kind: ComponentKind,
        name: &str,
        local_dir: &Path,
        exclude: &[&str],
        revision: &str,
    ) -> Result<BTreeMap<String, bool>> {
        let local = FileSet::read_dir(local_dir, exclude)?;
        self.files_identical(kind, name, &local, revision)
    }

    /// Contents of the component's `meta.yml` at `revision`, if it has one
    pub fn meta(&self, kind: ComponentKind, name: &str, revision: &str) -> Result<Option<String>> {
        let commit = self.commit(revision)?;
        let path = self.component_path(kind, name).join(META_FILE);
        Ok(blob_at(&self.repo, &commit, &path)?
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned()))
    }
}

fn blob_at(repo: &Repository, commit: &Commit<'_>, path: &Path) -> Result<Option<Vec<u8>>> {
    let tree = commit.tree()?;
    let entry = match tree.get_path(path) {
        Ok(entry) => entry,
        Err(e) if e.code() == git2::ErrorCode::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    if entry.kind() != Some(ObjectType::Blob) {
        return Ok(None);
    }
    let blob = repo.find_blob(entry.id())?;
    Ok(Some(blob.content().to_vec()))
}

/// `org_path` declared in the remote's own config file at `tip`
fn declared_org_path(repo: &Repository, url: &str, tip: &Commit<'_>) -> Result<Option<String>> {
    for name in crate::paths::CONFIG_FILES {
        if let Some(bytes) = blob_at(repo, tip, Path::new(name))? {
            let config: RemoteConfig =
                serde_yaml::from_slice(&bytes).map_err(|e| RegistryError::ConfigInvalid {
                    path: format!("{url}:{name}"),
                    reason: e.to_string(),
                })?;
            return Ok(config.org_path);
        }
    }
    Ok(None)
}

/// Compare two file sets by digest, over the union of their paths
pub fn compare_files(upstream: &FileSet, local: &FileSet) -> BTreeMap<String, bool> {
    upstream
        .union_paths(local)
        .into_iter()
        .map(|path| {
            let same = match (upstream.get(path), local.get(path)) {
                (Some(a), Some(b)) => hash::hash_bytes(a) == hash::hash_bytes(b),
                _ => false,
            };
            (path.to_string(), same)
        })
        .collect()
}

/// Seven-character form of a revision for messages
pub fn short_rev(revision: &str) -> &str {
    &revision[..revision.len().min(7)]
}
