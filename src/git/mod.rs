//! libgit2 plumbing for remote mirrors
//!
//! This module handles:
//! - Cloning a remote into a bare local mirror
//! - Fetching every branch of an existing mirror
//! - Looking up branch tips and commits by (possibly abbreviated) hash
//!
//! Authentication is delegated entirely to git's native system (see [`auth`]).

pub mod auth;
pub mod error;
pub mod url;

use std::fs;
use std::path::Path;

use git2::{Commit, FetchOptions, FetchPrune, Oid, RemoteCallbacks, Repository, build::RepoBuilder};

use crate::error::{RegistryError, Result};

/// Refspec mirroring every upstream branch under `refs/remotes/origin/`
pub const BRANCH_REFSPEC: &str = "+refs/heads/*:refs/remotes/origin/*";

fn fetch_options<'cb>() -> FetchOptions<'cb> {
    let mut callbacks = RemoteCallbacks::new();
    auth::setup_auth_callbacks(&mut callbacks);

    let mut options = FetchOptions::new();
    options.remote_callbacks(callbacks);
    options.prune(FetchPrune::On);
    options
}

/// Clone `url` into a bare mirror at `target`
///
/// The clone happens in a sibling temporary directory that is renamed into
/// place on success, so an interrupted clone never leaves a half-populated
/// mirror behind.
pub fn clone_mirror(url: &str, target: &Path) -> Result<Repository> {
    let parent = target.parent().ok_or_else(|| RegistryError::IoError {
        message: format!("Invalid mirror location '{}'", target.display()),
    })?;
    fs::create_dir_all(parent)?;
    let staging = tempfile::Builder::new()
        .prefix(".clone-")
        .tempdir_in(parent)?;

    let mut builder = RepoBuilder::new();
    builder.bare(true);
    builder.fetch_options(fetch_options());

    let source = url::for_libgit2(url);
    tracing::debug!(url, target = %target.display(), "cloning remote");
    builder
        .clone(source.as_ref(), staging.path())
        .map_err(|e| error::unreachable(url, &e))?;

    if target.exists() {
        fs::remove_dir_all(target)?;
    }
    let staged = staging.keep();
    fs::rename(&staged, target)?;
    open(target)
}

/// Fetch every branch of the mirror from `url`
pub fn fetch(repo: &Repository, url: &str) -> Result<()> {
    let source = url::for_libgit2(url);
    let mut remote = repo
        .remote_anonymous(source.as_ref())
        .map_err(|e| error::unreachable(url, &e))?;

    tracing::debug!(url, "fetching remote");
    remote
        .fetch(&[BRANCH_REFSPEC], Some(&mut fetch_options()), None)
        .map_err(|e| error::unreachable(url, &e))
}

/// Open an existing mirror
pub fn open(path: &Path) -> Result<Repository> {
    Repository::open_bare(path).map_err(|e| RegistryError::GitOperationFailed {
        message: format!("Failed to open mirror '{}': {}", path.display(), e.message()),
    })
}

/// Branch the remote's HEAD points at, if known
pub fn head_branch(repo: &Repository) -> Option<String> {
    if let Ok(reference) = repo.find_reference("refs/remotes/origin/HEAD") {
        if let Some(target) = reference.symbolic_target() {
            if let Some(branch) = target.strip_prefix("refs/remotes/origin/") {
                return Some(branch.to_string());
            }
        }
    }

    let head = repo.head().ok()?;
    if head.is_branch() {
        head.shorthand().map(str::to_string)
    } else {
        None
    }
}

/// Tip commit of an upstream branch
pub fn branch_tip<'r>(repo: &'r Repository, branch: &str) -> Option<Commit<'r>> {
    [
        format!("refs/remotes/origin/{branch}"),
        format!("refs/heads/{branch}"),
    ]
    .iter()
    .find_map(|name| repo.find_reference(name).ok()?.peel_to_commit().ok())
}

/// Names of every upstream branch in the mirror
pub fn branch_names(repo: &Repository) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for reference in repo.references_glob("refs/remotes/origin/*")? {
        let reference = reference?;
        if let Some(name) = reference
            .name()
            .and_then(|n| n.strip_prefix("refs/remotes/origin/"))
        {
            if name != "HEAD" {
                names.push(name.to_string());
            }
        }
    }
    names.sort();
    Ok(names)
}

/// Look up a commit by full or abbreviated hash
///
/// Anything that is not at least seven hex digits is rejected, so branch and
/// tag names never resolve here.
pub fn find_commit<'r>(repo: &'r Repository, revision: &str) -> Option<Commit<'r>> {
    if revision.len() < 7 || !revision.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    if revision.len() == 40 {
        let oid = Oid::from_str(revision).ok()?;
        return repo.find_commit(oid).ok();
    }
    repo.revparse_single(revision).ok()?.peel_to_commit().ok()
}
