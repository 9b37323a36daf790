//! Per-component commit history
//!
//! [`CommitLog`] walks a branch from its tip in reverse chronological order
//! and yields only the commits that change the component's subtree. It is
//! lazy: nothing past the last consumed commit is read.

use std::path::{Path, PathBuf};

use git2::{Commit, Oid, Repository, Revwalk, Sort};
use jiff::Timestamp;

use crate::error::Result;

/// One commit that touched a component
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitInfo {
    /// Full commit hash
    pub revision: String,
    /// Committer time
    pub date: Timestamp,
    /// First line of the commit message
    pub summary: String,
}

impl CommitInfo {
    pub(crate) fn from_commit(commit: &Commit<'_>) -> Self {
        let date = Timestamp::from_second(commit.time().seconds()).unwrap_or(Timestamp::UNIX_EPOCH);
        Self {
            revision: commit.id().to_string(),
            date,
            summary: commit.summary().unwrap_or_default().trim().to_string(),
        }
    }

    /// Calendar date of the commit (UTC)
    pub fn day(&self) -> String {
        self.date.strftime("%Y-%m-%d").to_string()
    }

    /// Seven-character abbreviation
    pub fn short(&self) -> &str {
        &self.revision[..self.revision.len().min(7)]
    }
}

/// Lazy, restartable iterator over the commits touching one path
pub struct CommitLog<'r> {
    repo: &'r Repository,
    walk: Revwalk<'r>,
    tip: Oid,
    path: PathBuf,
}

impl<'r> CommitLog<'r> {
    pub(crate) fn new(repo: &'r Repository, tip: Oid, path: impl Into<PathBuf>) -> Result<Self> {
        let walk = Self::walk_from(repo, tip)?;
        Ok(Self {
            repo,
            walk,
            tip,
            path: path.into(),
        })
    }

    fn walk_from(repo: &'r Repository, tip: Oid) -> Result<Revwalk<'r>> {
        let mut walk = repo.revwalk()?;
        walk.set_sorting(Sort::TOPOLOGICAL | Sort::TIME)?;
        walk.push(tip)?;
        Ok(walk)
    }

    /// Start again from the branch tip
    pub fn restart(&mut self) -> Result<()> {
        self.walk = Self::walk_from(self.repo, self.tip)?;
        Ok(())
    }

    fn touches(&self, commit: &Commit<'_>) -> Result<bool> {
        let current = subtree_id(commit, &self.path)?;
        if commit.parent_count() == 0 {
            return Ok(current.is_some());
        }
        // A commit touches the path unless it matches one of its parents
        for parent in commit.parents() {
            if subtree_id(&parent, &self.path)? == current {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

impl Iterator for CommitLog<'_> {
    type Item = Result<CommitInfo>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let oid = match self.walk.next()? {
                Ok(oid) => oid,
                Err(e) => return Some(Err(e.into())),
            };
            let commit = match self.repo.find_commit(oid) {
                Ok(commit) => commit,
                Err(e) => return Some(Err(e.into())),
            };
            match self.touches(&commit) {
                Ok(true) => return Some(Ok(CommitInfo::from_commit(&commit))),
                Ok(false) => continue,
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

/// Object id of the tree entry at `path`, if present
pub(crate) fn subtree_id(commit: &Commit<'_>, path: &Path) -> Result<Option<Oid>> {
    let tree = commit.tree()?;
    match tree.get_path(path) {
        Ok(entry) => Ok(Some(entry.id())),
        Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}
