//! Shared remote mirrors for the lifetime of one command
//!
//! Each remote URL is opened (cloned or fetched) at most once per command;
//! every later lookup reuses the same [`RemoteRepo`].

use std::collections::HashMap;

use super::RemoteRepo;
use crate::error::Result;
use crate::ui::{ProgressReporter, SilentProgressReporter};

/// Remote mirrors keyed by URL
pub struct RemoteRegistry {
    remotes: HashMap<String, RemoteRepo>,
    no_pull: bool,
    fallback_org: String,
    progress: Box<dyn ProgressReporter>,
}

impl RemoteRegistry {
    /// Start with no open remotes
    ///
    /// `no_pull` skips fetching mirrors that already exist. `fallback_org`
    /// is the project's `org_path`, used for remotes that do not declare one.
    pub fn new(no_pull: bool, fallback_org: impl Into<String>) -> Self {
        Self {
            remotes: HashMap::new(),
            no_pull,
            fallback_org: fallback_org.into(),
            progress: Box::new(SilentProgressReporter),
        }
    }

    /// Report clones and fetches through `progress`
    pub fn with_progress(mut self, progress: Box<dyn ProgressReporter>) -> Self {
        self.progress = progress;
        self
    }

    /// The remote for `url`, opening it on first use
    ///
    /// `branch` only selects the default branch when the remote is first
    /// opened; later requests for another branch are verified against the
    /// same mirror.
    pub fn get(&mut self, url: &str, branch: Option<&str>) -> Result<&RemoteRepo> {
        if !self.remotes.contains_key(url) {
            self.progress.start(&format!("Fetching {url}"));
            let remote = match RemoteRepo::open(url, branch, self.no_pull, &self.fallback_org) {
                Ok(remote) => remote,
                Err(e) => {
                    self.progress.abandon();
                    return Err(e);
                }
            };
            self.progress.finish();
            self.remotes.insert(url.to_string(), remote);
        }
        let remote = &self.remotes[url];
        if let Some(branch) = branch {
            if branch != remote.branch() {
                remote.verify_branch(branch)?;
            }
        }
        Ok(remote)
    }

    /// Number of open remotes
    pub fn len(&self) -> usize {
        self.remotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.remotes.is_empty()
    }

    /// Close every mirror
    pub fn shutdown(self) {
        tracing::debug!(remotes = self.len(), "closing registry");
        for url in self.remotes.keys() {
            tracing::trace!(url, "closing remote");
        }
    }
}
