//! Operations on the components of a project
//!
//! Each operation borrows a [`ProjectContext`] and coordinates:
//! - RemoteRepo: revisions and pristine files (from the remote module)
//! - Manifest: entries, ownership edges and patches (from the manifest module)
//! - PatchEngine: diffs and their application (from the patch module)
//! - Resolver: subworkflow dependencies (from the resolver module)
//! - UI: prompts, diffs and include hints (from the ui module)

pub mod context;
pub mod install;
pub mod patch;
pub mod references;
pub mod remove;
pub mod summary;
pub mod update;

pub use context::ProjectContext;
pub use summary::Summary;

use crate::component::ComponentKind;
use crate::error::{RegistryError, Result};
use crate::remote::{CommitInfo, RemoteRepo, short_rev};
use crate::ui::Prompter;

/// Commits shown per page when choosing a revision
const REVISION_PAGE: usize = 10;

/// How the revision to install or update to is chosen
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RevisionSelector {
    /// Newest commit touching the component on the branch
    #[default]
    Latest,
    /// A given, possibly abbreviated, commit
    Exact(String),
    /// Ask the user, paging through the component's history
    Interactive,
}

impl RevisionSelector {
    /// From the `--sha` and `--prompt` flags
    pub fn from_flags(sha: Option<&str>, prompt: bool) -> Self {
        match (sha, prompt) {
            (Some(sha), _) => RevisionSelector::Exact(sha.to_string()),
            (None, true) => RevisionSelector::Interactive,
            (None, false) => RevisionSelector::Latest,
        }
    }

    /// Selector for the dependencies of a component installed with `self`
    ///
    /// An exact revision is shared with the dependencies; otherwise each
    /// dependency takes its own newest revision.
    pub fn for_dependencies(&self) -> Self {
        match self {
            RevisionSelector::Exact(revision) => RevisionSelector::Exact(revision.clone()),
            _ => RevisionSelector::Latest,
        }
    }
}

/// Full hash of the revision `selector` picks on `branch`
///
/// `installed` is marked when the user chooses interactively.
pub fn select_revision(
    remote: &RemoteRepo,
    prompter: &mut dyn Prompter,
    kind: ComponentKind,
    name: &str,
    branch: &str,
    selector: &RevisionSelector,
    installed: Option<&str>,
) -> Result<String> {
    match selector {
        RevisionSelector::Latest => Ok(remote.latest(kind, name, branch)?.revision),
        RevisionSelector::Exact(revision) => {
            let unknown = || RegistryError::RevisionUnknown {
                url: remote.url().to_string(),
                revision: revision.clone(),
            };
            if !remote.exists(revision) {
                return Err(unknown());
            }
            let full = remote.resolve(revision)?;
            if !remote.exists_on_branch(&full, branch)? {
                return Err(unknown());
            }
            Ok(full)
        }
        RevisionSelector::Interactive => choose_revision(remote, prompter, kind, name, branch, installed),
    }
}

fn revision_label(info: &CommitInfo, installed: Option<&str>) -> String {
    let marker = if installed == Some(info.revision.as_str()) {
        " (installed)"
    } else {
        ""
    };
    format!("{} {} {}{}", info.short(), info.day(), info.summary, marker)
}

fn choose_revision(
    remote: &RemoteRepo,
    prompter: &mut dyn Prompter,
    kind: ComponentKind,
    name: &str,
    branch: &str,
    installed: Option<&str>,
) -> Result<String> {
    let mut log = remote.commit_log(kind, name, branch)?;
    let mut first_page = true;
    loop {
        let page: Vec<CommitInfo> = log.by_ref().take(REVISION_PAGE).collect::<Result<_>>()?;
        if page.is_empty() {
            if first_page {
                return Err(RegistryError::ComponentUnknown {
                    kind: kind.title().to_string(),
                    name: name.to_string(),
                    location: format!("in '{}' ({})", remote.url(), branch),
                });
            }
            log.restart()?;
            first_page = true;
            continue;
        }
        first_page = false;

        let mut options: Vec<String> = page.iter().map(|info| revision_label(info, installed)).collect();
        if page.len() == REVISION_PAGE {
            options.push("older commits".to_string());
        }
        let message = format!("Select {} revision of '{}'", kind.singular(), name);
        let choice = prompter.select(&message, &options)?;
        if let Some(info) = page.get(choice) {
            tracing::debug!(revision = %short_rev(&info.revision), "revision chosen");
            return Ok(info.revision.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CACHE_DIR_ENV;
    use crate::test_fixtures::FixtureRemote;
    use crate::ui::prompt::ScriptedPrompter;
    use serial_test::serial;
    use tempfile::TempDir;

    fn open(fixture: &FixtureRemote, cache: &TempDir) -> RemoteRepo {
        // SAFETY: tests touching the variable are serialised
        unsafe { std::env::set_var(CACHE_DIR_ENV, cache.path()) };
        RemoteRepo::open(&fixture.url(), None, false, "nf-core").unwrap()
    }

    #[test]
    fn test_selector_from_flags() {
        assert_eq!(
            RevisionSelector::from_flags(Some("abc"), true),
            RevisionSelector::Exact("abc".to_string())
        );
        assert_eq!(RevisionSelector::from_flags(None, true), RevisionSelector::Interactive);
        assert_eq!(RevisionSelector::from_flags(None, false), RevisionSelector::Latest);
        assert_eq!(RevisionSelector::Interactive.for_dependencies(), RevisionSelector::Latest);
    }

    #[test]
    #[serial]
    fn test_exact_revision_is_resolved() {
        let fixture = FixtureRemote::standard();
        let first = fixture.repo.head().unwrap().peel_to_commit().unwrap().id().to_string();
        fixture.write_module("fastqc", "FASTQC_V2");
        fixture.commit("Bump fastqc");
        let cache = TempDir::new().unwrap();
        let remote = open(&fixture, &cache);
        let mut prompter = ScriptedPrompter::default();

        let selected = select_revision(
            &remote,
            &mut prompter,
            ComponentKind::Module,
            "fastqc",
            "main",
            &RevisionSelector::Exact(first[..7].to_string()),
            None,
        )
        .unwrap();
        assert_eq!(selected, first);

        let err = select_revision(
            &remote,
            &mut prompter,
            ComponentKind::Module,
            "fastqc",
            "main",
            &RevisionSelector::Exact("0000000".to_string()),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, RegistryError::RevisionUnknown { .. }));
    }

    #[test]
    #[serial]
    fn test_interactive_choice_pages_history() {
        let fixture = FixtureRemote::standard();
        for i in 0..11 {
            fixture.write("modules/nf-core/fastqc/main.nf", &format!("process FASTQC_{i} {{}}\n"));
            fixture.commit(&format!("fastqc {i}"));
        }
        let cache = TempDir::new().unwrap();
        let remote = open(&fixture, &cache);

        // "older commits" on the first page, then the second entry of the next one
        let mut prompter = ScriptedPrompter::default();
        prompter.selections.extend([REVISION_PAGE, 1]);
        let selected = select_revision(
            &remote,
            &mut prompter,
            ComponentKind::Module,
            "fastqc",
            "main",
            &RevisionSelector::Interactive,
            None,
        )
        .unwrap();
        // newest first: page one holds fastqc 10..=1, page two fastqc 0 and the initial commit
        let initial = remote.commit_log(ComponentKind::Module, "fastqc", "main").unwrap().last().unwrap().unwrap();
        assert_eq!(selected, initial.revision);
        assert_eq!(prompter.asked.len(), 2);
    }
}
