//! Command implementations for nfcomp CLI
//!
//! Each command is a thin wrapper: it opens the project, turns its
//! arguments into operation options and runs the operation.

pub mod completions;
pub mod install;
pub mod patch;
pub mod remove;
pub mod update;

use std::path::Path;

use crate::cli::{ComponentAction, ComponentArgs};
use crate::component::ComponentKind;
use crate::error::Result;
use crate::operations::ProjectContext;
use crate::remote::NF_CORE_MODULES_REMOTE;

/// Run one `modules` / `subworkflows` action in the pipeline at `dir`
pub fn run_component(dir: &Path, no_pull: bool, kind: ComponentKind, args: ComponentArgs) -> Result<()> {
    let mut ctx = ProjectContext::open(dir, no_pull, args.action.verb())?;
    let remote = args
        .git_remote
        .or_else(|| ctx.manifest.first_remote().map(str::to_string))
        .unwrap_or_else(|| NF_CORE_MODULES_REMOTE.to_string());
    tracing::debug!(remote = %remote, "selected remote");
    let branch = args.branch;

    let result = match args.action {
        ComponentAction::Install(install) => install::run(&mut ctx, kind, remote, branch, install),
        ComponentAction::Remove(remove) => remove::run(&mut ctx, kind, remote, remove),
        ComponentAction::Update(update) => update::run(&mut ctx, kind, remote, branch, update),
        ComponentAction::Patch(patch) => patch::run(&mut ctx, kind, remote, patch),
    };
    ctx.registry.shutdown();
    result
}
