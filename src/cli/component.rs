use clap::{Parser, Subcommand};

use super::{InstallArgs, PatchArgs, RemoveArgs, UpdateArgs};

/// Arguments shared by every action on one component kind
#[derive(Parser, Debug)]
pub struct ComponentArgs {
    /// Remote git repository to take components from
    ///
    /// Defaults to the first remote in modules.json, else nf-core/modules.
    #[arg(long, short = 'g', global = true, env = "NFCOMP_GIT_REMOTE")]
    pub git_remote: Option<String>,

    /// Branch of the remote (defaults to the remote's default branch)
    #[arg(long, short = 'b', global = true)]
    pub branch: Option<String>,

    #[command(subcommand)]
    pub action: ComponentAction,
}

#[derive(Subcommand, Debug)]
pub enum ComponentAction {
    /// Install a component and what it includes
    Install(InstallArgs),

    /// Remove a component and what only it needed
    Remove(RemoveArgs),

    /// Update installed components, keeping their patches
    Update(UpdateArgs),

    /// Record the local changes of a component as a patch
    Patch(PatchArgs),
}

impl ComponentAction {
    /// Verb used in messages and checks
    pub fn verb(&self) -> &'static str {
        match self {
            ComponentAction::Install(_) => "install",
            ComponentAction::Remove(_) => "remove",
            ComponentAction::Update(_) => "update",
            ComponentAction::Patch(_) => "patch",
        }
    }
}
