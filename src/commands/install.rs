//! Install command CLI wrapper
//!
//! Delegates all business logic to operations/install.rs.

use crate::cli::InstallArgs;
use crate::component::ComponentKind;
use crate::error::Result;
use crate::operations::install::{InstallOperation, InstallOptions};
use crate::operations::{ProjectContext, RevisionSelector};

impl InstallOptions {
    fn from_args(kind: ComponentKind, remote: String, branch: Option<String>, args: &InstallArgs) -> Self {
        Self {
            kind,
            remote,
            branch,
            selector: RevisionSelector::from_flags(args.sha.as_deref(), args.prompt),
            force: args.force,
        }
    }
}

/// Run install command
pub fn run(
    ctx: &mut ProjectContext,
    kind: ComponentKind,
    remote: String,
    branch: Option<String>,
    args: InstallArgs,
) -> Result<()> {
    let name = match args.name.clone() {
        Some(name) => name,
        None => ctx.choose_available(kind, &remote, branch.as_deref())?,
    };
    let options = InstallOptions::from_args(kind, remote, branch, &args);
    InstallOperation::new(ctx, options).execute(&name)?;
    Ok(())
}
