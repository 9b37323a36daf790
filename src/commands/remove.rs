//! Remove command CLI wrapper
//!
//! Delegates all business logic to operations/remove.rs.

use crate::cli::RemoveArgs;
use crate::component::ComponentKind;
use crate::error::Result;
use crate::operations::ProjectContext;
use crate::operations::remove::{RemoveOperation, RemoveOptions};

/// Run remove command
pub fn run(ctx: &mut ProjectContext, kind: ComponentKind, remote: String, args: RemoveArgs) -> Result<()> {
    let name = match args.name {
        Some(name) => name,
        None => ctx.choose_installed(kind, &remote)?,
    };
    let options = RemoveOptions {
        kind,
        remote,
        force: args.force,
    };
    RemoveOperation::new(ctx, options).execute(&name)?;
    Ok(())
}
