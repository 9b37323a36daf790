//! Patch command CLI wrapper

use crate::cli::PatchArgs;
use crate::component::ComponentKind;
use crate::error::Result;
use crate::operations::ProjectContext;
use crate::operations::patch::{PatchOperation, PatchOptions};

/// Run patch command
pub fn run(ctx: &mut ProjectContext, kind: ComponentKind, remote: String, args: PatchArgs) -> Result<()> {
    let name = match args.name {
        Some(name) => name,
        None => ctx.choose_installed(kind, &remote)?,
    };
    let options = PatchOptions {
        kind,
        remote,
        remove: args.remove,
    };
    PatchOperation::new(ctx, options).execute(&name)?;
    Ok(())
}
