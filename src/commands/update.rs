//! Update command CLI wrapper
//!
//! Delegates all business logic to operations/update.rs.

use console::Style;

use crate::cli::UpdateArgs;
use crate::component::ComponentKind;
use crate::error::Result;
use crate::operations::update::{UpdateMode, UpdateOperation, UpdateOptions, UpdateOutcome};
use crate::operations::{ProjectContext, RevisionSelector};

impl From<&UpdateArgs> for UpdateMode {
    fn from(args: &UpdateArgs) -> Self {
        match (&args.save_diff, args.show_diff) {
            (Some(path), _) => UpdateMode::WriteDiffFile(path.clone()),
            (None, true) => UpdateMode::Preview,
            (None, false) => UpdateMode::Apply,
        }
    }
}

fn print_summary(outcomes: &[UpdateOutcome]) {
    let updated: Vec<String> = outcomes
        .iter()
        .filter_map(|outcome| match outcome {
            UpdateOutcome::Updated { id, .. } => Some(id.to_string()),
            _ => None,
        })
        .collect();
    if updated.is_empty() {
        return;
    }
    println!(
        "{} {}",
        Style::new().green().bold().apply_to("Updated:"),
        updated.join(", ")
    );
}

/// Run update command
pub fn run(
    ctx: &mut ProjectContext,
    kind: ComponentKind,
    remote: String,
    branch: Option<String>,
    args: UpdateArgs,
) -> Result<()> {
    let name = match (&args.name, args.all) {
        (_, true) => None,
        (Some(name), false) => Some(name.clone()),
        (None, false) => Some(ctx.choose_installed(kind, &remote)?),
    };
    let options = UpdateOptions {
        kind,
        remote,
        branch,
        selector: RevisionSelector::from_flags(args.sha.as_deref(), args.prompt),
        force: args.force,
        mode: UpdateMode::from(&args),
        update_deps: args.update_deps,
    };
    let outcomes = UpdateOperation::new(ctx, options).execute(name.as_deref())?;
    print_summary(&outcomes);
    Ok(())
}
