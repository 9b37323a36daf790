//! Output for users: diffs, include statements, references
//!
//! Diagnostics go through `tracing`; what the user asked to see goes to
//! stdout from here.

use console::Style;

use crate::component::ComponentId;
use crate::patch::PatchDocument;
use crate::paths::ProjectPaths;

/// `include { FASTQC } from '../modules/nf-core/fastqc/main'`
pub fn include_statement(id: &ComponentId) -> String {
    format!(
        "include {{ {} }} from '{}'",
        id.include_name(),
        ProjectPaths::include_path(id)
    )
}

/// Tell the user how to use a freshly installed component
pub fn print_include_hint(id: &ComponentId) {
    println!(
        "Use the following statement to include this {}:\n\n {}\n",
        id.kind.singular(),
        Style::new().green().apply_to(include_statement(id))
    );
}

fn line_style(line: &str) -> Style {
    if line.starts_with("diff --git") || line.starts_with("--- ") || line.starts_with("+++ ") {
        Style::new().bold()
    } else if line.starts_with("@@") {
        Style::new().cyan()
    } else if line.starts_with('+') {
        Style::new().green()
    } else if line.starts_with('-') {
        Style::new().red()
    } else if line.starts_with("Binary files") || line.starts_with("Changes in") {
        Style::new().yellow()
    } else {
        Style::new()
    }
}

/// Print a patch document with colours
pub fn print_patch(doc: &PatchDocument) {
    for line in doc.render_lossy().lines() {
        println!("{}", line_style(line).apply_to(line));
    }
}

/// List the pipeline files that still include a component
pub fn print_references(id: &ComponentId, references: &[(String, usize)]) {
    println!(
        "{} '{}' is included in:",
        Style::new().bold().yellow().apply_to(id.kind.title()),
        id
    );
    for (file, line) in references {
        println!("  {file}:{line}");
    }
}
