//! CLI definitions using clap derive API
//!
//! This module is organized into submodules for each command's argument types:
//! - component: the `modules` / `subworkflows` prefix and its shared flags
//! - install, remove, update, patch: per-action arguments
//! - completions: Completions command arguments

use clap::builder::{Styles, styling::AnsiColor};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub mod completions;
pub mod component;
pub mod install;
pub mod patch;
pub mod remove;
pub mod update;

pub use completions::CompletionsArgs;
pub use component::{ComponentAction, ComponentArgs};
pub use install::InstallArgs;
pub use patch::PatchArgs;
pub use remove::RemoveArgs;
pub use update::UpdateArgs;

/// nfcomp - pipeline component manager
///
/// Install, update, patch and remove modules and subworkflows from git remotes.
#[derive(Parser, Debug)]
#[command(
    name = "nfcomp",
    author,
    version,
    color = clap::ColorChoice::Always,
    styles = Styles::styled()
        .header(AnsiColor::Green.on_default().bold())
        .usage(AnsiColor::Green.on_default().bold())
        .literal(AnsiColor::Cyan.on_default().bold())
        .placeholder(AnsiColor::Cyan.on_default()),
    about = "Manage the modules and subworkflows of a pipeline",
    long_about = "nfcomp installs modules and subworkflows from git remotes into a pipeline, \
                  records them in modules.json and keeps local modifications as patches \
                  across updates.",
    after_help = "\x1b[1m\x1b[32mExamples:\x1b[0m\n   \
                  nfcomp modules install fastqc                 \x1b[90m# Install from nf-core/modules\x1b[0m\n   \
                  nfcomp subworkflows install bam_stats_samtools \x1b[90m# Install with its modules\x1b[0m\n   \
                  nfcomp modules update --all --show-diff       \x1b[90m# Review every update\x1b[0m\n   \
                  nfcomp modules patch fastqc                   \x1b[90m# Record local changes\x1b[0m\n   \
                  nfcomp modules remove fastqc                  \x1b[90m# Remove a module\x1b[0m\n\n\
                  "
)]
pub struct Cli {
    /// Pipeline directory (defaults to current directory)
    #[arg(long, short = 'd', global = true, env = "NFCOMP_DIR", default_value = ".")]
    pub dir: PathBuf,

    /// Enable verbose output
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Use the local mirrors of the remotes without fetching
    #[arg(long, global = true)]
    pub no_pull: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage modules
    Modules(ComponentArgs),

    /// Manage subworkflows
    Subworkflows(ComponentArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}
