//! nfcomp - pipeline component manager
//!
//! Installs modules and subworkflows from git remotes into a pipeline,
//! records them in `modules.json` and carries local modifications across
//! updates as patches.

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cache;
mod cli;
mod commands;
mod component;
mod config;
mod error;
mod files;
mod git;
mod hash;
mod manifest;
mod operations;
mod patch;
mod paths;
mod remote;
mod resolver;
mod ui;

#[cfg(test)]
mod test_fixtures;

use cli::{Cli, Commands};
use component::ComponentKind;

/// Log to stderr so stdout only carries what the user asked to see
fn init_tracing(verbose: bool) {
    let default = if verbose { "nfcomp=debug" } else { "nfcomp=info" };
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| default.into()),
    );

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(verbose)
                .without_time(),
        )
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Modules(args) => commands::run_component(&cli.dir, cli.no_pull, ComponentKind::Module, args),
        Commands::Subworkflows(args) => {
            commands::run_component(&cli.dir, cli.no_pull, ComponentKind::Subworkflow, args)
        }
        Commands::Completions(args) => commands::completions::run(args),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        if let error::RegistryError::ComponentFailures { failures } = &e {
            for failure in failures {
                eprintln!("  - {}", failure);
            }
        }
        std::process::exit(e.exit_code());
    }
}
