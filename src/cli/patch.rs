use clap::Parser;

/// Arguments for the patch command
#[derive(Parser, Debug)]
#[command(after_help = "EXAMPLES:\n  \
                  Record local changes:\n    nfcomp modules patch fastqc\n\n\
                  Undo the recorded changes:\n    nfcomp modules patch fastqc --remove")]
pub struct PatchArgs {
    /// Component name (`tool` or `tool/subtool`); asked for when omitted
    pub name: Option<String>,

    /// Revert the component to its pristine files and drop the patch
    #[arg(long, short = 'r')]
    pub remove: bool,
}
