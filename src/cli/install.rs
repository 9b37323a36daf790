use clap::Parser;

/// Arguments for the install command
#[derive(Parser, Debug)]
#[command(after_help = "EXAMPLES:\n  \
                   Install the newest revision:\n    nfcomp modules install fastqc\n\n\
                   Install a given revision:\n    nfcomp modules install fastqc --sha 3b8f1a7\n\n\
                   Choose the revision from the history:\n    nfcomp modules install samtools/sort --prompt\n\n\
                   Install from another remote:\n    nfcomp modules --git-remote https://github.com/acme/modules.git install tool\n\n\
                   Reinstall over local changes:\n    nfcomp modules install fastqc --force")]
pub struct InstallArgs {
    /// Component name (`tool` or `tool/subtool`); asked for when omitted
    pub name: Option<String>,

    /// Install this commit instead of the newest one
    #[arg(long, short = 's', conflicts_with = "prompt")]
    pub sha: Option<String>,

    /// Choose the revision interactively
    #[arg(long, short = 'p')]
    pub prompt: bool,

    /// Reinstall even if already installed
    #[arg(long, short = 'f')]
    pub force: bool,
}
