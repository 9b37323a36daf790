use clap::Parser;

/// Arguments for the remove command
#[derive(Parser, Debug)]
#[command(after_help = "EXAMPLES:\n  \
                  Remove a module:\n    nfcomp modules remove fastqc\n\n\
                  Remove a subworkflow and the modules only it needed:\n    nfcomp subworkflows remove bam_stats_samtools\n\n\
                  Remove even if the pipeline still includes it:\n    nfcomp modules remove fastqc --force")]
pub struct RemoveArgs {
    /// Component name (`tool` or `tool/subtool`); asked for when omitted
    pub name: Option<String>,

    /// Do not ask when pipeline scripts still include the component
    #[arg(long, short = 'f')]
    pub force: bool,
}
