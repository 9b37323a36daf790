use clap::Parser;
use std::path::PathBuf;

/// Arguments for the update command
#[derive(Parser, Debug)]
#[command(after_help = "EXAMPLES:\n  \
                  Update one module:\n    nfcomp modules update fastqc\n\n\
                  Update every module, reviewing each change:\n    nfcomp modules update --all --show-diff\n\n\
                  Write the changes to a file instead:\n    nfcomp modules update --all --save-diff changes.diff\n\n\
                  Update a subworkflow and everything it includes:\n    nfcomp subworkflows update bam_stats_samtools --update-deps")]
pub struct UpdateArgs {
    /// Component name (`tool` or `tool/subtool`); asked for unless `--all` is given
    #[arg(conflicts_with = "all")]
    pub name: Option<String>,

    /// Update every installed component of this kind
    #[arg(long, short = 'a')]
    pub all: bool,

    /// Update to this commit instead of the newest one
    #[arg(long, short = 's', conflicts_with = "prompt")]
    pub sha: Option<String>,

    /// Choose the revision interactively
    #[arg(long, short = 'p')]
    pub prompt: bool,

    /// Rewrite components already at the target revision
    #[arg(long, short = 'f')]
    pub force: bool,

    /// Show the changes and ask before applying them
    #[arg(long, short = 'x', visible_alias = "preview", overrides_with = "no_show_diff")]
    pub show_diff: bool,

    /// Apply the changes without showing them
    #[arg(long, overrides_with = "show_diff")]
    pub no_show_diff: bool,

    /// Write the changes to FILE instead of applying them
    #[arg(long, short = 'D', value_name = "FILE", conflicts_with = "show_diff")]
    pub save_diff: Option<PathBuf>,

    /// Also update the components an updated subworkflow includes
    #[arg(long, short = 'u')]
    pub update_deps: bool,
}

#[cfg(test)]
mod tests {
    use crate::cli::{Cli, Commands, ComponentAction, UpdateArgs};
    use clap::Parser;
    use std::path::PathBuf;

    fn parse(args: &[&str]) -> UpdateArgs {
        let mut argv = vec!["nfcomp", "modules", "update"];
        argv.extend_from_slice(args);
        let cli = Cli::try_parse_from(argv).unwrap();
        let Commands::Modules(component) = cli.command else {
            panic!("Expected Modules command");
        };
        let ComponentAction::Update(update) = component.action else {
            panic!("Expected Update action");
        };
        update
    }

    #[test]
    fn test_update_all_with_diff_file() {
        let args = parse(&["--all", "--save-diff", "changes.diff"]);
        assert!(args.all);
        assert_eq!(args.name, None);
        assert_eq!(args.save_diff, Some(PathBuf::from("changes.diff")));
    }

    #[test]
    fn test_last_diff_flag_wins() {
        let args = parse(&["fastqc", "--show-diff", "--no-show-diff"]);
        assert!(!args.show_diff);
        assert!(args.no_show_diff);
    }

    #[test]
    fn test_name_conflicts_with_all() {
        let args = parse(&[]);
        assert_eq!(args.name, None);
        assert!(!args.all);
        assert!(Cli::try_parse_from(["nfcomp", "modules", "update", "fastqc", "--all"]).is_err());
    }
}
