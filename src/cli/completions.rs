use clap::Parser;

/// Arguments for completions command
#[derive(Parser, Debug)]
#[command(after_help = "EXAMPLES:\n  \
                  Generate bash completions:\n    nfcomp completions bash > ~/.bash_completion.d/nfcomp\n\n\
                  Generate zsh completions:\n    nfcomp completions zsh > ~/.zfunc/_nfcomp\n\n\
                  Generate fish completions:\n    nfcomp completions fish > ~/.config/fish/completions/nfcomp.fish")]
pub struct CompletionsArgs {
    /// Shell type (bash, elvish, fish, powershell, zsh)
    #[arg(long = "shell", short = 's', value_name = "SHELL")]
    pub shell_flag: Option<String>,

    /// Shell type, as a positional argument
    #[arg(conflicts_with = "shell_flag", required_unless_present = "shell_flag")]
    pub shell: Option<String>,
}

impl CompletionsArgs {
    /// The requested shell, whichever way it was given
    pub fn shell(&self) -> &str {
        self.shell_flag
            .as_deref()
            .or(self.shell.as_deref())
            .unwrap_or_default()
    }
}
