//! Shell completions command

use clap::CommandFactory;

use crate::cli::CompletionsArgs;
use crate::error::{RegistryError, Result};

fn parse_shell(name: &str) -> Option<clap_complete::Shell> {
    match name.to_lowercase().as_str() {
        "bash" => Some(clap_complete::Shell::Bash),
        "elvish" => Some(clap_complete::Shell::Elvish),
        "fish" => Some(clap_complete::Shell::Fish),
        "powershell" | "pwsh" => Some(clap_complete::Shell::PowerShell),
        "zsh" => Some(clap_complete::Shell::Zsh),
        _ => None,
    }
}

/// Generate shell completions
pub fn run(args: CompletionsArgs) -> Result<()> {
    let shell = parse_shell(args.shell()).ok_or_else(|| RegistryError::ConfigInvalid {
        path: "--shell".to_string(),
        reason: format!(
            "unknown shell '{}', expected one of bash, elvish, fish, powershell, zsh",
            args.shell()
        ),
    })?;

    let mut cmd = <crate::cli::Cli as CommandFactory>::command();
    clap_complete::generate(shell, &mut cmd, "nfcomp", &mut std::io::stdout().lock());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    macro_rules! test_shell {
        ($test_name:ident, $shell:expr) => {
            #[test]
            fn $test_name() {
                let args = CompletionsArgs {
                    shell_flag: Some($shell.to_string()),
                    shell: None,
                };
                assert!(run(args).is_ok());
            }
        };
    }

    test_shell!(test_completions_bash, "bash");
    test_shell!(test_completions_fish, "fish");
    test_shell!(test_completions_pwsh, "pwsh");
    test_shell!(test_completions_mixed_case, "Zsh");

    #[test]
    fn test_completions_positional() {
        let args = CompletionsArgs {
            shell_flag: None,
            shell: Some("elvish".to_string()),
        };
        assert!(run(args).is_ok());
    }

    #[test]
    fn test_unknown_shell() {
        let args = CompletionsArgs {
            shell_flag: Some("tcsh".to_string()),
            shell: None,
        };
        assert!(matches!(run(args), Err(RegistryError::ConfigInvalid { .. })));
    }
}
