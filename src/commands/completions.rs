use clap::CommandFactory;
use clap_complete::Shell;
use std::io::{self, Write};

use crate::cli::Cli;

#[derive(Debug, Clone, Copy)]
pub struct CompletionsCommand {
    pub shell: Shell,
}

impl CompletionsCommand {
    pub fn execute(self) {
        self.generate(&mut io::stdout());
    }

    fn generate<W: Write>(&self, out: &mut W) {
        let mut cmd = Cli::command();
        let app_name = cmd.get_name().to_string();
        clap_complete::generate(self.shell, &mut cmd, app_name, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generate_to_string(shell: Shell) -> String {
        let mut buffer = Vec::new();
        CompletionsCommand { shell }.generate(&mut buffer);
        String::from_utf8(buffer).unwrap_or_default()
    }

    #[test]
    fn test_bash_completion() {
        let script = generate_to_string(Shell::Bash);
        assert!(script.contains("_mfaexec()"));
        assert!(script.contains("complete -F _mfaexec"));
    }

    #[test]
    fn test_zsh_completion() {
        let script = generate_to_string(Shell::Zsh);
        assert!(script.contains("#compdef mfaexec"));
    }

    #[test]
    fn test_fish_completion() {
        let script = generate_to_string(Shell::Fish);
        assert!(script.contains("complete -c mfaexec"));
    }

    #[test]
    fn test_completion_contains_global_options() {
        let script = generate_to_string(Shell::Bash);
        assert!(script.contains("--verbose"));
        assert!(script.contains("--completions"));
    }
}
