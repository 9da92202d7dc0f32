use anyhow::Result;
use clap::{ArgAction, Parser};
use clap_complete::Shell;

use crate::commands::{BrokerCommand, CompletionsCommand};

#[derive(Debug, Clone, Parser)]
#[command(
    name = "mfaexec",
    version,
    about = "Obtain MFA-gated AWS credentials, assume a role, and print or exec with them",
    long_about = "Obtain MFA-gated AWS session credentials (cached in ~/.aws/credcache.json), \
                  assume the role named by AWS_ASSUME_ROLE, then either print shell export \
                  statements or run COMMAND with the role credentials in its environment."
)]
pub struct Cli {
    #[arg(short = 'v', long, action = ArgAction::Count, help = "Increase verbosity (-v debug, -vv trace)")]
    pub verbose: u8,

    #[arg(
        long,
        value_enum,
        value_name = "SHELL",
        exclusive = true,
        help = "Print a shell completion script and exit"
    )]
    pub completions: Option<Shell>,

    #[arg(
        trailing_var_arg = true,
        allow_hyphen_values = true,
        value_name = "COMMAND",
        help = "Program to run with the role credentials, followed by its arguments"
    )]
    pub command: Vec<String>,
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        match self.completions {
            Some(shell) => {
                CompletionsCommand { shell }.execute();
                Ok(())
            }
            None => {
                BrokerCommand {
                    command: self.command,
                }
                .execute()
                .await
            }
        }
    }
}
