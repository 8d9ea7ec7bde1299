//! Secrets file management

use clap::{Args, Subcommand};
use harvest_core::Secrets;

/// Secrets file commands
#[derive(Args, Debug)]
pub struct SecretsArgs {
    #[command(subcommand)]
    pub command: SecretsCommand,
}

#[derive(Subcommand, Debug)]
pub enum SecretsCommand {
    /// Write a template secrets file with owner-only permissions
    Init,

    /// Show where the secrets file is read from
    Path,
}

impl SecretsArgs {
    pub fn execute(&self) -> anyhow::Result<()> {
        match self.command {
            SecretsCommand::Init => {
                let path = Secrets::create_template()?;
                println!("Created {}", path.display());
                println!("Fill in [github] username and token before running harvest.");
            }
            SecretsCommand::Path => match Secrets::default_secrets_path() {
                Some(path) => println!("{}", path.display()),
                None => anyhow::bail!("Could not determine secrets path"),
            },
        }

        Ok(())
    }
}
