pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

#[derive(Parser)]
#[command(name = "lifeos")]
#[command(about = "LifeOS admin CLI - migrations, one-off jobs and maintenance")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in human-readable text format")]
    pub text: bool,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Apply pending database migrations")]
    Migrate,

    #[command(about = "Run background jobs by hand")]
    Job {
        #[command(subcommand)]
        cmd: commands::job::JobCommands,
    },

    #[command(about = "Print an Argon2 hash for a password")]
    HashPassword {
        #[arg(help = "Plain-text password")]
        password: String,
    },

    #[command(about = "Inspect the effective configuration")]
    Config {
        #[command(subcommand)]
        cmd: commands::config::ConfigCommands,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);

    match cli.command {
        Commands::Migrate => commands::migrate::handle(output_format).await,
        Commands::Job { cmd } => commands::job::handle(cmd, output_format).await,
        Commands::HashPassword { password } => commands::password::handle(&password, output_format),
        Commands::Config { cmd } => commands::config::handle(cmd, output_format),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::JobKind;

    #[test]
    fn parses_job_run() {
        let cli = Cli::try_parse_from(["lifeos", "--json", "job", "run", "scores"]).unwrap();
        assert!(matches!(OutputFormat::from_cli(&cli), OutputFormat::Json));
        match cli.command {
            Commands::Job {
                cmd: commands::job::JobCommands::Run { job },
            } => assert_eq!(job, JobKind::Scores),
            _ => panic!("expected job run"),
        }
    }

    #[test]
    fn parses_net_worth_job() {
        let cli = Cli::try_parse_from(["lifeos", "job", "run", "net-worth"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Job {
                cmd: commands::job::JobCommands::Run { job: JobKind::NetWorth }
            }
        ));
    }

    #[test]
    fn rejects_unknown_job() {
        assert!(Cli::try_parse_from(["lifeos", "job", "run", "backups"]).is_err());
    }

    #[test]
    fn parses_hash_password_and_config() {
        let cli = Cli::try_parse_from(["lifeos", "hash-password", "hunter22"]).unwrap();
        assert!(matches!(cli.command, Commands::HashPassword { ref password } if password == "hunter22"));

        let cli = Cli::try_parse_from(["lifeos", "config", "show"]).unwrap();
        assert!(matches!(OutputFormat::from_cli(&cli), OutputFormat::Text));
        assert!(matches!(cli.command, Commands::Config { .. }));
    }
}
