use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "poetry-duet",
    about = "Two LLM agents write a poetic dialogue; a third provider critiques it"
)]
pub struct CliArgs {
    #[arg(long, short = 'c', global = true)]
    pub config: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a session described by a TOML file and print the result as JSON.
    Run {
        session: PathBuf,
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
        /// Do not print turn progress to stderr.
        #[arg(long, short = 'q')]
        quiet: bool,
    },
    /// List a provider's models.
    Models {
        provider: String,
        #[arg(long)]
        gateway: bool,
        #[arg(long, short = 's')]
        search: Option<String>,
    },
    /// Send a tiny prompt to one model and report whether it answered.
    Check {
        provider: String,
        model: String,
        #[arg(long)]
        gateway: bool,
    },
}

impl Command {
    pub fn routing(&self) -> poetry_duet::RoutingMode {
        match self {
            Command::Models { gateway: true, .. } | Command::Check { gateway: true, .. } => {
                poetry_duet::RoutingMode::Gateway
            }
            _ => poetry_duet::RoutingMode::Direct,
        }
    }
}
