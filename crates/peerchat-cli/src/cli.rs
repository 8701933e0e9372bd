//! Command-line interface definitions and parsing

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<String>,

    /// Override the local display name
    #[arg(short, long)]
    pub name: Option<String>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Start the interactive chat prompt
    Chat,
    /// Run one discovery round, print the session snapshot and exit
    Status {
        /// Seconds to wait for discoveries before printing
        #[arg(short, long, default_value_t = 1)]
        wait: u64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_chat_with_overrides() {
        let cli = Cli::parse_from(["peerchat", "-v", "--name", "morgan", "chat"]);
        assert!(cli.verbose);
        assert_eq!(cli.name.as_deref(), Some("morgan"));
        assert_eq!(cli.command, Commands::Chat);
    }

    #[test]
    fn test_parse_status_default_wait() {
        let cli = Cli::parse_from(["peerchat", "--config", "peerchat.toml", "status"]);
        assert_eq!(cli.config.as_deref(), Some("peerchat.toml"));
        assert_eq!(cli.command, Commands::Status { wait: 1 });
    }
}
