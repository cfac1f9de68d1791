use crate::utils::error::Result;
use crate::utils::validation::{validate_path, Validate};
use clap::{Parser, Subcommand};

#[derive(Debug, Clone, Parser)]
#[command(name = "group-text")]
#[command(about = "Send one SMS to every member of a group")]
pub struct CliConfig {
    /// Path to TOML configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Override storage.data_dir from config
    #[arg(long)]
    pub data_dir: Option<String>,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON")]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Show member and mobile-eligible counts for a group
    Preview {
        #[arg(long)]
        group: i64,

        #[arg(long)]
        include_inactive: Option<bool>,
    },

    /// Send a message to every eligible member of a group
    Send {
        #[arg(long)]
        group: Option<i64>,

        #[arg(short, long)]
        message: String,

        /// Origin number id, overrides messaging.origin_number
        #[arg(long)]
        from: Option<String>,

        #[arg(long)]
        include_inactive: Option<bool>,

        #[arg(long)]
        sender: Option<i64>,
    },
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        if let Some(config) = &self.config {
            validate_path("config", config)?;
        }
        if let Some(data_dir) = &self.data_dir {
            validate_path("data_dir", data_dir)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_send_command() {
        let cli = CliConfig::try_parse_from([
            "group-text",
            "--data-dir",
            "/tmp/data",
            "send",
            "--group",
            "7",
            "-m",
            "Practice moved to 6pm",
        ])
        .unwrap();

        assert_eq!(cli.data_dir.as_deref(), Some("/tmp/data"));
        match cli.command {
            Command::Send {
                group,
                message,
                from,
                ..
            } => {
                assert_eq!(group, Some(7));
                assert_eq!(message, "Practice moved to 6pm");
                assert!(from.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_preview_command() {
        let cli = CliConfig::try_parse_from([
            "group-text",
            "preview",
            "--group",
            "3",
            "--include-inactive",
            "true",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Command::Preview {
                group: 3,
                include_inactive: Some(true)
            }
        ));
        assert!(cli.validate().is_ok());
    }
}
