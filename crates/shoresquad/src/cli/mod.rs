//! Command-line interface for shoresquad.
//!
//! This module provides the CLI structure for the `shoresquad` binary. The
//! handlers live in [`crate::app`].

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    BackendArg, ConfigCommand, CrewCommand, EventCommand, OutputFormat, ResetCommand,
    StatusCommand, WeatherCommand,
};

/// shoresquad - Rally your crew for beach cleanups
///
/// Create and join cleanup crews, log the cleanups you attend, and check the
/// weather before heading out.
#[derive(Debug, Parser)]
#[command(name = "shoresquad")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value = "plain")]
    pub format: OutputFormat,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show your crews, the next cleanup and the weather
    Start,

    /// Manage crews
    #[command(subcommand)]
    Crew(CrewCommand),

    /// Track cleanup events
    #[command(subcommand)]
    Event(EventCommand),

    /// Show the weather forecast
    Weather(WeatherCommand),

    /// Acquire the current location
    Location,

    /// Show storage status
    Status(StatusCommand),

    /// Delete all stored crews, events and locations
    Reset(ResetCommand),

    /// View configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        if self.quiet {
            crate::logging::Verbosity::Quiet
        } else {
            match self.verbose {
                0 => crate::logging::Verbosity::Normal,
                1 => crate::logging::Verbosity::Verbose,
                _ => crate::logging::Verbosity::Trace,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn cli(verbose: u8, quiet: bool) -> Cli {
        Cli {
            config: None,
            verbose,
            quiet,
            format: OutputFormat::Plain,
            command: Command::Status(StatusCommand { json: false }),
        }
    }

    #[test]
    fn test_cli_debug() {
        let cli = Cli::command();
        assert_eq!(cli.get_name(), "shoresquad");
    }

    #[test]
    fn test_verbosity_quiet() {
        assert_eq!(cli(0, true).verbosity(), crate::logging::Verbosity::Quiet);
        assert_eq!(cli(2, true).verbosity(), crate::logging::Verbosity::Quiet);
    }

    #[test]
    fn test_verbosity_levels() {
        assert_eq!(cli(0, false).verbosity(), crate::logging::Verbosity::Normal);
        assert_eq!(cli(1, false).verbosity(), crate::logging::Verbosity::Verbose);
        assert_eq!(cli(2, false).verbosity(), crate::logging::Verbosity::Trace);
    }

    #[test]
    fn test_cli_verify() {
        // Verify the CLI structure is valid
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_crew_create_without_name() {
        let cli = Cli::try_parse_from(["shoresquad", "crew", "create"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Crew(CrewCommand::Create { name: None })
        ));
    }

    #[test]
    fn test_parse_crew_delete() {
        let cli = Cli::try_parse_from(["shoresquad", "crew", "delete", "42", "--yes"]).unwrap();
        match cli.command {
            Command::Crew(CrewCommand::Delete { id, yes }) => {
                assert_eq!(id, "42");
                assert!(yes);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_crew_delete_requires_id() {
        assert!(Cli::try_parse_from(["shoresquad", "crew", "delete"]).is_err());
    }

    #[test]
    fn test_parse_event_attend() {
        let cli = Cli::try_parse_from(["shoresquad", "event", "attend", "1"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Event(EventCommand::Attend { .. })
        ));
    }

    #[test]
    fn test_parse_weather() {
        let cli = Cli::try_parse_from([
            "shoresquad",
            "weather",
            "East Coast Park",
            "--backend",
            "open-meteo",
            "--watch",
        ])
        .unwrap();
        match cli.command {
            Command::Weather(cmd) => {
                assert_eq!(cmd.place.as_deref(), Some("East Coast Park"));
                assert_eq!(cmd.backend, Some(BackendArg::OpenMeteo));
                assert!(cmd.watch);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_status() {
        let cli = Cli::try_parse_from(["shoresquad", "status"]).unwrap();
        assert!(matches!(cli.command, Command::Status(_)));
    }

    #[test]
    fn test_parse_with_config() {
        let cli =
            Cli::try_parse_from(["shoresquad", "-c", "/custom/config.toml", "status"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/custom/config.toml")));
    }

    #[test]
    fn test_parse_with_verbose() {
        let cli = Cli::try_parse_from(["shoresquad", "-v", "status"]).unwrap();
        assert_eq!(cli.verbose, 1);
    }

    #[test]
    fn test_parse_with_quiet() {
        let cli = Cli::try_parse_from(["shoresquad", "-q", "status"]).unwrap();
        assert!(cli.quiet);
    }

    #[test]
    fn test_parse_global_format_after_subcommand() {
        let cli = Cli::try_parse_from(["shoresquad", "crew", "list", "-f", "json"]).unwrap();
        assert_eq!(cli.format, OutputFormat::Json);
    }
}
