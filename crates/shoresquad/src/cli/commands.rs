//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};

use crate::config::WeatherBackendKind;
use crate::render::Markup;

/// Crew management commands.
#[derive(Debug, Subcommand)]
pub enum CrewCommand {
    /// Create a new crew (prompts for a name when omitted)
    Create {
        /// Name of the crew
        name: Option<String>,
    },

    /// Join an existing crew (prompts for the id when omitted)
    Join {
        /// Crew id
        id: Option<String>,
    },

    /// Delete a crew
    Delete {
        /// Crew id
        id: String,

        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// List all crews
    List,

    /// Copy a crew id to the clipboard
    Share {
        /// Crew id
        id: String,
    },
}

/// Cleanup event commands.
#[derive(Debug, Subcommand)]
pub enum EventCommand {
    /// List scheduled cleanups
    List,

    /// Schedule a cleanup
    Add {
        /// Where the cleanup takes place
        location: String,
    },

    /// Log attendance at a cleanup
    Attend {
        /// Event id
        id: String,
    },
}

/// Weather command arguments.
#[derive(Debug, Args)]
pub struct WeatherCommand {
    /// Place to look up (Open-Meteo only)
    pub place: Option<String>,

    /// Weather service to ask
    #[arg(short, long, value_enum)]
    pub backend: Option<BackendArg>,

    /// Keep running; each line on stdin refreshes the forecast
    #[arg(short, long)]
    pub watch: bool,
}

/// Status command arguments.
#[derive(Debug, Args)]
pub struct StatusCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Reset command arguments.
#[derive(Debug, Args)]
pub struct ResetCommand {
    /// Skip confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(long)]
        file: Option<PathBuf>,
    },
}

/// Weather backend argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BackendArg {
    /// NEA open data, fixed to the cleanup region
    Nea,
    /// Open-Meteo, any geocodable place
    OpenMeteo,
}

impl From<BackendArg> for WeatherBackendKind {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Nea => Self::Nea,
            BackendArg::OpenMeteo => Self::OpenMeteo,
        }
    }
}

/// Output format for commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Plain text output
    #[default]
    Plain,
    /// HTML fragments
    Html,
    /// JSON output
    Json,
}

impl OutputFormat {
    /// Markup used for rendered views. JSON output has none and falls back
    /// to plain text for messages that have no record to serialize.
    #[must_use]
    pub fn markup(self) -> Markup {
        match self {
            Self::Html => Markup::Html,
            Self::Plain | Self::Json => Markup::Plain,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_arg_conversion() {
        assert_eq!(
            WeatherBackendKind::from(BackendArg::Nea),
            WeatherBackendKind::Nea
        );
        assert_eq!(
            WeatherBackendKind::from(BackendArg::OpenMeteo),
            WeatherBackendKind::OpenMeteo
        );
    }

    #[test]
    fn test_output_format_default() {
        assert_eq!(OutputFormat::default(), OutputFormat::Plain);
    }

    #[test]
    fn test_output_format_markup() {
        assert_eq!(OutputFormat::Plain.markup(), Markup::Plain);
        assert_eq!(OutputFormat::Html.markup(), Markup::Html);
        assert_eq!(OutputFormat::Json.markup(), Markup::Plain);
    }

    #[test]
    fn test_backend_arg_value_names() {
        let names: Vec<_> = BackendArg::value_variants()
            .iter()
            .filter_map(|v| v.to_possible_value())
            .map(|v| v.get_name().to_string())
            .collect();
        assert_eq!(names, vec!["nea", "open-meteo"]);
    }
}
