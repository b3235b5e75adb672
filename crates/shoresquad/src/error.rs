//! Error types for shoresquad.
//!
//! This module defines the error types shared by the store, the registries and
//! the application controller. Weather failures have their own enum in
//! [`crate::weather`] and are wrapped here.

use std::path::PathBuf;
use thiserror::Error;

use crate::weather::WeatherError;

/// The main error type for shoresquad operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Storage Errors ===
    /// Failed to open or create the store database.
    #[error("failed to open store at {path}: {source}")]
    StoreOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A store query failed.
    #[error("store query failed: {0}")]
    StoreQuery(#[from] rusqlite::Error),

    /// Failed to run store migrations.
    #[error("store migration failed: {message}")]
    StoreMigration {
        /// Description of what went wrong.
        message: String,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === Lookup Errors ===
    /// No crew with the given id exists.
    #[error("crew not found: {id}")]
    CrewNotFound {
        /// The id as supplied by the user.
        id: String,
    },

    /// No event with the given id exists.
    #[error("event not found: {id}")]
    EventNotFound {
        /// The id as supplied by the user.
        id: String,
    },

    // === Input Errors ===
    /// Reading interactive input failed.
    #[error("failed to read input: {0}")]
    Input(String),

    /// No position could be determined.
    #[error("location unavailable: {0}")]
    LocationUnavailable(String),

    /// Writing to the system clipboard failed.
    #[error("clipboard unavailable: {0}")]
    Clipboard(String),

    // === Weather Errors ===
    /// Fetching or decoding weather data failed.
    #[error(transparent)]
    Weather(#[from] WeatherError),

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Generic Errors ===
    /// An operation timed out.
    #[error("operation timed out: {operation}")]
    Timeout {
        /// Description of the operation that timed out.
        operation: String,
    },
}

/// Result type alias for shoresquad operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a crew not-found error.
    #[must_use]
    pub fn crew_not_found(id: impl Into<String>) -> Self {
        Self::CrewNotFound { id: id.into() }
    }

    /// Create an event not-found error.
    #[must_use]
    pub fn event_not_found(id: impl Into<String>) -> Self {
        Self::EventNotFound { id: id.into() }
    }

    /// Create a configuration validation error.
    #[must_use]
    pub fn config_validation(message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            message: message.into(),
        }
    }

    /// Create an input error.
    #[must_use]
    pub fn input(message: impl Into<String>) -> Self {
        Self::Input(message.into())
    }

    /// Create a location unavailable error.
    #[must_use]
    pub fn location_unavailable(message: impl Into<String>) -> Self {
        Self::LocationUnavailable(message.into())
    }

    /// Create a clipboard error.
    #[must_use]
    pub fn clipboard(message: impl Into<String>) -> Self {
        Self::Clipboard(message.into())
    }

    /// Check if this error means a referenced record does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::CrewNotFound { .. } | Self::EventNotFound { .. })
    }

    /// Check if this error came from the weather client.
    #[must_use]
    pub fn is_weather_error(&self) -> bool {
        matches!(self, Self::Weather(_))
    }
}
