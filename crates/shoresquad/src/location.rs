//! Location acquisition.
//!
//! A [`LocationProvider`] answers "where am I?". Lookups are bounded by a
//! timeout and never fail the caller: a slow or broken provider just means
//! no location. Successful fixes are remembered in the store.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::LocationConfig;
use crate::error::{Error, Result};
use crate::storage::{keys, Store};

/// A position on the globe.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// Latitude in decimal degrees.
    pub latitude: f64,
    /// Longitude in decimal degrees.
    pub longitude: f64,
    /// Accuracy radius in metres, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
}

impl Location {
    /// Create a location without an accuracy estimate.
    #[must_use]
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            accuracy: None,
        }
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.6}, {:.6}", self.latitude, self.longitude)?;
        if let Some(accuracy) = self.accuracy {
            write!(f, " (±{accuracy:.0} m)")?;
        }
        Ok(())
    }
}

/// Source of the current position.
#[async_trait]
pub trait LocationProvider: Send + Sync + std::fmt::Debug {
    /// Determine the current position.
    async fn current_location(&self) -> Result<Location>;
}

/// Reports the position fixed in configuration.
#[derive(Debug, Clone, Default)]
pub struct ConfiguredLocation {
    location: Option<Location>,
}

impl ConfiguredLocation {
    /// Build from the `[location]` section. Without both coordinates the
    /// provider has no position to give.
    #[must_use]
    pub fn from_config(config: &LocationConfig) -> Self {
        let location = match (config.latitude, config.longitude) {
            (Some(latitude), Some(longitude)) => Some(Location::new(latitude, longitude)),
            _ => None,
        };
        Self { location }
    }
}

#[async_trait]
impl LocationProvider for ConfiguredLocation {
    async fn current_location(&self) -> Result<Location> {
        self.location.ok_or_else(|| {
            Error::location_unavailable("no position configured (set location.latitude and location.longitude)")
        })
    }
}

/// Ask `provider` for a position, giving up after `timeout`.
///
/// A fix is saved as the last known location. Timeouts and provider errors
/// are logged and yield `None`.
pub async fn acquire(
    provider: &dyn LocationProvider,
    timeout: Duration,
    store: &Store,
) -> Option<Location> {
    let result = match tokio::time::timeout(timeout, provider.current_location()).await {
        Ok(result) => result,
        Err(_) => Err(Error::Timeout {
            operation: format!("location lookup after {}ms", timeout.as_millis()),
        }),
    };

    match result {
        Ok(location) => {
            info!(%location, "Location acquired");
            if !store.save(keys::LOCATION, &location) {
                debug!("Location not persisted");
            }
            Some(location)
        }
        Err(e) => {
            warn!("Location unavailable: {e}");
            None
        }
    }
}

/// The most recently acquired location, if any.
#[must_use]
pub fn last_known(store: &Store) -> Option<Location> {
    store.load(keys::LOCATION)
}
