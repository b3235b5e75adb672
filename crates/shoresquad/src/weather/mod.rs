//! Weather client.
//!
//! One [`WeatherClient`] fronts interchangeable [`WeatherBackend`]s:
//!
//! - [`nea::NeaBackend`]: Singapore NEA open data for the fixed cleanup region
//!   (real-time station readings plus the 4-day outlook).
//! - [`open_meteo::OpenMeteoBackend`]: geocodes a free-text place name, then
//!   asks Open-Meteo for current conditions and a short daily forecast.
//!
//! Both produce the same normalized [`WeatherReport`] in metric units. A
//! failed request is not retried and nothing is cached.

pub mod nea;
pub mod open_meteo;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error};

use crate::config::{Config, WeatherBackendKind};

/// User agent sent with every weather request.
const USER_AGENT: &str = concat!("shoresquad/", env!("CARGO_PKG_VERSION"));

/// Errors from fetching or decoding weather data.
#[derive(Debug, Error)]
pub enum WeatherError {
    /// The request could not be sent or the body could not be read.
    #[error("request to {url} failed: {source}")]
    Request {
        /// Endpoint that was requested.
        url: String,
        /// The underlying error.
        #[source]
        source: reqwest::Error,
    },

    /// The service answered with a non-success status.
    #[error("{url} returned HTTP {status}")]
    Status {
        /// Endpoint that was requested.
        url: String,
        /// The status received.
        status: StatusCode,
    },

    /// The response body was not the expected JSON.
    #[error("unexpected response from {url}: {source}")]
    Decode {
        /// Endpoint that was requested.
        url: String,
        /// The underlying error.
        #[source]
        source: serde_json::Error,
    },

    /// The response parsed but lacked the data needed for a report.
    #[error("weather data missing: {what}")]
    MissingData {
        /// What was missing.
        what: String,
    },

    /// Geocoding found no place for the query.
    #[error("no place found matching \"{query}\"")]
    LocationNotFound {
        /// The place name that was searched.
        query: String,
    },

    /// A place search was requested with a blank name.
    #[error("place name must not be empty")]
    EmptyQuery,
}

impl WeatherError {
    pub(crate) fn missing(what: impl Into<String>) -> Self {
        Self::MissingData { what: what.into() }
    }
}

/// Normalized weather for one place: current conditions plus a daily outlook.
///
/// Every measurement is optional; renderers leave out what is absent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherReport {
    /// Display name of the place.
    pub location: String,
    /// Air temperature in degrees Celsius.
    pub temperature_c: Option<f64>,
    /// Wind speed in km/h.
    pub wind_speed_kmh: Option<f64>,
    /// Relative humidity in percent.
    pub humidity_pct: Option<f64>,
    /// Precipitation in millimetres.
    pub precipitation_mm: Option<f64>,
    /// Short text description such as "Partly Cloudy".
    pub condition: Option<String>,
    /// IANA timezone of the place.
    pub timezone: Option<String>,
    /// Daily outlook, earliest first.
    pub forecast: Vec<DailyForecast>,
    /// Data attribution line.
    pub source: String,
}

impl WeatherReport {
    /// Whether the report has any current reading at all.
    #[must_use]
    pub fn has_current(&self) -> bool {
        self.temperature_c.is_some()
            || self.wind_speed_kmh.is_some()
            || self.humidity_pct.is_some()
            || self.precipitation_mm.is_some()
            || self.condition.is_some()
    }
}

/// Outlook for a single day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyForecast {
    /// The day.
    pub date: NaiveDate,
    /// Short text description.
    pub condition: Option<String>,
    /// Lowest temperature in degrees Celsius.
    pub temp_low_c: Option<f64>,
    /// Highest temperature in degrees Celsius.
    pub temp_high_c: Option<f64>,
    /// Compass direction of the wind, e.g. "NNE".
    pub wind_direction: Option<String>,
    /// Highest wind speed in km/h.
    pub wind_speed_kmh: Option<f64>,
    /// Highest relative humidity in percent.
    pub humidity_pct: Option<f64>,
    /// Total precipitation in millimetres.
    pub precipitation_mm: Option<f64>,
}

impl DailyForecast {
    /// A day with no readings yet.
    #[must_use]
    pub fn on(date: NaiveDate) -> Self {
        Self {
            date,
            condition: None,
            temp_low_c: None,
            temp_high_c: None,
            wind_direction: None,
            wind_speed_kmh: None,
            humidity_pct: None,
            precipitation_mm: None,
        }
    }
}

/// A weather service that can produce a [`WeatherReport`].
#[async_trait]
pub trait WeatherBackend: Send + Sync + std::fmt::Debug {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Fetch the weather for `place`, or for the backend's default location
    /// when `place` is `None`.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, a non-success status, an
    /// undecodable body or missing data.
    async fn fetch(&self, place: Option<&str>) -> Result<WeatherReport, WeatherError>;
}

/// Entry point for weather lookups.
///
/// Cheap to clone; clones share the backend and its HTTP connection pool.
#[derive(Debug, Clone)]
pub struct WeatherClient {
    backend: Arc<dyn WeatherBackend>,
}

impl WeatherClient {
    /// Wrap an existing backend.
    #[must_use]
    pub fn new(backend: Arc<dyn WeatherBackend>) -> Self {
        Self { backend }
    }

    /// Build the client for `kind` from configuration.
    #[must_use]
    pub fn from_config(config: &Config, kind: WeatherBackendKind) -> Self {
        let http = http_client(config);
        let backend: Arc<dyn WeatherBackend> = match kind {
            WeatherBackendKind::Nea => Arc::new(nea::NeaBackend::new(http, config)),
            WeatherBackendKind::OpenMeteo => {
                Arc::new(open_meteo::OpenMeteoBackend::new(http, config))
            }
        };
        debug!(backend = backend.name(), "Weather client ready");
        Self { backend }
    }

    /// Name of the active backend.
    #[must_use]
    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Fetch a report, logging failures.
    ///
    /// # Errors
    ///
    /// Propagates the backend's error unchanged.
    pub async fn fetch(&self, place: Option<&str>) -> Result<WeatherReport, WeatherError> {
        debug!(backend = self.backend.name(), place = ?place, "Fetching weather");
        self.backend.fetch(place).await.map_err(|e| {
            error!(backend = self.backend.name(), "Weather fetch failed: {e}");
            e
        })
    }
}

fn http_client(config: &Config) -> Client {
    let mut builder = Client::builder().user_agent(USER_AGENT);
    if let Some(timeout) = config.request_timeout() {
        builder = builder.timeout(timeout);
    }
    builder.build().unwrap_or_else(|e| {
        error!("Falling back to a default HTTP client: {e}");
        Client::new()
    })
}

/// GET `url` with `query` and decode the JSON body.
pub(crate) async fn get_json<T: DeserializeOwned>(
    client: &Client,
    url: &str,
    query: &[(&str, String)],
) -> Result<T, WeatherError> {
    let request_error = |source| WeatherError::Request {
        url: url.to_string(),
        source,
    };

    let response = client
        .get(url)
        .query(query)
        .send()
        .await
        .map_err(request_error)?;

    let status = response.status();
    if !status.is_success() {
        return Err(WeatherError::Status {
            url: url.to_string(),
            status,
        });
    }

    let body = response.text().await.map_err(request_error)?;
    serde_json::from_str(&body).map_err(|source| WeatherError::Decode {
        url: url.to_string(),
        source,
    })
}
