//! Configuration management for shoresquad.
//!
//! Configuration is layered with figment: built-in defaults, then a TOML
//! file, then `SHORESQUAD_` environment variables.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "shoresquad";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "shoresquad.db";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `SHORESQUAD_`, `__` between sections)
/// 2. TOML config file at `~/.config/shoresquad/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Weather client configuration.
    pub weather: WeatherConfig,
    /// The next scheduled cleanup.
    pub cleanup: CleanupConfig,
    /// Location acquisition.
    pub location: LocationConfig,
    /// Crew defaults.
    pub crew: CrewConfig,
    /// Interaction settings.
    pub ui: UiConfig,
}

/// Storage-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the database file.
    /// Defaults to `~/.local/share/shoresquad/shoresquad.db`
    pub database_path: Option<PathBuf>,
}

/// Which weather service answers forecast requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WeatherBackendKind {
    /// Singapore NEA open data, fixed to the cleanup region.
    #[default]
    Nea,
    /// Open-Meteo geocoding and forecast, keyed by place name.
    OpenMeteo,
}

impl std::fmt::Display for WeatherBackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Nea => write!(f, "nea"),
            Self::OpenMeteo => write!(f, "open-meteo"),
        }
    }
}

/// Weather-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherConfig {
    /// Backend used when none is given on the command line.
    pub backend: WeatherBackendKind,
    /// NEA 4-day forecast endpoint.
    pub nea_forecast_url: String,
    /// NEA real-time readings endpoint.
    pub nea_realtime_url: String,
    /// Open-Meteo geocoding endpoint.
    pub geocoding_url: String,
    /// Open-Meteo forecast endpoint.
    pub forecast_url: String,
    /// Place searched by the Open-Meteo backend when none is given.
    /// When unset, the cleanup coordinates are used directly.
    pub default_place: Option<String>,
    /// Station names preferred for current NEA readings, in order.
    pub preferred_stations: Vec<String>,
    /// Request timeout in seconds. 0 keeps the HTTP client default.
    pub request_timeout_secs: u64,
}

/// The next scheduled cleanup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanupConfig {
    /// Display name of the cleanup location.
    pub name: String,
    /// Latitude in decimal degrees.
    pub latitude: f64,
    /// Longitude in decimal degrees.
    pub longitude: f64,
    /// Short description.
    pub description: String,
}

/// Location acquisition configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationConfig {
    /// Maximum time to wait for a position, in milliseconds.
    pub timeout_ms: u64,
    /// Fixed latitude reported as the current position.
    pub latitude: Option<f64>,
    /// Fixed longitude reported as the current position.
    pub longitude: Option<f64>,
}

/// Crew configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrewConfig {
    /// Name recorded when the local user creates or joins a crew.
    pub member_name: String,
}

/// Interaction configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// Quiet period before a refresh trigger fires, in milliseconds.
    pub refresh_debounce_ms: u64,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            backend: WeatherBackendKind::Nea,
            nea_forecast_url: "https://api.data.gov.sg/v1/environment/4-day-weather-forecast"
                .to_string(),
            nea_realtime_url:
                "https://api.data.gov.sg/v1/environment/realtime-weather-readings".to_string(),
            geocoding_url: "https://geocoding-api.open-meteo.com/v1/search".to_string(),
            forecast_url: "https://api.open-meteo.com/v1/forecast".to_string(),
            default_place: None,
            preferred_stations: default_preferred_stations(),
            request_timeout_secs: 0,
        }
    }
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            name: "Pasir Ris, Singapore".to_string(),
            latitude: 1.381_497,
            longitude: 103.955_574,
            description: "Street View Asia - Pasir Ris Beach Park".to_string(),
        }
    }
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 10_000,
            latitude: None,
            longitude: None,
        }
    }
}

impl Default for CrewConfig {
    fn default() -> Self {
        Self {
            member_name: "You".to_string(),
        }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            refresh_debounce_ms: 300,
        }
    }
}

/// Stations closest to the default cleanup site.
fn default_preferred_stations() -> Vec<String> {
    vec![
        "pasir ris".to_string(),
        "pasir".to_string(),
        "changi".to_string(),
    ]
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading, parsing or validation fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed("SHORESQUAD_").split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.crew.member_name.trim().is_empty() {
            return Err(Error::config_validation("crew.member_name must not be empty"));
        }

        if self.location.timeout_ms == 0 {
            return Err(Error::config_validation(
                "location.timeout_ms must be greater than 0",
            ));
        }

        check_coordinates("cleanup", self.cleanup.latitude, self.cleanup.longitude)?;

        match (self.location.latitude, self.location.longitude) {
            (Some(lat), Some(lon)) => check_coordinates("location", lat, lon)?,
            (None, None) => {}
            _ => {
                return Err(Error::config_validation(
                    "location.latitude and location.longitude must be set together",
                ))
            }
        }

        for (name, url) in [
            ("nea_forecast_url", &self.weather.nea_forecast_url),
            ("nea_realtime_url", &self.weather.nea_realtime_url),
            ("geocoding_url", &self.weather.geocoding_url),
            ("forecast_url", &self.weather.forecast_url),
        ] {
            if reqwest::Url::parse(url).is_err() {
                return Err(Error::config_validation(format!(
                    "weather.{name} is not a valid URL: {url}"
                )));
            }
        }

        Ok(())
    }

    /// Get the database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }

    /// Get the location timeout as a Duration.
    #[must_use]
    pub fn location_timeout(&self) -> Duration {
        Duration::from_millis(self.location.timeout_ms)
    }

    /// Get the weather request timeout, if one is configured.
    #[must_use]
    pub fn request_timeout(&self) -> Option<Duration> {
        if self.weather.request_timeout_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(self.weather.request_timeout_secs))
        }
    }

    /// Get the refresh debounce as a Duration.
    #[must_use]
    pub fn refresh_debounce(&self) -> Duration {
        Duration::from_millis(self.ui.refresh_debounce_ms)
    }
}

fn check_coordinates(section: &str, latitude: f64, longitude: f64) -> Result<()> {
    if !(-90.0..=90.0).contains(&latitude) {
        return Err(Error::config_validation(format!(
            "{section}.latitude must be within -90..=90, got {latitude}"
        )));
    }
    if !(-180.0..=180.0).contains(&longitude) {
        return Err(Error::config_validation(format!(
            "{section}.longitude must be within -180..=180, got {longitude}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.weather.backend, WeatherBackendKind::Nea);
        assert_eq!(config.crew.member_name, "You");
        assert_eq!(config.location.timeout_ms, 10_000);
        assert_eq!(config.ui.refresh_debounce_ms, 300);
        assert!(config.storage.database_path.is_none());
    }

    #[test]
    fn test_default_cleanup_is_pasir_ris() {
        let cleanup = CleanupConfig::default();

        assert_eq!(cleanup.name, "Pasir Ris, Singapore");
        assert!((cleanup.latitude - 1.381_497).abs() < f64::EPSILON);
        assert!((cleanup.longitude - 103.955_574).abs() < f64::EPSILON);
    }

    #[test]
    fn test_default_preferred_stations() {
        let weather = WeatherConfig::default();
        assert_eq!(weather.preferred_stations[0], "pasir ris");
        assert!(weather.preferred_stations.contains(&"changi".to_string()));
    }

    #[test]
    fn test_validate_valid_config() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_empty_member_name() {
        let mut config = Config::default();
        config.crew.member_name = "   ".to_string();

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("member_name"));
    }

    #[test]
    fn test_validate_zero_location_timeout() {
        let mut config = Config::default();
        config.location.timeout_ms = 0;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("timeout_ms"));
    }

    #[test]
    fn test_validate_out_of_range_latitude() {
        let mut config = Config::default();
        config.cleanup.latitude = 91.0;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("cleanup.latitude"));
    }

    #[test]
    fn test_validate_half_set_location() {
        let mut config = Config::default();
        config.location.latitude = Some(1.3);

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("set together"));
    }

    #[test]
    fn test_validate_bad_url() {
        let mut config = Config::default();
        config.weather.forecast_url = "not a url".to_string();

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("forecast_url"));
    }

    #[test]
    fn test_database_path_default() {
        let config = Config::default();
        assert!(config
            .database_path()
            .to_string_lossy()
            .contains("shoresquad.db"));
    }

    #[test]
    fn test_database_path_custom() {
        let mut config = Config::default();
        config.storage.database_path = Some(PathBuf::from("/custom/path/db.sqlite"));

        assert_eq!(
            config.database_path(),
            PathBuf::from("/custom/path/db.sqlite")
        );
    }

    #[test]
    fn test_request_timeout() {
        let mut config = Config::default();
        assert!(config.request_timeout().is_none());

        config.weather.request_timeout_secs = 15;
        assert_eq!(config.request_timeout(), Some(Duration::from_secs(15)));
    }

    #[test]
    fn test_durations() {
        let config = Config::default();
        assert_eq!(config.location_timeout(), Duration::from_secs(10));
        assert_eq!(config.refresh_debounce(), Duration::from_millis(300));
    }

    #[test]
    fn test_default_config_path() {
        let path = Config::default_config_path();
        assert!(path.to_string_lossy().contains("shoresquad"));
        assert!(path.to_string_lossy().contains("config.toml"));
    }

    #[test]
    fn test_load_nonexistent_config() {
        let config = Config::load_from(Some(PathBuf::from("/nonexistent/config.toml"))).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_from_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[weather]\nbackend = \"open-meteo\"\ndefault_place = \"Sentosa\"\n\n[crew]\nmember_name = \"Ana\"\n",
        )
        .unwrap();

        let config = Config::load_from(Some(path)).unwrap();
        assert_eq!(config.weather.backend, WeatherBackendKind::OpenMeteo);
        assert_eq!(config.weather.default_place.as_deref(), Some("Sentosa"));
        assert_eq!(config.crew.member_name, "Ana");
        assert_eq!(config.cleanup, CleanupConfig::default());
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[location]\ntimeout_ms = 0\n").unwrap();

        assert!(Config::load_from(Some(path)).is_err());
    }

    #[test]
    fn test_backend_kind_serialization() {
        let json = serde_json::to_string(&WeatherBackendKind::OpenMeteo).unwrap();
        assert_eq!(json, "\"open-meteo\"");
        assert_eq!(WeatherBackendKind::Nea.to_string(), "nea");
    }
}
