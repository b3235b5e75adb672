//! Open-Meteo backend.
//!
//! A free-text place is geocoded first (the first match wins); without a
//! place the cleanup coordinates from configuration are used as-is.
//! Open-Meteo reports wind in km/h and precipitation in mm by default.

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::{get_json, DailyForecast, WeatherBackend, WeatherError, WeatherReport};
use crate::config::Config;

/// Attribution shown under Open-Meteo reports.
pub const ATTRIBUTION: &str = "Weather data by Open-Meteo.com";

/// Days of forecast requested.
const FORECAST_DAYS: u8 = 4;

const CURRENT_FIELDS: &str =
    "temperature_2m,relative_humidity_2m,precipitation,wind_speed_10m,weather_code";

const DAILY_FIELDS: &str =
    "weather_code,temperature_2m_max,temperature_2m_min,precipitation_sum,wind_speed_10m_max,relative_humidity_2m_max";

#[derive(Debug, Deserialize)]
struct GeocodingResponse {
    #[serde(default)]
    results: Vec<Place>,
}

/// A geocoded place.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub(crate) struct Place {
    name: String,
    latitude: f64,
    longitude: f64,
    country: Option<String>,
}

impl Place {
    fn display_name(&self) -> String {
        match &self.country {
            Some(country) if !country.is_empty() => format!("{}, {country}", self.name),
            _ => self.name.clone(),
        }
    }
}

/// Forecast response.
#[derive(Debug, Deserialize)]
pub(crate) struct ForecastResponse {
    timezone: Option<String>,
    current: Option<Current>,
    daily: Option<Daily>,
}

#[derive(Debug, Deserialize)]
struct Current {
    temperature_2m: Option<f64>,
    relative_humidity_2m: Option<f64>,
    precipitation: Option<f64>,
    wind_speed_10m: Option<f64>,
    weather_code: Option<u8>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Daily {
    time: Vec<NaiveDate>,
    weather_code: Vec<Option<u8>>,
    temperature_2m_max: Vec<Option<f64>>,
    temperature_2m_min: Vec<Option<f64>>,
    precipitation_sum: Vec<Option<f64>>,
    wind_speed_10m_max: Vec<Option<f64>>,
    relative_humidity_2m_max: Vec<Option<f64>>,
}

/// Weather for any place via Open-Meteo.
#[derive(Debug)]
pub struct OpenMeteoBackend {
    client: Client,
    geocoding_url: String,
    forecast_url: String,
    default_place: Option<String>,
    fallback: Place,
}

impl OpenMeteoBackend {
    /// Create the backend from configuration.
    #[must_use]
    pub fn new(client: Client, config: &Config) -> Self {
        Self {
            client,
            geocoding_url: config.weather.geocoding_url.clone(),
            forecast_url: config.weather.forecast_url.clone(),
            default_place: config.weather.default_place.clone(),
            fallback: Place {
                name: config.cleanup.name.clone(),
                latitude: config.cleanup.latitude,
                longitude: config.cleanup.longitude,
                country: None,
            },
        }
    }

    async fn geocode(&self, query: &str) -> Result<Place, WeatherError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(WeatherError::EmptyQuery);
        }

        let response: GeocodingResponse = get_json(
            &self.client,
            &self.geocoding_url,
            &[
                ("name", query.to_string()),
                ("count", "1".to_string()),
                ("language", "en".to_string()),
                ("format", "json".to_string()),
            ],
        )
        .await?;

        let place = response
            .results
            .into_iter()
            .next()
            .ok_or_else(|| WeatherError::LocationNotFound {
                query: query.to_string(),
            })?;
        debug!(
            query,
            name = %place.name,
            latitude = place.latitude,
            longitude = place.longitude,
            "Geocoded place"
        );
        Ok(place)
    }

    async fn forecast(&self, place: &Place) -> Result<ForecastResponse, WeatherError> {
        get_json(
            &self.client,
            &self.forecast_url,
            &[
                ("latitude", place.latitude.to_string()),
                ("longitude", place.longitude.to_string()),
                ("current", CURRENT_FIELDS.to_string()),
                ("daily", DAILY_FIELDS.to_string()),
                ("timezone", "auto".to_string()),
                ("forecast_days", FORECAST_DAYS.to_string()),
            ],
        )
        .await
    }
}

#[async_trait]
impl WeatherBackend for OpenMeteoBackend {
    fn name(&self) -> &'static str {
        "open-meteo"
    }

    async fn fetch(&self, place: Option<&str>) -> Result<WeatherReport, WeatherError> {
        let place = match place.or(self.default_place.as_deref()) {
            Some(query) => self.geocode(query).await?,
            None => self.fallback.clone(),
        };

        let response = self.forecast(&place).await?;
        build_report(&place.display_name(), response)
    }
}

/// Describe a WMO weather interpretation code.
#[must_use]
pub fn describe_weather_code(code: u8) -> &'static str {
    match code {
        0 => "Clear sky",
        1 => "Mainly clear",
        2 => "Partly cloudy",
        3 => "Overcast",
        45 | 48 => "Fog",
        51 | 53 | 55 => "Drizzle",
        56 | 57 => "Freezing drizzle",
        61 | 63 | 65 => "Rain",
        66 | 67 => "Freezing rain",
        71 | 73 | 75 | 77 => "Snow",
        80..=82 => "Rain showers",
        85 | 86 => "Snow showers",
        95 => "Thunderstorm",
        96 | 99 => "Thunderstorm with hail",
        _ => "Unknown",
    }
}

fn nth<T: Copy>(values: &[Option<T>], i: usize) -> Option<T> {
    values.get(i).copied().flatten()
}

/// Turn a forecast response into a report for `location`.
pub(crate) fn build_report(
    location: &str,
    response: ForecastResponse,
) -> Result<WeatherReport, WeatherError> {
    let current = response
        .current
        .ok_or_else(|| WeatherError::missing("current conditions"))?;
    let daily = response.daily.unwrap_or_default();

    let forecast = daily
        .time
        .iter()
        .enumerate()
        .map(|(i, date)| {
            let mut day = DailyForecast::on(*date);
            day.condition = nth(&daily.weather_code, i).map(|c| describe_weather_code(c).to_string());
            day.temp_low_c = nth(&daily.temperature_2m_min, i);
            day.temp_high_c = nth(&daily.temperature_2m_max, i);
            day.precipitation_mm = nth(&daily.precipitation_sum, i);
            day.wind_speed_kmh = nth(&daily.wind_speed_10m_max, i);
            day.humidity_pct = nth(&daily.relative_humidity_2m_max, i);
            day
        })
        .collect();

    Ok(WeatherReport {
        location: location.to_string(),
        temperature_c: current.temperature_2m,
        wind_speed_kmh: current.wind_speed_10m,
        humidity_pct: current.relative_humidity_2m,
        precipitation_mm: current.precipitation,
        condition: current
            .weather_code
            .map(|c| describe_weather_code(c).to_string()),
        timezone: response.timezone,
        forecast,
        source: ATTRIBUTION.to_string(),
    })
}
