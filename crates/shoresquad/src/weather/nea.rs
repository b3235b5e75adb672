//! NEA (National Environment Agency, Singapore) backend.
//!
//! The location is fixed to the cleanup region. Two endpoints are queried
//! concurrently: real-time station readings for current conditions, and the
//! 4-day outlook for the forecast.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, trace};

use super::{get_json, DailyForecast, WeatherBackend, WeatherError, WeatherReport};
use crate::config::Config;

/// Attribution shown under NEA reports.
pub const ATTRIBUTION: &str = "Data provided by NEA (National Environment Agency, Singapore), data.gov.sg";

/// Timezone of every NEA report.
const TIMEZONE: &str = "Asia/Singapore";

/// Real-time readings response.
#[derive(Debug, Deserialize)]
pub(crate) struct RealtimeResponse {
    #[serde(default)]
    items: Vec<RealtimeItem>,
}

#[derive(Debug, Deserialize)]
struct RealtimeItem {
    /// Readings keyed by station name.
    #[serde(default)]
    readings: BTreeMap<String, StationReading>,
}

#[derive(Debug, Default, Deserialize)]
struct StationReading {
    air_temperature: Option<f64>,
    relative_humidity: Option<f64>,
    wind_speed: Option<f64>,
    rainfall: Option<f64>,
}

/// 4-day outlook response.
#[derive(Debug, Deserialize)]
pub(crate) struct ForecastResponse {
    #[serde(default)]
    items: Vec<ForecastItem>,
}

#[derive(Debug, Deserialize)]
struct ForecastItem {
    #[serde(default)]
    forecasts: Vec<DayForecast>,
}

#[derive(Debug, Deserialize)]
struct DayForecast {
    date: Option<NaiveDate>,
    forecast: Option<String>,
    temperature: Option<Bounds>,
    relative_humidity: Option<Bounds>,
    wind: Option<Wind>,
}

#[derive(Debug, Deserialize)]
struct Bounds {
    low: Option<f64>,
    high: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct Wind {
    speed: Option<Bounds>,
    direction: Option<String>,
}

/// Weather for the fixed cleanup region from NEA open data.
#[derive(Debug)]
pub struct NeaBackend {
    client: Client,
    realtime_url: String,
    forecast_url: String,
    location: String,
    preferred_stations: Vec<String>,
}

impl NeaBackend {
    /// Create the backend from configuration.
    #[must_use]
    pub fn new(client: Client, config: &Config) -> Self {
        Self {
            client,
            realtime_url: config.weather.nea_realtime_url.clone(),
            forecast_url: config.weather.nea_forecast_url.clone(),
            location: config.cleanup.name.clone(),
            preferred_stations: config.weather.preferred_stations.clone(),
        }
    }
}

#[async_trait]
impl WeatherBackend for NeaBackend {
    fn name(&self) -> &'static str {
        "nea"
    }

    async fn fetch(&self, place: Option<&str>) -> Result<WeatherReport, WeatherError> {
        if let Some(place) = place {
            debug!(place, "NEA covers a fixed region; ignoring place");
        }

        let (realtime, forecast) = tokio::try_join!(
            get_json::<RealtimeResponse>(&self.client, &self.realtime_url, &[]),
            get_json::<ForecastResponse>(&self.client, &self.forecast_url, &[]),
        )?;

        build_report(&self.location, &realtime, &forecast, &self.preferred_stations)
    }
}

/// Pick the station to report: the first one whose name contains a
/// preferred fragment (checked in preference order), else the first station.
fn pick_station<'a, T>(
    readings: &'a BTreeMap<String, T>,
    preferred: &[String],
) -> Option<(&'a String, &'a T)> {
    preferred
        .iter()
        .map(|fragment| fragment.to_lowercase())
        .find_map(|fragment| {
            readings
                .iter()
                .find(|(name, _)| name.to_lowercase().contains(&fragment))
        })
        .or_else(|| readings.iter().next())
}

/// Combine the two NEA responses into a report.
pub(crate) fn build_report(
    location: &str,
    realtime: &RealtimeResponse,
    forecast: &ForecastResponse,
    preferred_stations: &[String],
) -> Result<WeatherReport, WeatherError> {
    let item = realtime
        .items
        .first()
        .ok_or_else(|| WeatherError::missing("real-time readings"))?;

    let default_reading = StationReading::default();
    let reading = match pick_station(&item.readings, preferred_stations) {
        Some((station, reading)) => {
            trace!(station = %station, "Using station");
            reading
        }
        None => &default_reading,
    };

    let days: Vec<DailyForecast> = forecast
        .items
        .iter()
        .flat_map(|item| item.forecasts.iter())
        .filter_map(to_daily)
        .collect();

    Ok(WeatherReport {
        location: location.to_string(),
        temperature_c: reading.air_temperature,
        wind_speed_kmh: reading.wind_speed,
        humidity_pct: reading.relative_humidity,
        precipitation_mm: reading.rainfall,
        condition: days.first().and_then(|d| d.condition.clone()),
        timezone: Some(TIMEZONE.to_string()),
        forecast: days,
        source: ATTRIBUTION.to_string(),
    })
}

fn to_daily(day: &DayForecast) -> Option<DailyForecast> {
    let mut daily = DailyForecast::on(day.date?);
    daily.condition.clone_from(&day.forecast);
    if let Some(temperature) = &day.temperature {
        daily.temp_low_c = temperature.low;
        daily.temp_high_c = temperature.high;
    }
    daily.humidity_pct = day.relative_humidity.as_ref().and_then(|h| h.high);
    if let Some(wind) = &day.wind {
        daily.wind_direction.clone_from(&wind.direction);
        daily.wind_speed_kmh = wind.speed.as_ref().and_then(|s| s.high);
    }
    Some(daily)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::weather::stub;

    const REALTIME: &str = r#"{
        "items": [{
            "timestamp": "2025-03-01T10:00:00+08:00",
            "stations": [{"id": "S106"}, {"id": "S24"}],
            "readings": {
                "Ang Mo Kio Avenue 5": {"air_temperature": 30.1, "relative_humidity": 70},
                "Changi": {"air_temperature": 29.0, "relative_humidity": 75},
                "Pasir Ris Street 51": {"air_temperature": 28.4, "relative_humidity": 81, "wind_speed": 12.5, "rainfall": 0.2}
            }
        }]
    }"#;

    const FORECAST: &str = r#"{
        "items": [{
            "forecasts": [
                {
                    "date": "2025-03-02",
                    "forecast": "Thundery Showers",
                    "temperature": {"low": 24, "high": 33},
                    "relative_humidity": {"low": 55, "high": 95},
                    "wind": {"speed": {"low": 10, "high": 20}, "direction": "NNE"}
                },
                {"date": "2025-03-03", "forecast": "Partly Cloudy (Day)"},
                {"forecast": "Undated entries are skipped"}
            ]
        }]
    }"#;

    fn prefs() -> Vec<String> {
        Config::default().weather.preferred_stations
    }

    fn parse(realtime: &str, forecast: &str) -> (RealtimeResponse, ForecastResponse) {
        (
            serde_json::from_str(realtime).unwrap(),
            serde_json::from_str(forecast).unwrap(),
        )
    }

    #[test]
    fn test_build_report_prefers_pasir_ris() {
        let (realtime, forecast) = parse(REALTIME, FORECAST);
        let report = build_report("Pasir Ris", &realtime, &forecast, &prefs()).unwrap();

        assert_eq!(report.temperature_c, Some(28.4));
        assert_eq!(report.humidity_pct, Some(81.0));
        assert_eq!(report.wind_speed_kmh, Some(12.5));
        assert_eq!(report.precipitation_mm, Some(0.2));
        assert_eq!(report.timezone.as_deref(), Some("Asia/Singapore"));
        assert_eq!(report.condition.as_deref(), Some("Thundery Showers"));
    }

    #[test]
    fn test_build_report_falls_back_to_first_station() {
        let (realtime, forecast) = parse(REALTIME, FORECAST);
        let report =
            build_report("Pasir Ris", &realtime, &forecast, &["jurong".to_string()]).unwrap();

        assert_eq!(report.temperature_c, Some(30.1));
    }

    #[test]
    fn test_build_report_forecast_days() {
        let (realtime, forecast) = parse(REALTIME, FORECAST);
        let report = build_report("Pasir Ris", &realtime, &forecast, &prefs()).unwrap();

        assert_eq!(report.forecast.len(), 2);
        let first = &report.forecast[0];
        assert_eq!(first.date, NaiveDate::from_ymd_opt(2025, 3, 2).unwrap());
        assert_eq!(first.temp_low_c, Some(24.0));
        assert_eq!(first.temp_high_c, Some(33.0));
        assert_eq!(first.wind_direction.as_deref(), Some("NNE"));
        assert_eq!(first.wind_speed_kmh, Some(20.0));
        assert_eq!(first.humidity_pct, Some(95.0));

        let second = &report.forecast[1];
        assert!(second.temp_low_c.is_none());
        assert!(second.wind_direction.is_none());
    }

    #[test]
    fn test_build_report_without_realtime_items_fails() {
        let (realtime, forecast) = parse(r#"{"items": []}"#, FORECAST);
        let err = build_report("Pasir Ris", &realtime, &forecast, &prefs()).unwrap_err();
        assert!(matches!(err, WeatherError::MissingData { .. }));
    }

    #[test]
    fn test_build_report_without_stations_has_no_current_readings() {
        let (realtime, forecast) = parse(r#"{"items": [{"readings": {}}]}"#, r#"{"items": []}"#);
        let report = build_report("Pasir Ris", &realtime, &forecast, &prefs()).unwrap();

        assert!(report.temperature_c.is_none());
        assert!(report.forecast.is_empty());
    }

    fn backend_for(base: &str) -> NeaBackend {
        let mut config = Config::default();
        config.weather.nea_realtime_url = format!("{base}/realtime");
        config.weather.nea_forecast_url = format!("{base}/forecast");
        NeaBackend::new(Client::new(), &config)
    }

    #[tokio::test]
    async fn test_fetch_over_http() {
        let base = stub::serve(vec![
            ("/realtime", 200, REALTIME.to_string()),
            ("/forecast", 200, FORECAST.to_string()),
        ])
        .await;

        let report = backend_for(&base).fetch(None).await.unwrap();
        assert_eq!(report.location, "Pasir Ris, Singapore");
        assert_eq!(report.forecast.len(), 2);
    }

    #[tokio::test]
    async fn test_fetch_http_error() {
        let base = stub::serve(vec![
            ("/realtime", 500, String::new()),
            ("/forecast", 200, FORECAST.to_string()),
        ])
        .await;

        let err = backend_for(&base).fetch(None).await.unwrap_err();
        assert!(matches!(err, WeatherError::Status { .. }));
        assert!(err.to_string().contains("500"));
    }
}
