//! View rendering.
//!
//! Pure functions from records to markup. Two targets are supported: plain
//! text for the terminal and HTML fragments for embedding in a page. Nothing
//! here touches the store or the network.

use std::fmt::Write;

use serde::Serialize;

use crate::crew::Crew;
use crate::event::Event;
use crate::weather::{DailyForecast, WeatherError, WeatherReport};

/// Shown when there are no crews.
pub const NO_CREWS: &str = "Create or join a crew to start rallying your squad!";

/// Shown when there are no events.
pub const NO_EVENTS: &str = "No cleanups scheduled yet. Add one to get the squad moving!";

/// Shown while weather is being fetched.
pub const LOADING_WEATHER: &str = "🔄 Loading weather data...";

/// Markup target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Markup {
    /// Plain terminal text.
    #[default]
    Plain,
    /// HTML fragment.
    Html,
}

/// Kind of status message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    /// An action completed.
    Success,
    /// An action failed.
    Error,
    /// Work is in progress.
    Loading,
    /// Neutral information.
    Info,
}

impl MessageKind {
    fn css_class(self) -> &'static str {
        match self {
            Self::Success => "message-success",
            Self::Error => "message-error",
            Self::Loading => "message-loading",
            Self::Info => "message-info",
        }
    }
}

/// Escape text for inclusion in HTML.
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Condition keywords and their icons, checked in order.
const CONDITION_ICONS: &[(&[&str], &str)] = &[
    (&["rain", "showers", "drizzle"], "🌧️"),
    (&["cloud", "overcast"], "☁️"),
    (&["clear", "sunny", "fair"], "☀️"),
    (&["storm", "thunder"], "⛈️"),
    (&["snow"], "❄️"),
    (&["wind"], "🌪️"),
    (&["fog", "haze", "mist"], "🌫️"),
];

/// Pick an icon for a textual weather condition.
#[must_use]
pub fn condition_icon(condition: &str) -> &'static str {
    let condition = condition.to_lowercase();
    CONDITION_ICONS
        .iter()
        .find(|(words, _)| words.iter().any(|w| condition.contains(w)))
        .map_or("🌤️", |(_, icon)| *icon)
}

/// Render a status message.
#[must_use]
pub fn message(markup: Markup, kind: MessageKind, text: &str) -> String {
    match markup {
        Markup::Plain => text.to_string(),
        Markup::Html => format!(
            "<div class=\"message {}\">{}</div>",
            kind.css_class(),
            escape_html(text)
        ),
    }
}

/// Render the loading state of the weather panel.
#[must_use]
pub fn loading(markup: Markup) -> String {
    message(markup, MessageKind::Loading, LOADING_WEATHER)
}

/// Render a failed weather fetch. No partial report is shown.
#[must_use]
pub fn weather_error(markup: Markup, error: &WeatherError) -> String {
    message(
        markup,
        MessageKind::Error,
        &format!("⚠️ Failed to fetch weather: {error}. Please try refreshing."),
    )
}

fn placeholder(markup: Markup, text: &str) -> String {
    match markup {
        Markup::Plain => text.to_string(),
        Markup::Html => format!("<p class=\"placeholder-text\">{}</p>", escape_html(text)),
    }
}

/// Render the crew list.
#[must_use]
pub fn crews(markup: Markup, crews: &[Crew]) -> String {
    if crews.is_empty() {
        return placeholder(markup, NO_CREWS);
    }

    let mut out = String::new();
    for crew in crews {
        match markup {
            Markup::Plain => {
                let _ = writeln!(out, "{}", crew.name);
                let _ = writeln!(out, "  ID:       {}", crew.id);
                let _ = writeln!(
                    out,
                    "  Members:  {} ({})",
                    crew.members.len(),
                    crew.members.join(", ")
                );
                let _ = writeln!(out, "  Cleanups: {}", crew.cleanup_count);
            }
            Markup::Html => {
                let _ = writeln!(
                    out,
                    "<div class=\"crew-card\" data-crew-id=\"{id}\">\
                     <h4>{name}</h4>\
                     <p><strong>ID:</strong> {id}</p>\
                     <p><strong>Members:</strong> {members}</p>\
                     <p><strong>Cleanups:</strong> {cleanups}</p>\
                     </div>",
                    id = crew.id,
                    name = escape_html(&crew.name),
                    members = crew.members.len(),
                    cleanups = crew.cleanup_count,
                );
            }
        }
    }
    out.trim_end().to_string()
}

/// Render the event list.
#[must_use]
pub fn events(markup: Markup, events: &[Event]) -> String {
    if events.is_empty() {
        return placeholder(markup, NO_EVENTS);
    }

    let mut out = String::new();
    for event in events {
        let status = match event.attended_date {
            Some(date) => format!("attended {}", date.format("%Y-%m-%d")),
            None => "upcoming".to_string(),
        };
        match markup {
            Markup::Plain => {
                let _ = writeln!(out, "{}  {} ({status})", event.id, event.location);
            }
            Markup::Html => {
                let _ = writeln!(
                    out,
                    "<div class=\"event-card{}\" data-event-id=\"{}\"><h4>{}</h4><p>{}</p></div>",
                    if event.attended { " attended" } else { "" },
                    event.id,
                    escape_html(&event.location),
                    escape_html(&status),
                );
            }
        }
    }
    out.trim_end().to_string()
}

fn temperature_range(day: &DailyForecast) -> String {
    match (day.temp_low_c, day.temp_high_c) {
        (Some(low), Some(high)) => format!("{low}-{high}°C"),
        (Some(t), None) | (None, Some(t)) => format!("{t}°C"),
        (None, None) => "N/A".to_string(),
    }
}

/// Labelled details of a day, skipping what is absent.
fn day_details(day: &DailyForecast) -> Vec<(&'static str, String)> {
    let mut details = Vec::new();
    if let Some(direction) = &day.wind_direction {
        details.push(("Wind", direction.clone()));
    }
    if let Some(speed) = day.wind_speed_kmh {
        details.push(("Speed", format!("{speed} km/h")));
    }
    if let Some(humidity) = day.humidity_pct {
        details.push(("Humidity", format!("{humidity}%")));
    }
    if let Some(rain) = day.precipitation_mm {
        details.push(("Rain", format!("{rain} mm")));
    }
    details
}

/// Labelled current readings, skipping what is absent.
fn current_details(report: &WeatherReport) -> Vec<(&'static str, String)> {
    let mut details = Vec::new();
    if let Some(humidity) = report.humidity_pct {
        details.push(("Humidity", format!("{humidity}%")));
    }
    if let Some(wind) = report.wind_speed_kmh {
        details.push(("Wind", format!("{wind} km/h")));
    }
    if let Some(rain) = report.precipitation_mm {
        details.push(("Precipitation", format!("{rain} mm")));
    }
    if let Some(timezone) = &report.timezone {
        details.push(("Timezone", timezone.clone()));
    }
    details
}

/// Render a weather report: current conditions, the daily outlook and the
/// attribution. Missing readings are left out.
#[must_use]
pub fn weather(markup: Markup, report: &WeatherReport) -> String {
    match markup {
        Markup::Plain => weather_plain(report),
        Markup::Html => weather_html(report),
    }
}

fn weather_plain(report: &WeatherReport) -> String {
    let mut out = String::new();

    if report.has_current() {
        let _ = writeln!(out, "Current Conditions - {}", report.location);
        let condition = report.condition.as_deref().unwrap_or_default();
        let mut headline = condition_icon(condition).to_string();
        if let Some(temp) = report.temperature_c {
            let _ = write!(headline, " {temp}°C");
        }
        if !condition.is_empty() {
            let _ = write!(headline, " {condition}");
        }
        let _ = writeln!(out, "  {headline}");
        for (label, value) in current_details(report) {
            let _ = writeln!(out, "  {label}: {value}");
        }
    }

    if !report.forecast.is_empty() {
        if !out.is_empty() {
            out.push('\n');
        }
        let _ = writeln!(out, "{}-Day Forecast", report.forecast.len());
        for day in &report.forecast {
            let condition = day.condition.as_deref().unwrap_or_default();
            let _ = write!(
                out,
                "  {}  {} {}",
                day.date.format("%a, %b %-d"),
                condition_icon(condition),
                temperature_range(day)
            );
            if !condition.is_empty() {
                let _ = write!(out, "  {condition}");
            }
            out.push('\n');
            let details = day_details(day);
            if !details.is_empty() {
                let line: Vec<String> = details
                    .into_iter()
                    .map(|(label, value)| format!("{label}: {value}"))
                    .collect();
                let _ = writeln!(out, "      {}", line.join(" | "));
            }
        }
    }

    if !out.is_empty() {
        out.push('\n');
    }
    out.push_str(&report.source);
    out
}

fn weather_html(report: &WeatherReport) -> String {
    let mut out = String::new();

    if report.has_current() {
        let condition = report.condition.as_deref().unwrap_or_default();
        let _ = write!(
            out,
            "<div class=\"current-weather\"><h3>Current Conditions - {}</h3><div class=\"current-icon\">{}</div>",
            escape_html(&report.location),
            condition_icon(condition)
        );
        if let Some(temp) = report.temperature_c {
            let _ = write!(out, "<div class=\"current-temp\">{temp}°C</div>");
        }
        if !condition.is_empty() {
            let _ = write!(out, "<div class=\"current-desc\">{}</div>", escape_html(condition));
        }
        for (label, value) in current_details(report) {
            let _ = write!(
                out,
                "<div class=\"current-detail\">{label}: {}</div>",
                escape_html(&value)
            );
        }
        out.push_str("</div>\n");
    }

    if !report.forecast.is_empty() {
        let _ = write!(
            out,
            "<div class=\"forecast-header\"><h3>{}-Day Forecast</h3></div><div class=\"weather-grid\">",
            report.forecast.len()
        );
        for day in &report.forecast {
            let condition = day.condition.as_deref().unwrap_or_default();
            let _ = write!(
                out,
                "<div class=\"weather-card\"><div class=\"weather-date\">{}</div><div class=\"weather-icon\">{}</div><div class=\"weather-temp\">{}</div>",
                day.date.format("%a, %b %-d"),
                condition_icon(condition),
                temperature_range(day)
            );
            if !condition.is_empty() {
                let _ = write!(out, "<div class=\"weather-desc\">{}</div>", escape_html(condition));
            }
            let details = day_details(day);
            if !details.is_empty() {
                out.push_str("<div class=\"weather-details\">");
                for (label, value) in details {
                    let _ = write!(
                        out,
                        "<div class=\"weather-detail-item\"><span class=\"weather-detail-label\">{label}:</span> {}</div>",
                        escape_html(&value)
                    );
                }
                out.push_str("</div>");
            }
            out.push_str("</div>");
        }
        out.push_str("</div>\n");
    }

    let _ = write!(
        out,
        "<p class=\"attribution\">{}</p>",
        escape_html(&report.source)
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};

    fn report() -> WeatherReport {
        let mut day = DailyForecast::on(NaiveDate::from_ymd_opt(2025, 3, 2).unwrap());
        day.condition = Some("Thundery Showers".to_string());
        day.temp_low_c = Some(24.0);
        day.temp_high_c = Some(33.0);
        day.wind_direction = Some("NNE".to_string());

        WeatherReport {
            location: "Pasir Ris, Singapore".to_string(),
            temperature_c: Some(28.4),
            wind_speed_kmh: None,
            humidity_pct: Some(81.0),
            precipitation_mm: None,
            condition: Some("Partly Cloudy".to_string()),
            timezone: Some("Asia/Singapore".to_string()),
            forecast: vec![day],
            source: "Test data".to_string(),
        }
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html("<b>\"Tom\" & 'Jerry'</b>"),
            "&lt;b&gt;&quot;Tom&quot; &amp; &#39;Jerry&#39;&lt;/b&gt;"
        );
    }

    #[test]
    fn test_condition_icon() {
        assert_eq!(condition_icon("Thundery Showers"), "🌧️");
        assert_eq!(condition_icon("Partly Cloudy (Day)"), "☁️");
        assert_eq!(condition_icon("Clear sky"), "☀️");
        assert_eq!(condition_icon("Thunderstorm"), "⛈️");
        assert_eq!(condition_icon("Haze"), "🌫️");
        assert_eq!(condition_icon(""), "🌤️");
    }

    #[test]
    fn test_empty_crews_placeholder() {
        assert_eq!(crews(Markup::Plain, &[]), NO_CREWS);
        assert_eq!(
            crews(Markup::Html, &[]),
            format!("<p class=\"placeholder-text\">{NO_CREWS}</p>")
        );
    }

    #[test]
    fn test_crews_plain() {
        let mut crew = Crew::new(42, "Tide Turners", "You");
        crew.members.push("Ana".to_string());

        let out = crews(Markup::Plain, &[crew]);
        assert!(out.starts_with("Tide Turners"));
        assert!(out.contains("ID:       42"));
        assert!(out.contains("Members:  2 (You, Ana)"));
        assert!(out.contains("Cleanups: 0"));
    }

    #[test]
    fn test_crews_html_escapes_names() {
        let crew = Crew::new(1, "<script>", "You");
        let out = crews(Markup::Html, &[crew]);
        assert!(out.contains("&lt;script&gt;"));
        assert!(!out.contains("<script>"));
    }

    #[test]
    fn test_events_render_status() {
        let mut attended = Event::new(2, "Changi");
        attended.mark_attended(Utc::now());
        let out = events(Markup::Plain, &[Event::new(1, "Pasir Ris"), attended]);

        assert!(out.contains("1  Pasir Ris (upcoming)"));
        assert!(out.contains("2  Changi (attended "));
        assert_eq!(events(Markup::Plain, &[]), NO_EVENTS);
    }

    #[test]
    fn test_weather_plain() {
        let out = weather(Markup::Plain, &report());

        assert!(out.contains("Current Conditions - Pasir Ris, Singapore"));
        assert!(out.contains("28.4°C Partly Cloudy"));
        assert!(out.contains("Humidity: 81%"));
        assert!(out.contains("1-Day Forecast"));
        assert!(out.contains("Sun, Mar 2"));
        assert!(out.contains("24-33°C"));
        assert!(out.contains("Wind: NNE"));
        assert!(out.ends_with("Test data"));
    }

    #[test]
    fn test_weather_omits_absent_fields() {
        let out = weather(Markup::Plain, &report());
        assert!(!out.contains("Precipitation"));
        assert!(!out.contains("Speed"));
        assert!(!out.contains("None"));

        let html = weather(Markup::Html, &report());
        assert!(!html.contains("Precipitation"));
        assert!(!html.contains("Speed:"));
    }

    #[test]
    fn test_weather_without_current_readings() {
        let mut report = report();
        report.temperature_c = None;
        report.humidity_pct = None;
        report.condition = None;
        report.timezone = None;

        let out = weather(Markup::Plain, &report);
        assert!(!out.contains("Current Conditions"));
        assert!(out.starts_with("1-Day Forecast"));
    }

    #[test]
    fn test_temperature_range_variants() {
        let mut day = DailyForecast::on(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
        assert_eq!(temperature_range(&day), "N/A");
        day.temp_high_c = Some(31.0);
        assert_eq!(temperature_range(&day), "31°C");
        day.temp_low_c = Some(25.5);
        assert_eq!(temperature_range(&day), "25.5-31°C");
    }

    #[test]
    fn test_weather_html_structure() {
        let html = weather(Markup::Html, &report());
        assert!(html.contains("<div class=\"current-weather\">"));
        assert!(html.contains("<div class=\"weather-card\">"));
        assert!(html.contains("<p class=\"attribution\">Test data</p>"));
    }

    #[test]
    fn test_weather_error_message() {
        let err = WeatherError::missing("real-time readings");
        let out = weather_error(Markup::Plain, &err);
        assert!(out.contains("real-time readings"));
        assert!(out.ends_with("Please try refreshing."));

        let html = weather_error(Markup::Html, &err);
        assert!(html.starts_with("<div class=\"message message-error\">"));
        assert!(!html.contains("weather-card"));
    }

    #[test]
    fn test_message_kinds() {
        assert_eq!(message(Markup::Plain, MessageKind::Success, "Done"), "Done");
        assert_eq!(
            message(Markup::Html, MessageKind::Info, "a & b"),
            "<div class=\"message message-info\">a &amp; b</div>"
        );
        assert!(loading(Markup::Plain).contains("Loading weather data"));
    }
}
