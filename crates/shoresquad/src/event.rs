//! Cleanup events and the attendance log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, info};

use crate::config::CleanupConfig;
use crate::crew::{next_id, parse_id};
use crate::error::{Error, Result};
use crate::storage::{keys, Store};

/// A scheduled cleanup a user may mark as attended.
///
/// `attended_date` is set exactly when `attended` is true. Stored records
/// that break this are normalized when read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// Identifier.
    pub id: i64,

    /// Where the cleanup takes place.
    pub location: String,

    /// Whether the user attended.
    pub attended: bool,

    /// When attendance was logged.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attended_date: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEvent {
    id: i64,
    location: String,
    #[serde(default)]
    attended: bool,
    #[serde(default)]
    attended_date: Option<DateTime<Utc>>,
}

impl<'de> Deserialize<'de> for Event {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = RawEvent::deserialize(deserializer)?;
        let attended_date = if raw.attended { raw.attended_date } else { None };
        Ok(Self {
            id: raw.id,
            location: raw.location,
            attended: attended_date.is_some(),
            attended_date,
        })
    }
}

impl Event {
    /// Create an event that has not been attended.
    #[must_use]
    pub fn new(id: i64, location: impl Into<String>) -> Self {
        Self {
            id,
            location: location.into(),
            attended: false,
            attended_date: None,
        }
    }

    /// Record attendance at `at`. Returns `false` if already attended, in
    /// which case the original date is kept.
    pub fn mark_attended(&mut self, at: DateTime<Utc>) -> bool {
        if self.attended {
            return false;
        }
        self.attended = true;
        self.attended_date = Some(at);
        true
    }
}

/// Result of marking an event as attended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attended {
    /// The event after the change.
    pub event: Event,
    /// `false` when the event had already been marked.
    pub newly_marked: bool,
}

/// Attendance tracking over the stored event collection.
#[derive(Debug)]
pub struct EventLog<'a> {
    store: &'a Store,
}

impl<'a> EventLog<'a> {
    /// Create an event log backed by `store`.
    #[must_use]
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// All events in insertion order.
    #[must_use]
    pub fn list_events(&self) -> Vec<Event> {
        self.store.load(keys::EVENTS).unwrap_or_default()
    }

    /// Write the configured next cleanup as the first event if no event
    /// collection exists yet. Returns whether anything was written.
    pub fn seed(&self, cleanup: &CleanupConfig) -> bool {
        if self.store.load::<Vec<Event>>(keys::EVENTS).is_some() {
            return false;
        }
        let event = Event::new(Utc::now().timestamp_millis(), cleanup.name.clone());
        debug!(location = %event.location, "Seeding next cleanup");
        self.store.save(keys::EVENTS, &[event])
    }

    /// Append a new, unattended event at `location`.
    ///
    /// # Errors
    ///
    /// Returns an error if `location` is blank.
    pub fn schedule_event(&self, location: &str) -> Result<Event> {
        let location = location.trim();
        if location.is_empty() {
            return Err(Error::input("event location must not be empty"));
        }

        let mut events = self.list_events();
        let id = next_id(events.iter().map(|e| e.id), Utc::now().timestamp_millis());
        let event = Event::new(id, location);
        events.push(event.clone());
        self.store.save(keys::EVENTS, &events);

        info!(id, location, "Cleanup scheduled");
        Ok(event)
    }

    /// Mark the event with the given id as attended now.
    ///
    /// Marking an attended event again changes nothing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EventNotFound`] if no event has that id.
    pub fn mark_attended(&self, id: &str) -> Result<Attended> {
        let mut events = self.list_events();
        let event = parse_id(id)
            .and_then(|parsed| events.iter_mut().find(|e| e.id == parsed))
            .ok_or_else(|| Error::event_not_found(id.trim()))?;

        let newly_marked = event.mark_attended(Utc::now());
        let event = event.clone();
        if newly_marked {
            self.store.save(keys::EVENTS, &events);
            info!(id = event.id, location = %event.location, "Cleanup attendance logged");
        }

        Ok(Attended {
            event,
            newly_marked,
        })
    }
}
