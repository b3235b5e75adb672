//! Crew records and the crew registry.
//!
//! A crew is a named group of cleanup participants. The registry keeps the
//! whole collection as one JSON blob: every operation loads it, changes it and
//! writes it back in full.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::input::InputProvider;
use crate::storage::{keys, Store};

/// Question asked before a crew is deleted.
pub const DELETE_CONFIRMATION: &str = "Are you sure you want to delete this crew?";

/// A named group of cleanup participants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Crew {
    /// Unique identifier, milliseconds since the epoch at creation.
    pub id: i64,

    /// Display name.
    pub name: String,

    /// Participants in join order; the creator comes first.
    pub members: Vec<String>,

    /// When the crew was created.
    pub created_at: DateTime<Utc>,

    /// Completed cleanups. Displayed but never incremented.
    #[serde(default)]
    pub cleanup_count: u32,
}

impl Crew {
    /// Create a crew whose only member is `creator`.
    #[must_use]
    pub fn new(id: i64, name: impl Into<String>, creator: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            members: vec![creator.into()],
            created_at: Utc::now(),
            cleanup_count: 0,
        }
    }

    /// Check whether `member` already belongs to the crew.
    #[must_use]
    pub fn has_member(&self, member: &str) -> bool {
        self.members.iter().any(|m| m == member)
    }

    /// Add `member` unless already present. Returns whether it was added.
    pub fn add_member(&mut self, member: &str) -> bool {
        if self.has_member(member) {
            return false;
        }
        self.members.push(member.to_string());
        true
    }
}

/// Result of joining a crew.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Joined {
    /// The crew after joining.
    pub crew: Crew,
    /// `false` when the member was already part of the crew.
    pub added: bool,
}

/// Result of a delete request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The crew was removed.
    Deleted(Crew),
    /// The user declined the confirmation.
    Cancelled,
    /// No crew has that id.
    NotFound,
}

/// Parse a user-supplied crew or event id.
///
/// Anything that is not an integer cannot name a record.
#[must_use]
pub fn parse_id(id: &str) -> Option<i64> {
    id.trim().parse().ok()
}

/// Pick an id for a new record: the current time in milliseconds, bumped
/// past every existing id so ids grow with creation order.
#[must_use]
pub fn next_id(existing: impl IntoIterator<Item = i64>, now_ms: i64) -> i64 {
    existing
        .into_iter()
        .max()
        .map_or(now_ms, |max| now_ms.max(max.saturating_add(1)))
}

/// CRUD operations over the stored crew collection.
#[derive(Debug)]
pub struct CrewRegistry<'a> {
    store: &'a Store,
    member: String,
}

impl<'a> CrewRegistry<'a> {
    /// Create a registry acting on behalf of `member`.
    #[must_use]
    pub fn new(store: &'a Store, member: impl Into<String>) -> Self {
        Self {
            store,
            member: member.into(),
        }
    }

    /// The name recorded when this user creates or joins a crew.
    #[must_use]
    pub fn member(&self) -> &str {
        &self.member
    }

    /// All crews in insertion order, or an empty list if none are stored.
    #[must_use]
    pub fn list_crews(&self) -> Vec<Crew> {
        self.store.load(keys::CREWS).unwrap_or_default()
    }

    /// Look up a crew by its id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<Crew> {
        let id = parse_id(id)?;
        self.list_crews().into_iter().find(|c| c.id == id)
    }

    /// Create a crew named `name` with the current user as sole member.
    ///
    /// A blank name is a no-op and returns `None`.
    pub fn create_crew(&self, name: &str) -> Option<Crew> {
        let name = name.trim();
        if name.is_empty() {
            debug!("Ignoring crew creation with an empty name");
            return None;
        }

        let mut crews = self.list_crews();
        let id = next_id(crews.iter().map(|c| c.id), Utc::now().timestamp_millis());
        let crew = Crew::new(id, name, self.member.clone());
        crews.push(crew.clone());
        self.store.save(keys::CREWS, &crews);

        info!(id, name, "Crew created");
        Some(crew)
    }

    /// Add the current user to the crew with the given id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CrewNotFound`] if no crew has that id. The stored
    /// collection is left untouched in that case.
    pub fn join_crew(&self, id: &str) -> Result<Joined> {
        let mut crews = self.list_crews();
        let crew = parse_id(id)
            .and_then(|parsed| crews.iter_mut().find(|c| c.id == parsed))
            .ok_or_else(|| Error::crew_not_found(id.trim()))?;

        let added = crew.add_member(&self.member);
        let crew = crew.clone();
        self.store.save(keys::CREWS, &crews);

        info!(id = crew.id, added, "Joined crew");
        Ok(Joined { crew, added })
    }

    /// Delete the crew with the given id after `input` confirms.
    ///
    /// The remaining crews keep their order.
    ///
    /// # Errors
    ///
    /// Returns an error if the confirmation cannot be read.
    pub fn delete_crew(&self, id: &str, input: &mut dyn InputProvider) -> Result<DeleteOutcome> {
        let mut crews = self.list_crews();
        let Some(position) = parse_id(id).and_then(|parsed| crews.iter().position(|c| c.id == parsed))
        else {
            return Ok(DeleteOutcome::NotFound);
        };

        if !input.confirm(DELETE_CONFIRMATION)? {
            debug!(id, "Crew deletion cancelled");
            return Ok(DeleteOutcome::Cancelled);
        }

        let removed = crews.remove(position);
        self.store.save(keys::CREWS, &crews);

        info!(id = removed.id, "Crew deleted");
        Ok(DeleteOutcome::Deleted(removed))
    }
}
