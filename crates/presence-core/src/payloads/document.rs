//! Presence notification documents
//!
//! A notify carries a JSON presence document describing one identity's
//! state. The aggregator only cares about a single short status note:
//! the first person-level note wins, otherwise the first top-level note.

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Per-person status block inside a presence document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PersonStatus {
    pub id: String,
    #[serde(default)]
    pub notes: Vec<String>,
}

/// A parsed presence notification document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PresenceDocument {
    #[serde(default)]
    pub persons: Vec<PersonStatus>,
    #[serde(default)]
    pub notes: Vec<String>,
}

impl PresenceDocument {
    /// Parse a raw notify body
    pub fn parse(body: &str) -> Result<Self, DomainError> {
        serde_json::from_str(body).map_err(|e| DomainError::MalformedDocument(e.to_string()))
    }

    /// Select the status note: the first non-empty person note, falling
    /// back to the first top-level note. `None` means the document carries
    /// no usable status and must not touch the aggregate.
    pub fn status_note(&self) -> Option<&str> {
        self.persons
            .iter()
            .flat_map(|person| person.notes.iter())
            .chain(self.notes.iter())
            .map(String::as_str)
            .find(|note| !note.trim().is_empty())
    }
}
