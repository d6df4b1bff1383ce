//! Domain types for the helpdesk.
//!
//! Identifiers, the ticket record and its status, the create payloads, and the
//! field-error map returned by validation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Unique identifier for a ticket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TicketId(Uuid);

impl TicketId {
    /// Generate a fresh random ticket ID
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// The underlying UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for TicketId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TicketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of the user who owns tickets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(Uuid);

impl OwnerId {
    /// Generate a fresh random owner ID
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// The underlying UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for OwnerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for OwnerId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

/// Lifecycle status of a ticket
///
/// Serialized with the same strings used in storage, e.g. `"In Progress"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TicketStatus {
    /// Newly created, not yet picked up
    #[default]
    Open,
    /// Being worked on
    #[serde(rename = "In Progress")]
    InProgress,
    /// Waiting on something external
    #[serde(rename = "On Hold")]
    OnHold,
    /// Fixed, awaiting confirmation
    Resolved,
    /// Done
    Closed,
}

impl TicketStatus {
    /// Every status, in lifecycle order
    pub const ALL: [Self; 5] = [
        Self::Open,
        Self::InProgress,
        Self::OnHold,
        Self::Resolved,
        Self::Closed,
    ];

    /// The storage and wire representation
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "Open",
            Self::InProgress => "In Progress",
            Self::OnHold => "On Hold",
            Self::Resolved => "Resolved",
            Self::Closed => "Closed",
        }
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A status string that names no member of [`TicketStatus`]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown ticket status: {0:?}")]
pub struct UnknownStatus(pub String);

impl FromStr for TicketStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

/// A persisted support ticket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    /// Assigned by the store at creation, never changes
    pub id: TicketId,
    /// The owning user
    #[serde(rename = "userId")]
    pub owner_id: OwnerId,
    /// Short summary, never empty
    pub subject: String,
    /// Details, never empty
    pub description: String,
    /// Current status
    pub status: TicketStatus,
    /// When the ticket was created
    pub created_at: DateTime<Utc>,
    /// When the ticket was last changed
    pub updated_at: DateTime<Utc>,
}

/// Insert payload for a ticket that has no ID yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTicket {
    /// The owning user
    pub owner_id: OwnerId,
    /// Short summary
    pub subject: String,
    /// Details
    pub description: String,
    /// Initial status
    pub status: TicketStatus,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Same as `created_at` for a new ticket
    pub updated_at: DateTime<Utc>,
}

impl NewTicket {
    /// Attach the store-assigned ID
    #[must_use]
    pub fn into_ticket(self, id: TicketId) -> Ticket {
        Ticket {
            id,
            owner_id: self.owner_id,
            subject: self.subject,
            description: self.description,
            status: self.status,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Raw create-ticket form submission
///
/// Every field may be absent; validation decides what is acceptable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketForm {
    /// Submitted subject
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    /// Submitted description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Submitted status name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl TicketForm {
    /// Form with subject and description set and no status
    #[must_use]
    pub fn new(subject: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            subject: Some(subject.into()),
            description: Some(description.into()),
            status: None,
        }
    }

    /// Set the submitted status name
    #[must_use]
    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }
}

/// Validation messages keyed by form field name
///
/// Serializes as `{ "subject": ["Subject cannot be empty."] }`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    /// No errors
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a message against `field`
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    /// Messages for `field`, if any
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    /// Whether `field` has at least one message
    #[must_use]
    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// Names of the fields that failed
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Whether there are no errors
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of failing fields
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }
}

/// JSON body returned by the create, update and delete endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MutationResponse {
    /// Human-readable summary
    pub message: String,
    /// Per-field validation messages, empty unless validation failed
    #[serde(default)]
    pub errors: FieldErrors,
    /// The created ticket, on success
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ticket: Option<Ticket>,
}
