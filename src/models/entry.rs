use chrono::{DateTime, Utc};
use garde::Validate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::models::user::UserId;

/// Identifier of a vault entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(pub Uuid);

impl EntryId {
    /// Generates a fresh random id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EntryId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for EntryId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// A stored credential record.
#[derive(Clone, Debug)]
pub struct VaultEntry {
    /// The unique identifier for the entry.
    pub id: EntryId,
    /// The user who owns the entry. Never changes.
    pub owner_id: UserId,
    /// Display label.
    pub site: String,
    /// Optional display URI.
    pub link: Option<String>,
    /// Display username.
    pub username: String,
    /// base64(nonce ‖ tag ‖ ciphertext) of the password.
    pub cipher: String,
    /// The timestamp when the entry was created.
    pub created_at: DateTime<Utc>,
}

impl VaultEntry {
    /// Strips the secret for listing.
    pub fn summary(&self) -> EntrySummary {
        EntrySummary {
            id: self.id,
            site: self.site.clone(),
            link: self.link.clone(),
            username: self.username.clone(),
            created_at: self.created_at,
        }
    }
}

/// Entry metadata as returned by listings. Carries no secret material.
#[derive(Clone, Debug, Serialize)]
pub struct EntrySummary {
    pub id: EntryId,
    pub site: String,
    pub link: Option<String>,
    pub username: String,
    pub created_at: DateTime<Utc>,
}

/// Input for a new entry, before encryption.
#[derive(Validate)]
pub struct NewEntry {
    #[garde(length(min = 1))]
    pub site: String,
    #[garde(skip)]
    pub link: Option<String>,
    #[garde(length(min = 1))]
    pub username: String,
    #[garde(length(min = 1))]
    pub password: String,
}

/// One page of a user's entries, newest first.
#[derive(Clone, Debug, Serialize)]
pub struct EntryPage {
    pub entries: Vec<EntrySummary>,
    pub page: i64,
    pub page_size: i64,
    pub total: i64,
    pub total_pages: i64,
}
