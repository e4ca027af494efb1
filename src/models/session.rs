use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::user::UserId;

/// Represents a user session.
///
/// Lives only in the session store, keyed by a fingerprint of the opaque
/// token the client holds in its `session_id` cookie.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// The ID of the user this session belongs to.
    pub user_id: UserId,
    /// The timestamp when the session was created.
    pub created_at: DateTime<Utc>,
    /// The timestamp when the session expires.
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Whether the session has passed its expiry at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Seconds left before expiry, zero once expired.
    pub fn remaining_secs(&self, now: DateTime<Utc>) -> u64 {
        (self.expires_at - now).num_seconds().max(0) as u64
    }
}
