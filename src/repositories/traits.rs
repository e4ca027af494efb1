use async_trait::async_trait;

use crate::error::Result;
use crate::models::entry::{EntryId, EntrySummary, VaultEntry};
use crate::models::session::Session;
use crate::models::user::{User, UserId};

/// Durable storage for registered users.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Inserts a user. A taken email fails with `AppError::Conflict`.
    async fn create(&self, user: &User) -> Result<()>;

    /// Looks a user up by exact email.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Looks a user up by id.
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>>;
}

/// Durable storage for vault entries. Every read and delete is scoped to an owner.
#[async_trait]
pub trait EntryRepository: Send + Sync {
    /// Inserts a new entry.
    async fn insert(&self, entry: &VaultEntry) -> Result<()>;

    /// Returns one slice of the owner's entries, newest first.
    async fn list(&self, owner: UserId, limit: i64, offset: i64) -> Result<Vec<EntrySummary>>;

    /// Counts the owner's entries.
    async fn count(&self, owner: UserId) -> Result<i64>;

    /// Fetches an entry if it exists and belongs to `owner`.
    async fn find(&self, owner: UserId, id: EntryId) -> Result<Option<VaultEntry>>;

    /// Deletes an entry if it belongs to `owner`; returns the number of rows removed.
    async fn delete(&self, owner: UserId, id: EntryId) -> Result<u64>;
}

/// Server-side session records keyed by opaque token.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Stores `session` under `token` until its expiry.
    async fn create(&self, token: &str, session: &Session) -> Result<()>;

    /// Returns the session for `token`, if any.
    async fn get(&self, token: &str) -> Result<Option<Session>>;

    /// Removes the session for `token`. Removing an unknown token is not an error.
    async fn invalidate(&self, token: &str) -> Result<()>;

    /// Drops sessions past their expiry; returns how many were removed.
    async fn purge_expired(&self) -> Result<usize>;
}
