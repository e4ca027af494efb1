//! In-process stores for development and tests.
//!
//! Same contracts as the PostgreSQL and Redis stores, held behind
//! `tokio::sync::RwLock`s.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::{
    crypto::token::token_fingerprint,
    error::{AppError, Result},
    models::entry::{EntryId, EntrySummary, VaultEntry},
    models::session::Session,
    models::user::{User, UserId},
    repositories::traits::{EntryRepository, SessionStore, UserRepository},
};

/// Users keyed by email.
#[derive(Clone, Default)]
pub struct MemoryUserRepository {
    users: Arc<RwLock<HashMap<String, User>>>,
}

impl MemoryUserRepository {
    /// Creates an empty repository.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn create(&self, user: &User) -> Result<()> {
        let mut users = self.users.write().await;
        if users.contains_key(&user.email) {
            return Err(AppError::Conflict("Email already registered".to_string()));
        }
        users.insert(user.email.clone(), user.clone());
        Ok(())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let users = self.users.read().await;
        Ok(users.get(email).cloned())
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.id == id).cloned())
    }
}

/// Entries in insertion order.
#[derive(Clone, Default)]
pub struct MemoryEntryRepository {
    entries: Arc<RwLock<Vec<VaultEntry>>>,
}

impl MemoryEntryRepository {
    /// Creates an empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrites the stored blob of an entry, as corruption at rest would.
    #[cfg(test)]
    pub async fn replace_cipher(&self, id: EntryId, cipher: String) -> bool {
        let mut entries = self.entries.write().await;
        match entries.iter_mut().find(|e| e.id == id) {
            Some(entry) => {
                entry.cipher = cipher;
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl EntryRepository for MemoryEntryRepository {
    async fn insert(&self, entry: &VaultEntry) -> Result<()> {
        let mut entries = self.entries.write().await;
        entries.push(entry.clone());
        Ok(())
    }

    async fn list(&self, owner: UserId, limit: i64, offset: i64) -> Result<Vec<EntrySummary>> {
        let entries = self.entries.read().await;
        Ok(entries
            .iter()
            .rev()
            .filter(|e| e.owner_id == owner)
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .map(VaultEntry::summary)
            .collect())
    }

    async fn count(&self, owner: UserId) -> Result<i64> {
        let entries = self.entries.read().await;
        Ok(entries.iter().filter(|e| e.owner_id == owner).count() as i64)
    }

    async fn find(&self, owner: UserId, id: EntryId) -> Result<Option<VaultEntry>> {
        let entries = self.entries.read().await;
        Ok(entries
            .iter()
            .find(|e| e.id == id && e.owner_id == owner)
            .cloned())
    }

    async fn delete(&self, owner: UserId, id: EntryId) -> Result<u64> {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|e| !(e.id == id && e.owner_id == owner));
        Ok((before - entries.len()) as u64)
    }
}

/// Sessions keyed by token fingerprint.
#[derive(Clone, Default)]
pub struct MemorySessionStore {
    sessions: Arc<RwLock<HashMap<String, Session>>>,
}

impl MemorySessionStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn create(&self, token: &str, session: &Session) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        sessions.insert(token_fingerprint(token), session.clone());
        Ok(())
    }

    async fn get(&self, token: &str) -> Result<Option<Session>> {
        let sessions = self.sessions.read().await;
        Ok(sessions.get(&token_fingerprint(token)).cloned())
    }

    async fn invalidate(&self, token: &str) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        sessions.remove(&token_fingerprint(token));
        Ok(())
    }

    async fn purge_expired(&self) -> Result<usize> {
        let now = chrono::Utc::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| !session.is_expired_at(now));
        Ok(before - sessions.len())
    }
}
