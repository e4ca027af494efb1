use redis::aio::ConnectionManager;
use std::sync::Arc;

use crate::config::{Config, StorageBackend};
use crate::crypto::cipher::VaultCipher;
use crate::crypto::kdf::derive_key;
use crate::crypto::password::CredentialHasher;
use crate::error::Result;
use crate::repositories::{
    entry::PgEntryRepository,
    memory::{MemoryEntryRepository, MemorySessionStore, MemoryUserRepository},
    session::RedisSessionStore,
    traits::{EntryRepository, SessionStore, UserRepository},
    user::PgUserRepository,
};

/// The application's state.
///
/// Everything in here is either immutable for the life of the process (config,
/// cipher, hasher) or an injected store handle.
#[derive(Clone)]
pub struct AppState {
    /// The application's configuration.
    pub config: Arc<Config>,
    /// Seals and opens vault secrets under the master key.
    pub cipher: Arc<VaultCipher>,
    /// Hashes and verifies login passwords.
    pub hasher: Arc<CredentialHasher>,
    /// User storage.
    pub users: Arc<dyn UserRepository>,
    /// Entry storage.
    pub entries: Arc<dyn EntryRepository>,
    /// Session storage.
    pub sessions: Arc<dyn SessionStore>,
}

impl AppState {
    /// Creates a new `AppState`, connecting to the configured backend.
    ///
    /// # Arguments
    ///
    /// * `config` - The application's configuration.
    ///
    /// # Returns
    ///
    /// A `Result` containing the `AppState`.
    pub async fn new(config: &Config) -> Result<Self> {
        match &config.storage {
            StorageBackend::Postgres {
                database_url,
                pool_size,
                redis_url,
            } => {
                let db = crate::db::create_pool(database_url, *pool_size)?;
                crate::db::ensure_schema(&db).await?;
                tracing::info!("✅ PostgreSQL Pool initialized with deadpool-postgres");

                let redis_client = redis::Client::open(redis_url.as_str())?;
                let redis = ConnectionManager::new(redis_client).await?;
                tracing::info!("✅ Redis Connection Manager initialized (pooled)");

                Self::with_stores(
                    config,
                    Arc::new(PgUserRepository::new(db.clone())),
                    Arc::new(PgEntryRepository::new(db)),
                    Arc::new(RedisSessionStore::new(redis)),
                )
            }
            StorageBackend::Memory => {
                tracing::warn!("⚠️  Using in-memory storage, all data is lost on restart");
                Self::in_memory(config)
            }
        }
    }

    /// Creates an `AppState` backed entirely by process memory.
    pub fn in_memory(config: &Config) -> Result<Self> {
        Self::with_stores(
            config,
            Arc::new(MemoryUserRepository::new()),
            Arc::new(MemoryEntryRepository::new()),
            Arc::new(MemorySessionStore::new()),
        )
    }

    /// Creates an `AppState` over explicit stores.
    ///
    /// Derives the master key once; the cipher holds it for the rest of the
    /// process lifetime.
    pub fn with_stores(
        config: &Config,
        users: Arc<dyn UserRepository>,
        entries: Arc<dyn EntryRepository>,
        sessions: Arc<dyn SessionStore>,
    ) -> Result<Self> {
        let key = derive_key(&config.vault_secret, &config.key_derivation)?;
        let cipher = VaultCipher::new(key);
        tracing::info!(
            "✅ Master key derived ({})",
            config.key_derivation.name()
        );

        let hasher = CredentialHasher::new(config.password_hash_cost)?;

        Ok(AppState {
            config: Arc::new(config.clone()),
            cipher: Arc::new(cipher),
            hasher: Arc::new(hasher),
            users,
            entries,
            sessions,
        })
    }
}
