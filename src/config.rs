use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use zeroize::Zeroizing;

use crate::crypto::kdf::KeyDerivation;
use crate::crypto::password::HashCost;

/// Salt used for the master key when `VAULT_KDF_SALT` is not set.
const DEFAULT_KDF_SALT: &str = "passvault.master-key.v1";

/// Where users, entries and sessions are kept.
#[derive(Clone, Debug)]
pub enum StorageBackend {
    /// PostgreSQL for users and entries, Redis for sessions.
    Postgres {
        database_url: String,
        pool_size: usize,
        redis_url: String,
    },
    /// Process memory only. Everything is lost on restart.
    Memory,
}

/// The application's configuration.
#[derive(Clone)]
pub struct Config {
    /// Address the HTTP server binds to.
    pub bind_addr: SocketAddr,
    /// The storage backend.
    pub storage: StorageBackend,
    /// The duration of a session in days.
    pub session_duration_days: i64,
    /// The externally supplied secret the master key is derived from.
    pub vault_secret: Zeroizing<Vec<u8>>,
    /// How the master key is derived from `vault_secret`.
    pub key_derivation: KeyDerivation,
    /// Argon2id cost for login password hashes.
    pub password_hash_cost: HashCost,
    /// Entries per listing page.
    pub page_size: i64,
    /// Upper bound on any single store call.
    pub store_timeout: Duration,
    /// Origins allowed by CORS.
    pub cors_origins: Vec<String>,
    /// Whether cookies carry the `Secure` attribute.
    pub secure_cookies: bool,
}

fn var_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn parse_var<T>(name: &str, default: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    var_or(name, default)
        .parse()
        .with_context(|| format!("Invalid {}", name))
}

impl Config {
    /// Creates a new `Config` from environment variables.
    ///
    /// `VAULT_KEY` has no default: a build that silently fell back to a known
    /// secret would seal every entry under a public key.
    pub fn from_env() -> Result<Self> {
        let vault_secret = Zeroizing::new(
            env::var("VAULT_KEY")
                .context("VAULT_KEY must be set (generate with: openssl rand -hex 32)")?
                .into_bytes(),
        );

        if vault_secret.is_empty() {
            anyhow::bail!("VAULT_KEY must not be empty");
        }

        let key_derivation = match var_or("VAULT_KDF", "argon2id").as_str() {
            "argon2id" => KeyDerivation::Argon2id {
                salt: var_or("VAULT_KDF_SALT", DEFAULT_KDF_SALT).into_bytes(),
                memory_kib: parse_var("VAULT_KDF_MEMORY_KIB", "65536")?,
                iterations: parse_var("VAULT_KDF_ITERATIONS", "3")?,
                parallelism: parse_var("VAULT_KDF_PARALLELISM", "4")?,
            },
            "sha256" => KeyDerivation::Sha256,
            other => anyhow::bail!("Unknown VAULT_KDF '{}' (expected argon2id or sha256)", other),
        };

        let default_cost = HashCost::default();
        let password_hash_cost = HashCost {
            memory_kib: parse_var(
                "PASSWORD_HASH_MEMORY_KIB",
                &default_cost.memory_kib.to_string(),
            )?,
            iterations: parse_var(
                "PASSWORD_HASH_ITERATIONS",
                &default_cost.iterations.to_string(),
            )?,
            parallelism: parse_var(
                "PASSWORD_HASH_PARALLELISM",
                &default_cost.parallelism.to_string(),
            )?,
        };

        let storage = match var_or("STORAGE_BACKEND", "postgres").as_str() {
            "postgres" => StorageBackend::Postgres {
                database_url: env::var("DATABASE_URL")
                    .context("DATABASE_URL must be set")?,
                pool_size: parse_var("DATABASE_POOL_SIZE", "16")?,
                redis_url: var_or("REDIS_URL", "redis://127.0.0.1:6379"),
            },
            "memory" => StorageBackend::Memory,
            other => anyhow::bail!("Unknown STORAGE_BACKEND '{}' (expected postgres or memory)", other),
        };

        let page_size: i64 = parse_var("PAGE_SIZE", "20")?;
        if page_size < 1 {
            anyhow::bail!("PAGE_SIZE must be at least 1");
        }

        let session_duration_days: i64 = parse_var("SESSION_DURATION_DAYS", "7")?;
        if session_duration_days < 1 {
            anyhow::bail!("SESSION_DURATION_DAYS must be at least 1");
        }

        let cors_origins = var_or("CORS_ORIGINS", "http://localhost:3000")
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_string)
            .collect();

        Ok(Self {
            bind_addr: parse_var("BIND_ADDR", "127.0.0.1:3000")?,
            storage,
            session_duration_days,
            vault_secret,
            key_derivation,
            password_hash_cost,
            page_size,
            store_timeout: Duration::from_millis(parse_var("STORE_TIMEOUT_MS", "5000")?),
            cors_origins,
            secure_cookies: var_or("APP_ENV", "development") == "production",
        })
    }

    /// Session lifetime as a chrono duration.
    pub fn session_duration(&self) -> chrono::Duration {
        chrono::Duration::days(self.session_duration_days)
    }
}
