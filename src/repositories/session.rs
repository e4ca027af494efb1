use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use crate::{
    crypto::token::token_fingerprint,
    error::{AppError, Result},
    models::session::Session,
    repositories::traits::SessionStore,
};

fn session_key(token: &str) -> String {
    format!("session:{}", token_fingerprint(token))
}

/// Redis-backed session store. Expiry is enforced by key TTL.
#[derive(Clone)]
pub struct RedisSessionStore {
    redis: ConnectionManager,
}

impl RedisSessionStore {
    /// Creates a store over a pooled Redis connection.
    pub fn new(redis: ConnectionManager) -> Self {
        Self { redis }
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn create(&self, token: &str, session: &Session) -> Result<()> {
        let session_json = sonic_rs::to_string(session)
            .map_err(|e| AppError::Internal(format!("Session serialization failed: {}", e)))?;

        let ttl = session.remaining_secs(chrono::Utc::now()).max(1);
        let mut redis = self.redis.clone();
        let _: () = redis
            .set_ex(session_key(token), &session_json, ttl)
            .await
            .map_err(|e| {
                tracing::error!("❌ Redis set_ex failed: {}", e);
                AppError::Redis(e)
            })?;
        Ok(())
    }

    async fn get(&self, token: &str) -> Result<Option<Session>> {
        let mut redis = self.redis.clone();
        let session_json: Option<String> = redis.get(session_key(token)).await?;

        match session_json {
            Some(json) => match sonic_rs::from_str::<Session>(&json) {
                Ok(session) => Ok(Some(session)),
                Err(e) => {
                    tracing::warn!("❌ Invalid session JSON, discarding: {}", e);
                    let _: () = redis.del(session_key(token)).await?;
                    Ok(None)
                }
            },
            None => Ok(None),
        }
    }

    async fn invalidate(&self, token: &str) -> Result<()> {
        let mut redis = self.redis.clone();
        let _: () = redis.del(session_key(token)).await?;
        Ok(())
    }

    async fn purge_expired(&self) -> Result<usize> {
        Ok(0)
    }
}
