use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use time::{Duration, OffsetDateTime};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

const KEY_PREFIX: &str = "calcvault:revoked:";

fn revoked_key(jti: Uuid) -> String {
    format!("{}{}", KEY_PREFIX, jti)
}

/// Cache of revoked token IDs. Entries expire on their own once the token
/// they belong to would have expired anyway.
#[async_trait]
pub trait TokenBlacklist: Send + Sync {
    async fn revoke(&self, jti: Uuid, ttl_secs: u64) -> anyhow::Result<()>;
    async fn is_revoked(&self, jti: Uuid) -> anyhow::Result<bool>;
}

/// Redis-backed blacklist: one `SET ... EX ttl` per revoked jti.
#[derive(Clone)]
pub struct RedisBlacklist {
    conn: ConnectionManager,
}

impl RedisBlacklist {
    pub async fn connect(redis_url: &str) -> anyhow::Result<Self> {
        let client = redis::Client::open(redis_url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl TokenBlacklist for RedisBlacklist {
    async fn revoke(&self, jti: Uuid, ttl_secs: u64) -> anyhow::Result<()> {
        let mut conn = self.conn.clone();
        let _: () = conn.set_ex(revoked_key(jti), 1u8, ttl_secs).await?;
        debug!(%jti, ttl_secs, "token revoked");
        Ok(())
    }

    async fn is_revoked(&self, jti: Uuid) -> anyhow::Result<bool> {
        let mut conn = self.conn.clone();
        let found: bool = conn.exists(revoked_key(jti)).await?;
        Ok(found)
    }
}

/// In-memory blacklist used by tests and `AppState::fake()`.
#[derive(Clone, Default)]
pub struct MemoryBlacklist {
    entries: Arc<RwLock<HashMap<Uuid, OffsetDateTime>>>,
}

#[async_trait]
impl TokenBlacklist for MemoryBlacklist {
    async fn revoke(&self, jti: Uuid, ttl_secs: u64) -> anyhow::Result<()> {
        let expires = OffsetDateTime::now_utc() + Duration::seconds(ttl_secs as i64);
        self.entries.write().await.insert(jti, expires);
        Ok(())
    }

    async fn is_revoked(&self, jti: Uuid) -> anyhow::Result<bool> {
        let entries = self.entries.read().await;
        Ok(entries
            .get(&jti)
            .map(|expires| *expires > OffsetDateTime::now_utc())
            .unwrap_or(false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unknown_jti_is_not_revoked() {
        let bl = MemoryBlacklist::default();
        assert!(!bl.is_revoked(Uuid::new_v4()).await.unwrap());
    }

    #[tokio::test]
    async fn revoked_jti_is_reported_until_ttl_passes() {
        let bl = MemoryBlacklist::default();
        let jti = Uuid::new_v4();
        bl.revoke(jti, 60).await.unwrap();
        assert!(bl.is_revoked(jti).await.unwrap());
    }

    #[tokio::test]
    async fn expired_entry_is_not_revoked() {
        let bl = MemoryBlacklist::default();
        let jti = Uuid::new_v4();
        bl.revoke(jti, 0).await.unwrap();
        assert!(!bl.is_revoked(jti).await.unwrap());
    }
}
