//! Redis-backed cache client.

use std::time::Duration;

use async_trait::async_trait;

use super::{CacheClient, CacheError};

impl From<::redis::RedisError> for CacheError {
    fn from(err: ::redis::RedisError) -> Self {
        CacheError::Backend(err.to_string())
    }
}

pub struct RedisCache {
    client: ::redis::Client,
}

impl RedisCache {
    /// Opens a client for `redis://host:port`. No connection is made until first use.
    pub fn open(host: &str, port: u16) -> Result<Self, CacheError> {
        let client = ::redis::Client::open(format!("redis://{}:{}", host, port))?;
        tracing::info!(host, port, "redis cache configured");
        Ok(Self { client })
    }
}

#[async_trait]
impl CacheClient for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let data: Option<String> = ::redis::cmd("GET").arg(key).query_async(&mut conn).await?;
        Ok(data)
    }

    async fn set_ex(&self, key: &str, ttl: Duration, value: String) -> Result<(), CacheError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        // SETEX rejects a zero expiry
        ::redis::cmd("SETEX")
            .arg(key)
            .arg(ttl.as_secs().max(1))
            .arg(value)
            .query_async::<()>(&mut conn)
            .await?;
        Ok(())
    }
}
