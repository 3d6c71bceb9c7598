//! Redis session store

#[cfg(feature = "redis-store")]
use async_trait::async_trait;

#[cfg(feature = "redis-store")]
use parley_core::{Session, SessionStore};
use parley_core::{ParleyError, Result};

#[cfg(feature = "redis-store")]
pub struct RedisStore {
    client: redis::Client,
    prefix: String,
    default_ttl: Option<u64>,
}

#[cfg(feature = "redis-store")]
fn map_redis_err(e: redis::RedisError) -> ParleyError {
    ParleyError::Store(e.to_string())
}

#[cfg(feature = "redis-store")]
impl RedisStore {
    pub fn new(url: &str) -> Result<Self> {
        let client = redis::Client::open(url).map_err(map_redis_err)?;
        Ok(Self {
            client,
            prefix: "parley:".to_string(),
            default_ttl: None,
        })
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Sessions expire this many seconds after their last write.
    pub fn with_ttl(mut self, ttl_seconds: u64) -> Self {
        self.default_ttl = Some(ttl_seconds);
        self
    }

    fn session_key(&self, sender: &str) -> String {
        format!("{}session:{}", self.prefix, sender)
    }

    async fn get_connection(&self) -> Result<redis::aio::MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(map_redis_err)
    }
}

#[cfg(feature = "redis-store")]
#[async_trait]
impl SessionStore for RedisStore {
    async fn exists(&self, sender: &str) -> Result<bool> {
        let mut conn = self.get_connection().await?;
        let count: i64 = redis::cmd("EXISTS")
            .arg(self.session_key(sender))
            .query_async(&mut conn)
            .await
            .map_err(map_redis_err)?;
        Ok(count > 0)
    }

    async fn get(&self, sender: &str) -> Result<Option<Session>> {
        let mut conn = self.get_connection().await?;
        let data: Option<String> = redis::cmd("GET")
            .arg(self.session_key(sender))
            .query_async(&mut conn)
            .await
            .map_err(map_redis_err)?;

        match data {
            Some(json) => {
                let session = serde_json::from_str(&json).map_err(|e| {
                    ParleyError::Store(format!("corrupt session for '{}': {}", sender, e))
                })?;
                Ok(Some(session))
            }
            None => Ok(None),
        }
    }

    async fn set(&self, sender: &str, session: &Session) -> Result<()> {
        let mut conn = self.get_connection().await?;
        let data = serde_json::to_string(session)?;
        let key = self.session_key(sender);

        if let Some(ttl) = self.default_ttl {
            redis::cmd("SETEX")
                .arg(&key)
                .arg(ttl)
                .arg(&data)
                .query_async::<()>(&mut conn)
                .await
                .map_err(map_redis_err)?;
        } else {
            redis::cmd("SET")
                .arg(&key)
                .arg(&data)
                .query_async::<()>(&mut conn)
                .await
                .map_err(map_redis_err)?;
        }

        tracing::trace!(sender, state = session.state, "Stored session");
        Ok(())
    }

    async fn delete(&self, sender: &str) -> Result<()> {
        let mut conn = self.get_connection().await?;
        redis::cmd("DEL")
            .arg(self.session_key(sender))
            .query_async::<()>(&mut conn)
            .await
            .map_err(map_redis_err)?;
        Ok(())
    }
}

#[cfg(not(feature = "redis-store"))]
pub struct RedisStore {
    _private: (),
}

#[cfg(not(feature = "redis-store"))]
impl RedisStore {
    pub fn new(_url: &str) -> Result<Self> {
        Err(ParleyError::Config(
            "Redis store requires the 'redis-store' feature".to_string(),
        ))
    }
}
