//! Session store backends and per-sender turn locks

mod locks;
mod memory;
mod redis;

pub use locks::{SenderGuard, SenderLocks};
pub use memory::{DEFAULT_SHARDS, MemoryStore};
pub use parley_core::{ParleyError, Result, Session, SessionStore};
pub use redis::RedisStore;

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StoreConfig {
    #[serde(alias = "CACHE", alias = "cache")]
    Memory {
        #[serde(default)]
        shards: Option<usize>,
        #[serde(default)]
        ttl_seconds: Option<u64>,
    },
    #[serde(alias = "REDIS")]
    Redis {
        url: String,
        #[serde(default)]
        prefix: Option<String>,
        #[serde(default)]
        ttl_seconds: Option<u64>,
    },
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig::Memory {
            shards: None,
            ttl_seconds: None,
        }
    }
}

pub fn create_store(config: &StoreConfig) -> Result<Arc<dyn SessionStore>> {
    match config {
        StoreConfig::Memory {
            shards,
            ttl_seconds,
        } => {
            let mut store = MemoryStore::with_shards(shards.unwrap_or(DEFAULT_SHARDS));
            if let Some(ttl) = ttl_seconds {
                store = store.with_ttl(Duration::from_secs(*ttl));
            }
            Ok(Arc::new(store))
        }

        #[cfg(feature = "redis-store")]
        StoreConfig::Redis {
            url,
            prefix,
            ttl_seconds,
        } => {
            let mut store = RedisStore::new(url)?;
            if let Some(p) = prefix {
                store = store.with_prefix(p);
            }
            if let Some(ttl) = ttl_seconds {
                store = store.with_ttl(*ttl);
            }
            Ok(Arc::new(store))
        }

        #[cfg(not(feature = "redis-store"))]
        StoreConfig::Redis { .. } => Err(ParleyError::Config(
            "Redis store requires the 'redis-store' feature".into(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_memory() {
        assert_eq!(
            StoreConfig::default(),
            StoreConfig::Memory {
                shards: None,
                ttl_seconds: None
            }
        );
    }

    #[test]
    fn test_parse_configs() {
        let memory: StoreConfig = serde_yaml::from_str("type: memory\nttl_seconds: 60").unwrap();
        assert_eq!(
            memory,
            StoreConfig::Memory {
                shards: None,
                ttl_seconds: Some(60)
            }
        );

        let redis: StoreConfig =
            serde_yaml::from_str("type: redis\nurl: redis://localhost:6379\nprefix: \"bot:\"")
                .unwrap();
        assert!(matches!(redis, StoreConfig::Redis { prefix: Some(ref p), .. } if p == "bot:"));
    }

    #[tokio::test]
    async fn test_create_memory_store() {
        let store = create_store(&StoreConfig::default()).unwrap();
        assert!(!store.exists("alice").await.unwrap());
        let session = store.get_or_create("alice").await.unwrap();
        assert_eq!(session, Session::new());
        assert!(store.exists("alice").await.unwrap());
    }

    #[cfg(not(feature = "redis-store"))]
    #[test]
    fn test_redis_requires_feature() {
        let config = StoreConfig::Redis {
            url: "redis://localhost".into(),
            prefix: None,
            ttl_seconds: None,
        };
        assert!(matches!(create_store(&config), Err(ParleyError::Config(_))));
    }
}
