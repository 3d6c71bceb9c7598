use std::collections::HashMap;
use std::hash::{BuildHasher, RandomState};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::RwLock;

use parley_core::{Result, Session, SessionStore};

pub const DEFAULT_SHARDS: usize = 16;

struct Entry {
    session: Session,
    touched: Instant,
}

/// In-process session store split into independently locked shards.
///
/// Shard locks are only held for the map operation itself, never across an await.
pub struct MemoryStore {
    shards: Box<[RwLock<HashMap<String, Entry>>]>,
    hasher: RandomState,
    ttl: Option<Duration>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_shards(DEFAULT_SHARDS)
    }

    pub fn with_shards(count: usize) -> Self {
        let shards = (0..count.max(1))
            .map(|_| RwLock::new(HashMap::new()))
            .collect();
        Self {
            shards,
            hasher: RandomState::new(),
            ttl: None,
        }
    }

    /// Entries idle for longer than `ttl` read as absent.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    fn shard(&self, sender: &str) -> &RwLock<HashMap<String, Entry>> {
        let index = self.hasher.hash_one(sender) as usize % self.shards.len();
        &self.shards[index]
    }

    fn is_live(&self, entry: &Entry, now: Instant) -> bool {
        match self.ttl {
            Some(ttl) => now.duration_since(entry.touched) < ttl,
            None => true,
        }
    }

    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.shards
            .iter()
            .map(|shard| {
                shard
                    .read()
                    .values()
                    .filter(|entry| self.is_live(entry, now))
                    .count()
            })
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop expired entries; returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        if self.ttl.is_none() {
            return 0;
        }
        let now = Instant::now();
        let mut removed = 0;
        for shard in self.shards.iter() {
            let mut map = shard.write();
            let before = map.len();
            map.retain(|_, entry| self.is_live(entry, now));
            removed += before - map.len();
        }
        if removed > 0 {
            tracing::debug!(removed, "Purged expired sessions");
        }
        removed
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn exists(&self, sender: &str) -> Result<bool> {
        let now = Instant::now();
        Ok(self
            .shard(sender)
            .read()
            .get(sender)
            .is_some_and(|entry| self.is_live(entry, now)))
    }

    async fn get(&self, sender: &str) -> Result<Option<Session>> {
        let now = Instant::now();
        Ok(self
            .shard(sender)
            .read()
            .get(sender)
            .filter(|entry| self.is_live(entry, now))
            .map(|entry| entry.session.clone()))
    }

    async fn set(&self, sender: &str, session: &Session) -> Result<()> {
        self.shard(sender).write().insert(
            sender.to_string(),
            Entry {
                session: session.clone(),
                touched: Instant::now(),
            },
        );
        Ok(())
    }

    async fn delete(&self, sender: &str) -> Result<()> {
        self.shard(sender).write().remove(sender);
        Ok(())
    }
}
