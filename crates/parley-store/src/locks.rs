use std::collections::HashMap;
use std::hash::{BuildHasher, RandomState};
use std::pin::Pin;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::memory::DEFAULT_SHARDS;

type LockTable = HashMap<String, Arc<AsyncMutex<()>>>;

/// Per-sender exclusive sections.
///
/// Turns for the same sender run one at a time; turns for different senders
/// never wait on each other beyond the brief shard lookup.
pub struct SenderLocks {
    shards: Arc<[Mutex<LockTable>]>,
    hasher: RandomState,
}

impl SenderLocks {
    pub fn new() -> Self {
        Self::with_shards(DEFAULT_SHARDS)
    }

    pub fn with_shards(count: usize) -> Self {
        let shards: Vec<Mutex<LockTable>> =
            (0..count.max(1)).map(|_| Mutex::new(HashMap::new())).collect();
        Self {
            shards: shards.into(),
            hasher: RandomState::new(),
        }
    }

    fn shard_index(&self, sender: &str) -> usize {
        self.hasher.hash_one(sender) as usize % self.shards.len()
    }

    /// Wait until no other turn holds `sender`, then hold it until the guard drops.
    pub async fn acquire(&self, sender: &str) -> SenderGuard {
        let index = self.shard_index(sender);
        let lock = {
            let mut table = self.shards[index].lock();
            table
                .entry(sender.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        // If this future is dropped while queued, `pending` goes first and
        // `entry` then sees the real reference count.
        let mut waiting = Waiting {
            pending: Box::pin(lock.clone().lock_owned()),
            entry: Entry {
                lock,
                shards: self.shards.clone(),
                index,
                sender: sender.to_string(),
            },
        };
        let guard = waiting.pending.as_mut().await;
        SenderGuard {
            guard,
            entry: waiting.entry,
        }
    }

    /// Number of senders with a turn in flight or waiting.
    pub fn active(&self) -> usize {
        self.shards.iter().map(|shard| shard.lock().len()).sum()
    }
}

impl Default for SenderLocks {
    fn default() -> Self {
        Self::new()
    }
}

/// A queued `acquire`. Fields drop in declaration order.
struct Waiting<F> {
    pending: Pin<Box<F>>,
    entry: Entry,
}

/// One holder's or waiter's claim on a sender's table entry.
struct Entry {
    lock: Arc<AsyncMutex<()>>,
    shards: Arc<[Mutex<LockTable>]>,
    index: usize,
    sender: String,
}

impl Drop for Entry {
    fn drop(&mut self) {
        let mut table = self.shards[self.index].lock();
        // One reference here, one in the table: nobody else holds or waits.
        if Arc::strong_count(&self.lock) == 2 {
            table.remove(&self.sender);
        }
    }
}

pub struct SenderGuard {
    // Released before `entry` checks the table.
    guard: OwnedMutexGuard<()>,
    entry: Entry,
}

impl SenderGuard {
    pub fn sender(&self) -> &str {
        &self.entry.sender
    }
}
