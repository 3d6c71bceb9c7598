//! Storage trait for per-sender sessions

use async_trait::async_trait;

use crate::error::Result;
use crate::session::Session;

/// Mapping from sender identity to session state.
///
/// Built-in backends: `MemoryStore` and `RedisStore` (in `parley-store`).
/// Implementations must tolerate concurrent calls for different senders; ordering of
/// turns for the same sender is enforced by the caller.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn exists(&self, sender: &str) -> Result<bool>;
    /// Returns `None` if the sender has never been seen (or the entry expired).
    async fn get(&self, sender: &str) -> Result<Option<Session>>;
    async fn set(&self, sender: &str, session: &Session) -> Result<()>;
    async fn delete(&self, sender: &str) -> Result<()>;

    /// Load the sender's session, storing a fresh one on first contact.
    async fn get_or_create(&self, sender: &str) -> Result<Session> {
        if let Some(session) = self.get(sender).await? {
            return Ok(session);
        }
        let session = Session::new();
        self.set(sender, &session).await?;
        Ok(session)
    }
}
