/*
    push.rs - Remote push seam

    The engine never talks to a concrete backend; it pushes queue items
    through this trait. Hosts provide an implementation per deployment
    (HTTP API, message bus, test double).
*/

use async_trait::async_trait;
use thiserror::Error;

use crate::store::SyncQueueItem;

/// Errors surfaced by a remote push implementation
#[derive(Debug, Error)]
pub enum PushError {
    /// Transport-level failure (unreachable host, connection reset)
    #[error("Network error: {0}")]
    Network(String),

    /// The remote side received the item and refused it
    #[error("Remote rejected the item: {0}")]
    Rejected(String),
}

/// Pluggable transport for pending mutations.
///
/// `Ok(true)` confirms the remote applied the mutation. `Ok(false)` and
/// `Err(_)` are both failures; the engine treats them the same way and
/// keeps the item queued.
#[async_trait]
pub trait RemotePush: Send + Sync {
    async fn push(&self, item: &SyncQueueItem) -> Result<bool, PushError>;
}
