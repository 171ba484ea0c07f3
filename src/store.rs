//! Persistence seam for conversation history.
//!
//! [`ChatSession`](crate::session::ChatSession) talks to storage only through
//! the [`MessageStore`] trait, so backends can range from the bundled
//! in-memory store to durable ones without touching session logic.

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::model::ChatMessage;

/// Errors returned by message store implementations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Underlying I/O failure (file-backed stores).
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to encode or decode a persisted message.
    #[error("store serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Backend-specific failure.
    #[error("store backend error: {0}")]
    Backend(String),
}

/// Append-only storage for chat messages.
///
/// Implementations must preserve insertion order: `list` returns messages in
/// the order they were appended.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Persist one message at the end of the conversation.
    async fn append(&self, message: ChatMessage) -> Result<(), StoreError>;

    /// All persisted messages, oldest first.
    async fn list(&self) -> Result<Vec<ChatMessage>, StoreError>;

    /// Remove every persisted message.
    async fn delete_all(&self) -> Result<(), StoreError>;
}

/// In-memory [`MessageStore`] backed by a `tokio` read-write lock.
///
/// Contents live as long as the store; nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    messages: RwLock<Vec<ChatMessage>>,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MessageStore for MemoryStore {
    async fn append(&self, message: ChatMessage) -> Result<(), StoreError> {
        self.messages.write().await.push(message);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<ChatMessage>, StoreError> {
        Ok(self.messages.read().await.clone())
    }

    async fn delete_all(&self) -> Result<(), StoreError> {
        self.messages.write().await.clear();
        Ok(())
    }
}
