//! Conversation state layer
//!
//! Responsible for storing and loading per-thread conversation state.
//! Currently in-memory; the trait seam allows a durable backend later.
//! One pass commits through one `append` call: either everything the
//! pass produced lands, or nothing does.

use crate::error::OrchestrationError;
use crate::models::{ConversationThread, Message, ThreadId, UserId};
use crate::Result;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

/// Everything one pass wants persisted: the appended messages plus the
/// identity captured during the pass, if any.
#[derive(Debug, Clone, Default)]
pub struct TurnDelta {
    pub messages: Vec<Message>,
    pub identified_user: Option<UserId>,
}

/// Trait for conversation persistence
#[async_trait::async_trait]
pub trait ThreadStore: Send + Sync {
    /// Initialize an empty thread on first use, or return the existing
    /// record.
    async fn get_or_create(&self, thread_id: &ThreadId) -> Result<ConversationThread>;

    /// Commit one pass atomically. Calling this for a thread that was
    /// never created is a programming error (`InvalidThreadState`), as is
    /// trying to replace an already-set identity with a different one.
    async fn append(&self, thread_id: &ThreadId, delta: TurnDelta) -> Result<()>;

    /// The ordered history of an existing thread.
    async fn snapshot(&self, thread_id: &ThreadId) -> Result<Vec<Message>>;
}

/// In-memory thread store for development
pub struct InMemoryThreadStore {
    threads: Arc<RwLock<HashMap<ThreadId, ConversationThread>>>,
}

impl InMemoryThreadStore {
    pub fn new() -> Self {
        Self {
            threads: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryThreadStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl ThreadStore for InMemoryThreadStore {
    async fn get_or_create(&self, thread_id: &ThreadId) -> Result<ConversationThread> {
        let mut threads = self.threads.write().await;
        let thread = threads
            .entry(thread_id.clone())
            .or_insert_with(|| ConversationThread::new(thread_id.clone()));
        Ok(thread.clone())
    }

    async fn append(&self, thread_id: &ThreadId, delta: TurnDelta) -> Result<()> {
        let mut threads = self.threads.write().await;
        let thread = threads.get_mut(thread_id).ok_or_else(|| {
            OrchestrationError::InvalidThreadState(format!(
                "append to unknown thread {}",
                thread_id
            ))
        })?;

        if let Some(user) = delta.identified_user {
            match &thread.identified_user {
                Some(existing) if *existing != user => {
                    return Err(OrchestrationError::InvalidThreadState(format!(
                        "thread {} already identified as {}, refusing {}",
                        thread_id, existing, user
                    )));
                }
                _ => thread.identified_user = Some(user),
            }
        }

        thread.messages.extend(delta.messages);
        Ok(())
    }

    async fn snapshot(&self, thread_id: &ThreadId) -> Result<Vec<Message>> {
        let threads = self.threads.read().await;
        threads
            .get(thread_id)
            .map(|t| t.messages.clone())
            .ok_or_else(|| {
                OrchestrationError::InvalidThreadState(format!(
                    "snapshot of unknown thread {}",
                    thread_id
                ))
            })
    }
}

/// Per-thread pass serialization. Each thread gets its own async mutex;
/// holding the owned guard for the length of a pass means a second pass
/// on the same thread waits while other threads proceed untouched.
pub struct ThreadLocks {
    locks: Mutex<HashMap<ThreadId, Arc<Mutex<()>>>>,
}

impl ThreadLocks {
    pub fn new() -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub async fn acquire(&self, thread_id: &ThreadId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            locks
                .entry(thread_id.clone())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}

impl Default for ThreadLocks {
    fn default() -> Self {
        Self::new()
    }
}
