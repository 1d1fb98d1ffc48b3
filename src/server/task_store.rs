//! Task persistence.
//!
//! The [`TaskStore`] holds the single authoritative copy of each [`Task`],
//! keyed by id; writes replace the stored value wholesale. The crate ships
//! only the in-memory implementation — durability is a property of whatever
//! implements the trait, not of the runtime.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::A2AResult;
use crate::types::Task;

/// Storage for [`Task`]s.
///
/// Implementations must tolerate concurrent access: the aggregator writes
/// while `tasks/get` reads. Per-task writes are serialized by the callers'
/// fold ordering; distinct tasks must not contend.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Store `task`, replacing any previous value under the same id.
    async fn save(&self, task: Task) -> A2AResult<()>;

    /// The task stored under `task_id`, if any.
    async fn get(&self, task_id: &str) -> A2AResult<Option<Task>>;

    /// Drop the task stored under `task_id`. Succeeds if absent.
    async fn delete(&self, task_id: &str) -> A2AResult<()>;
}

/// A [`TaskStore`] backed by a process-local map. Contents are lost when the
/// process exits.
#[derive(Debug, Default)]
pub struct InMemoryTaskStore {
    tasks: RwLock<HashMap<String, Task>>,
}

impl InMemoryTaskStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn save(&self, task: Task) -> A2AResult<()> {
        debug!(task_id = %task.id, state = %task.status.state, "saving task");
        self.tasks.write().await.insert(task.id.clone(), task);
        Ok(())
    }

    async fn get(&self, task_id: &str) -> A2AResult<Option<Task>> {
        Ok(self.tasks.read().await.get(task_id).cloned())
    }

    async fn delete(&self, task_id: &str) -> A2AResult<()> {
        if self.tasks.write().await.remove(task_id).is_none() {
            debug!(task_id = %task_id, "delete of unknown task");
        }
        Ok(())
    }
}
