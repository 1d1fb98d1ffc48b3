//! The event-to-task fold.
//!
//! A [`TaskManager`] is created per operation with whatever identity the
//! request carried — possibly none — and applies each incoming event to the
//! stored [`Task`]. It is the only writer of task state: status replacement
//! with history carry-over, artifact merging, and whole-snapshot adoption
//! all go through [`TaskManager::process`].
//!
//! Identity is enforced here. The first task-bearing event fixes
//! `(task_id, context_id)` when the request did not; every later event must
//! agree or the executor is reporting on the wrong task.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::{A2AError, A2AResult};
use crate::types::{
    Event, Message, Task, TaskArtifactUpdateEvent, TaskState, TaskStatus, TaskStatusUpdateEvent,
};

use super::task_store::TaskStore;

/// Folds a task's event stream into its persisted state.
pub struct TaskManager {
    task_id: Option<String>,
    context_id: Option<String>,
    store: Arc<dyn TaskStore>,
    initial_message: Option<Message>,
    current: Option<Task>,
}

impl TaskManager {
    /// A manager for the task identified by the request, if it identified
    /// one. `initial_message` seeds the history of a task this manager ends
    /// up creating.
    pub fn new(
        task_id: Option<String>,
        context_id: Option<String>,
        store: Arc<dyn TaskStore>,
        initial_message: Option<Message>,
    ) -> A2AResult<Self> {
        if matches!(task_id.as_deref(), Some("")) {
            return Err(A2AError::invalid_params("task id must not be empty"));
        }
        Ok(TaskManager {
            task_id,
            context_id,
            store,
            initial_message,
            current: None,
        })
    }

    /// The task id, once known.
    pub fn task_id(&self) -> Option<&str> {
        self.task_id.as_deref()
    }

    /// The context id, once known.
    pub fn context_id(&self) -> Option<&str> {
        self.context_id.as_deref()
    }

    /// The current task snapshot: cached if an event has been folded,
    /// loaded from the store otherwise. `None` when no task exists yet.
    pub async fn get_task(&mut self) -> A2AResult<Option<Task>> {
        if self.current.is_some() {
            return Ok(self.current.clone());
        }
        self.reload().await
    }

    /// The task as the store has it right now, bypassing this manager's
    /// cache. Another consumer of the same stream — a cancel call, say —
    /// may have folded events this manager never saw.
    pub async fn reload(&mut self) -> A2AResult<Option<Task>> {
        let Some(ref id) = self.task_id else {
            return Ok(None);
        };
        let task = self.store.get(id).await?;
        self.current = task.clone();
        Ok(task)
    }

    /// Fold one event into the stored task.
    ///
    /// Task snapshots, status updates, and artifact updates mutate and
    /// persist the task; the updated snapshot is returned. Standalone
    /// messages are not task state and fold to `None`.
    pub async fn process(&mut self, event: &Event) -> A2AResult<Option<Task>> {
        match event {
            Event::Task(task) => self.adopt_snapshot(task).await.map(Some),
            Event::StatusUpdate(update) => self.apply_status(update).await.map(Some),
            Event::ArtifactUpdate(update) => self.apply_artifact(update).await.map(Some),
            Event::Message(_) => {
                debug!("message events are not folded into task state");
                Ok(None)
            }
        }
    }

    /// Append `message` to a copy of `task`'s history and return it.
    ///
    /// A message already attached to the current status is moved into the
    /// history first so nothing is lost when the status is later replaced.
    /// The caller decides whether to persist the returned value.
    pub fn update_with_message(&mut self, message: Message, task: &Task) -> Task {
        let mut updated = task.clone();
        let history = updated.history.get_or_insert_with(Vec::new);
        if let Some(status_message) = updated.status.message.take() {
            history.push(status_message);
        }
        history.push(message);
        self.current = Some(updated.clone());
        updated
    }

    async fn adopt_snapshot(&mut self, snapshot: &Task) -> A2AResult<Task> {
        self.check_identity(&snapshot.id, &snapshot.context_id)?;

        if let Some(stored) = self.load_current().await? {
            if stored.status.state.is_terminal() && stored.status.state != snapshot.status.state {
                return Err(illegal_transition(
                    &stored.id,
                    stored.status.state,
                    snapshot.status.state,
                ));
            }
        }

        self.persist(snapshot.clone()).await
    }

    async fn apply_status(&mut self, update: &TaskStatusUpdateEvent) -> A2AResult<Task> {
        self.check_identity(&update.task_id, &update.context_id)?;
        let mut task = self
            .load_or_create(&update.task_id, &update.context_id)
            .await?;

        if task.status.state.is_terminal() && task.status.state != update.status.state {
            return Err(illegal_transition(
                &task.id,
                task.status.state,
                update.status.state,
            ));
        }

        debug!(task_id = %task.id, state = %update.status.state, "applying status update");

        if let Some(previous_message) = task.status.message.take() {
            task.history.get_or_insert_with(Vec::new).push(previous_message);
        }
        if let Some(ref event_meta) = update.metadata {
            merge_metadata(&mut task, event_meta);
        }
        task.status = update.status.clone();

        self.persist(task).await
    }

    async fn apply_artifact(&mut self, update: &TaskArtifactUpdateEvent) -> A2AResult<Task> {
        self.check_identity(&update.task_id, &update.context_id)?;
        let mut task = self
            .load_or_create(&update.task_id, &update.context_id)
            .await?;

        merge_artifact_chunk(&mut task, update);
        self.persist(task).await
    }

    /// Verify event identity against what this manager knows, adopting the
    /// ids when they were still open.
    fn check_identity(&mut self, task_id: &str, context_id: &str) -> A2AResult<()> {
        match self.task_id {
            Some(ref known) if known != task_id => {
                return Err(A2AError::invalid_agent_response(format!(
                    "event targets task {task_id} but this execution is for task {known}"
                )));
            }
            Some(_) => {}
            None => self.task_id = Some(task_id.to_string()),
        }
        match self.context_id {
            Some(ref known) if known != context_id => {
                return Err(A2AError::invalid_agent_response(format!(
                    "event targets context {context_id} but this execution is for context {known}"
                )));
            }
            Some(_) => {}
            None => self.context_id = Some(context_id.to_string()),
        }
        Ok(())
    }

    async fn load_current(&mut self) -> A2AResult<Option<Task>> {
        if self.current.is_some() {
            return Ok(self.current.clone());
        }
        let Some(ref id) = self.task_id else {
            return Ok(None);
        };
        let task = self.store.get(id).await?;
        self.current = task.clone();
        Ok(task)
    }

    /// The stored task, or a fresh `submitted` one when the executor sent an
    /// update before any snapshot.
    async fn load_or_create(&mut self, task_id: &str, context_id: &str) -> A2AResult<Task> {
        if let Some(task) = self.load_current().await? {
            return Ok(task);
        }
        debug!(task_id, context_id, "creating task for update event");
        let mut task = Task::submitted(task_id, context_id);
        task.status = TaskStatus::now(TaskState::Submitted);
        if let Some(ref message) = self.initial_message {
            task.history = Some(vec![message.clone()]);
        }
        Ok(task)
    }

    async fn persist(&mut self, task: Task) -> A2AResult<Task> {
        self.store.save(task.clone()).await?;
        self.task_id.get_or_insert_with(|| task.id.clone());
        self.context_id.get_or_insert_with(|| task.context_id.clone());
        self.current = Some(task.clone());
        Ok(task)
    }
}

fn illegal_transition(task_id: &str, from: TaskState, to: TaskState) -> A2AError {
    A2AError::invalid_agent_response(format!(
        "task {task_id} is {from} (terminal) and cannot transition to {to}"
    ))
}

fn merge_metadata(task: &mut Task, incoming: &serde_json::Value) {
    match task.metadata {
        Some(ref mut existing) => {
            if let (Some(existing), Some(incoming)) = (existing.as_object_mut(), incoming.as_object())
            {
                for (key, value) in incoming {
                    existing.insert(key.clone(), value.clone());
                }
            }
        }
        None => task.metadata = Some(incoming.clone()),
    }
}

/// Merge one artifact-update chunk into a task's artifact list.
///
/// An unseen `artifactId` is appended. A seen one is replaced, unless the
/// chunk carries `append=true`, in which case its parts are concatenated
/// onto the existing artifact. An append chunk for an unseen id has nothing
/// to extend and is dropped with a warning.
pub fn merge_artifact_chunk(task: &mut Task, update: &TaskArtifactUpdateEvent) {
    let artifacts = task.artifacts.get_or_insert_with(Vec::new);
    let incoming = &update.artifact;
    let existing = artifacts
        .iter()
        .position(|a| a.artifact_id == incoming.artifact_id);

    if update.append.unwrap_or(false) {
        match existing {
            Some(index) => {
                debug!(artifact_id = %incoming.artifact_id, "appending artifact parts");
                artifacts[index].parts.extend(incoming.parts.iter().cloned());
            }
            None => warn!(
                task_id = %task.id,
                artifact_id = %incoming.artifact_id,
                "append chunk for unknown artifact, dropping"
            ),
        }
    } else {
        match existing {
            Some(index) => artifacts[index] = incoming.clone(),
            None => artifacts.push(incoming.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::task_store::InMemoryTaskStore;
    use crate::types::{Artifact, Part};

    fn status_event(task_id: &str, state: TaskState, fin: bool) -> Event {
        Event::StatusUpdate(TaskStatusUpdateEvent {
            task_id: task_id.into(),
            context_id: "c1".into(),
            kind: "status-update".into(),
            status: TaskStatus::new(state),
            r#final: fin,
            metadata: None,
        })
    }

    fn artifact_event(task_id: &str, artifact_id: &str, text: &str, append: Option<bool>) -> Event {
        Event::ArtifactUpdate(TaskArtifactUpdateEvent {
            task_id: task_id.into(),
            context_id: "c1".into(),
            kind: "artifact-update".into(),
            artifact: Artifact {
                artifact_id: artifact_id.into(),
                name: None,
                description: None,
                parts: vec![Part::text(text)],
                metadata: None,
                extensions: None,
            },
            append,
            last_chunk: None,
            metadata: None,
        })
    }

    fn manager(store: &Arc<InMemoryTaskStore>, task_id: Option<&str>) -> TaskManager {
        TaskManager::new(
            task_id.map(String::from),
            None,
            Arc::clone(store) as Arc<dyn TaskStore>,
            None,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn adopts_identity_from_first_event() {
        let store = Arc::new(InMemoryTaskStore::new());
        let mut mgr = manager(&store, None);

        mgr.process(&status_event("t1", TaskState::Working, false))
            .await
            .unwrap();

        assert_eq!(mgr.task_id(), Some("t1"));
        assert_eq!(mgr.context_id(), Some("c1"));
        let task = store.get("t1").await.unwrap().unwrap();
        assert_eq!(task.status.state, TaskState::Working);
    }

    #[tokio::test]
    async fn rejects_mismatched_task_id() {
        let store = Arc::new(InMemoryTaskStore::new());
        let mut mgr = manager(&store, Some("t1"));

        let err = mgr
            .process(&status_event("t2", TaskState::Working, false))
            .await
            .unwrap_err();
        assert_eq!(err.code(), crate::error::INVALID_AGENT_RESPONSE);
    }

    #[tokio::test]
    async fn rejects_transition_out_of_terminal_state() {
        let store = Arc::new(InMemoryTaskStore::new());
        let mut mgr = manager(&store, None);

        mgr.process(&status_event("t1", TaskState::Completed, true))
            .await
            .unwrap();
        let err = mgr
            .process(&status_event("t1", TaskState::Working, false))
            .await
            .unwrap_err();
        assert_eq!(err.code(), crate::error::INVALID_AGENT_RESPONSE);
    }

    #[tokio::test]
    async fn repeated_terminal_state_is_tolerated() {
        let store = Arc::new(InMemoryTaskStore::new());
        let mut mgr = manager(&store, None);

        mgr.process(&status_event("t1", TaskState::Canceled, true))
            .await
            .unwrap();
        // Cancel paths can deliver the same terminal status twice.
        mgr.process(&status_event("t1", TaskState::Canceled, true))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn status_message_moves_to_history_on_replacement() {
        let store = Arc::new(InMemoryTaskStore::new());
        let mut mgr = manager(&store, None);

        let mut first = TaskStatusUpdateEvent {
            task_id: "t1".into(),
            context_id: "c1".into(),
            kind: "status-update".into(),
            status: TaskStatus::new(TaskState::Working),
            r#final: false,
            metadata: None,
        };
        first.status.message = Some(Message::agent_text("m1", "working on it"));
        mgr.process(&Event::StatusUpdate(first)).await.unwrap();

        let task = mgr
            .process(&status_event("t1", TaskState::Completed, true))
            .await
            .unwrap()
            .unwrap();
        let history = task.history.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].message_id, "m1");
        assert!(task.status.message.is_none());
    }

    #[tokio::test]
    async fn artifact_chunks_replace_append_and_drop() {
        let store = Arc::new(InMemoryTaskStore::new());
        let mut mgr = manager(&store, None);

        mgr.process(&artifact_event("t1", "a1", "partial", None))
            .await
            .unwrap();
        let task = mgr
            .process(&artifact_event("t1", "a1", " more", Some(true)))
            .await
            .unwrap()
            .unwrap();
        let artifact = &task.artifacts.as_ref().unwrap()[0];
        assert_eq!(artifact.parts.len(), 2);

        // Full replacement resets the part list.
        let task = mgr
            .process(&artifact_event("t1", "a1", "rewritten", Some(false)))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(task.artifacts.as_ref().unwrap()[0].parts.len(), 1);

        // An append for an id never seen is dropped.
        let task = mgr
            .process(&artifact_event("t1", "ghost", "x", Some(true)))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(task.artifacts.as_ref().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn fold_is_deterministic_across_replays() {
        let events = vec![
            status_event("t1", TaskState::Submitted, false),
            artifact_event("t1", "a1", "partial", None),
            artifact_event("t1", "a1", " more", Some(true)),
            status_event("t1", TaskState::Completed, true),
        ];

        let mut outcomes = Vec::new();
        for _ in 0..2 {
            let store = Arc::new(InMemoryTaskStore::new());
            let mut mgr = manager(&store, None);
            for event in &events {
                mgr.process(event).await.unwrap();
            }
            outcomes.push(
                serde_json::to_value(store.get("t1").await.unwrap().unwrap()).unwrap(),
            );
        }
        assert_eq!(outcomes[0], outcomes[1]);
    }

    #[tokio::test]
    async fn update_with_message_appends_and_preserves_status_message() {
        let store = Arc::new(InMemoryTaskStore::new());
        let mut mgr = manager(&store, Some("t1"));

        let mut task = Task::submitted("t1", "c1");
        task.status.message = Some(Message::agent_text("m-status", "need input"));

        let updated = mgr.update_with_message(Message::user_text("m-user", "here"), &task);
        let history = updated.history.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].message_id, "m-status");
        assert_eq!(history[1].message_id, "m-user");
        assert!(updated.status.message.is_none());
    }

    #[tokio::test]
    async fn message_events_do_not_touch_the_store() {
        let store = Arc::new(InMemoryTaskStore::new());
        let mut mgr = manager(&store, None);

        let folded = mgr
            .process(&Event::Message(Message::agent_text("m1", "hi")))
            .await
            .unwrap();
        assert!(folded.is_none());
        assert!(mgr.task_id().is_none());
    }
}
