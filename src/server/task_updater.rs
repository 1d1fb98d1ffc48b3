//! Ergonomic event emission for executor authors.
//!
//! A [`TaskUpdater`] wraps an [`EventQueue`] with the task identity baked
//! in, so an executor writes `updater.start_work(None)` instead of
//! assembling status-update events by hand. It also enforces the state
//! machine locally: after a terminal transition has been published, further
//! status updates are refused before they ever reach the queue.

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::warn;
use uuid::Uuid;

use crate::error::{A2AError, A2AResult};
use crate::types::{
    Artifact, Event, Message, Part, Role, TaskArtifactUpdateEvent, TaskState, TaskStatus,
    TaskStatusUpdateEvent,
};

use super::event_queue::EventQueue;

/// Publishes status and artifact events for one task.
///
/// Share it across concurrent executor internals via `Arc`; the terminal
/// latch is mutex-protected.
pub struct TaskUpdater {
    queue: EventQueue,
    task_id: String,
    context_id: String,
    terminal_reached: Mutex<bool>,
}

impl TaskUpdater {
    /// An updater bound to `(task_id, context_id)`.
    pub fn new(queue: EventQueue, task_id: String, context_id: String) -> Self {
        TaskUpdater {
            queue,
            task_id,
            context_id,
            terminal_reached: Mutex::new(false),
        }
    }

    /// The task id events are published under.
    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    /// The context id events are published under.
    pub fn context_id(&self) -> &str {
        &self.context_id
    }

    /// Whether a terminal status has been published through this updater.
    pub async fn is_terminal(&self) -> bool {
        *self.terminal_reached.lock().await
    }

    /// Publish a status update, stamped with the current time.
    ///
    /// A terminal `state` forces `final=true` and latches the updater;
    /// any status update after that fails without being enqueued.
    pub async fn update_status(
        &self,
        state: TaskState,
        message: Option<Message>,
        r#final: bool,
        metadata: Option<serde_json::Value>,
    ) -> A2AResult<()> {
        let terminal = state.is_terminal();
        {
            let mut latched = self.terminal_reached.lock().await;
            if *latched {
                warn!(task_id = %self.task_id, requested = %state, "status update after terminal state");
                return Err(A2AError::internal_error(format!(
                    "task {} already reached a terminal state, cannot move to {state}",
                    self.task_id
                )));
            }
            if terminal {
                *latched = true;
            }
        }

        self.queue
            .enqueue_event(Event::StatusUpdate(TaskStatusUpdateEvent {
                task_id: self.task_id.clone(),
                context_id: self.context_id.clone(),
                kind: "status-update".to_string(),
                status: TaskStatus {
                    state,
                    message,
                    timestamp: Some(Utc::now().to_rfc3339()),
                },
                r#final: r#final || terminal,
                metadata,
            }));
        Ok(())
    }

    /// Publish an artifact chunk. The artifact id is generated when absent;
    /// pass the same id with `append=true` to extend a previous chunk.
    ///
    /// Artifacts carry no state transition, so they are not gated by the
    /// terminal latch.
    pub async fn add_artifact(
        &self,
        parts: Vec<Part>,
        artifact_id: Option<String>,
        name: Option<String>,
        append: Option<bool>,
        last_chunk: Option<bool>,
    ) -> A2AResult<()> {
        let artifact_id = artifact_id.unwrap_or_else(|| Uuid::new_v4().to_string());
        self.queue
            .enqueue_event(Event::ArtifactUpdate(TaskArtifactUpdateEvent {
                task_id: self.task_id.clone(),
                context_id: self.context_id.clone(),
                kind: "artifact-update".to_string(),
                artifact: Artifact {
                    artifact_id,
                    name,
                    description: None,
                    parts,
                    metadata: None,
                    extensions: None,
                },
                append,
                last_chunk,
                metadata: None,
            }));
        Ok(())
    }

    /// Move to `submitted`.
    pub async fn submit(&self, message: Option<Message>) -> A2AResult<()> {
        self.update_status(TaskState::Submitted, message, false, None).await
    }

    /// Move to `working`.
    pub async fn start_work(&self, message: Option<Message>) -> A2AResult<()> {
        self.update_status(TaskState::Working, message, false, None).await
    }

    /// Move to `completed`. Terminal.
    pub async fn complete(&self, message: Option<Message>) -> A2AResult<()> {
        self.update_status(TaskState::Completed, message, true, None).await
    }

    /// Move to `failed`. Terminal.
    pub async fn fail(&self, message: Option<Message>) -> A2AResult<()> {
        self.update_status(TaskState::Failed, message, true, None).await
    }

    /// Move to `canceled`. Terminal.
    pub async fn cancel(&self, message: Option<Message>) -> A2AResult<()> {
        self.update_status(TaskState::Canceled, message, true, None).await
    }

    /// Move to `rejected`. Terminal.
    pub async fn reject(&self, message: Option<Message>) -> A2AResult<()> {
        self.update_status(TaskState::Rejected, message, true, None).await
    }

    /// Pause in `input-required` until the client sends a follow-up.
    pub async fn requires_input(&self, message: Option<Message>, r#final: bool) -> A2AResult<()> {
        self.update_status(TaskState::InputRequired, message, r#final, None).await
    }

    /// Pause in `auth-required` until the client authenticates.
    pub async fn requires_auth(&self, message: Option<Message>, r#final: bool) -> A2AResult<()> {
        self.update_status(TaskState::AuthRequired, message, r#final, None).await
    }

    /// Complete with a one-line text message attached to the final status.
    pub async fn complete_with_text(&self, text: &str) -> A2AResult<()> {
        let message = self.new_agent_message(vec![Part::text(text)], None);
        self.complete(Some(message)).await
    }

    /// Fail with a one-line text message attached to the final status.
    pub async fn fail_with_text(&self, text: &str) -> A2AResult<()> {
        let message = self.new_agent_message(vec![Part::text(text)], None);
        self.fail(Some(message)).await
    }

    /// An agent message pre-addressed to this task, not yet published.
    pub fn new_agent_message(
        &self,
        parts: Vec<Part>,
        metadata: Option<serde_json::Value>,
    ) -> Message {
        Message {
            message_id: Uuid::new_v4().to_string(),
            role: Role::Agent,
            kind: "message".to_string(),
            parts,
            context_id: Some(self.context_id.clone()),
            task_id: Some(self.task_id.clone()),
            metadata,
            extensions: None,
            reference_task_ids: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn updater_with_queue() -> (TaskUpdater, EventQueue) {
        let queue = EventQueue::new();
        let updater = TaskUpdater::new(queue.clone(), "t1".into(), "c1".into());
        (updater, queue)
    }

    #[tokio::test]
    async fn status_updates_carry_identity_and_timestamp() {
        let (updater, queue) = updater_with_queue();
        let mut rx = queue.subscribe();

        updater.start_work(None).await.unwrap();
        match rx.recv().await.unwrap() {
            Event::StatusUpdate(update) => {
                assert_eq!(update.task_id, "t1");
                assert_eq!(update.context_id, "c1");
                assert_eq!(update.status.state, TaskState::Working);
                assert!(!update.r#final);
                assert!(update.status.timestamp.is_some());
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test]
    async fn terminal_state_forces_final_and_latches() {
        let (updater, queue) = updater_with_queue();
        let mut rx = queue.subscribe();

        updater.update_status(TaskState::Completed, None, false, None)
            .await
            .unwrap();
        match rx.recv().await.unwrap() {
            Event::StatusUpdate(update) => assert!(update.r#final),
            other => panic!("unexpected event {other:?}"),
        }

        assert!(updater.is_terminal().await);
        assert!(updater.start_work(None).await.is_err());
    }

    #[tokio::test]
    async fn artifacts_pass_the_terminal_latch() {
        let (updater, queue) = updater_with_queue();
        let mut rx = queue.subscribe();

        updater.complete(None).await.unwrap();
        updater
            .add_artifact(vec![Part::text("late")], Some("a1".into()), None, None, None)
            .await
            .unwrap();

        rx.recv().await.unwrap();
        match rx.recv().await.unwrap() {
            Event::ArtifactUpdate(update) => assert_eq!(update.artifact.artifact_id, "a1"),
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test]
    async fn generated_artifact_ids_are_unique() {
        let (updater, queue) = updater_with_queue();
        let mut rx = queue.subscribe();

        updater
            .add_artifact(vec![Part::text("a")], None, None, None, None)
            .await
            .unwrap();
        updater
            .add_artifact(vec![Part::text("b")], None, None, None, None)
            .await
            .unwrap();

        let first = match rx.recv().await.unwrap() {
            Event::ArtifactUpdate(u) => u.artifact.artifact_id,
            other => panic!("unexpected event {other:?}"),
        };
        let second = match rx.recv().await.unwrap() {
            Event::ArtifactUpdate(u) => u.artifact.artifact_id,
            other => panic!("unexpected event {other:?}"),
        };
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn agent_messages_are_addressed_to_the_task() {
        let (updater, _queue) = updater_with_queue();
        let message = updater.new_agent_message(vec![Part::text("hi")], None);
        assert_eq!(message.role, Role::Agent);
        assert_eq!(message.task_id.as_deref(), Some("t1"));
        assert_eq!(message.context_id.as_deref(), Some("c1"));
    }
}
