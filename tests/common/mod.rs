//! Shared fixtures: scripted executors and message builders.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;

use a2a_runtime::prelude::*;

pub fn user_message(message_id: &str, text: &str) -> Message {
    let mut message = Message::user_text(message_id, text);
    message.context_id = Some("c1".to_string());
    message
}

pub fn follow_up_message(message_id: &str, text: &str, task_id: &str) -> Message {
    let mut message = user_message(message_id, text);
    message.task_id = Some(task_id.to_string());
    message
}

pub fn send_params(message: Message) -> MessageSendParams {
    MessageSendParams {
        message,
        configuration: Some(MessageSendConfiguration {
            accepted_output_modes: Some(vec!["text".to_string()]),
            push_notification_config: None,
            history_length: None,
            blocking: Some(true),
        }),
        metadata: None,
    }
}

pub fn task_snapshot(task_id: &str, state: TaskState) -> Task {
    let mut task = Task::submitted(task_id, "c1");
    task.status = TaskStatus::new(state);
    task
}

pub fn task_event(task_id: &str, state: TaskState) -> Event {
    Event::Task(task_snapshot(task_id, state))
}

pub fn status_event(task_id: &str, state: TaskState, r#final: bool) -> Event {
    Event::StatusUpdate(TaskStatusUpdateEvent {
        task_id: task_id.to_string(),
        context_id: "c1".to_string(),
        kind: "status-update".to_string(),
        status: TaskStatus::new(state),
        r#final,
        metadata: None,
    })
}

pub fn artifact_event(
    task_id: &str,
    artifact_id: &str,
    name: Option<&str>,
    text: &str,
    append: Option<bool>,
    last_chunk: Option<bool>,
) -> Event {
    Event::ArtifactUpdate(TaskArtifactUpdateEvent {
        task_id: task_id.to_string(),
        context_id: "c1".to_string(),
        kind: "artifact-update".to_string(),
        artifact: Artifact {
            artifact_id: artifact_id.to_string(),
            name: name.map(String::from),
            description: None,
            parts: vec![Part::text(text)],
            metadata: None,
            extensions: None,
        },
        append,
        last_chunk,
        metadata: None,
    })
}

/// Emits a fixed script of events, then optionally parks until the queue is
/// closed (an executor that "does not terminate"). Cancel publishes the
/// standard terminal cancellation.
pub struct ScriptedAgent {
    pub events: Vec<Event>,
    pub park: bool,
}

impl ScriptedAgent {
    pub fn new(events: Vec<Event>) -> Self {
        ScriptedAgent { events, park: false }
    }

    pub fn parked(events: Vec<Event>) -> Self {
        ScriptedAgent { events, park: true }
    }
}

#[async_trait]
impl AgentExecutor for ScriptedAgent {
    async fn execute(&self, _context: RequestContext, queue: EventQueue) -> A2AResult<()> {
        for event in &self.events {
            queue.enqueue_event(event.clone());
        }
        if self.park {
            while !queue.is_closed() {
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
        }
        Ok(())
    }

    async fn cancel(&self, context: RequestContext, queue: EventQueue) -> A2AResult<()> {
        let updater = TaskUpdater::new(queue, context.task_id, context.context_id);
        updater.cancel(None).await
    }
}

/// Emits a first batch, stays alive until released, then emits a second
/// batch. Models an executor waiting out an interrupt.
pub struct GatedAgent {
    pub first: Vec<Event>,
    pub second: Vec<Event>,
    pub resume: Arc<Notify>,
}

impl GatedAgent {
    pub fn new(first: Vec<Event>, second: Vec<Event>) -> (Self, Arc<Notify>) {
        let resume = Arc::new(Notify::new());
        let agent = GatedAgent {
            first,
            second,
            resume: Arc::clone(&resume),
        };
        (agent, resume)
    }
}

#[async_trait]
impl AgentExecutor for GatedAgent {
    async fn execute(&self, _context: RequestContext, queue: EventQueue) -> A2AResult<()> {
        for event in &self.first {
            queue.enqueue_event(event.clone());
        }
        self.resume.notified().await;
        for event in &self.second {
            queue.enqueue_event(event.clone());
        }
        Ok(())
    }

    async fn cancel(&self, context: RequestContext, queue: EventQueue) -> A2AResult<()> {
        let updater = TaskUpdater::new(queue, context.task_id, context.context_id);
        updater.cancel(None).await
    }
}

/// Always fails, for exercising the producer-error path.
pub struct FailingAgent;

#[async_trait]
impl AgentExecutor for FailingAgent {
    async fn execute(&self, _context: RequestContext, _queue: EventQueue) -> A2AResult<()> {
        Err(A2AError::internal_error("scripted failure"))
    }

    async fn cancel(&self, _context: RequestContext, _queue: EventQueue) -> A2AResult<()> {
        Ok(())
    }
}

pub fn handler_for(
    agent: Arc<dyn AgentExecutor>,
) -> (Arc<DefaultRequestHandler>, Arc<InMemoryTaskStore>) {
    let store = Arc::new(InMemoryTaskStore::new());
    let handler = DefaultRequestHandler::new(agent, Arc::clone(&store) as Arc<dyn TaskStore>);
    (Arc::new(handler), store)
}

/// Poll the store until the task reaches `state` or the deadline passes.
pub async fn wait_for_state(store: &Arc<InMemoryTaskStore>, task_id: &str, state: TaskState) {
    tokio::time::timeout(Duration::from_secs(3), async {
        loop {
            if let Some(task) = store.get(task_id).await.unwrap() {
                if task.status.state == state {
                    return;
                }
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("task {task_id} never reached {state}"));
}
