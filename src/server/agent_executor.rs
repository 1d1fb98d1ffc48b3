//! The executor contract and its per-invocation context.
//!
//! [`AgentExecutor`] is the one trait an agent author implements: produce
//! events onto a queue, return when done. Everything the executor may need
//! to know about the call — ids, the inbound message, the task so far, the
//! caller — travels in a [`RequestContext`] assembled by a
//! [`RequestContextBuilder`] before launch.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use crate::error::A2AResult;
use crate::types::{Message, MessageSendConfiguration, MessageSendParams, Task};

use super::event_queue::EventQueue;
use super::task_store::TaskStore;

/// Caller-scoped state threaded through a single JSON-RPC call: arbitrary
/// per-request values (authentication results, trace ids) and the protocol
/// extension negotiation for this exchange.
#[derive(Debug, Clone, Default)]
pub struct ServerCallContext {
    /// Freeform per-call values set by the transport or middleware.
    pub state: HashMap<String, Value>,

    /// Extension URIs the client asked to activate.
    pub requested_extensions: HashSet<String>,

    /// Extension URIs the agent confirmed for this call.
    pub activated_extensions: HashSet<String>,
}

/// Everything an executor invocation gets to see.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// The task this invocation works on. Generated when the client did not
    /// name one; an executor that mints its own task id instead is allowed
    /// to, as long as every event it emits uses it consistently.
    pub task_id: String,

    /// Conversation grouping, generated when the client did not supply one.
    pub context_id: String,

    /// The inbound message. Absent on `cancel` invocations.
    pub message: Option<Message>,

    /// Snapshot of the task as of launch; absent for brand-new work.
    pub task: Option<Task>,

    /// The client's per-send options.
    pub configuration: Option<MessageSendConfiguration>,

    /// Tasks referenced by the inbound message, pre-loaded when the context
    /// builder was configured to do so.
    pub related_tasks: Vec<Task>,

    /// Freeform request metadata.
    pub metadata: Option<Value>,

    /// Caller identity and extension state for this call.
    pub call_context: Option<ServerCallContext>,
}

impl RequestContext {
    /// The inbound message's text parts joined by `delimiter`; empty when
    /// there is no message or it has no text.
    pub fn get_user_input(&self, delimiter: &str) -> String {
        self.message
            .as_ref()
            .map(|m| crate::utils::get_message_text(m, delimiter))
            .unwrap_or_default()
    }

    /// Record a task this invocation spawned or depends on.
    pub fn attach_related_task(&mut self, task: Task) {
        self.related_tasks.push(task);
    }

    /// Extension URIs the client asked for.
    pub fn requested_extensions(&self) -> HashSet<String> {
        self.call_context
            .as_ref()
            .map(|c| c.requested_extensions.clone())
            .unwrap_or_default()
    }

    /// Confirm an extension for this call; echoed back to the client by the
    /// transport.
    pub fn add_activated_extension(&mut self, uri: impl Into<String>) {
        if let Some(ref mut call_context) = self.call_context {
            call_context.activated_extensions.insert(uri.into());
        }
    }
}

/// Assembles a [`RequestContext`] before an executor launch.
#[async_trait]
pub trait RequestContextBuilder: Send + Sync {
    /// Build the context. Explicit arguments win over fields carried by the
    /// params, which win over fields of the existing task.
    async fn build(
        &self,
        params: Option<&MessageSendParams>,
        task_id: Option<&str>,
        context_id: Option<&str>,
        task: Option<&Task>,
        call_context: Option<ServerCallContext>,
    ) -> A2AResult<RequestContext>;
}

/// The stock [`RequestContextBuilder`]: resolves ids by precedence,
/// generates what is missing, and optionally pre-loads referenced tasks
/// from a store.
pub struct SimpleRequestContextBuilder {
    store: Option<Arc<dyn TaskStore>>,
    populate_referenced_tasks: bool,
}

impl SimpleRequestContextBuilder {
    /// A builder that pre-loads `referenceTaskIds` from `store` when
    /// `populate_referenced_tasks` is set.
    pub fn new(store: Option<Arc<dyn TaskStore>>, populate_referenced_tasks: bool) -> Self {
        SimpleRequestContextBuilder {
            store,
            populate_referenced_tasks,
        }
    }
}

impl Default for SimpleRequestContextBuilder {
    fn default() -> Self {
        Self::new(None, false)
    }
}

#[async_trait]
impl RequestContextBuilder for SimpleRequestContextBuilder {
    async fn build(
        &self,
        params: Option<&MessageSendParams>,
        task_id: Option<&str>,
        context_id: Option<&str>,
        task: Option<&Task>,
        call_context: Option<ServerCallContext>,
    ) -> A2AResult<RequestContext> {
        let mut related_tasks = Vec::new();
        if self.populate_referenced_tasks {
            if let (Some(store), Some(params)) = (&self.store, params) {
                for reference in params
                    .message
                    .reference_task_ids
                    .iter()
                    .flatten()
                {
                    if let Some(found) = store.get(reference).await? {
                        related_tasks.push(found);
                    }
                }
            }
        }

        let task_id = task_id
            .map(str::to_string)
            .or_else(|| params.and_then(|p| p.message.task_id.clone()))
            .or_else(|| task.map(|t| t.id.clone()))
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let context_id = context_id
            .map(str::to_string)
            .or_else(|| params.and_then(|p| p.message.context_id.clone()))
            .or_else(|| task.map(|t| t.context_id.clone()))
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        Ok(RequestContext {
            task_id,
            context_id,
            message: params.map(|p| p.message.clone()),
            task: task.cloned(),
            configuration: params.and_then(|p| p.configuration.clone()),
            related_tasks,
            metadata: params.and_then(|p| p.metadata.clone()),
            call_context,
        })
    }
}

/// The work producer an agent author supplies.
///
/// Both operations run on the runtime's worker pool. An executor emits
/// whatever mix of task snapshots, status updates, artifact chunks, or a
/// standalone message fits its work, then returns; its completion closes
/// the queue. Returning an error is fatal for the call: the queue is closed
/// with the failure recorded and the client sees an internal error.
#[async_trait]
pub trait AgentExecutor: Send + Sync {
    /// Perform the work for one inbound message, emitting events as it goes.
    ///
    /// Must eventually return — including when it parks the task in
    /// `input-required` or `auth-required`, where returning leaves the task
    /// interrupted rather than finished.
    async fn execute(&self, context: RequestContext, queue: EventQueue) -> A2AResult<()>;

    /// Stop the task identified by `context`. Expected to emit a terminal
    /// `canceled` status update; may run while `execute` is still in flight.
    async fn cancel(&self, context: RequestContext, queue: EventQueue) -> A2AResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::task_store::{InMemoryTaskStore, TaskStore};
    use crate::types::Part;

    fn params_with_message(message: Message) -> MessageSendParams {
        MessageSendParams {
            message,
            configuration: None,
            metadata: None,
        }
    }

    #[tokio::test]
    async fn builder_generates_ids_when_nothing_supplies_them() {
        let builder = SimpleRequestContextBuilder::default();
        let params = params_with_message(Message::user_text("m1", "hi"));
        let context = builder
            .build(Some(&params), None, None, None, None)
            .await
            .unwrap();
        assert!(Uuid::parse_str(&context.task_id).is_ok());
        assert!(Uuid::parse_str(&context.context_id).is_ok());
    }

    #[tokio::test]
    async fn builder_prefers_explicit_ids_over_message_fields() {
        let builder = SimpleRequestContextBuilder::default();
        let mut message = Message::user_text("m1", "hi");
        message.task_id = Some("from-message".into());
        let params = params_with_message(message);

        let context = builder
            .build(Some(&params), Some("explicit"), None, None, None)
            .await
            .unwrap();
        assert_eq!(context.task_id, "explicit");
    }

    #[tokio::test]
    async fn builder_loads_referenced_tasks_when_configured() {
        let store = Arc::new(InMemoryTaskStore::new());
        store
            .save(Task::submitted("ref-1", "c1"))
            .await
            .unwrap();

        let builder = SimpleRequestContextBuilder::new(Some(store), true);
        let mut message = Message::user_text("m1", "hi");
        message.reference_task_ids = Some(vec!["ref-1".into(), "missing".into()]);
        let params = params_with_message(message);

        let context = builder
            .build(Some(&params), None, None, None, None)
            .await
            .unwrap();
        assert_eq!(context.related_tasks.len(), 1);
        assert_eq!(context.related_tasks[0].id, "ref-1");
    }

    #[test]
    fn user_input_joins_text_parts() {
        let mut message = Message::user_text("m1", "first");
        message.parts.push(Part::text("second"));
        let context = RequestContext {
            task_id: "t1".into(),
            context_id: "c1".into(),
            message: Some(message),
            task: None,
            configuration: None,
            related_tasks: Vec::new(),
            metadata: None,
            call_context: None,
        };
        assert_eq!(context.get_user_input(" "), "first second");
    }
}
