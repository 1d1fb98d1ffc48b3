//! # a2a-runtime
//!
//! The core of an Agent-to-Agent (A2A) server: a request-handling and
//! event-streaming engine. You implement one trait —
//! [`server::AgentExecutor`] — that produces events onto a queue; the
//! runtime turns JSON-RPC operations into executor launches, folds the
//! emitted events into authoritative [`types::Task`] state, and answers
//! each call with a final result or a live stream.
//!
//! Three subsystems carry the weight:
//!
//! 1. the [`server::RequestHandler`], which orchestrates per-task
//!    execution and owns the running-producer bookkeeping;
//! 2. the [`server::EventQueue`] fabric — bounded queues with tap fan-out
//!    for late subscribers, coordinated closure, and a poller-start
//!    handshake;
//! 3. the [`server::ResultAggregator`] and [`server::TaskManager`], which
//!    fold the heterogeneous event stream into the stored task.
//!
//! Authentication, durable storage, and cross-node coordination are out of
//! scope: stores are trait-pluggable and a single runtime instance is
//! authoritative for a task id. The `transport-http` feature (default)
//! adds a ready-made axum binding with SSE streaming and the well-known
//! agent card routes; the core has no dependency on it.
//!
//! ## Writing an agent
//!
//! ```rust,ignore
//! use a2a_runtime::prelude::*;
//! use async_trait::async_trait;
//! use std::sync::Arc;
//!
//! struct EchoAgent;
//!
//! #[async_trait]
//! impl AgentExecutor for EchoAgent {
//!     async fn execute(&self, context: RequestContext, queue: EventQueue) -> A2AResult<()> {
//!         let updater = TaskUpdater::new(queue, context.task_id, context.context_id);
//!         let input = context.get_user_input("\n");
//!         updater.complete_with_text(&format!("Echo: {input}")).await
//!     }
//!
//!     async fn cancel(&self, context: RequestContext, queue: EventQueue) -> A2AResult<()> {
//!         let updater = TaskUpdater::new(queue, context.task_id, context.context_id);
//!         updater.cancel(None).await
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let card = AgentCardBuilder::new("Echo Agent", "Echoes messages back", "1.0.0")
//!         .with_jsonrpc_interface("http://localhost:3000/a2a")
//!         .with_streaming(true)
//!         .build();
//!
//!     let handler = DefaultRequestHandler::new(
//!         Arc::new(EchoAgent),
//!         Arc::new(InMemoryTaskStore::new()),
//!     );
//!     let app = a2a_router(Arc::new(handler), card);
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Module map
//!
//! - [`types`] — the wire-level domain model
//! - [`error`] — the stable JSON-RPC error taxonomy
//! - [`server`] — queues, stores, the fold, the handler, the HTTP binding
//! - [`utils`] — construction and extraction helpers
//! - [`builders`] — agent card and server assembly

pub mod builders;
pub mod error;
pub mod server;
pub mod types;
pub mod utils;

pub use error::{A2AError, A2AResult};
pub use types::*;

pub use builders::AgentCardBuilder;
#[cfg(feature = "transport-http")]
pub use builders::ServerBuilder;

/// One-stop imports for agent authors.
pub mod prelude {
    pub use crate::builders::AgentCardBuilder;
    #[cfg(feature = "transport-http")]
    pub use crate::builders::ServerBuilder;
    pub use crate::error::{A2AError, A2AResult};
    #[cfg(feature = "transport-http")]
    pub use crate::server::a2a_router;
    pub use crate::server::{
        AgentExecutor, BasePushNotificationSender, DefaultRequestHandler, EventConsumer,
        EventQueue, InMemoryPushNotificationConfigStore, InMemoryQueueManager, InMemoryTaskStore,
        PushNotificationConfigStore, PushNotificationSender, QueueManager, RequestContext,
        RequestContextBuilder, RequestHandler, ResultAggregator, ServerCallContext,
        SimpleRequestContextBuilder, TaskManager, TaskStore, TaskUpdater,
    };
    pub use crate::types::{
        AgentCapabilities, AgentCard, AgentInterface, AgentSkill, Artifact, Event, FileContent,
        FileWithBytes, FileWithUri, Message, MessageSendConfiguration, MessageSendParams, Part,
        PushNotificationConfig, Role, SendMessageResult, Task, TaskArtifactUpdateEvent,
        TaskIdParams, TaskPushNotificationConfig, TaskQueryParams, TaskState, TaskStatus,
        TaskStatusUpdateEvent,
    };
}
