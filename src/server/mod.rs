//! The runtime: everything between a transport and an agent's executor.
//!
//! The moving parts, producer side to consumer side:
//!
//! - [`AgentExecutor`] — the contract agent authors implement
//! - [`RequestContext`] / [`ServerCallContext`] — what an invocation sees
//! - [`TaskUpdater`] — ergonomic event emission for executors
//! - [`EventQueue`] + [`QueueManager`] — the per-task event fabric
//! - [`EventConsumer`] + [`ResultAggregator`] — stream consumption and the
//!   event-to-task fold
//! - [`TaskManager`] + [`TaskStore`] — task state and its persistence
//! - [`PushNotificationConfigStore`] / [`PushNotificationSender`] — outbound
//!   webhooks on task updates
//! - [`RequestHandler`] / [`DefaultRequestHandler`] — the operation surface
//! - [`a2a_router`] — the HTTP/SSE binding (`transport-http` feature)

pub mod agent_executor;
#[cfg(feature = "transport-http")]
pub mod axum_integration;
pub mod event_queue;
pub mod push_notification;
pub mod request_handler;
pub mod result_aggregator;
pub mod task_manager;
pub mod task_store;
pub mod task_updater;

pub use agent_executor::{
    AgentExecutor, RequestContext, RequestContextBuilder, ServerCallContext,
    SimpleRequestContextBuilder,
};
#[cfg(feature = "transport-http")]
pub use axum_integration::a2a_router;
pub use event_queue::{
    EventQueue, InMemoryQueueManager, NoTaskQueue, QueueManager, TaskQueueExists,
    DEFAULT_QUEUE_CAPACITY, POLLER_START_TIMEOUT,
};
pub use push_notification::{
    BasePushNotificationSender, InMemoryPushNotificationConfigStore, PushNotificationConfigStore,
    PushNotificationSender,
};
pub use request_handler::{DefaultRequestHandler, EventStream, RequestHandler};
pub use result_aggregator::{EventConsumer, ResultAggregator, DEFAULT_POLL_INTERVAL};
pub use task_manager::{merge_artifact_chunk, TaskManager};
pub use task_store::{InMemoryTaskStore, TaskStore};
pub use task_updater::TaskUpdater;
