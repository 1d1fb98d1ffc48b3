//! The public operation surface of the runtime.
//!
//! [`RequestHandler`] is what a transport dispatches into, one method per
//! JSON-RPC operation. [`DefaultRequestHandler`] is the full orchestration:
//! it resolves the task a message belongs to, opens the per-task event
//! queue, launches the executor on the worker pool, and hands the queue to
//! a [`ResultAggregator`] that decides what the call returns.
//!
//! Producer bookkeeping lives here too. Every launched executor future is
//! tracked by task id so `tasks/cancel` can abort it, and is re-keyed if
//! the executor announces a task id of its own.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::error::{A2AError, A2AResult};
use crate::types::{
    DeleteTaskPushNotificationConfigParams, Event, GetTaskPushNotificationConfigParams,
    ListTaskPushNotificationConfigParams, MessageSendParams, SendMessageResult, Task, TaskIdParams,
    TaskPushNotificationConfig, TaskQueryParams, TaskState, TaskStatus,
};
use crate::utils::apply_history_length;

use super::agent_executor::{
    AgentExecutor, RequestContextBuilder, ServerCallContext, SimpleRequestContextBuilder,
};
use super::event_queue::{EventQueue, InMemoryQueueManager, QueueManager, POLLER_START_TIMEOUT};
use super::push_notification::{PushNotificationConfigStore, PushNotificationSender};
use super::result_aggregator::{EventConsumer, ResultAggregator};
use super::task_manager::TaskManager;
use super::task_store::TaskStore;

/// A live stream of events for `message/stream` and `tasks/resubscribe`.
/// An `Err` item terminates the stream; the transport frames it as the
/// final envelope.
pub type EventStream = BoxStream<'static, A2AResult<Event>>;

/// One method per A2A operation. A transport binding validates the JSON-RPC
/// envelope, deserializes params, and calls these; every error return maps
/// to a wire error envelope.
#[async_trait]
pub trait RequestHandler: Send + Sync {
    /// `message/send`: run the executor and block until the task finishes,
    /// interrupts for input, or the agent answers with a bare message.
    async fn on_message_send(
        &self,
        params: MessageSendParams,
        context: Option<ServerCallContext>,
    ) -> A2AResult<SendMessageResult>;

    /// `message/stream`: run the executor and stream every event as it is
    /// produced.
    async fn on_message_send_stream(
        &self,
        params: MessageSendParams,
        context: Option<ServerCallContext>,
    ) -> A2AResult<EventStream>;

    /// `tasks/get`: fetch a stored task.
    async fn on_get_task(
        &self,
        params: TaskQueryParams,
        context: Option<ServerCallContext>,
    ) -> A2AResult<Task>;

    /// `tasks/cancel`: ask the executor to stop a task and return the
    /// resulting snapshot.
    async fn on_cancel_task(
        &self,
        params: TaskIdParams,
        context: Option<ServerCallContext>,
    ) -> A2AResult<Task>;

    /// `tasks/resubscribe`: attach to the live stream of an in-flight task.
    async fn on_resubscribe_to_task(
        &self,
        params: TaskIdParams,
        context: Option<ServerCallContext>,
    ) -> A2AResult<EventStream>;

    /// `tasks/pushNotificationConfig/set`. Fails as unsupported unless the
    /// handler was built with a config store.
    async fn on_set_task_push_notification_config(
        &self,
        _params: TaskPushNotificationConfig,
        _context: Option<ServerCallContext>,
    ) -> A2AResult<TaskPushNotificationConfig> {
        Err(push_unsupported())
    }

    /// `tasks/pushNotificationConfig/get`.
    async fn on_get_task_push_notification_config(
        &self,
        _params: GetTaskPushNotificationConfigParams,
        _context: Option<ServerCallContext>,
    ) -> A2AResult<TaskPushNotificationConfig> {
        Err(push_unsupported())
    }

    /// `tasks/pushNotificationConfig/list`.
    async fn on_list_task_push_notification_config(
        &self,
        _params: ListTaskPushNotificationConfigParams,
        _context: Option<ServerCallContext>,
    ) -> A2AResult<Vec<TaskPushNotificationConfig>> {
        Err(push_unsupported())
    }

    /// `tasks/pushNotificationConfig/delete`.
    async fn on_delete_task_push_notification_config(
        &self,
        _params: DeleteTaskPushNotificationConfigParams,
        _context: Option<ServerCallContext>,
    ) -> A2AResult<()> {
        Err(push_unsupported())
    }
}

fn push_unsupported() -> A2AError {
    A2AError::unsupported_operation("push notification configuration is not enabled")
}

/// A launched executor future.
///
/// `key` starts as the id the queue was created under and is rewritten if
/// the executor announces its own task id, so the future can always be
/// found — and can always find its own bookkeeping — under the current id.
struct RunningAgent {
    handle: JoinHandle<()>,
    key: Arc<StdMutex<String>>,
}

type RunningAgents = Arc<Mutex<HashMap<String, RunningAgent>>>;

/// Everything `setup_execution` prepares before the consumer side starts.
struct Execution {
    queue: EventQueue,
    queue_key: String,
    requested_task_id: Option<String>,
    manager: TaskManager,
}

/// The standard [`RequestHandler`].
pub struct DefaultRequestHandler {
    executor: Arc<dyn AgentExecutor>,
    task_store: Arc<dyn TaskStore>,
    queue_manager: Arc<dyn QueueManager>,
    context_builder: Arc<dyn RequestContextBuilder>,
    push_config_store: Option<Arc<dyn PushNotificationConfigStore>>,
    push_sender: Option<Arc<dyn PushNotificationSender>>,
    running_agents: RunningAgents,
}

impl DefaultRequestHandler {
    /// A handler with in-memory queues and the stock context builder.
    pub fn new(executor: Arc<dyn AgentExecutor>, task_store: Arc<dyn TaskStore>) -> Self {
        Self::with_queue_manager(executor, task_store, Arc::new(InMemoryQueueManager::new()))
    }

    /// A handler over a caller-supplied [`QueueManager`].
    pub fn with_queue_manager(
        executor: Arc<dyn AgentExecutor>,
        task_store: Arc<dyn TaskStore>,
        queue_manager: Arc<dyn QueueManager>,
    ) -> Self {
        let context_builder = Arc::new(SimpleRequestContextBuilder::new(
            Some(Arc::clone(&task_store)),
            true,
        ));
        DefaultRequestHandler {
            executor,
            task_store,
            queue_manager,
            context_builder,
            push_config_store: None,
            push_sender: None,
            running_agents: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Replace the [`RequestContextBuilder`].
    pub fn with_context_builder(mut self, builder: Arc<dyn RequestContextBuilder>) -> Self {
        self.context_builder = builder;
        self
    }

    /// Enable the `tasks/pushNotificationConfig/*` methods and outbound
    /// notifications on streamed task updates.
    pub fn with_push_notifications(
        mut self,
        store: Arc<dyn PushNotificationConfigStore>,
        sender: Arc<dyn PushNotificationSender>,
    ) -> Self {
        self.push_config_store = Some(store);
        self.push_sender = Some(sender);
        self
    }

    /// Resolve the task, open the queue, and launch the executor.
    async fn setup_execution(
        &self,
        params: &MessageSendParams,
        call_context: Option<ServerCallContext>,
    ) -> A2AResult<Execution> {
        let requested_task_id = params.message.task_id.clone();

        // A message naming a task continues that task; it must exist and
        // still be open.
        let task = match requested_task_id {
            Some(ref id) => {
                let task = self
                    .task_store
                    .get(id)
                    .await?
                    .ok_or_else(|| A2AError::task_not_found(id.clone()))?;
                if task.status.state.is_terminal() {
                    return Err(A2AError::invalid_params(format!(
                        "task {id} is {} and accepts no further messages",
                        task.status.state
                    )));
                }
                Some(task)
            }
            None => None,
        };

        let mut manager = TaskManager::new(
            requested_task_id.clone(),
            params.message.context_id.clone(),
            Arc::clone(&self.task_store),
            Some(params.message.clone()),
        )?;

        if let Some(ref task) = task {
            let updated = manager.update_with_message(params.message.clone(), task);
            self.task_store.save(updated).await?;

            if let Some(push_config) = params
                .configuration
                .as_ref()
                .and_then(|c| c.push_notification_config.clone())
            {
                if let Some(ref store) = self.push_config_store {
                    store.set_info(&task.id, push_config).await?;
                }
            }
        }

        let context = self
            .context_builder
            .build(Some(params), None, None, task.as_ref(), call_context)
            .await?;

        // The queue key is the context's task id: the real one when known, a
        // placeholder otherwise, re-keyed once the executor announces the
        // task it is actually working on.
        let queue_key = context.task_id.clone();
        let queue = self.queue_manager.create_or_tap(&queue_key).await;

        self.launch_executor(context, queue.clone(), queue_key.clone())
            .await;

        Ok(Execution {
            queue,
            queue_key,
            requested_task_id,
            manager,
        })
    }

    /// Spawn the producer future and register it under `key`.
    async fn launch_executor(&self, context: super::agent_executor::RequestContext, queue: EventQueue, key: String) {
        let executor = Arc::clone(&self.executor);
        let queue_manager = Arc::clone(&self.queue_manager);
        let task_store = Arc::clone(&self.task_store);
        let running_agents = Arc::clone(&self.running_agents);
        let key_cell = Arc::new(StdMutex::new(key.clone()));

        let wrapper_key = Arc::clone(&key_cell);
        let launch_key = key.clone();
        let handle = tokio::spawn(async move {
            if !queue.await_poller_start(POLLER_START_TIMEOUT).await {
                warn!(task_id = %launch_key, "no consumer started polling the queue");
            }

            match executor.execute(context, queue.clone()).await {
                Ok(()) => queue.close(),
                Err(err) => {
                    error!(task_id = %launch_key, error = %err, "agent execution failed");
                    let current = wrapper_key.lock().unwrap().clone();
                    mark_task_failed(&task_store, &current, &err).await;
                    queue.close_with_error(A2AError::internal_error(format!(
                        "agent execution failed: {err}"
                    )));
                }
            }

            // Producer-side cleanup is deferred until here, after the future
            // has fully run; consumers still drain whatever is buffered.
            let current = wrapper_key.lock().unwrap().clone();
            let _ = queue_manager.close(&current).await;
            if current != launch_key {
                let _ = queue_manager.close(&launch_key).await;
            }
            running_agents.lock().await.remove(&current);
        });

        self.running_agents
            .lock()
            .await
            .insert(key, RunningAgent { handle, key: key_cell });
    }

    /// Move producer bookkeeping from the placeholder key to the task id the
    /// executor announced, and register the queue under it so cancel and
    /// resubscribe can find both.
    async fn adopt_task_id(&self, old_key: &str, task_id: &str, queue: &EventQueue) {
        if old_key == task_id {
            return;
        }
        if !queue.is_closed() && self.queue_manager.add(task_id, queue.clone()).await.is_err() {
            debug!(task_id, "queue already registered under announced id");
        }
        let mut agents = self.running_agents.lock().await;
        if let Some(agent) = agents.remove(old_key) {
            *agent.key.lock().unwrap() = task_id.to_string();
            agents.insert(task_id.to_string(), agent);
        }
    }

    /// The fold observer shared by the send paths: adopts an
    /// executor-announced task id on the first folded snapshot, and — when
    /// enabled — fires a push notification per snapshot. Both effects are
    /// fire-and-forget relative to the fold.
    fn fold_hook(
        &self,
        queue_key: String,
        queue: EventQueue,
        id_already_known: bool,
        with_push: bool,
    ) -> impl FnMut(&Task) + Send + 'static {
        let queue_manager = Arc::clone(&self.queue_manager);
        let running_agents = Arc::clone(&self.running_agents);
        let push_sender = if with_push { self.push_sender.clone() } else { None };
        let mut adopted = id_already_known;

        move |task: &Task| {
            if !adopted {
                adopted = true;
                if task.id != queue_key {
                    let queue_manager = Arc::clone(&queue_manager);
                    let running_agents = Arc::clone(&running_agents);
                    let queue = queue.clone();
                    let old_key = queue_key.clone();
                    let task_id = task.id.clone();
                    tokio::spawn(async move {
                        if !queue.is_closed()
                            && queue_manager.add(&task_id, queue.clone()).await.is_err()
                        {
                            debug!(task_id, "queue already registered under announced id");
                        }
                        let mut agents = running_agents.lock().await;
                        if let Some(agent) = agents.remove(&old_key) {
                            *agent.key.lock().unwrap() = task_id.clone();
                            agents.insert(task_id, agent);
                        }
                    });
                }
            }
            if let Some(ref sender) = push_sender {
                let sender = Arc::clone(sender);
                let snapshot = task.clone();
                tokio::spawn(async move { sender.send_notification(&snapshot).await });
            }
        }
    }

    /// Drop bookkeeping for a finished execution and release its queue.
    async fn finish_execution(&self, key: &str) {
        self.running_agents.lock().await.remove(key);
        let _ = self.queue_manager.close(key).await;
    }

    fn require_push_store(&self) -> A2AResult<&Arc<dyn PushNotificationConfigStore>> {
        self.push_config_store.as_ref().ok_or_else(push_unsupported)
    }

    async fn require_task(&self, task_id: &str) -> A2AResult<Task> {
        self.task_store
            .get(task_id)
            .await?
            .ok_or_else(|| A2AError::task_not_found(task_id.to_string()))
    }
}

/// Best-effort: record an executor crash on the stored task so `tasks/get`
/// reflects the failure.
async fn mark_task_failed(store: &Arc<dyn TaskStore>, task_id: &str, err: &A2AError) {
    let Ok(Some(mut task)) = store.get(task_id).await else {
        return;
    };
    if task.status.state.is_terminal() {
        return;
    }
    task.status = TaskStatus::now(TaskState::Failed);
    debug!(task_id, error = %err, "marking task failed after executor error");
    if let Err(save_err) = store.save(task).await {
        warn!(task_id, error = %save_err, "could not record task failure");
    }
}

#[async_trait]
impl RequestHandler for DefaultRequestHandler {
    async fn on_message_send(
        &self,
        params: MessageSendParams,
        context: Option<ServerCallContext>,
    ) -> A2AResult<SendMessageResult> {
        let history_length = params
            .configuration
            .as_ref()
            .and_then(|c| c.history_length);

        let execution = self.setup_execution(&params, context).await?;
        let consumer = EventConsumer::new(execution.queue.clone());
        let hook = self.fold_hook(
            execution.queue_key.clone(),
            execution.queue.clone(),
            execution.requested_task_id.is_some(),
            false,
        );
        let aggregator = ResultAggregator::new(execution.manager);

        let consumed = aggregator
            .consume_and_break_on_interrupt(consumer, hook)
            .await;
        let (result, interrupted) = match consumed {
            Ok(outcome) => outcome,
            Err(err) => {
                self.finish_execution(&execution.queue_key).await;
                return Err(err);
            }
        };

        let Some(result) = result else {
            self.finish_execution(&execution.queue_key).await;
            return Err(A2AError::internal_error(
                "agent finished without producing a result",
            ));
        };

        match result {
            SendMessageResult::Message(message) => {
                self.finish_execution(&execution.queue_key).await;
                Ok(SendMessageResult::Message(message))
            }
            SendMessageResult::Task(task) => {
                if let Some(ref expected) = execution.requested_task_id {
                    if task.id != *expected {
                        self.finish_execution(&execution.queue_key).await;
                        return Err(A2AError::internal_error(format!(
                            "task id mismatch in agent response: expected {expected}, got {}",
                            task.id
                        )));
                    }
                }

                if interrupted {
                    // The executor keeps running; make sure it is findable
                    // under the id it actually works on. The fold hook has
                    // normally done this already — repeating it here closes
                    // the gap where cancel arrives before the spawned
                    // adoption ran.
                    self.adopt_task_id(&execution.queue_key, &task.id, &execution.queue)
                        .await;
                } else {
                    self.finish_execution(&task.id).await;
                    if task.id != execution.queue_key {
                        self.finish_execution(&execution.queue_key).await;
                    }
                }

                Ok(SendMessageResult::Task(apply_history_length(
                    &task,
                    history_length,
                )))
            }
        }
    }

    async fn on_message_send_stream(
        &self,
        params: MessageSendParams,
        context: Option<ServerCallContext>,
    ) -> A2AResult<EventStream> {
        let execution = self.setup_execution(&params, context).await?;
        let consumer = EventConsumer::new(execution.queue.clone());
        let hook = self.fold_hook(
            execution.queue_key.clone(),
            execution.queue.clone(),
            execution.requested_task_id.is_some(),
            true,
        );
        let aggregator = ResultAggregator::new(execution.manager);

        Ok(aggregator.consume_and_emit(consumer, hook))
    }

    async fn on_get_task(
        &self,
        params: TaskQueryParams,
        _context: Option<ServerCallContext>,
    ) -> A2AResult<Task> {
        let task = self.require_task(&params.id).await?;
        Ok(apply_history_length(&task, params.history_length))
    }

    async fn on_cancel_task(
        &self,
        params: TaskIdParams,
        context: Option<ServerCallContext>,
    ) -> A2AResult<Task> {
        let task = self.require_task(&params.id).await?;
        if task.status.state.is_terminal() {
            return Err(A2AError::task_not_cancelable(format!(
                "task {} is already {}",
                params.id, task.status.state
            )));
        }

        let queue = self.queue_manager.create_or_tap(&params.id).await;
        let consumer = EventConsumer::new(queue.clone());

        let cancel_context = self
            .context_builder
            .build(None, Some(&params.id), Some(&task.context_id), Some(&task), context)
            .await?;
        self.executor.cancel(cancel_context, queue.clone()).await?;

        // Stop the execute future too; the cancellation event has already
        // been produced by the executor's cancel path.
        if let Some(agent) = self.running_agents.lock().await.remove(&params.id) {
            agent.handle.abort();
        }

        let manager = TaskManager::new(
            Some(params.id.clone()),
            Some(task.context_id.clone()),
            Arc::clone(&self.task_store),
            None,
        )?;
        let result = ResultAggregator::new(manager).consume_all(consumer).await?;
        let _ = self.queue_manager.close(&params.id).await;

        match result {
            Some(SendMessageResult::Task(task)) => Ok(task),
            _ => Err(A2AError::internal_error(
                "cancellation produced no task snapshot",
            )),
        }
    }

    async fn on_resubscribe_to_task(
        &self,
        params: TaskIdParams,
        _context: Option<ServerCallContext>,
    ) -> A2AResult<EventStream> {
        // Both the task and its live queue must exist; a finished task has
        // no stream left to attach to.
        self.require_task(&params.id).await?;
        let queue = self.queue_manager.tap(&params.id).await.ok_or_else(|| {
            A2AError::task_not_found(format!("task {} has no active stream", params.id))
        })?;

        // A resubscriber only observes: the original call's aggregator owns
        // the fold, so events are not applied to the store twice.
        let mut consumer = EventConsumer::new(queue);
        let stream = async_stream::stream! {
            loop {
                match consumer.next().await {
                    Ok(Some(event)) => {
                        let done = event.is_final();
                        yield Ok(event);
                        if done {
                            break;
                        }
                    }
                    Ok(None) => break,
                    Err(err) => {
                        yield Err(err);
                        break;
                    }
                }
            }
        };
        Ok(stream.boxed())
    }

    async fn on_set_task_push_notification_config(
        &self,
        params: TaskPushNotificationConfig,
        _context: Option<ServerCallContext>,
    ) -> A2AResult<TaskPushNotificationConfig> {
        let store = self.require_push_store()?;
        self.require_task(&params.task_id).await?;

        let mut config = params.push_notification_config;
        config.id.get_or_insert_with(|| params.task_id.clone());
        store.set_info(&params.task_id, config.clone()).await?;

        Ok(TaskPushNotificationConfig {
            task_id: params.task_id,
            push_notification_config: config,
        })
    }

    async fn on_get_task_push_notification_config(
        &self,
        params: GetTaskPushNotificationConfigParams,
        _context: Option<ServerCallContext>,
    ) -> A2AResult<TaskPushNotificationConfig> {
        let store = self.require_push_store()?;
        self.require_task(&params.id).await?;

        let configs = store.get_info(&params.id).await?;
        let config = match params.push_notification_config_id {
            Some(ref wanted) => configs
                .into_iter()
                .find(|c| c.id.as_deref() == Some(wanted)),
            None => configs.into_iter().next(),
        }
        .ok_or_else(|| {
            A2AError::invalid_params(format!(
                "no push notification config registered for task {}",
                params.id
            ))
        })?;

        Ok(TaskPushNotificationConfig {
            task_id: params.id,
            push_notification_config: config,
        })
    }

    async fn on_list_task_push_notification_config(
        &self,
        params: ListTaskPushNotificationConfigParams,
        _context: Option<ServerCallContext>,
    ) -> A2AResult<Vec<TaskPushNotificationConfig>> {
        let store = self.require_push_store()?;
        self.require_task(&params.id).await?;

        Ok(store
            .get_info(&params.id)
            .await?
            .into_iter()
            .map(|config| TaskPushNotificationConfig {
                task_id: params.id.clone(),
                push_notification_config: config,
            })
            .collect())
    }

    async fn on_delete_task_push_notification_config(
        &self,
        params: DeleteTaskPushNotificationConfigParams,
        _context: Option<ServerCallContext>,
    ) -> A2AResult<()> {
        let store = self.require_push_store()?;
        self.require_task(&params.id).await?;
        store
            .delete_info(&params.id, Some(&params.push_notification_config_id))
            .await
    }
}
