//! Stream consumption: turning a task's event queue into a result.
//!
//! [`EventConsumer`] is the polling half — it pulls events off an
//! [`EventQueue`] with a modest timeout, releases the queue's poller-start
//! latch on its first pull, and translates queue closure into either a clean
//! end-of-stream or the producer's recorded failure.
//!
//! [`ResultAggregator`] drives a consumer to completion, folding every event
//! through a [`TaskManager`] so the store is always the authority, and
//! decides what a call returns: the final [`Task`], the agent's standalone
//! [`Message`], or an early snapshot when the task interrupts for input.

use std::sync::Arc;
use std::time::Duration;

use futures::stream::BoxStream;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, warn};

use crate::error::{A2AError, A2AResult};
use crate::types::{Event, Message, SendMessageResult, Task};

use super::event_queue::EventQueue;
use super::task_manager::TaskManager;

/// How long a single poll waits before re-checking queue state.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Pulls events off a queue for one consumer.
pub struct EventConsumer {
    queue: EventQueue,
    rx: broadcast::Receiver<Event>,
    poll_interval: Duration,
    started: bool,
}

impl EventConsumer {
    /// A consumer over `queue`, subscribed as of now.
    pub fn new(queue: EventQueue) -> Self {
        let rx = queue.subscribe();
        EventConsumer {
            queue,
            rx,
            poll_interval: DEFAULT_POLL_INTERVAL,
            started: false,
        }
    }

    /// One bounded poll.
    ///
    /// `Ok(Some)` is an event; `Ok(None)` means nothing arrived within
    /// `wait` while the queue is still open. Once the queue is closed and
    /// drained this fails — with the producer's recorded error if there is
    /// one, otherwise with a plain queue-closed internal error.
    pub async fn dequeue_event(&mut self, wait: Duration) -> A2AResult<Option<Event>> {
        self.mark_started();
        match tokio::time::timeout(wait, self.rx.recv()).await {
            Ok(Ok(event)) => {
                if event.is_final() {
                    debug!(kind = event.kind(), "final event, closing queue");
                    self.queue.close();
                }
                Ok(Some(event))
            }
            Ok(Err(broadcast::error::RecvError::Closed)) => Err(self.closed_error()),
            Ok(Err(broadcast::error::RecvError::Lagged(missed))) => {
                warn!(missed, "consumer lagged behind the queue");
                Ok(None)
            }
            Err(_elapsed) if self.queue.is_closed() => Err(self.closed_error()),
            Err(_elapsed) => Ok(None),
        }
    }

    /// The next event, or `Ok(None)` at a clean end of stream.
    ///
    /// Polls until something arrives or the queue closes; a producer failure
    /// recorded on the queue surfaces as the error of the affected call.
    pub async fn next(&mut self) -> A2AResult<Option<Event>> {
        loop {
            match self.dequeue_event(self.poll_interval).await {
                Ok(Some(event)) => return Ok(Some(event)),
                Ok(None) => continue,
                Err(_) if self.queue.error().is_none() => return Ok(None),
                Err(err) => return Err(err),
            }
        }
    }

    fn mark_started(&mut self) {
        if !self.started {
            self.started = true;
            self.queue.notify_poller_started();
        }
    }

    fn closed_error(&self) -> A2AError {
        self.queue
            .error()
            .unwrap_or_else(|| A2AError::internal_error("event queue closed"))
    }
}

/// Folds an event stream into its task and produces the caller's result.
pub struct ResultAggregator {
    manager: Arc<Mutex<TaskManager>>,
    message: Option<Message>,
}

impl ResultAggregator {
    /// An aggregator folding through `manager`.
    pub fn new(manager: TaskManager) -> Self {
        ResultAggregator {
            manager: Arc::new(Mutex::new(manager)),
            message: None,
        }
    }

    /// The latest known result: the agent's standalone message if one was
    /// observed, else the current task snapshot. Weakly consistent with an
    /// in-flight stream, strongly consistent with the store.
    pub async fn current_result(&self) -> A2AResult<Option<SendMessageResult>> {
        if let Some(ref message) = self.message {
            return Ok(Some(SendMessageResult::Message(message.clone())));
        }
        let task = self.manager.lock().await.get_task().await?;
        Ok(task.map(SendMessageResult::Task))
    }

    /// Drain the stream to its end and return the final result.
    pub async fn consume_all(
        self,
        consumer: EventConsumer,
    ) -> A2AResult<Option<SendMessageResult>> {
        let (result, _) = self
            .consume_with(consumer, false, |_task: &Task| {})
            .await?;
        Ok(result)
    }

    /// Drain the stream, stopping early if the task interrupts for client
    /// input.
    ///
    /// On an interrupt the snapshot so far is returned with `true`, the
    /// executor is left running, and a background drain keeps folding its
    /// remaining events so the store stays current. `on_task` observes
    /// every folded snapshot as it lands, before the call returns — this is
    /// where the caller wires task-id adoption.
    pub async fn consume_and_break_on_interrupt<F>(
        self,
        consumer: EventConsumer,
        on_task: F,
    ) -> A2AResult<(Option<SendMessageResult>, bool)>
    where
        F: FnMut(&Task) + Send + 'static,
    {
        self.consume_with(consumer, true, on_task).await
    }

    async fn consume_with<F>(
        mut self,
        mut consumer: EventConsumer,
        break_on_interrupt: bool,
        mut on_task: F,
    ) -> A2AResult<(Option<SendMessageResult>, bool)>
    where
        F: FnMut(&Task) + Send + 'static,
    {
        let mut interrupted = false;
        while let Some(event) = consumer.next().await? {
            if let Some(task) = self.fold_with_snapshot(&event).await? {
                on_task(&task);
            }
            if break_on_interrupt && event.is_interrupt() {
                debug!(task_id = ?event.task_id(), "interrupt state, handing control back");
                interrupted = true;
                let manager = Arc::clone(&self.manager);
                tokio::spawn(Self::drain_in_background(manager, consumer));
                break;
            }
            if event.is_final() {
                break;
            }
        }
        let result = self.final_result().await?;
        Ok((result, interrupted))
    }

    /// The result once consumption stopped. Unlike
    /// [`ResultAggregator::current_result`] this re-reads the store: a
    /// second consumer of the same stream (a cancel call) may have folded a
    /// terminal event this aggregator only observed as queue closure.
    async fn final_result(&self) -> A2AResult<Option<SendMessageResult>> {
        if let Some(ref message) = self.message {
            return Ok(Some(SendMessageResult::Message(message.clone())));
        }
        let task = self.manager.lock().await.reload().await?;
        Ok(task.map(SendMessageResult::Task))
    }

    /// Fold the stream while republishing each event to the returned stream.
    ///
    /// `on_task` observes every folded task snapshot, letting the caller
    /// hang side effects (push notifications, queue re-registration) off the
    /// fold without a second consumer. The stream ends after the final
    /// event, at queue closure, or with the producer's recorded error.
    pub fn consume_and_emit<F>(
        mut self,
        mut consumer: EventConsumer,
        mut on_task: F,
    ) -> BoxStream<'static, A2AResult<Event>>
    where
        F: FnMut(&Task) + Send + 'static,
    {
        Box::pin(async_stream::stream! {
            loop {
                match consumer.next().await {
                    Ok(Some(event)) => {
                        match self.fold_with_snapshot(&event).await {
                            Ok(Some(task)) => on_task(&task),
                            Ok(None) => {}
                            Err(err) => {
                                yield Err(err);
                                break;
                            }
                        }
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
        })
    }

    async fn fold_with_snapshot(&mut self, event: &Event) -> A2AResult<Option<Task>> {
        if let Event::Message(message) = event {
            self.message = Some(message.clone());
            return Ok(None);
        }
        self.manager.lock().await.process(event).await
    }

    async fn drain_in_background(manager: Arc<Mutex<TaskManager>>, mut consumer: EventConsumer) {
        loop {
            match consumer.next().await {
                Ok(Some(event)) => {
                    let folded = manager.lock().await.process(&event).await;
                    if let Err(err) = folded {
                        warn!(error = %err, "background drain stopped on fold error");
                        break;
                    }
                    if event.is_final() {
                        break;
                    }
                }
                Ok(None) => break,
                Err(err) => {
                    warn!(error = %err, "background drain stopped on producer error");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::task_store::{InMemoryTaskStore, TaskStore};
    use crate::types::{TaskState, TaskStatus, TaskStatusUpdateEvent};

    fn status_event(state: TaskState, fin: bool) -> Event {
        Event::StatusUpdate(TaskStatusUpdateEvent {
            task_id: "t1".into(),
            context_id: "c1".into(),
            kind: "status-update".into(),
            status: TaskStatus::new(state),
            r#final: fin,
            metadata: None,
        })
    }

    fn aggregator(store: &Arc<InMemoryTaskStore>) -> ResultAggregator {
        let manager = TaskManager::new(
            None,
            None,
            Arc::clone(store) as Arc<dyn TaskStore>,
            None,
        )
        .unwrap();
        ResultAggregator::new(manager)
    }

    #[tokio::test]
    async fn consume_all_returns_final_task() {
        let store = Arc::new(InMemoryTaskStore::new());
        let queue = EventQueue::new();
        let consumer = EventConsumer::new(queue.clone());

        queue.enqueue_event(status_event(TaskState::Working, false));
        queue.enqueue_event(status_event(TaskState::Completed, true));

        let result = aggregator(&store).consume_all(consumer).await.unwrap();
        match result {
            Some(SendMessageResult::Task(task)) => {
                assert_eq!(task.status.state, TaskState::Completed)
            }
            other => panic!("expected task result, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn standalone_message_wins_over_task_state() {
        let store = Arc::new(InMemoryTaskStore::new());
        let queue = EventQueue::new();
        let consumer = EventConsumer::new(queue.clone());

        queue.enqueue_event(Event::Message(Message::agent_text("m-reply", "hello")));

        let result = aggregator(&store).consume_all(consumer).await.unwrap();
        match result {
            Some(SendMessageResult::Message(m)) => assert_eq!(m.message_id, "m-reply"),
            other => panic!("expected message result, got {other:?}"),
        }
        // No task was materialized.
        assert!(store.get("t1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn interrupt_breaks_early_and_keeps_draining() {
        let store = Arc::new(InMemoryTaskStore::new());
        let queue = EventQueue::new();
        let consumer = EventConsumer::new(queue.clone());

        queue.enqueue_event(status_event(TaskState::InputRequired, false));

        let (result, interrupted) = aggregator(&store)
            .consume_and_break_on_interrupt(consumer, |_task: &Task| {})
            .await
            .unwrap();
        assert!(interrupted);
        match result {
            Some(SendMessageResult::Task(task)) => {
                assert_eq!(task.status.state, TaskState::InputRequired)
            }
            other => panic!("expected task result, got {other:?}"),
        }

        // The background drain picks up what the executor emits afterwards.
        queue.enqueue_event(status_event(TaskState::Completed, true));
        tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                if let Some(task) = store.get("t1").await.unwrap() {
                    if task.status.state == TaskState::Completed {
                        break;
                    }
                }
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
        })
        .await
        .expect("store never saw the terminal state");
    }

    #[tokio::test]
    async fn producer_error_surfaces_to_the_consumer() {
        let store = Arc::new(InMemoryTaskStore::new());
        let queue = EventQueue::new();
        let consumer = EventConsumer::new(queue.clone());

        queue.close_with_error(A2AError::internal_error("executor panicked"));

        let err = aggregator(&store).consume_all(consumer).await.unwrap_err();
        assert_eq!(err.code(), crate::error::INTERNAL_ERROR);
        assert!(err.to_string().contains("executor panicked"));
    }

    #[tokio::test]
    async fn clean_close_without_events_yields_no_result() {
        let store = Arc::new(InMemoryTaskStore::new());
        let queue = EventQueue::new();
        let consumer = EventConsumer::new(queue.clone());
        queue.close();

        let result = aggregator(&store).consume_all(consumer).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn dequeue_reports_timeout_and_closure_distinctly() {
        let queue = EventQueue::new();
        let mut consumer = EventConsumer::new(queue.clone());

        // Open and empty: a timeout is not an error.
        let polled = consumer.dequeue_event(Duration::from_millis(20)).await;
        assert!(matches!(polled, Ok(None)));
        // The first poll released the handshake latch.
        assert!(queue.await_poller_start(Duration::from_millis(10)).await);

        queue.close();
        let closed = consumer.dequeue_event(Duration::from_millis(20)).await;
        assert!(closed.is_err());
    }

    #[tokio::test]
    async fn buffered_events_remain_readable_after_close() {
        let queue = EventQueue::new();
        let mut consumer = EventConsumer::new(queue.clone());

        queue.enqueue_event(status_event(TaskState::Working, false));
        queue.close();

        let event = consumer
            .dequeue_event(Duration::from_millis(50))
            .await
            .unwrap();
        assert!(event.is_some());
        assert!(consumer.dequeue_event(Duration::from_millis(50)).await.is_err());
    }
}
