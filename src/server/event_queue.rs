//! The per-task event fabric.
//!
//! An [`EventQueue`] connects one producer (the executor) to any number of
//! consumers. The main queue is created when execution starts; late
//! subscribers get child queues ("taps") that observe every event enqueued
//! after the tap was made. Closing the family is coordinated: closing any
//! member closes the root and every tap, and a producer failure is recorded
//! out-of-band so consumers can tell an orderly close from a crash.
//!
//! [`QueueManager`] keys queues by task id and owns their lifecycle.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex, Weak};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{broadcast, Mutex, Notify};
use tracing::{debug, warn};

use crate::error::A2AError;
use crate::types::Event;

/// Default buffer capacity of a queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// How long a producer waits for a consumer before giving up on the
/// poller-start handshake.
pub const POLLER_START_TIMEOUT: Duration = Duration::from_secs(10);

struct QueueState {
    closed: AtomicBool,
    error: StdMutex<Option<A2AError>>,
    children: StdMutex<Vec<EventQueue>>,
    poller_started: AtomicBool,
    poller_notify: Notify,
    /// Set on taps; closing a tap delegates to the root of its family.
    parent: StdMutex<Option<ParentHandle>>,
}

struct ParentHandle {
    tx: broadcast::Sender<Event>,
    state: Weak<QueueState>,
}

/// A bounded, multi-consumer event queue with tap fan-out.
///
/// Cloning shares the underlying queue; [`EventQueue::tap`] creates a child
/// with its own buffer that receives all future events.
#[derive(Clone)]
pub struct EventQueue {
    tx: broadcast::Sender<Event>,
    state: Arc<QueueState>,
}

impl EventQueue {
    /// A queue with the default capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_QUEUE_CAPACITY)
    }

    /// A queue buffering up to `capacity` events per subscriber.
    ///
    /// A subscriber that falls more than `capacity` events behind starts
    /// losing the oldest ones and is told so through a lag notification.
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(capacity > 0, "queue capacity must be positive");
        let (tx, _) = broadcast::channel(capacity);
        EventQueue {
            tx,
            state: Arc::new(QueueState {
                closed: AtomicBool::new(false),
                error: StdMutex::new(None),
                children: StdMutex::new(Vec::new()),
                poller_started: AtomicBool::new(false),
                poller_notify: Notify::new(),
                parent: StdMutex::new(None),
            }),
        }
    }

    /// Open a receiver observing every event enqueued from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }

    /// Append an event, fanning it out to all current taps.
    ///
    /// On a closed queue the event is dropped with a warning; enqueueing is
    /// never an error from the producer's point of view.
    pub fn enqueue_event(&self, event: Event) {
        if self.is_closed() {
            warn!(kind = event.kind(), "queue closed, dropping event");
            return;
        }

        if self.tx.send(event.clone()).is_err() {
            debug!(kind = event.kind(), "no subscribers for event");
        }

        let children = self.state.children.lock().unwrap().clone();
        for child in children {
            child.enqueue_event(event.clone());
        }
    }

    /// Create a child queue that observes all future events of this queue.
    /// The child does not see events already buffered here.
    pub fn tap(&self) -> EventQueue {
        let child = EventQueue::new();
        *child.state.parent.lock().unwrap() = Some(ParentHandle {
            tx: self.tx.clone(),
            state: Arc::downgrade(&self.state),
        });
        self.state.children.lock().unwrap().push(child.clone());
        debug!("tapped event queue");
        child
    }

    /// Close this queue's family: the root and every tap.
    ///
    /// Called on a tap, the close is delegated to the root. Events already
    /// buffered stay readable until each subscriber drains them. Idempotent.
    pub fn close(&self) {
        self.close_with(None)
    }

    /// Close the family and record a producer failure for consumers to find.
    ///
    /// There is no in-band error event: a consumer that observes closure asks
    /// the queue for the error via [`EventQueue::error`].
    pub fn close_with_error(&self, error: A2AError) {
        self.close_with(Some(error))
    }

    fn close_with(&self, error: Option<A2AError>) {
        if let Some(root) = self.family_root() {
            root.close_downward(error);
        } else {
            self.close_downward(error);
        }
    }

    /// Resolve the root of this queue's family, if this is a tap whose
    /// parent is still alive.
    fn family_root(&self) -> Option<EventQueue> {
        let parent = self.state.parent.lock().unwrap();
        let handle = parent.as_ref()?;
        let state = handle.state.upgrade()?;
        let root = EventQueue {
            tx: handle.tx.clone(),
            state,
        };
        drop(parent);
        Some(root.family_root().unwrap_or(root))
    }

    fn close_downward(&self, error: Option<A2AError>) {
        if !self.state.closed.swap(true, Ordering::AcqRel) {
            debug!("closing event queue");
        }
        if let Some(ref err) = error {
            let mut slot = self.state.error.lock().unwrap();
            if slot.is_none() {
                *slot = Some(err.clone());
            }
        }
        let children = self.state.children.lock().unwrap().clone();
        for child in children {
            child.close_downward(error.clone());
        }
    }

    /// Whether the queue has been closed.
    pub fn is_closed(&self) -> bool {
        self.state.closed.load(Ordering::Acquire)
    }

    /// The producer failure recorded at close time, if any.
    pub fn error(&self) -> Option<A2AError> {
        self.state.error.lock().unwrap().clone()
    }

    /// Record that a consumer has started polling. Called by the consumer on
    /// its first dequeue; releases every [`EventQueue::await_poller_start`]
    /// waiter in the family, upward through parents.
    pub fn notify_poller_started(&self) {
        self.state.poller_started.store(true, Ordering::Release);
        self.state.poller_notify.notify_waiters();
        if let Some(root) = self.family_root() {
            root.state.poller_started.store(true, Ordering::Release);
            root.state.poller_notify.notify_waiters();
        }
    }

    /// Wait up to `timeout` for a consumer to start polling.
    ///
    /// Lets a producer avoid racing its first events into a queue nobody is
    /// reading yet. Returns `false` on timeout.
    pub async fn await_poller_start(&self, timeout: Duration) -> bool {
        if self.state.poller_started.load(Ordering::Acquire) {
            return true;
        }
        let notified = self.state.poller_notify.notified();
        if self.state.poller_started.load(Ordering::Acquire) {
            return true;
        }
        tokio::time::timeout(timeout, notified).await.is_ok()
            || self.state.poller_started.load(Ordering::Acquire)
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventQueue")
            .field("closed", &self.is_closed())
            .field("subscribers", &self.tx.receiver_count())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// QueueManager
// ---------------------------------------------------------------------------

/// A queue is already registered under this task id.
#[derive(Debug, Clone, thiserror::Error)]
#[error("an event queue already exists for this task")]
pub struct TaskQueueExists;

/// No queue is registered under this task id.
#[derive(Debug, Clone, thiserror::Error)]
#[error("no event queue exists for this task")]
pub struct NoTaskQueue;

/// Owns the main [`EventQueue`] of each in-flight task, keyed by task id.
///
/// Operations on distinct task ids never contend beyond the map lock.
#[async_trait]
pub trait QueueManager: Send + Sync {
    /// Register an externally created main queue under `task_id`.
    async fn add(&self, task_id: &str, queue: EventQueue) -> Result<(), TaskQueueExists>;

    /// The queue registered under `task_id`, if any.
    async fn get(&self, task_id: &str) -> Option<EventQueue>;

    /// A new tap of the queue registered under `task_id`, if any.
    async fn tap(&self, task_id: &str) -> Option<EventQueue>;

    /// Close the queue registered under `task_id` and drop the registration.
    async fn close(&self, task_id: &str) -> Result<(), NoTaskQueue>;

    /// The main queue for `task_id`, created on first use; a tap of it on
    /// every subsequent call.
    async fn create_or_tap(&self, task_id: &str) -> EventQueue;
}

/// The in-process [`QueueManager`]. A single runtime instance is
/// authoritative for a task id, so a plain map suffices.
#[derive(Default)]
pub struct InMemoryQueueManager {
    queues: Mutex<HashMap<String, EventQueue>>,
}

impl InMemoryQueueManager {
    /// An empty manager.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl QueueManager for InMemoryQueueManager {
    async fn add(&self, task_id: &str, queue: EventQueue) -> Result<(), TaskQueueExists> {
        let mut queues = self.queues.lock().await;
        if queues.contains_key(task_id) {
            return Err(TaskQueueExists);
        }
        queues.insert(task_id.to_string(), queue);
        Ok(())
    }

    async fn get(&self, task_id: &str) -> Option<EventQueue> {
        self.queues.lock().await.get(task_id).cloned()
    }

    async fn tap(&self, task_id: &str) -> Option<EventQueue> {
        self.queues.lock().await.get(task_id).map(EventQueue::tap)
    }

    async fn close(&self, task_id: &str) -> Result<(), NoTaskQueue> {
        let queue = self.queues.lock().await.remove(task_id);
        match queue {
            Some(queue) => {
                queue.close();
                Ok(())
            }
            None => Err(NoTaskQueue),
        }
    }

    async fn create_or_tap(&self, task_id: &str) -> EventQueue {
        let mut queues = self.queues.lock().await;
        match queues.get(task_id) {
            Some(existing) => existing.tap(),
            None => {
                let queue = EventQueue::new();
                queues.insert(task_id.to_string(), queue.clone());
                queue
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Message;

    fn message_event(text: &str) -> Event {
        Event::Message(Message::agent_text(format!("m-{text}"), text))
    }

    #[tokio::test]
    async fn subscribers_see_events_in_order() {
        let queue = EventQueue::new();
        let mut rx = queue.subscribe();
        queue.enqueue_event(message_event("one"));
        queue.enqueue_event(message_event("two"));

        for expected in ["one", "two"] {
            match rx.recv().await.unwrap() {
                Event::Message(m) => assert_eq!(m.message_id, format!("m-{expected}")),
                other => panic!("unexpected event {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn taps_observe_only_future_events() {
        let queue = EventQueue::new();
        queue.enqueue_event(message_event("before"));

        let tap = queue.tap();
        let mut tap_rx = tap.subscribe();
        queue.enqueue_event(message_event("after"));

        match tap_rx.recv().await.unwrap() {
            Event::Message(m) => assert_eq!(m.message_id, "m-after"),
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test]
    async fn closing_a_tap_closes_the_family() {
        let queue = EventQueue::new();
        let tap = queue.tap();
        let nested = tap.tap();

        nested.close();
        assert!(queue.is_closed());
        assert!(tap.is_closed());
        assert!(nested.is_closed());
    }

    #[tokio::test]
    async fn enqueue_after_close_is_dropped() {
        let queue = EventQueue::new();
        let mut rx = queue.subscribe();
        queue.close();
        queue.enqueue_event(message_event("late"));
        assert!(matches!(
            rx.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }

    #[tokio::test]
    async fn close_error_reaches_taps() {
        let queue = EventQueue::new();
        let tap = queue.tap();
        queue.close_with_error(A2AError::internal_error("producer died"));
        assert!(matches!(tap.error(), Some(A2AError::InternalError { .. })));
    }

    #[tokio::test]
    async fn poller_handshake_completes_and_times_out() {
        let queue = EventQueue::new();
        assert!(!queue.await_poller_start(Duration::from_millis(10)).await);

        queue.notify_poller_started();
        assert!(queue.await_poller_start(Duration::from_millis(10)).await);
    }

    #[tokio::test]
    async fn manager_add_conflicts_and_tap_misses() {
        let manager = InMemoryQueueManager::new();
        manager.add("t1", EventQueue::new()).await.unwrap();
        assert!(manager.add("t1", EventQueue::new()).await.is_err());
        assert!(manager.tap("missing").await.is_none());
        assert!(manager.close("missing").await.is_err());
    }

    #[tokio::test]
    async fn manager_create_or_tap_reuses_main_queue() {
        let manager = InMemoryQueueManager::new();
        let main = manager.create_or_tap("t1").await;
        let tap = manager.create_or_tap("t1").await;

        let mut tap_rx = tap.subscribe();
        main.enqueue_event(message_event("x"));
        assert!(tap_rx.recv().await.is_ok());

        manager.close("t1").await.unwrap();
        assert!(main.is_closed());
        assert!(tap.is_closed());
        assert!(manager.get("t1").await.is_none());
    }
}
