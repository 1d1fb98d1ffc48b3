//! Best-effort outbound webhooks on task updates.
//!
//! [`PushNotificationConfigStore`] keeps per-task webhook registrations;
//! [`PushNotificationSender`] POSTs task snapshots at them. Delivery is
//! fire-and-forget with a request timeout and a bounded number of retries:
//! a failure that survives the retries is logged and never propagates into
//! the JSON-RPC call that caused the update.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::error::A2AResult;
use crate::types::{PushNotificationConfig, Task};

/// Per-request timeout on webhook deliveries.
pub const DELIVERY_TIMEOUT: Duration = Duration::from_secs(10);

/// How many times a delivery is attempted before it is dropped.
pub const DELIVERY_ATTEMPTS: u32 = 3;

/// Pause before the first retry; doubled-ish by attempt number after that.
const RETRY_BACKOFF: Duration = Duration::from_millis(500);

/// Per-task webhook registrations. A task may hold several configs, each
/// addressed by its `id` (defaulted to the task id when the client sent
/// none).
#[async_trait]
pub trait PushNotificationConfigStore: Send + Sync {
    /// Add or replace (by config id) a registration for `task_id`.
    async fn set_info(&self, task_id: &str, config: PushNotificationConfig) -> A2AResult<()>;

    /// All registrations for `task_id`, oldest first.
    async fn get_info(&self, task_id: &str) -> A2AResult<Vec<PushNotificationConfig>>;

    /// Remove one registration; `config_id` defaults to the task id.
    async fn delete_info(&self, task_id: &str, config_id: Option<&str>) -> A2AResult<()>;
}

/// Process-local [`PushNotificationConfigStore`].
#[derive(Default)]
pub struct InMemoryPushNotificationConfigStore {
    configs: RwLock<HashMap<String, Vec<PushNotificationConfig>>>,
}

impl InMemoryPushNotificationConfigStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PushNotificationConfigStore for InMemoryPushNotificationConfigStore {
    async fn set_info(&self, task_id: &str, mut config: PushNotificationConfig) -> A2AResult<()> {
        config.id.get_or_insert_with(|| task_id.to_string());
        let mut configs = self.configs.write().await;
        let registered = configs.entry(task_id.to_string()).or_default();
        registered.retain(|existing| existing.id != config.id);
        registered.push(config);
        Ok(())
    }

    async fn get_info(&self, task_id: &str) -> A2AResult<Vec<PushNotificationConfig>> {
        Ok(self
            .configs
            .read()
            .await
            .get(task_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn delete_info(&self, task_id: &str, config_id: Option<&str>) -> A2AResult<()> {
        let target = config_id.unwrap_or(task_id);
        let mut configs = self.configs.write().await;
        if let Some(registered) = configs.get_mut(task_id) {
            registered.retain(|existing| existing.id.as_deref() != Some(target));
            if registered.is_empty() {
                configs.remove(task_id);
            }
        }
        Ok(())
    }
}

/// Delivers task snapshots to registered webhooks.
#[async_trait]
pub trait PushNotificationSender: Send + Sync {
    /// Notify every endpoint registered for `task.id`. Must not fail the
    /// caller; log and move on.
    async fn send_notification(&self, task: &Task);
}

/// The stock sender: one HTTP POST of the task JSON per registered config,
/// all dispatched concurrently. Each delivery gets [`DELIVERY_TIMEOUT`] per
/// request and up to [`DELIVERY_ATTEMPTS`] tries with a short backoff; a
/// delivery that still fails is logged and dropped.
pub struct BasePushNotificationSender {
    client: reqwest::Client,
    store: Arc<dyn PushNotificationConfigStore>,
}

impl BasePushNotificationSender {
    /// A sender reading registrations from `store`, with the default
    /// per-request timeout applied.
    pub fn new(store: Arc<dyn PushNotificationConfigStore>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(DELIVERY_TIMEOUT)
            .build()
            .unwrap_or_else(|err| {
                warn!(error = %err, "could not build HTTP client, falling back to defaults");
                reqwest::Client::new()
            });
        Self::with_client(client, store)
    }

    /// Same, with a caller-configured HTTP client (timeouts, proxies, TLS).
    pub fn with_client(client: reqwest::Client, store: Arc<dyn PushNotificationConfigStore>) -> Self {
        BasePushNotificationSender { client, store }
    }

    async fn post(&self, task: &Task, config: &PushNotificationConfig) {
        for attempt in 1..=DELIVERY_ATTEMPTS {
            match self.attempt(task, config).await {
                Ok(()) => {
                    debug!(task_id = %task.id, url = %config.url, attempt, "push notification delivered");
                    return;
                }
                Err(reason) if attempt < DELIVERY_ATTEMPTS => {
                    debug!(
                        task_id = %task.id,
                        url = %config.url,
                        attempt,
                        reason = %reason,
                        "push notification attempt failed, retrying"
                    );
                    tokio::time::sleep(RETRY_BACKOFF * attempt).await;
                }
                Err(reason) => {
                    warn!(
                        task_id = %task.id,
                        url = %config.url,
                        attempts = DELIVERY_ATTEMPTS,
                        reason = %reason,
                        "push notification dropped after final attempt"
                    );
                }
            }
        }
    }

    async fn attempt(&self, task: &Task, config: &PushNotificationConfig) -> Result<(), String> {
        let mut request = self.client.post(&config.url).json(task);

        if let Some(ref token) = config.token {
            request = request.header("X-A2A-Notification-Token", token);
        }
        if let Some(ref auth) = config.authentication {
            if let (Some(scheme), Some(credentials)) =
                (auth.schemes.first(), auth.credentials.as_ref())
            {
                request = request.header("Authorization", format!("{scheme} {credentials}"));
            }
        }

        match request.send().await {
            Ok(response) if response.status().is_success() => Ok(()),
            Ok(response) => Err(format!(
                "endpoint answered {}",
                response.status().as_u16()
            )),
            Err(err) => Err(err.to_string()),
        }
    }
}

#[async_trait]
impl PushNotificationSender for BasePushNotificationSender {
    async fn send_notification(&self, task: &Task) {
        let configs = match self.store.get_info(&task.id).await {
            Ok(configs) => configs,
            Err(err) => {
                warn!(task_id = %task.id, error = %err, "could not load push configs");
                return;
            }
        };
        if configs.is_empty() {
            return;
        }
        futures::future::join_all(configs.iter().map(|config| self.post(task, config))).await;
    }
}
