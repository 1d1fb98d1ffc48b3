//! The A2A wire-level domain model.
//!
//! Everything here serializes to the JSON shapes mandated by the A2A
//! protocol (v0.3): camelCase field names, `kind`-tagged unions for events
//! and parts, `type`-tagged security schemes, and the JSON-RPC 2.0 envelope.
//! The runtime treats these types as data; all behavior lives in
//! [`crate::server`].

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

// ---------------------------------------------------------------------------
// Task lifecycle
// ---------------------------------------------------------------------------

/// Lifecycle state of a [`Task`].
///
/// States are serialized in kebab-case (`"input-required"`). A task moves
/// monotonically toward one of the terminal states and never transitions out
/// of one; the interrupt states pause the task while the executor keeps
/// running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskState {
    /// Accepted, not yet started.
    Submitted,
    /// The agent is actively working.
    Working,
    /// Finished successfully. Terminal.
    Completed,
    /// Finished with an error. Terminal.
    Failed,
    /// Canceled by the client. Terminal.
    Canceled,
    /// Waiting for further client input. Interrupt.
    InputRequired,
    /// Refused by the agent. Terminal.
    Rejected,
    /// Waiting for the client to authenticate. Interrupt.
    AuthRequired,
    /// State could not be determined. Treated as terminal.
    Unknown,
}

impl TaskState {
    /// Whether the task can never transition again.
    ///
    /// This is the single terminality predicate used by the queue consumer,
    /// the task manager, and the request handler alike.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskState::Completed
                | TaskState::Failed
                | TaskState::Canceled
                | TaskState::Rejected
                | TaskState::Unknown
        )
    }

    /// Whether the task is paused awaiting the client (`input-required` or
    /// `auth-required`). The executor stays alive through an interrupt.
    pub fn is_interrupt(self) -> bool {
        matches!(self, TaskState::InputRequired | TaskState::AuthRequired)
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskState::Submitted => "submitted",
            TaskState::Working => "working",
            TaskState::Completed => "completed",
            TaskState::Failed => "failed",
            TaskState::Canceled => "canceled",
            TaskState::InputRequired => "input-required",
            TaskState::Rejected => "rejected",
            TaskState::AuthRequired => "auth-required",
            TaskState::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// A task's current state plus the optional message and timestamp that came
/// with it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStatus {
    /// The lifecycle state.
    pub state: TaskState,

    /// Agent message accompanying this status, if any. Moved into the task
    /// history when the status is replaced.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,

    /// RFC 3339 timestamp of when the status was set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl TaskStatus {
    /// A status with no message and no timestamp.
    pub fn new(state: TaskState) -> Self {
        TaskStatus {
            state,
            message: None,
            timestamp: None,
        }
    }

    /// A status stamped with the current UTC time.
    pub fn now(state: TaskState) -> Self {
        TaskStatus {
            state,
            message: None,
            timestamp: Some(chrono::Utc::now().to_rfc3339()),
        }
    }
}

/// The unit of work tracked by the runtime.
///
/// `id` and `context_id` are fixed at creation. `history` is append-only;
/// `artifacts` are merged per the artifact-update rules. The task store holds
/// the single authoritative copy per id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Task identifier, unique per runtime instance.
    pub id: String,

    /// Conversation grouping shared across messages and tasks.
    pub context_id: String,

    /// Wire discriminator, always `"task"`.
    #[serde(default = "kind_task")]
    pub kind: String,

    /// Current status.
    pub status: TaskStatus,

    /// Outputs produced so far.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifacts: Option<Vec<Artifact>>,

    /// Messages exchanged for this task, oldest first.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history: Option<Vec<Message>>,

    /// Freeform metadata.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl Task {
    /// A freshly submitted task with empty history.
    pub fn submitted(id: impl Into<String>, context_id: impl Into<String>) -> Self {
        Task {
            id: id.into(),
            context_id: context_id.into(),
            kind: kind_task(),
            status: TaskStatus::new(TaskState::Submitted),
            artifacts: None,
            history: None,
            metadata: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Messages and parts
// ---------------------------------------------------------------------------

/// Who authored a [`Message`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The client side of the conversation.
    User,
    /// The agent side.
    Agent,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => f.write_str("user"),
            Role::Agent => f.write_str("agent"),
        }
    }
}

/// One turn of a conversation, composed of one or more [`Part`]s.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Message identifier, generated if the sender did not supply one.
    pub message_id: String,

    /// Sender role.
    pub role: Role,

    /// Wire discriminator, always `"message"`.
    #[serde(default = "kind_message")]
    pub kind: String,

    /// Ordered content parts. Never empty on a valid message.
    pub parts: Vec<Part>,

    /// Conversation this message belongs to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context_id: Option<String>,

    /// Task this message continues, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,

    /// Freeform metadata.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,

    /// URIs of protocol extensions relevant to this message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Vec<String>>,

    /// Other tasks this message refers to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_task_ids: Option<Vec<String>>,
}

impl Message {
    /// A user message with a single text part.
    pub fn user_text(message_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self::text(Role::User, message_id, text)
    }

    /// An agent message with a single text part.
    pub fn agent_text(message_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self::text(Role::Agent, message_id, text)
    }

    fn text(role: Role, message_id: impl Into<String>, text: impl Into<String>) -> Self {
        Message {
            message_id: message_id.into(),
            role,
            kind: kind_message(),
            parts: vec![Part::text(text)],
            context_id: None,
            task_id: None,
            metadata: None,
            extensions: None,
            reference_task_ids: None,
        }
    }
}

/// File payload delivered inline as base64 bytes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileWithBytes {
    /// Base64-encoded content.
    pub bytes: String,
    /// MIME type, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    /// File name, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// File payload referenced by URI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileWithUri {
    /// Where the content lives.
    pub uri: String,
    /// MIME type, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    /// File name, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// The two file delivery forms. Untagged: the presence of `bytes` or `uri`
/// decides which one a JSON object is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FileContent {
    /// Inline base64 bytes.
    Bytes(FileWithBytes),
    /// URI reference.
    Uri(FileWithUri),
}

/// A unit of content inside a message or artifact, discriminated on the wire
/// by the `kind` field:
///
/// ```json
/// {"kind": "text", "text": "hello"}
/// {"kind": "file", "file": {"uri": "https://…", "mimeType": "application/pdf"}}
/// {"kind": "data", "data": {"answer": 42}}
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Part {
    /// Plain text.
    #[serde(rename = "text")]
    Text {
        /// The text content.
        text: String,
        /// Freeform metadata for this part.
        #[serde(skip_serializing_if = "Option::is_none")]
        metadata: Option<serde_json::Value>,
    },
    /// A file, inline or by reference.
    #[serde(rename = "file")]
    File {
        /// The file payload.
        file: FileContent,
        /// Freeform metadata for this part.
        #[serde(skip_serializing_if = "Option::is_none")]
        metadata: Option<serde_json::Value>,
    },
    /// Structured data.
    #[serde(rename = "data")]
    Data {
        /// Arbitrary JSON payload.
        data: serde_json::Value,
        /// Freeform metadata for this part.
        #[serde(skip_serializing_if = "Option::is_none")]
        metadata: Option<serde_json::Value>,
    },
}

impl Part {
    /// A text part without metadata.
    pub fn text(text: impl Into<String>) -> Self {
        Part::Text {
            text: text.into(),
            metadata: None,
        }
    }

    /// A file part carrying inline base64 bytes.
    pub fn file_from_bytes(
        bytes: impl Into<String>,
        name: Option<String>,
        mime_type: Option<String>,
    ) -> Self {
        Part::File {
            file: FileContent::Bytes(FileWithBytes {
                bytes: bytes.into(),
                mime_type,
                name,
            }),
            metadata: None,
        }
    }

    /// A file part referencing content by URI.
    pub fn file_from_uri(
        uri: impl Into<String>,
        name: Option<String>,
        mime_type: Option<String>,
    ) -> Self {
        Part::File {
            file: FileContent::Uri(FileWithUri {
                uri: uri.into(),
                mime_type,
                name,
            }),
            metadata: None,
        }
    }

    /// A structured data part.
    pub fn data(data: serde_json::Value) -> Self {
        Part::Data {
            data,
            metadata: None,
        }
    }
}

/// A structured output attached to a task.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    /// Identifier used to merge successive artifact-update chunks.
    pub artifact_id: String,

    /// Human-readable name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// What this artifact is.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Ordered content parts. Never empty on a valid artifact.
    pub parts: Vec<Part>,

    /// Freeform metadata.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,

    /// URIs of protocol extensions relevant to this artifact.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Vec<String>>,
}

// ---------------------------------------------------------------------------
// Streaming update events
// ---------------------------------------------------------------------------

/// Announces that a task's status changed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStatusUpdateEvent {
    /// Task whose status changed.
    pub task_id: String,

    /// The task's context.
    pub context_id: String,

    /// Wire discriminator, always `"status-update"`.
    #[serde(default = "kind_status_update")]
    pub kind: String,

    /// The new status.
    pub status: TaskStatus,

    /// `true` on the last event of a stream. Always present on the wire,
    /// even when `false`.
    #[serde(rename = "final")]
    pub r#final: bool,

    /// Freeform metadata, merged into the task's metadata on fold.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

/// Announces a new artifact or a continuation chunk of an existing one.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskArtifactUpdateEvent {
    /// Task the artifact belongs to.
    pub task_id: String,

    /// The task's context.
    pub context_id: String,

    /// Wire discriminator, always `"artifact-update"`.
    #[serde(default = "kind_artifact_update")]
    pub kind: String,

    /// The artifact payload (full, or the parts to append).
    pub artifact: Artifact,

    /// When `true`, concatenate this event's parts onto the artifact with the
    /// same id instead of replacing it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub append: Option<bool>,

    /// Informational: whether this is the final chunk.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_chunk: Option<bool>,

    /// Freeform metadata.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

fn kind_task() -> String {
    "task".to_string()
}

fn kind_message() -> String {
    "message".to_string()
}

fn kind_status_update() -> String {
    "status-update".to_string()
}

fn kind_artifact_update() -> String {
    "artifact-update".to_string()
}

// ---------------------------------------------------------------------------
// Event unions
// ---------------------------------------------------------------------------

/// Anything an executor can emit on an event queue.
///
/// On the wire each variant serializes flat, with the inner `kind` field as
/// the discriminator — there is no wrapper object.
#[derive(Debug, Clone)]
pub enum Event {
    /// A full task snapshot.
    Task(Task),
    /// A standalone agent reply; ends the stream without a task.
    Message(Message),
    /// A status change.
    StatusUpdate(TaskStatusUpdateEvent),
    /// An artifact chunk.
    ArtifactUpdate(TaskArtifactUpdateEvent),
}

impl Event {
    /// The wire discriminator of this event.
    pub fn kind(&self) -> &'static str {
        match self {
            Event::Task(_) => "task",
            Event::Message(_) => "message",
            Event::StatusUpdate(_) => "status-update",
            Event::ArtifactUpdate(_) => "artifact-update",
        }
    }

    /// The task id this event refers to, when it carries one.
    pub fn task_id(&self) -> Option<&str> {
        match self {
            Event::Task(t) => Some(&t.id),
            Event::Message(m) => m.task_id.as_deref(),
            Event::StatusUpdate(e) => Some(&e.task_id),
            Event::ArtifactUpdate(e) => Some(&e.task_id),
        }
    }

    /// Whether this event ends the stream it appears in: a standalone
    /// message, a status update flagged `final`, or any snapshot or status
    /// carrying a terminal [`TaskState`].
    pub fn is_final(&self) -> bool {
        match self {
            Event::Message(_) => true,
            Event::Task(t) => t.status.state.is_terminal(),
            Event::StatusUpdate(e) => e.r#final || e.status.state.is_terminal(),
            Event::ArtifactUpdate(_) => false,
        }
    }

    /// Whether this event puts the task into an interrupt state.
    pub fn is_interrupt(&self) -> bool {
        match self {
            Event::Task(t) => t.status.state.is_interrupt(),
            Event::StatusUpdate(e) => e.status.state.is_interrupt(),
            _ => false,
        }
    }
}

impl Serialize for Event {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Event::Task(inner) => inner.serialize(serializer),
            Event::Message(inner) => inner.serialize(serializer),
            Event::StatusUpdate(inner) => inner.serialize(serializer),
            Event::ArtifactUpdate(inner) => inner.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Event {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        match discriminator(&value)? {
            "task" => serde_json::from_value(value)
                .map(Event::Task)
                .map_err(serde::de::Error::custom),
            "message" => serde_json::from_value(value)
                .map(Event::Message)
                .map_err(serde::de::Error::custom),
            "status-update" => serde_json::from_value(value)
                .map(Event::StatusUpdate)
                .map_err(serde::de::Error::custom),
            "artifact-update" => serde_json::from_value(value)
                .map(Event::ArtifactUpdate)
                .map_err(serde::de::Error::custom),
            other => Err(serde::de::Error::unknown_variant(
                other,
                &["task", "message", "status-update", "artifact-update"],
            )),
        }
    }
}

/// The result of a blocking `message/send`: the final task, or the agent's
/// standalone reply. Serializes flat, discriminated by `kind`.
#[derive(Debug, Clone)]
pub enum SendMessageResult {
    /// The task's final (or interrupted) snapshot.
    Task(Task),
    /// A bare agent reply; no task was involved.
    Message(Message),
}

impl Serialize for SendMessageResult {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            SendMessageResult::Task(inner) => inner.serialize(serializer),
            SendMessageResult::Message(inner) => inner.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for SendMessageResult {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        match discriminator(&value)? {
            "task" => serde_json::from_value(value)
                .map(SendMessageResult::Task)
                .map_err(serde::de::Error::custom),
            "message" => serde_json::from_value(value)
                .map(SendMessageResult::Message)
                .map_err(serde::de::Error::custom),
            other => Err(serde::de::Error::unknown_variant(
                other,
                &["task", "message"],
            )),
        }
    }
}

fn discriminator<E: serde::de::Error>(value: &serde_json::Value) -> Result<&str, E> {
    value
        .get("kind")
        .and_then(|v| v.as_str())
        .ok_or_else(|| E::missing_field("kind"))
}

// ---------------------------------------------------------------------------
// Agent card
// ---------------------------------------------------------------------------

/// The self-describing manifest served at the agent's well-known URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentCard {
    /// Human-readable agent name.
    pub name: String,

    /// What the agent does.
    pub description: String,

    /// Agent version string.
    pub version: String,

    /// A2A protocol version the agent speaks. Defaults to `"0.3.0"`.
    #[serde(default = "default_protocol_version")]
    pub protocol_version: String,

    /// Primary endpoint URL.
    pub url: String,

    /// Transport spoken at [`AgentCard::url`]. Defaults to `"JSONRPC"`.
    #[serde(default = "default_preferred_transport")]
    pub preferred_transport: String,

    /// Further endpoints, possibly on other transports.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_interfaces: Option<Vec<AgentInterface>>,

    /// Operator of the agent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<AgentProvider>,

    /// Link to human documentation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub documentation_url: Option<String>,

    /// Optional capabilities: streaming, push notifications, extensions.
    pub capabilities: AgentCapabilities,

    /// Named security scheme definitions, referenced from `security`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub security_schemes: Option<HashMap<String, SecurityScheme>>,

    /// Security requirements for calling the agent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub security: Option<Vec<SecurityRequirement>>,

    /// MIME types accepted as input by default.
    pub default_input_modes: Vec<String>,

    /// MIME types produced as output by default.
    pub default_output_modes: Vec<String>,

    /// What the agent can do.
    pub skills: Vec<AgentSkill>,

    /// Whether an authenticated caller can fetch an extended card.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supports_authenticated_extended_card: Option<bool>,

    /// JWS signatures over the card.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signatures: Option<Vec<AgentCardSignature>>,

    /// Link to an icon.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
}

fn default_protocol_version() -> String {
    "0.3.0".to_string()
}

fn default_preferred_transport() -> String {
    "JSONRPC".to_string()
}

/// One endpoint/transport pair an agent is reachable on.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentInterface {
    /// Endpoint URL.
    pub url: String,

    /// Transport label, e.g. `"JSONRPC"`, `"GRPC"`, `"HTTP+JSON"`.
    pub transport: String,
}

/// Optional features an agent declares.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentCapabilities {
    /// Supports `message/stream` and `tasks/resubscribe`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub streaming: Option<bool>,

    /// Supports the `tasks/pushNotificationConfig/*` methods.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub push_notifications: Option<bool>,

    /// Exposes per-task state transition history.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_transition_history: Option<bool>,

    /// Protocol extensions the agent understands.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Vec<AgentExtension>>,
}

/// A protocol extension declared in the agent card.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentExtension {
    /// Extension URI.
    pub uri: String,

    /// What the extension does.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Whether clients must understand the extension to talk to the agent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,

    /// Extension-specific configuration.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
}

/// A capability advertised by the agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentSkill {
    /// Skill identifier, unique within the card.
    pub id: String,

    /// Human-readable name.
    pub name: String,

    /// What the skill does.
    pub description: String,

    /// Categorization tags.
    pub tags: Vec<String>,

    /// Example prompts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub examples: Option<Vec<String>>,

    /// Input MIME types, when narrower than the card default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_modes: Option<Vec<String>>,

    /// Output MIME types, when narrower than the card default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_modes: Option<Vec<String>>,

    /// Extra security requirements for this skill.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub security: Option<Vec<SecurityRequirement>>,
}

/// The organization behind an agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentProvider {
    /// Organization name.
    pub organization: String,

    /// Organization URL.
    pub url: String,
}

/// A detached JWS signature (RFC 7515) over the agent card.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentCardSignature {
    /// Base64url-encoded protected header.
    pub protected: String,

    /// Base64url-encoded signature.
    pub signature: String,

    /// Unprotected header values.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header: Option<serde_json::Value>,
}

// ---------------------------------------------------------------------------
// Security schemes
// ---------------------------------------------------------------------------

/// Where an API key is carried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiKeyLocation {
    /// In a cookie.
    Cookie,
    /// In an HTTP header.
    Header,
    /// In a query parameter.
    Query,
}

/// An OpenAPI-style security scheme, discriminated by `type`:
///
/// ```json
/// {"type": "apiKey", "in": "header", "name": "X-API-Key"}
/// {"type": "http", "scheme": "bearer"}
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SecurityScheme {
    /// A static API key.
    #[serde(rename = "apiKey")]
    ApiKey {
        /// Scheme description.
        #[serde(skip_serializing_if = "Option::is_none")]
        description: Option<String>,
        /// Where the key goes. Serialized as `"in"`.
        #[serde(rename = "in")]
        location: ApiKeyLocation,
        /// Header/query/cookie name carrying the key.
        name: String,
    },
    /// RFC 7235 HTTP authentication.
    #[serde(rename = "http")]
    Http {
        /// Scheme description.
        #[serde(skip_serializing_if = "Option::is_none")]
        description: Option<String>,
        /// Scheme name, e.g. `"bearer"`.
        scheme: String,
        /// Bearer token format hint.
        #[serde(rename = "bearerFormat", skip_serializing_if = "Option::is_none")]
        bearer_format: Option<String>,
    },
    /// OAuth 2.0.
    #[serde(rename = "oauth2")]
    OAuth2 {
        /// Scheme description.
        #[serde(skip_serializing_if = "Option::is_none")]
        description: Option<String>,
        /// The flows the agent accepts.
        flows: OAuthFlows,
        /// RFC 8414 metadata URL.
        #[serde(rename = "oauth2MetadataUrl", skip_serializing_if = "Option::is_none")]
        oauth2_metadata_url: Option<String>,
    },
    /// OpenID Connect discovery.
    #[serde(rename = "openIdConnect")]
    OpenIdConnect {
        /// Scheme description.
        #[serde(skip_serializing_if = "Option::is_none")]
        description: Option<String>,
        /// Discovery document URL.
        #[serde(rename = "openIdConnectUrl")]
        open_id_connect_url: String,
    },
    /// Mutual TLS.
    #[serde(rename = "mutualTLS")]
    MutualTls {
        /// Scheme description.
        #[serde(skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
}

/// The OAuth 2.0 flows a scheme offers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OAuthFlows {
    /// Authorization code flow.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authorization_code: Option<AuthorizationCodeOAuthFlow>,

    /// Client credentials flow.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_credentials: Option<ClientCredentialsOAuthFlow>,

    /// Implicit flow (deprecated in OAuth 2.1).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub implicit: Option<ImplicitOAuthFlow>,

    /// Resource-owner password flow (deprecated in OAuth 2.1).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<PasswordOAuthFlow>,
}

/// Authorization code flow endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationCodeOAuthFlow {
    /// Authorization endpoint.
    pub authorization_url: String,

    /// Token endpoint.
    pub token_url: String,

    /// Refresh endpoint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_url: Option<String>,

    /// Scope name → description.
    pub scopes: HashMap<String, String>,
}

/// Client credentials flow endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientCredentialsOAuthFlow {
    /// Token endpoint.
    pub token_url: String,

    /// Refresh endpoint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_url: Option<String>,

    /// Scope name → description.
    pub scopes: HashMap<String, String>,
}

/// Implicit flow endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImplicitOAuthFlow {
    /// Authorization endpoint.
    pub authorization_url: String,

    /// Refresh endpoint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_url: Option<String>,

    /// Scope name → description.
    pub scopes: HashMap<String, String>,
}

/// Resource-owner password flow endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordOAuthFlow {
    /// Token endpoint.
    pub token_url: String,

    /// Refresh endpoint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_url: Option<String>,

    /// Scope name → description.
    pub scopes: HashMap<String, String>,
}

/// Scheme name → required scopes, e.g. `[{"oauth": ["read", "write"]}]`.
pub type SecurityRequirement = HashMap<String, Vec<String>>;

// ---------------------------------------------------------------------------
// Push notification configuration
// ---------------------------------------------------------------------------

/// Where and how to deliver task-update webhooks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushNotificationConfig {
    /// Config identifier; a task may register several configs. Defaults to
    /// the task id when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Webhook URL.
    pub url: String,

    /// Opaque token echoed back so the receiver can validate the source.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// How to authenticate against the webhook.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authentication: Option<PushNotificationAuthenticationInfo>,
}

/// Authentication requirements of a push notification endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushNotificationAuthenticationInfo {
    /// Accepted schemes, e.g. `["Bearer"]`.
    pub schemes: Vec<String>,

    /// Credentials to present, when the scheme needs them.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credentials: Option<String>,
}

/// A [`PushNotificationConfig`] bound to a task. This is both the params and
/// the result shape of `tasks/pushNotificationConfig/set`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPushNotificationConfig {
    /// The task the config applies to.
    pub task_id: String,

    /// The webhook configuration.
    pub push_notification_config: PushNotificationConfig,
}

// ---------------------------------------------------------------------------
// JSON-RPC envelope
// ---------------------------------------------------------------------------

/// A JSON-RPC request id: string, integer, or null.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JsonRpcId {
    /// String id.
    String(String),
    /// Integer id.
    Number(i64),
    /// Explicit null (used in responses when the request id is unknown).
    #[default]
    Null,
}

impl fmt::Display for JsonRpcId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JsonRpcId::String(s) => f.write_str(s),
            JsonRpcId::Number(n) => write!(f, "{}", n),
            JsonRpcId::Null => f.write_str("null"),
        }
    }
}

impl From<&str> for JsonRpcId {
    fn from(s: &str) -> Self {
        JsonRpcId::String(s.to_string())
    }
}

impl From<String> for JsonRpcId {
    fn from(s: String) -> Self {
        JsonRpcId::String(s)
    }
}

impl From<i64> for JsonRpcId {
    fn from(n: i64) -> Self {
        JsonRpcId::Number(n)
    }
}

/// A JSON-RPC 2.0 request envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    /// Always `"2.0"`.
    pub jsonrpc: String,

    /// Request id; absent on notifications.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<JsonRpcId>,

    /// Method name, e.g. `"message/send"`.
    pub method: String,

    /// Method parameters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
}

impl JsonRpcRequest {
    /// A request with an id.
    pub fn new(
        id: impl Into<JsonRpcId>,
        method: impl Into<String>,
        params: Option<serde_json::Value>,
    ) -> Self {
        JsonRpcRequest {
            jsonrpc: "2.0".to_string(),
            id: Some(id.into()),
            method: method.into(),
            params,
        }
    }
}

/// A JSON-RPC 2.0 response envelope. Exactly one of `result` and `error` is
/// present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    /// Always `"2.0"`.
    pub jsonrpc: String,

    /// Echo of the request id; `null` when the id could not be determined.
    #[serde(default)]
    pub id: JsonRpcId,

    /// The result on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,

    /// The error on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    /// A success envelope.
    pub fn success(id: JsonRpcId, result: serde_json::Value) -> Self {
        JsonRpcResponse {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// An error envelope.
    pub fn error(id: JsonRpcId, error: JsonRpcError) -> Self {
        JsonRpcResponse {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }
}

/// A JSON-RPC 2.0 error object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    /// Stable error code; see [`crate::error`].
    pub code: i64,

    /// Human-readable message.
    pub message: String,

    /// Optional structured detail.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

// ---------------------------------------------------------------------------
// Method parameter types
// ---------------------------------------------------------------------------

/// Params of `message/send` and `message/stream`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageSendParams {
    /// The inbound message.
    pub message: Message,

    /// Per-call options.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub configuration: Option<MessageSendConfiguration>,

    /// Freeform metadata.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

/// Options on a `message/send` call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageSendConfiguration {
    /// Output MIME types the client can handle.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accepted_output_modes: Option<Vec<String>>,

    /// Webhook config to register alongside the send.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub push_notification_config: Option<PushNotificationConfig>,

    /// Cap on history entries in the returned task; `<= 0` means none.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history_length: Option<i32>,

    /// Block until the task reaches a terminal or interrupt state.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocking: Option<bool>,
}

/// Params of `tasks/get`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskQueryParams {
    /// Task id.
    pub id: String,

    /// Cap on history entries in the returned task; `<= 0` means none.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history_length: Option<i32>,

    /// Freeform metadata.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

/// Params of `tasks/cancel` and `tasks/resubscribe`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskIdParams {
    /// Task id.
    pub id: String,

    /// Freeform metadata.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

/// Params of `tasks/pushNotificationConfig/get`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetTaskPushNotificationConfigParams {
    /// Task id.
    pub id: String,

    /// Which config to fetch; the first registered one when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub push_notification_config_id: Option<String>,

    /// Freeform metadata.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

/// Params of `tasks/pushNotificationConfig/list`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListTaskPushNotificationConfigParams {
    /// Task id.
    pub id: String,

    /// Freeform metadata.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

/// Params of `tasks/pushNotificationConfig/delete`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteTaskPushNotificationConfigParams {
    /// Task id.
    pub id: String,

    /// Which config to remove.
    pub push_notification_config_id: String,

    /// Freeform metadata.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}
