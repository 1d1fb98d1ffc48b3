//! Helpers for building and reading [`Message`]s.

use crate::types::{Message, Part, Role};
use crate::utils::parts::get_text_parts;
use uuid::Uuid;

/// Build an agent message with a single text part and a generated id.
pub fn new_agent_text_message(
    text: impl Into<String>,
    context_id: Option<impl Into<String>>,
    task_id: Option<impl Into<String>>,
) -> Message {
    new_agent_parts_message(vec![Part::text(text)], context_id, task_id)
}

/// Build an agent message from arbitrary parts with a generated id.
pub fn new_agent_parts_message(
    parts: Vec<Part>,
    context_id: Option<impl Into<String>>,
    task_id: Option<impl Into<String>>,
) -> Message {
    Message {
        message_id: Uuid::new_v4().to_string(),
        role: Role::Agent,
        kind: "message".to_string(),
        parts,
        context_id: context_id.map(Into::into),
        task_id: task_id.map(Into::into),
        metadata: None,
        extensions: None,
        reference_task_ids: None,
    }
}

/// Join the text content of a message's text parts with `delimiter`.
/// Returns an empty string when there are no text parts.
pub fn get_message_text(message: &Message, delimiter: &str) -> String {
    get_text_parts(&message.parts).join(delimiter)
}
