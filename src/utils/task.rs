//! Helpers for building [`Task`]s and shaping task responses.

use crate::error::{A2AError, A2AResult};
use crate::types::{Artifact, Message, Part, Task, TaskState, TaskStatus};
use uuid::Uuid;

/// Build a `submitted` task seeded from the message that created it.
///
/// Task and context ids are taken from the message when present, generated
/// otherwise. The message becomes the first history entry.
///
/// Fails on messages with no parts or with empty text parts; such messages
/// are invalid at the protocol level and would produce an unanswerable task.
pub fn new_task(request: Message) -> A2AResult<Task> {
    if request.parts.is_empty() {
        return Err(A2AError::invalid_params("message parts must not be empty"));
    }
    for part in &request.parts {
        if let Part::Text { text, .. } = part {
            if text.is_empty() {
                return Err(A2AError::invalid_params("text part must not be empty"));
            }
        }
    }

    let id = request
        .task_id
        .clone()
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let context_id = request
        .context_id
        .clone()
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    Ok(Task {
        id,
        context_id,
        kind: "task".to_string(),
        status: TaskStatus::now(TaskState::Submitted),
        artifacts: None,
        history: Some(vec![request]),
        metadata: None,
    })
}

/// Build a `completed` task carrying the given artifacts.
pub fn completed_task(
    task_id: impl Into<String>,
    context_id: impl Into<String>,
    artifacts: Vec<Artifact>,
    history: Option<Vec<Message>>,
) -> A2AResult<Task> {
    if artifacts.is_empty() {
        return Err(A2AError::invalid_params(
            "a completed task needs at least one artifact",
        ));
    }
    Ok(Task {
        id: task_id.into(),
        context_id: context_id.into(),
        kind: "task".to_string(),
        status: TaskStatus::now(TaskState::Completed),
        artifacts: Some(artifacts),
        history,
        metadata: None,
    })
}

/// Return a copy of `task` whose history is capped at the last
/// `history_length` messages.
///
/// `None` keeps the full history; any value `<= 0` empties it. Ordering is
/// preserved and the input task is left untouched.
pub fn apply_history_length(task: &Task, history_length: Option<i32>) -> Task {
    let mut shaped = task.clone();
    if let Some(limit) = history_length {
        if limit <= 0 {
            if shaped.history.is_some() {
                shaped.history = Some(Vec::new());
            }
        } else if let Some(history) = shaped.history.as_mut() {
            let limit = limit as usize;
            if history.len() > limit {
                *history = history.split_off(history.len() - limit);
            }
        }
    }
    shaped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(i: usize) -> Message {
        Message::user_text(format!("m{i}"), format!("message {i}"))
    }

    fn task_with_history(n: usize) -> Task {
        let mut task = Task::submitted("t1", "c1");
        task.history = Some((0..n).map(message).collect());
        task
    }

    #[test]
    fn new_task_generates_missing_ids() {
        let task = new_task(Message::user_text("m1", "hello")).unwrap();
        assert_eq!(task.status.state, TaskState::Submitted);
        assert!(Uuid::parse_str(&task.id).is_ok());
        assert_eq!(task.history.as_ref().unwrap().len(), 1);
    }

    #[test]
    fn new_task_honors_supplied_ids() {
        let mut msg = Message::user_text("m1", "hello");
        msg.task_id = Some("T1".into());
        msg.context_id = Some("c1".into());
        let task = new_task(msg).unwrap();
        assert_eq!(task.id, "T1");
        assert_eq!(task.context_id, "c1");
    }

    #[test]
    fn new_task_rejects_empty_content() {
        let mut msg = Message::user_text("m1", "hello");
        msg.parts.clear();
        assert!(new_task(msg).is_err());

        let empty_text = Message::user_text("m2", "");
        assert!(new_task(empty_text).is_err());
    }

    #[test]
    fn completed_task_requires_artifacts() {
        assert!(completed_task("t1", "c1", vec![], None).is_err());
    }

    #[test]
    fn history_cap_keeps_most_recent_entries() {
        let task = task_with_history(10);
        let shaped = apply_history_length(&task, Some(3));
        let history = shaped.history.unwrap();
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].message_id, "m7");
        assert_eq!(history[2].message_id, "m9");
        // The original is untouched.
        assert_eq!(task.history.unwrap().len(), 10);
    }

    #[test]
    fn history_cap_of_zero_or_less_empties_history() {
        assert!(apply_history_length(&task_with_history(4), Some(0))
            .history
            .unwrap()
            .is_empty());
        assert!(apply_history_length(&task_with_history(4), Some(-2))
            .history
            .unwrap()
            .is_empty());
    }

    #[test]
    fn absent_cap_keeps_everything() {
        let shaped = apply_history_length(&task_with_history(4), None);
        assert_eq!(shaped.history.unwrap().len(), 4);
    }

    #[test]
    fn oversized_cap_is_a_noop() {
        let shaped = apply_history_length(&task_with_history(2), Some(10));
        assert_eq!(shaped.history.unwrap().len(), 2);
    }
}
