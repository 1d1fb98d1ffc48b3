//! Wire-format checks against hand-written JSON: the shapes other A2A
//! implementations will actually send and expect.

use serde_json::{json, Value};

use a2a_runtime::types::*;

fn round_trip<T>(value: &T) -> Value
where
    T: serde::Serialize + serde::de::DeserializeOwned,
{
    let wire = serde_json::to_value(value).unwrap();
    let back: T = serde_json::from_value(wire.clone()).unwrap();
    assert_eq!(serde_json::to_value(&back).unwrap(), wire);
    wire
}

#[test]
fn task_matches_the_documented_shape() {
    let mut task = Task::submitted("task-1", "ctx-1");
    task.status = TaskStatus {
        state: TaskState::Working,
        message: None,
        timestamp: Some("2026-01-01T00:00:00Z".to_string()),
    };
    task.history = Some(vec![Message::user_text("m1", "hello")]);

    let wire = round_trip(&task);
    assert_eq!(wire["kind"], "task");
    assert_eq!(wire["contextId"], "ctx-1");
    assert_eq!(wire["status"]["state"], "working");
    assert_eq!(wire["status"]["timestamp"], "2026-01-01T00:00:00Z");
    assert_eq!(wire["history"][0]["kind"], "message");
}

#[test]
fn inbound_task_without_kind_field_still_parses() {
    // Older peers omit the discriminator on plain (non-union) positions.
    let task: Task = serde_json::from_value(json!({
        "id": "t1",
        "contextId": "c1",
        "status": {"state": "submitted"}
    }))
    .unwrap();
    assert_eq!(task.kind, "task");
}

#[test]
fn every_part_variant_round_trips() {
    let parts = vec![
        Part::text("plain"),
        Part::file_from_bytes("aGVsbG8=", Some("hello.txt".into()), Some("text/plain".into())),
        Part::file_from_uri("https://example.com/doc.pdf", None, Some("application/pdf".into())),
        Part::data(json!({"rows": [1, 2, 3]})),
    ];
    let wires: Vec<Value> = parts.iter().map(round_trip).collect();
    assert_eq!(wires[0]["kind"], "text");
    assert_eq!(wires[1]["file"]["bytes"], "aGVsbG8=");
    assert_eq!(wires[2]["file"]["uri"], "https://example.com/doc.pdf");
    assert_eq!(wires[3]["data"]["rows"][1], 2);
}

#[test]
fn every_event_kind_round_trips_through_the_union() {
    let events = vec![
        Event::Task(Task::submitted("t1", "c1")),
        Event::Message(Message::agent_text("m1", "reply")),
        Event::StatusUpdate(TaskStatusUpdateEvent {
            task_id: "t1".into(),
            context_id: "c1".into(),
            kind: "status-update".into(),
            status: TaskStatus::new(TaskState::InputRequired),
            r#final: false,
            metadata: Some(json!({"step": 2})),
        }),
        Event::ArtifactUpdate(TaskArtifactUpdateEvent {
            task_id: "t1".into(),
            context_id: "c1".into(),
            kind: "artifact-update".into(),
            artifact: Artifact {
                artifact_id: "a1".into(),
                name: Some("chunk".into()),
                description: None,
                parts: vec![Part::text("piece")],
                metadata: None,
                extensions: None,
            },
            append: Some(true),
            last_chunk: Some(false),
            metadata: None,
        }),
    ];

    for event in &events {
        let wire = round_trip(event);
        assert_eq!(wire["kind"], event.kind());
        // The union serializes flat: identity fields sit at the top level.
        assert!(wire.get("result").is_none());
    }
}

#[test]
fn status_update_wire_shape_is_exact() {
    let event = TaskStatusUpdateEvent {
        task_id: "T1".into(),
        context_id: "c1".into(),
        kind: "status-update".into(),
        status: TaskStatus::new(TaskState::Completed),
        r#final: true,
        metadata: None,
    };
    assert_eq!(
        serde_json::to_value(&event).unwrap(),
        json!({
            "taskId": "T1",
            "contextId": "c1",
            "kind": "status-update",
            "status": {"state": "completed"},
            "final": true
        })
    );
}

#[test]
fn artifact_update_optional_flags_are_omitted_when_absent() {
    let event = TaskArtifactUpdateEvent {
        task_id: "T1".into(),
        context_id: "c1".into(),
        kind: "artifact-update".into(),
        artifact: Artifact {
            artifact_id: "a1".into(),
            name: None,
            description: None,
            parts: vec![Part::text("x")],
            metadata: None,
            extensions: None,
        },
        append: None,
        last_chunk: None,
        metadata: None,
    };
    let wire = serde_json::to_value(&event).unwrap();
    assert!(wire.get("append").is_none());
    assert!(wire.get("lastChunk").is_none());
}

#[test]
fn message_send_params_parse_the_canonical_request() {
    let params: MessageSendParams = serde_json::from_value(json!({
        "message": {
            "role": "user",
            "parts": [{"kind": "text", "text": "tell me a joke"}],
            "contextId": "c1",
            "messageId": "m1"
        },
        "configuration": {
            "acceptedOutputModes": ["text"],
            "blocking": true,
            "historyLength": 5,
            "pushNotificationConfig": {"url": "https://hooks.example/cb", "token": "tok"}
        }
    }))
    .unwrap();

    let config = params.configuration.unwrap();
    assert_eq!(config.history_length, Some(5));
    assert_eq!(
        config.push_notification_config.unwrap().token.as_deref(),
        Some("tok")
    );
}

#[test]
fn push_config_round_trips_with_auth_schemes() {
    let config = PushNotificationConfig {
        id: Some("cfg-1".into()),
        url: "https://hooks.example/cb".into(),
        token: Some("tok".into()),
        authentication: Some(PushNotificationAuthenticationInfo {
            schemes: vec!["Bearer".into()],
            credentials: Some("secret".into()),
        }),
    };
    let wire = round_trip(&config);
    assert_eq!(wire["authentication"]["schemes"], json!(["Bearer"]));

    let bound = TaskPushNotificationConfig {
        task_id: "T1".into(),
        push_notification_config: config,
    };
    let wire = round_trip(&bound);
    assert_eq!(wire["taskId"], "T1");
    assert_eq!(wire["pushNotificationConfig"]["url"], "https://hooks.example/cb");
}

#[test]
fn security_schemes_round_trip_each_type() {
    let schemes = vec![
        serde_json::to_value(SecurityScheme::ApiKey {
            description: None,
            location: ApiKeyLocation::Header,
            name: "X-API-Key".into(),
        })
        .unwrap(),
        serde_json::to_value(SecurityScheme::Http {
            description: None,
            scheme: "bearer".into(),
            bearer_format: Some("JWT".into()),
        })
        .unwrap(),
        serde_json::to_value(SecurityScheme::OpenIdConnect {
            description: None,
            open_id_connect_url: "https://auth.example/.well-known/openid-configuration".into(),
        })
        .unwrap(),
        serde_json::to_value(SecurityScheme::MutualTls { description: None }).unwrap(),
    ];

    for wire in schemes {
        let back: SecurityScheme = serde_json::from_value(wire.clone()).unwrap();
        assert_eq!(serde_json::to_value(&back).unwrap(), wire);
    }
}

#[test]
fn jsonrpc_request_and_response_shapes() {
    let request: JsonRpcRequest = serde_json::from_value(json!({
        "jsonrpc": "2.0",
        "id": "abc",
        "method": "tasks/get",
        "params": {"id": "T1"}
    }))
    .unwrap();
    assert_eq!(request.method, "tasks/get");
    assert_eq!(request.id, Some(JsonRpcId::String("abc".into())));

    let response = JsonRpcResponse::error(
        JsonRpcId::Null,
        JsonRpcError {
            code: -32001,
            message: "Task not found".into(),
            data: None,
        },
    );
    let wire = serde_json::to_value(&response).unwrap();
    assert_eq!(wire["id"], Value::Null);
    assert_eq!(wire["error"]["code"], -32001);
}

#[test]
fn agent_card_serializes_camel_case_capabilities() {
    let card: AgentCard = serde_json::from_value(json!({
        "name": "Writer",
        "description": "Writes things",
        "version": "2.1.0",
        "url": "https://agents.example/a2a",
        "capabilities": {"streaming": true, "pushNotifications": false},
        "defaultInputModes": ["text/plain"],
        "defaultOutputModes": ["text/plain"],
        "skills": [{
            "id": "write",
            "name": "Write",
            "description": "Drafts text",
            "tags": ["writing"]
        }]
    }))
    .unwrap();

    let wire = serde_json::to_value(&card).unwrap();
    assert_eq!(wire["capabilities"]["pushNotifications"], false);
    assert_eq!(wire["protocolVersion"], "0.3.0");
    assert_eq!(wire["skills"][0]["id"], "write");
}
