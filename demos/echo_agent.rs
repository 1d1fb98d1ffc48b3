//! A minimal agent: echoes the user's text back as an artifact.
//!
//! Run with `cargo run --example echo_agent`, then:
//!
//! ```sh
//! curl -s http://localhost:3000/a2a -H 'content-type: application/json' -d '{
//!   "jsonrpc": "2.0", "id": 1, "method": "message/send",
//!   "params": {"message": {"role": "user", "messageId": "m1",
//!     "parts": [{"kind": "text", "text": "hello"}]}}
//! }'
//! ```

use std::sync::Arc;

use async_trait::async_trait;

use a2a_runtime::prelude::*;

struct EchoAgent;

#[async_trait]
impl AgentExecutor for EchoAgent {
    async fn execute(&self, context: RequestContext, queue: EventQueue) -> A2AResult<()> {
        let updater = TaskUpdater::new(queue, context.task_id.clone(), context.context_id.clone());
        let input = context.get_user_input("\n");

        updater.start_work(None).await?;
        updater
            .add_artifact(
                vec![Part::text(format!("Echo: {input}"))],
                None,
                Some("echo".to_string()),
                None,
                Some(true),
            )
            .await?;
        updater.complete(None).await
    }

    async fn cancel(&self, context: RequestContext, queue: EventQueue) -> A2AResult<()> {
        let updater = TaskUpdater::new(queue, context.task_id, context.context_id);
        updater.cancel(None).await
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "a2a_runtime=debug,echo_agent=debug".into()),
        )
        .init();

    let card = AgentCardBuilder::new("Echo Agent", "Echoes messages back", "1.0.0")
        .with_jsonrpc_interface("http://localhost:3000/a2a")
        .with_skill(
            "echo",
            "Echo",
            "Repeats the user's message",
            vec!["chat".to_string()],
        )
        .with_streaming(true)
        .build();

    let handler = DefaultRequestHandler::new(
        Arc::new(EchoAgent),
        Arc::new(InMemoryTaskStore::new()),
    );
    let app = a2a_router(Arc::new(handler), card);

    let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
    println!("echo agent listening on http://localhost:3000");
    axum::serve(listener, app).await?;
    Ok(())
}
