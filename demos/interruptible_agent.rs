//! An agent that pauses for confirmation before finishing.
//!
//! The first `message/send` parks the task in `input-required` and returns
//! immediately while the executor future stays alive. A follow-up
//! `message/send` carrying the same `taskId` and the word "confirm" resumes
//! and completes it; anything else rejects it.
//!
//! Run with `cargo run --example interruptible_agent`.

use std::sync::Arc;

use async_trait::async_trait;

use a2a_runtime::prelude::*;

struct ConfirmingAgent;

impl ConfirmingAgent {
    fn is_follow_up(context: &RequestContext) -> bool {
        context
            .task
            .as_ref()
            .is_some_and(|task| task.status.state == TaskState::InputRequired)
    }
}

#[async_trait]
impl AgentExecutor for ConfirmingAgent {
    async fn execute(&self, context: RequestContext, queue: EventQueue) -> A2AResult<()> {
        let updater = TaskUpdater::new(queue, context.task_id.clone(), context.context_id.clone());

        if !Self::is_follow_up(&context) {
            let prompt = updater.new_agent_message(
                vec![Part::text("Reply \"confirm\" to proceed.")],
                None,
            );
            return updater.requires_input(Some(prompt), false).await;
        }

        let answer = context.get_user_input(" ").to_lowercase();
        if answer.contains("confirm") {
            updater.start_work(None).await?;
            updater
                .add_artifact(
                    vec![Part::text("confirmed and done")],
                    None,
                    Some("result".to_string()),
                    None,
                    Some(true),
                )
                .await?;
            updater.complete(None).await
        } else {
            let reason =
                updater.new_agent_message(vec![Part::text("No confirmation given.")], None);
            updater.reject(Some(reason)).await
        }
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
                .unwrap_or_else(|_| "a2a_runtime=debug,interruptible_agent=debug".into()),
        )
        .init();

    let card = AgentCardBuilder::new(
        "Confirming Agent",
        "Waits for confirmation before completing",
        "1.0.0",
    )
    .with_jsonrpc_interface("http://localhost:3000/a2a")
    .with_skill(
        "confirm",
        "Confirm",
        "Asks for confirmation, then completes",
        vec!["workflow".to_string()],
    )
    .with_streaming(true)
    .build();

    let handler = DefaultRequestHandler::new(
        Arc::new(ConfirmingAgent),
        Arc::new(InMemoryTaskStore::new()),
    );
    let app = a2a_router(Arc::new(handler), card);

    let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
    println!("confirming agent listening on http://localhost:3000");
    axum::serve(listener, app).await?;
    Ok(())
}
