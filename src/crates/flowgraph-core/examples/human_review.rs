//! Document review with a human in the loop
//!
//! Drafts a document, pauses for a reviewer's verdict, then publishes or bins it.
//! Snapshots go to a temporary directory, so the suspended run could be resumed by
//! another process pointed at the same directory.
//!
//! Run with: `cargo run --example human_review`

use flowgraph_core::{
    async_trait, init_tracing, BoxError, EngineConfig, Event, EventType, FnNode, Graph, Node, NodeContext,
    NodeOutput, NodeResult, Payload, RunOutcome, SnapshotStore, Workflow, WorkflowState,
};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, Clone, Serialize, Deserialize)]
enum Doc {
    Drafted { title: String, body: String },
    Reviewed { title: String, approved: bool },
}

impl Payload for Doc {
    fn event_type(&self) -> EventType {
        match self {
            Doc::Drafted { .. } => EventType::new("Drafted"),
            Doc::Reviewed { .. } => EventType::new("Reviewed"),
        }
    }
}

/// Asks a reviewer whether the draft may be published
struct Review;

#[async_trait]
impl Node<Doc> for Review {
    fn name(&self) -> &str {
        "review"
    }

    fn consumes(&self) -> Vec<EventType> {
        vec![EventType::new("Drafted")]
    }

    fn produces(&self) -> Vec<EventType> {
        vec![EventType::new("Reviewed")]
    }

    async fn invoke(&self, event: Event<Doc>, ctx: &mut NodeContext<'_>) -> NodeResult<Doc> {
        let Some(Doc::Drafted { title, body }) = event.into_payload() else {
            return Ok(NodeOutput::none());
        };

        // expensive and not repeated when the node re-runs after wakeup
        let words: usize = ctx
            .checkpoint("word_count", || async {
                println!("  counting words of '{}'", title);
                Ok::<_, BoxError>(body.split_whitespace().count())
            })
            .await?;

        let verdict = ctx.interrupt(json!({ "title": &title, "words": words }))?;
        let approved = verdict.get("approved").and_then(|v| v.as_bool()).unwrap_or(false);
        ctx.state_mut().set("reviewer_note", verdict.get("note").cloned().unwrap_or_default());

        Ok(NodeOutput::emit(Doc::Reviewed { title, approved }))
    }
}

fn build_graph() -> flowgraph_core::Result<Graph<Doc>> {
    Graph::builder()
        .register(
            FnNode::new("draft")
                .consumes(EventType::START)
                .produces("Drafted")
                .handler(|_event, ctx| {
                    Box::pin(async move {
                        let title = ctx
                            .state()
                            .get("title")
                            .and_then(|v| v.as_str())
                            .unwrap_or("untitled")
                            .to_string();
                        Ok(NodeOutput::emit(Doc::Drafted {
                            body: format!("{} is a short note about event routing.", title),
                            title,
                        }))
                    })
                }),
        )
        .register(Review)
        .register(
            FnNode::new("publish")
                .consumes("Reviewed")
                .produces(EventType::STOP)
                .handler(|event, _ctx| {
                    Box::pin(async move {
                        let result = match event.into_payload() {
                            Some(Doc::Reviewed { title, approved: true }) => json!({ "published": title }),
                            _ => json!({ "published": null }),
                        };
                        Ok(Event::stop(result).into())
                    })
                }),
        )
        .build()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let snapshots = tempfile::tempdir()?;
    let config = EngineConfig::from_toml_str(&format!(
        r#"
        [persistence]
        backend = "file"
        directory = "{}"

        [logging]
        level = "flowgraph_core=info"
        "#,
        snapshots.path().display()
    ))?;
    init_tracing(&config.logging)?;

    println!("=== Human Review ===\n");

    let workflow = Workflow::from_config(build_graph()?, &config).await?;
    let initial: WorkflowState = [("title", json!("Release notes"))].into_iter().collect();

    let suspension = match workflow.start(initial).await? {
        RunOutcome::Suspended(suspension) => suspension,
        RunOutcome::Completed(completion) => {
            println!("finished without review: {}", completion.result);
            return Ok(());
        }
    };
    println!("\nwaiting on '{}' with {}", suspension.node, suspension.payload);
    println!("stored snapshots: {:?}\n", workflow.store().list_ids().await?);

    // the reviewer answers; watch the remaining events as they happen
    let mut run = workflow.wakeup_streaming(
        suspension.workflow_id.clone(),
        json!({ "approved": true, "note": "ship it" }),
    );
    let mut events = run.stream_events();
    while let Some(event) = events.next().await {
        println!("  event: {}", event.event_type());
    }

    if let RunOutcome::Completed(completion) = run.outcome().await? {
        println!("\nresult: {}", completion.result);
        println!("reviewer note: {:?}", completion.state.get("reviewer_note"));
    }
    Ok(())
}
