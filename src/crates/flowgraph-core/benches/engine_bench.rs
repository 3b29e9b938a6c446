use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use flowgraph_core::{
    Event, EventType, FnNode, Graph, NamedEvent, NodeOutput, Workflow, WorkflowState,
};
use serde_json::json;

fn step(i: usize) -> String {
    format!("Step{}", i)
}

fn chain_graph(len: usize) -> Graph<NamedEvent> {
    (0..len)
        .fold(Graph::builder(), |builder, i| {
            let node = FnNode::new(format!("node_{}", i));
            let node = if i == 0 {
                node.consumes(EventType::START)
            } else {
                node.consumes(step(i - 1))
            };
            let node = if i + 1 == len {
                node.produces(EventType::STOP).handler(|_event, _ctx| {
                    Box::pin(async { Ok(Event::stop(json!("done")).into()) })
                })
            } else {
                let next = step(i);
                node.produces(next.clone()).handler(move |_event, ctx| {
                    let next = next.clone();
                    Box::pin(async move {
                        ctx.state_mut().set(next.clone(), true);
                        Ok(NodeOutput::emit(NamedEvent::new(next, json!(null))))
                    })
                })
            };
            builder.register(node)
        })
        .build()
        .unwrap()
}

fn counter_graph() -> Graph<NamedEvent> {
    Graph::builder()
        .register(
            FnNode::new("counter")
                .consumes(EventType::START)
                .consumes("Tick")
                .produces("Tick")
                .produces(EventType::STOP)
                .handler(|_event, ctx| {
                    Box::pin(async move {
                        let n = ctx.state().get("n").and_then(|v| v.as_u64()).unwrap_or(0);
                        ctx.state_mut().set("n", n + 1);
                        if n >= 100 {
                            Ok(Event::stop(json!(n)).into())
                        } else {
                            Ok(NodeOutput::emit(NamedEvent::new("Tick", json!(n))))
                        }
                    })
                }),
        )
        .build()
        .unwrap()
}

fn approval_graph() -> Graph<NamedEvent> {
    Graph::builder()
        .register(
            FnNode::new("approve")
                .consumes(EventType::START)
                .produces(EventType::STOP)
                .handler(|_event, ctx| {
                    Box::pin(async move {
                        let answer = ctx.interrupt(json!({"question": "approve?"}))?;
                        Ok(Event::stop(answer).into())
                    })
                }),
        )
        .build()
        .unwrap()
}

fn build_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("graph build");
    for len in [4, 32, 128] {
        group.bench_with_input(BenchmarkId::from_parameter(len), &len, |b, &len| {
            b.iter(|| chain_graph(black_box(len)));
        });
    }
    group.finish();
}

fn execution_benchmark(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();

    let mut group = c.benchmark_group("linear execution");
    for len in [4, 32, 128] {
        let workflow = Workflow::new(chain_graph(len));
        group.bench_with_input(BenchmarkId::from_parameter(len), &workflow, |b, workflow| {
            b.iter(|| runtime.block_on(workflow.start(WorkflowState::new())).unwrap());
        });
    }
    group.finish();

    let looping = Workflow::new(counter_graph());
    c.bench_function("self loop x100", |b| {
        b.iter(|| runtime.block_on(looping.start(WorkflowState::new())).unwrap());
    });
}

fn suspend_resume_benchmark(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let workflow = Workflow::new(approval_graph());

    c.bench_function("suspend + wakeup (memory)", |b| {
        b.iter(|| {
            runtime.block_on(async {
                workflow
                    .start_with_id("bench", WorkflowState::new())
                    .await
                    .unwrap();
                workflow.wakeup("bench", black_box(json!("yes"))).await.unwrap()
            })
        });
    });
}

criterion_group!(
    benches,
    build_benchmark,
    execution_benchmark,
    suspend_resume_benchmark
);
criterion_main!(benches);
