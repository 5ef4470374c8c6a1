//! Tests for `tools/list` and `tools/call` dispatch.

use hatchery::{
    AgentFactory, CREATE_AGENT, CallResult, Content, DescriptorStore, Generator, Handler,
    ListPolicy, Registry,
    testing::{Delayed, FailingGenerator, Gated, SpecialtyGenerator, StaticGenerator, draft},
};
use serde_json::{Map, Value, json};
use std::{sync::Arc, time::Duration};
use tokio::sync::Barrier;

fn args(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap()
}

fn stock_analyst_args() -> Map<String, Value> {
    args(json!({
        "specialty": "Stock Analyst",
        "goal": "Summarize ticker performance",
        "task": "Analyze TSLA",
        "agent_type": "analyst"
    }))
}

fn handler<G: Generator>(generator: G) -> Handler<G> {
    Handler::new(
        Registry::in_memory(ListPolicy::All),
        AgentFactory::new(generator),
    )
}

#[tokio::test]
async fn create_agent_then_list() {
    let handler = handler(SpecialtyGenerator);

    let result = handler.call_tool(CREATE_AGENT, stock_analyst_args()).await;
    assert!(!result.is_error, "{}", result.joined_text());
    assert!(result.joined_text().contains("stock_analyst"));

    let tools = handler.list_tools();
    assert_eq!(tools[0].name, CREATE_AGENT);
    let created = tools.iter().find(|t| t.name == "stock_analyst").unwrap();
    assert!(!created.description.is_empty());

    let stored = handler.registry().get("stock_analyst").unwrap();
    assert_eq!(stored.specialty.as_deref(), Some("Stock Analyst"));
    assert_eq!(stored.goal.as_deref(), Some("Summarize ticker performance"));
}

#[tokio::test]
async fn unknown_tool_is_in_band_error() {
    let handler = handler(SpecialtyGenerator);
    let result = handler.call_tool("nonexistent_tool", Map::new()).await;
    assert_eq!(
        result,
        CallResult {
            content: vec![Content::Text {
                text: "Unknown tool: nonexistent_tool".into()
            }],
            is_error: true,
        }
    );
}

#[tokio::test]
async fn create_agent_without_arguments_is_rejected() {
    let handler = handler(SpecialtyGenerator);
    let result = handler.call_tool(CREATE_AGENT, Map::new()).await;

    assert!(result.is_error);
    assert!(result.joined_text().contains("specialty"));
    assert_eq!(handler.list_tools().len(), 1);
}

#[tokio::test]
async fn generation_failure_is_generic() {
    let handler = handler(FailingGenerator("upstream 500: secret detail"));
    let result = handler.call_tool(CREATE_AGENT, stock_analyst_args()).await;

    assert!(result.is_error);
    assert_eq!(result.joined_text(), "Failed to create agent");
    assert!(handler.registry().is_empty());
}

#[tokio::test]
async fn malformed_draft_never_registers() {
    let mut bad = draft("analyst", "Analyzes");
    bad.input_schema = json!({ "type": "array" });
    let handler = handler(StaticGenerator(bad));

    let result = handler.call_tool(CREATE_AGENT, stock_analyst_args()).await;
    assert!(result.is_error);
    assert!(handler.registry().is_empty());
}

#[tokio::test]
async fn generated_name_collision_is_reported() {
    let handler = handler(StaticGenerator(draft("analyst", "Analyzes")));

    let first = handler.call_tool(CREATE_AGENT, stock_analyst_args()).await;
    assert!(!first.is_error);

    let second = handler.call_tool(CREATE_AGENT, stock_analyst_args()).await;
    assert!(second.is_error);
    assert!(second.joined_text().contains("'analyst'"));
    assert_eq!(handler.registry().len(), 1);
}

#[tokio::test]
async fn generated_reserved_name_is_rejected() {
    let handler = handler(StaticGenerator(draft("Create Agent", "Sneaky")));
    let result = handler.call_tool(CREATE_AGENT, stock_analyst_args()).await;

    assert!(result.is_error);
    assert!(handler.registry().is_empty());
}

#[tokio::test]
async fn created_agent_echoes_arguments() {
    let handler = handler(SpecialtyGenerator);
    handler.call_tool(CREATE_AGENT, stock_analyst_args()).await;

    let result = handler
        .call_tool("stock_analyst", args(json!({ "input": "TSLA" })))
        .await;
    assert!(!result.is_error);
    assert_eq!(
        result.joined_text(),
        r#"Agent 'stock_analyst' received: {"input":"TSLA"}"#
    );
}

#[tokio::test(start_paused = true)]
async fn generation_timeout_is_failure() {
    let generator = Delayed {
        inner: SpecialtyGenerator,
        delay: Duration::from_secs(60),
    };
    let handler = Handler::new(
        Registry::in_memory(ListPolicy::All),
        AgentFactory::new(generator).with_timeout(Duration::from_secs(5)),
    );

    let result = handler.call_tool(CREATE_AGENT, stock_analyst_args()).await;
    assert!(result.is_error);
    assert!(handler.registry().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_creations_overlap_and_both_persist() {
    let dir = tempfile::tempdir().unwrap();
    let store = DescriptorStore::new(dir.path().join("agents.json"));
    let registry = Registry::open(store.clone(), ListPolicy::All).await;

    // Both generations must be in flight at once to pass the barrier.
    let generator = Gated {
        inner: SpecialtyGenerator,
        barrier: Arc::new(Barrier::new(2)),
    };
    let handler = Arc::new(Handler::new(registry.clone(), AgentFactory::new(generator)));

    let calls = ["Stock Analyst", "Weather Reporter"].map(|specialty| {
        let handler = Arc::clone(&handler);
        tokio::spawn(async move {
            let arguments = args(json!({
                "specialty": specialty,
                "goal": "Help",
                "task": "Do the thing"
            }));
            handler.call_tool(CREATE_AGENT, arguments).await
        })
    });

    for call in calls {
        let result = call.await.unwrap();
        assert!(!result.is_error, "{}", result.joined_text());
    }

    registry.flush().await.unwrap();
    let mut names: Vec<_> = store.load_all().unwrap().into_iter().map(|a| a.name).collect();
    names.sort();
    assert_eq!(names, ["stock_analyst", "weather_reporter"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_same_name_creations_have_one_winner() {
    let generator = Gated {
        inner: StaticGenerator(draft("analyst", "Analyzes")),
        barrier: Arc::new(Barrier::new(2)),
    };
    let handler = Arc::new(handler(generator));

    let calls: Vec<_> = (0..2)
        .map(|_| {
            let handler = Arc::clone(&handler);
            tokio::spawn(async move { handler.call_tool(CREATE_AGENT, stock_analyst_args()).await })
        })
        .collect();

    let mut failures = 0;
    for call in calls {
        if call.await.unwrap().is_error {
            failures += 1;
        }
    }
    assert_eq!(failures, 1);
    assert_eq!(handler.registry().len(), 1);
}
