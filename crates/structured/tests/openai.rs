//! Tests for the OpenAI-compatible generator.

use hatchery::{AgentFactory, CreationRequest, Generator};
use hatchery_structured::{Client, OpenAI, parse_draft};
use serde_json::{Value, json};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{header, method, path},
};

const COMPLETIONS: &str = "/v1/chat/completions";

fn completion(content: &str) -> Value {
    json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": content },
            "finish_reason": "stop"
        }]
    })
}

#[test]
fn parse_plain_draft() {
    let body = completion(
        r#"{"name":"stock_analyst","description":"Analyzes stocks","inputSchema":{"type":"object"}}"#,
    );
    let draft = parse_draft(&body.to_string()).unwrap();
    assert_eq!(draft.name, "stock_analyst");
    assert_eq!(draft.input_schema["type"], "object");
}

#[test]
fn parse_fenced_snake_case_draft() {
    let body = completion(
        "```json\n{\"name\":\"Stock Analyst\",\"description\":\"Analyzes\",\"input_schema\":{}}\n```",
    );
    let draft = parse_draft(&body.to_string()).unwrap();
    assert_eq!(draft.name, "Stock Analyst");
    assert_eq!(draft.input_schema, json!({}));
}

#[test]
fn parse_rejects_empty_choices() {
    let err = parse_draft(r#"{"choices":[]}"#).unwrap_err();
    assert!(err.to_string().contains("no content"));
}

#[test]
fn parse_rejects_prose() {
    let body = completion("Sure! Here is your agent.");
    assert!(parse_draft(&body.to_string()).is_err());
}

#[test]
fn request_carries_schema_and_settings() {
    let client = OpenAI::api(Client::new(), "sk-test")
        .unwrap()
        .model("gpt-4o")
        .temperature(0.2);
    let body = serde_json::to_value(client.request("make an agent")).unwrap();

    assert_eq!(body["model"], "gpt-4o");
    assert!((body["temperature"].as_f64().unwrap() - 0.2).abs() < 1e-6);
    assert_eq!(body["response_format"]["type"], "json_schema");
    let schema = &body["response_format"]["json_schema"]["schema"];
    assert!(schema["properties"]["name"].is_object());
    assert_eq!(body["messages"][0]["role"], "system");
    assert_eq!(body["messages"][1]["content"], "make an agent");
}

#[tokio::test]
async fn generate_round_trip() {
    let server = MockServer::start().await;
    let content =
        r#"{"name":"stock_analyst","description":"Analyzes stocks","inputSchema":{"type":"object"}}"#;
    Mock::given(method("POST"))
        .and(path(COMPLETIONS))
        .and(header("authorization", "Bearer sk-test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(content)))
        .expect(1)
        .mount(&server)
        .await;

    let url = format!("{}{COMPLETIONS}", server.uri());
    let client = OpenAI::custom(Client::new(), "sk-test", &url).unwrap();
    let draft = client.generate("make an agent").await.unwrap();
    assert_eq!(draft.name, "stock_analyst");

    let requests = server.received_requests().await.unwrap();
    let sent: Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(sent["messages"][1]["content"], "make an agent");
    assert_eq!(sent["response_format"]["type"], "json_schema");
}

#[tokio::test]
async fn backend_error_fails_factory() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(COMPLETIONS))
        .respond_with(ResponseTemplate::new(500).set_body_string(r#"{"error":"boom"}"#))
        .mount(&server)
        .await;

    let url = format!("{}{COMPLETIONS}", server.uri());
    let factory = AgentFactory::new(OpenAI::custom(Client::new(), "", &url).unwrap());
    let request = CreationRequest {
        specialty: "Stock Analyst".into(),
        goal: "Summarize".into(),
        task: "Analyze TSLA".into(),
        agent_type: None,
    };
    let err = factory.create(&request).await.unwrap_err();
    assert!(matches!(err, hatchery::Error::Generation(_)));
    assert!(err.to_string().contains("500"));

    let requests = server.received_requests().await.unwrap();
    assert!(requests[0].headers.get("authorization").is_none());
}
