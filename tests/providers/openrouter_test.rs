use chat_stream::core::{LLMError, PricingSource};
use chat_stream::providers::{FinishReason, LLMClient, Message, OpenRouterClient, StreamOutcome};
use chat_stream::tools::{DateTimeTool, Tool};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::{sse_body, test_config, Recorder};

const MODEL: &str = "anthropic/claude-sonnet-4";
const COMPLETIONS: &str = "/api/v1/chat/completions";

fn client(server: &MockServer) -> OpenRouterClient {
    OpenRouterClient::new(test_config(&server.uri()), String::from("test-key"))
}

fn sse_response(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body, "text/event-stream")
}

#[tokio::test]
async fn streams_text_and_usage() {
    let server = MockServer::start().await;
    let config = test_config(&server.uri());

    Mock::given(method("POST"))
        .and(path(COMPLETIONS))
        .and(header("authorization", "Bearer test-key"))
        .and(header("http-referer", config.gateway.referer.as_str()))
        .and(header("x-title", config.gateway.title.as_str()))
        .and(body_partial_json(json!({
            "model": MODEL,
            "stream": true,
            "usage": { "include": true },
            "provider": { "require_parameters": true }
        })))
        .respond_with(sse_response(sse_body(&[
            json!({"choices": [{"index": 0, "delta": {"content": "Hel"}}]}),
            json!({"choices": [{"index": 0, "delta": {"content": "lo"}}]}),
            json!({
                "choices": [{"index": 0, "delta": {}, "finish_reason": "stop"}],
                "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
            }),
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let client = OpenRouterClient::new(config, String::from("test-key"));
    let mut recorder = Recorder::default();
    let outcome = client
        .query_streaming(
            &[Message::user("hi")],
            None,
            &mut recorder,
            &CancellationToken::new(),
        )
        .await
        .expect("stream should succeed");

    assert_eq!(outcome, StreamOutcome::Completed);
    assert_eq!(recorder.content, "Hello");
    assert!(recorder.tool_calls.is_empty());
    assert!(recorder.errors.is_empty());
    assert_eq!(recorder.completions.len(), 1);

    let (usage, cost) = recorder.completions[0];
    assert_eq!(usage.total_tokens, 15);
    let expected = (10.0 * 3.0 + 5.0 * 15.0) / 1_000_000.0;
    assert!((cost - expected).abs() < 1e-12);
}

#[tokio::test]
async fn streams_tool_call_split_across_chunks() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(COMPLETIONS))
        .and(body_partial_json(json!({
            "tools": [{ "type": "function", "function": { "name": "date_time" } }]
        })))
        .respond_with(sse_response(sse_body(&[
            json!({"choices": [{"index": 0, "delta": {"reasoning": "need the time"}}]}),
            json!({"choices": [{"index": 0, "delta": {"tool_calls": [
                {"index": 0, "id": "call_1", "type": "function",
                 "function": {"name": "date_time", "arguments": ""}}
            ]}}]}),
            json!({"choices": [{"index": 0, "delta": {"tool_calls": [
                {"index": 0, "function": {"arguments": "{\"format\":"}}
            ]}}]}),
            json!({"choices": [{"index": 0, "delta": {"tool_calls": [
                {"index": 0, "function": {"arguments": "\"unix\"}"}}
            ]}}]}),
            json!({"choices": [{"index": 0, "delta": {}, "finish_reason": "tool_calls"}]}),
            json!({"choices": [{"index": 0, "delta": {}, "finish_reason": "tool_calls"}]}),
        ])))
        .mount(&server)
        .await;

    let tools = [DateTimeTool.definition()];
    let mut recorder = Recorder::default();
    let outcome = client(&server)
        .query_streaming(
            &[Message::user("what time is it?")],
            Some(&tools),
            &mut recorder,
            &CancellationToken::new(),
        )
        .await
        .expect("stream should succeed");

    assert_eq!(outcome, StreamOutcome::ToolCallsPending);
    assert_eq!(recorder.reasoning, "need the time");
    assert_eq!(recorder.tool_calls.len(), 1);

    let (calls, finish_reason) = &recorder.tool_calls[0];
    assert_eq!(*finish_reason, FinishReason::ToolCalls);
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].id, "call_1");
    assert_eq!(calls[0].function.name, "date_time");
    assert_eq!(calls[0].function.arguments, r#"{"format":"unix"}"#);
}

#[tokio::test]
async fn drops_nameless_tool_call() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(COMPLETIONS))
        .respond_with(sse_response(sse_body(&[
            json!({"choices": [{"index": 0, "delta": {"tool_calls": [
                {"index": 0, "id": "call_1", "function": {"arguments": "{}"}}
            ]}}]}),
            json!({"choices": [{"index": 0, "delta": {}, "finish_reason": "tool_calls"}]}),
        ])))
        .mount(&server)
        .await;

    let mut recorder = Recorder::default();
    client(&server)
        .query_streaming(
            &[Message::user("hi")],
            None,
            &mut recorder,
            &CancellationToken::new(),
        )
        .await
        .expect("stream should succeed");

    assert!(recorder.tool_calls.is_empty());
    assert!(recorder.errors.is_empty());
}

#[tokio::test]
async fn malformed_chunk_does_not_stop_stream() {
    let server = MockServer::start().await;
    let body = [
        "data: {\"choices\": [{\"index\": 0, \"delta\": {\"content\": \"a\"}}]}",
        "data: {not json",
        "data: {\"choices\": [{\"index\": 0, \"delta\": {\"content\": \"b\"}}]}",
        "data: [DONE]",
        "",
    ]
    .join("\r\n");
    Mock::given(method("POST"))
        .and(path(COMPLETIONS))
        .respond_with(sse_response(body))
        .mount(&server)
        .await;

    let mut recorder = Recorder::default();
    let outcome = client(&server)
        .query_streaming(
            &[Message::user("hi")],
            None,
            &mut recorder,
            &CancellationToken::new(),
        )
        .await
        .expect("stream should succeed");

    assert_eq!(outcome, StreamOutcome::Completed);
    assert_eq!(recorder.content, "ab");
    assert!(recorder.errors.is_empty());
}

#[tokio::test]
async fn gateway_error_message_is_surfaced() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(COMPLETIONS))
        .respond_with(ResponseTemplate::new(402).set_body_json(json!({
            "error": { "message": "Insufficient credits", "code": 402 }
        })))
        .mount(&server)
        .await;

    let mut recorder = Recorder::default();
    let error = client(&server)
        .query_streaming(
            &[Message::user("hi")],
            None,
            &mut recorder,
            &CancellationToken::new(),
        )
        .await
        .expect_err("non-2xx should fail");

    match error {
        LLMError::Api { status, message } => {
            assert_eq!(status, 402);
            assert_eq!(message, "Insufficient credits");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(recorder.errors.len(), 1);
    assert!(recorder.content.is_empty());
}

#[tokio::test]
async fn gateway_error_without_body_uses_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(COMPLETIONS))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .mount(&server)
        .await;

    let mut recorder = Recorder::default();
    let error = client(&server)
        .query_streaming(
            &[Message::user("hi")],
            None,
            &mut recorder,
            &CancellationToken::new(),
        )
        .await
        .expect_err("non-2xx should fail");

    let LLMError::Api { status, message } = error else {
        panic!("expected an API error");
    };
    assert_eq!(status, 500);
    assert!(message.starts_with("request failed: 500"), "{message}");
    assert_eq!(recorder.errors.len(), 1);
}

#[tokio::test]
async fn missing_api_key_fails_before_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(COMPLETIONS))
        .respond_with(sse_response(sse_body(&[])))
        .expect(0)
        .mount(&server)
        .await;

    let client = OpenRouterClient::new(test_config(&server.uri()), None::<String>);
    let mut recorder = Recorder::default();
    let error = client
        .query_streaming(
            &[Message::user("hi")],
            None,
            &mut recorder,
            &CancellationToken::new(),
        )
        .await
        .expect_err("missing key should fail");

    assert!(matches!(error, LLMError::MissingApiKey(_)));
    assert_eq!(recorder.errors.len(), 1);
}

#[tokio::test]
async fn cancelled_before_start_is_silent() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(COMPLETIONS))
        .respond_with(sse_response(sse_body(&[
            json!({"choices": [{"index": 0, "delta": {"content": "late"}}]}),
        ])))
        .mount(&server)
        .await;

    let cancel = CancellationToken::new();
    cancel.cancel();

    let mut recorder = Recorder::default();
    let outcome = client(&server)
        .query_streaming(&[Message::user("hi")], None, &mut recorder, &cancel)
        .await
        .expect("cancellation is not an error");

    assert_eq!(outcome, StreamOutcome::Cancelled);
    assert!(recorder.content.is_empty());
    assert!(recorder.errors.is_empty());
}

#[tokio::test]
async fn non_streaming_query() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(COMPLETIONS))
        .and(body_partial_json(json!({
            "model": MODEL,
            "provider": { "require_parameters": true }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "gen-1",
            "model": MODEL,
            "choices": [{
                "index": 0,
                "finish_reason": "stop",
                "message": { "role": "assistant", "content": "Hi!", "reasoning": "greet back" }
            }],
            "usage": { "prompt_tokens": 1000, "completion_tokens": 1000, "total_tokens": 2000 }
        })))
        .mount(&server)
        .await;

    let completion = client(&server)
        .query(&[Message::user("hello")], None)
        .await
        .expect("query should succeed");

    assert_eq!(completion.message.role(), "assistant");
    assert_eq!(completion.message.content(), "Hi!");
    assert_eq!(completion.reasoning.as_deref(), Some("greet back"));
    assert_eq!(completion.finish_reason, Some(FinishReason::Stop));
    assert_eq!(completion.usage.map(|u| u.total_tokens), Some(2000));
    assert!((completion.cost - 0.018).abs() < 1e-12);
}

#[tokio::test]
async fn fetches_and_refreshes_pricing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/models"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                { "id": "vendor/cheap", "pricing": { "prompt": "0.0000001", "completion": "0.0000004" } },
                { "id": "vendor/broken", "pricing": { "prompt": "n/a", "completion": "0" } },
                { "id": "vendor/unpriced" }
            ]
        })))
        .mount(&server)
        .await;

    let client = client(&server);
    let table = client.fetch_pricing().await.expect("pricing should load");
    assert_eq!(table.len(), 1);
    let cheap = &table["vendor/cheap"];
    assert!((cheap.input - 0.1).abs() < 1e-9);
    assert!((cheap.output - 0.4).abs() < 1e-9);

    let pricing = client.pricing().clone();
    pricing.refresh(&client).await.expect("refresh should succeed");
    let merged = pricing.get();
    assert!(merged.contains_key("vendor/cheap"));
    assert!(merged.contains_key(MODEL));
}
