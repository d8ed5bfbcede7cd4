use chat_stream::core::ConversationManager;
use chat_stream::providers::{Message, OpenRouterClient};
use chat_stream::tools::{DateTimeTool, ToolRegistry};
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::{sse_body, test_config};

const COMPLETIONS: &str = "/api/v1/chat/completions";

#[tokio::test]
async fn tool_round_trip_against_gateway() {
    let server = MockServer::start().await;

    // Continuation turn: the request now carries the tool result
    Mock::given(method("POST"))
        .and(path(COMPLETIONS))
        .and(body_string_contains(r#""role":"tool""#))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            sse_body(&[json!({
                "choices": [{"index": 0, "delta": {"content": "Done."}, "finish_reason": "stop"}],
                "usage": {"prompt_tokens": 20, "completion_tokens": 2, "total_tokens": 22}
            })]),
            "text/event-stream",
        ))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(COMPLETIONS))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            sse_body(&[
                json!({"choices": [{"index": 0, "delta": {
                    "reasoning_details": [{"type": "reasoning.text", "text": "clock", "signature": "s1"}],
                    "tool_calls": [{"index": 0, "id": "call_1", "type": "function",
                                    "function": {"name": "date_time", "arguments": "{}"}}]
                }}]}),
                json!({
                    "choices": [{"index": 0, "delta": {}, "finish_reason": "tool_calls"}],
                    "usage": {"prompt_tokens": 10, "completion_tokens": 4, "total_tokens": 14}
                }),
            ]),
            "text/event-stream",
        ))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    let mut registry = ToolRegistry::new();
    registry.register(DateTimeTool);
    let client = OpenRouterClient::new(test_config(&server.uri()), String::from("test-key"));
    let mut manager = ConversationManager::new(
        Box::new(client),
        Some(Box::new(registry)),
        vec![String::from("date_time")],
    );

    let mut output = Vec::new();
    let summary = manager
        .run(
            vec![Message::user("what time is it?")],
            4,
            &mut output,
            &CancellationToken::new(),
        )
        .await
        .expect("conversation should succeed");

    assert_eq!(String::from_utf8(output).expect("utf8"), "Done.");
    assert_eq!(summary.steps, 2);
    assert_eq!(summary.usage.total_tokens, 36);

    let roles: Vec<_> = summary.messages.iter().map(Message::role).collect();
    assert_eq!(roles, vec!["user", "assistant", "tool", "assistant"]);

    let tool_result: Value =
        serde_json::from_str(&summary.messages[2].content()).expect("tool result is JSON");
    assert!(tool_result["unix"].is_i64());

    // The assistant turn is replayed with its tool calls and reasoning details
    let requests = server.received_requests().await.expect("recording enabled");
    let replay: Value = requests[1].body_json().expect("request body is JSON");
    let assistant = &replay["messages"][1];
    assert_eq!(assistant["role"], "assistant");
    assert_eq!(assistant["tool_calls"][0]["id"], "call_1");
    assert_eq!(assistant["reasoning_details"][0]["signature"], "s1");
    assert_eq!(replay["messages"][2]["tool_call_id"], "call_1");
}
