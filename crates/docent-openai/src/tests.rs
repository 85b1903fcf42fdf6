// Tests for the OpenAI Assistants client against a mock server

use super::*;
use docent_core::{
    CallbackResult, CapabilityRegistry, DispatchOptions, DocentConfig, DocentError, MessageRole,
    RunDispatcher, RunStatus,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_json, body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> OpenAiAssistantsClient {
    OpenAiAssistantsClient::new("sk-test", &server.uri(), reqwest::Client::new())
}

fn run_json(status: &str) -> serde_json::Value {
    json!({
        "id": "run_1",
        "object": "thread.run",
        "thread_id": "thread_1",
        "assistant_id": "asst_1",
        "status": status,
        "required_action": null,
        "last_error": null
    })
}

#[test]
fn test_from_config_requires_key() {
    let result = OpenAiAssistantsClient::from_config(&DocentConfig::default());
    assert!(matches!(result, Err(DocentError::Configuration(_))));

    let config = DocentConfig::default().with_openai_api_key("sk-test");
    assert!(OpenAiAssistantsClient::from_config(&config).is_ok());
}

#[tokio::test]
async fn test_requests_carry_auth_and_beta_headers() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/threads"))
        .and(header("Authorization", "Bearer sk-test"))
        .and(header("OpenAI-Beta", "assistants=v2"))
        .and(body_json(json!({
            "messages": [{"role": "user", "content": "What's new in AI?"}],
            "tool_resources": {"file_search": {"vector_store_ids": ["vs_1"]}}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "thread_1"})))
        .expect(1)
        .mount(&server)
        .await;

    let thread = client_for(&server)
        .create_thread("What's new in AI?", "vs_1")
        .await
        .unwrap();
    assert_eq!(thread, "thread_1");
}

#[tokio::test]
async fn test_api_error_uses_error_message() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/threads/thread_x/runs/run_x"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": {"message": "No thread found with id 'thread_x'.", "type": "invalid_request_error"}
        })))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .get_run("thread_x", "run_x")
        .await
        .unwrap_err();

    assert!(err.is_not_found());
    assert_eq!(
        err.to_string(),
        "API error (404): No thread found with id 'thread_x'."
    );
}

#[tokio::test]
async fn test_list_messages_follows_pages() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/threads/thread_1/messages"))
        .and(query_param("order", "desc"))
        .and(query_param("after", "msg_2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                {"id": "msg_1", "role": "user", "created_at": 100,
                 "content": [{"type": "text", "text": {"value": "Hi", "annotations": []}}]}
            ],
            "has_more": false,
            "last_id": "msg_1"
        })))
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/threads/thread_1/messages"))
        .and(query_param("order", "desc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                {"id": "msg_3", "role": "assistant", "created_at": 300,
                 "content": [{"type": "text", "text": {"value": "Sure", "annotations": []}}]},
                {"id": "msg_2", "role": "user", "created_at": 200,
                 "content": [{"type": "text", "text": {"value": "Tell me", "annotations": []}}]}
            ],
            "has_more": true,
            "last_id": "msg_2"
        })))
        .mount(&server)
        .await;

    let messages = client_for(&server).list_messages("thread_1").await.unwrap();

    let ids: Vec<&str> = messages.iter().map(|m| m.id.as_str()).collect();
    assert_eq!(ids, vec!["msg_3", "msg_2", "msg_1"]);
    assert_eq!(messages[0].role, MessageRole::Assistant);
    assert_eq!(messages[0].content, "Sure");
}

#[tokio::test]
async fn test_submit_tool_outputs_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/threads/thread_1/runs/run_1/submit_tool_outputs"))
        .and(body_json(json!({
            "tool_outputs": [{"tool_call_id": "call_1", "output": "[]"}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(run_json("queued")))
        .expect(1)
        .mount(&server)
        .await;

    let run = client_for(&server)
        .submit_tool_outputs(
            "thread_1",
            "run_1",
            &[CallbackResult {
                tool_call_id: "call_1".into(),
                output: "[]".into(),
            }],
        )
        .await
        .unwrap();
    assert_eq!(run.status, RunStatus::Queued);
}

#[tokio::test]
async fn test_upload_file_is_multipart() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/files"))
        .and(body_string_contains("assistants"))
        .and(body_string_contains("handbook.txt"))
        .and(body_string_contains("Company handbook"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "file_1"})))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("handbook.txt");
    std::fs::write(&file, "Company handbook").unwrap();

    let id = client_for(&server).upload_file(&file).await.unwrap();
    assert_eq!(id, "file_1");
}

#[tokio::test]
async fn test_upload_missing_file_is_io_error() {
    let server = MockServer::start().await;
    let err = client_for(&server)
        .upload_file(std::path::Path::new("/nonexistent/docent/file.txt"))
        .await
        .unwrap_err();
    assert!(matches!(err, DocentError::Io(_)));
}

#[tokio::test]
async fn test_dispatch_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/threads/thread_1/runs"))
        .and(body_json(json!({"assistant_id": "asst_1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(run_json("queued")))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/threads/thread_1/runs/run_1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(run_json("in_progress")))
        .up_to_n_times(2)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/threads/thread_1/runs/run_1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(run_json("completed")))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/threads/thread_1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                {"id": "msg_2", "role": "assistant", "created_at": 2,
                 "content": [{"type": "text", "text": {"value": "Answer", "annotations": []}}]},
                {"id": "msg_1", "role": "user", "created_at": 1,
                 "content": [{"type": "text", "text": {"value": "Question", "annotations": []}}]}
            ],
            "has_more": false
        })))
        .mount(&server)
        .await;

    let dispatcher = RunDispatcher::new(
        Arc::new(client_for(&server)),
        Arc::new(CapabilityRegistry::new()),
        DispatchOptions {
            poll_interval: Duration::from_millis(10),
            max_wait: Duration::from_secs(5),
        },
    );

    let outcome = dispatcher.run("thread_1", "asst_1").await.unwrap();
    assert!(outcome.is_success());
    let contents: Vec<&str> = outcome.messages.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents, vec!["Question", "Answer"]);
}
