// Integration tests for run dispatch
//
// The remote assistant service is played by InMemoryAssistantApi; the news
// endpoint and scraped pages are served by wiremock.

use async_trait::async_trait;
use docent_core::{
    memory::{InMemoryAssistantApi, ScriptStep},
    CallbackRequest, Capability, CapabilityRegistry, CapabilityResult, ConversationGateway,
    DispatchOptions, Docent, DocentConfig, DocentError, MessageRole, RunDispatcher, RunStatus,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fast_options() -> DispatchOptions {
    DispatchOptions {
        poll_interval: Duration::from_millis(10),
        max_wait: Duration::from_secs(5),
    }
}

async fn news_server() -> MockServer {
    let server = MockServer::start().await;
    let articles: Vec<Value> = (1..=5)
        .map(|n| {
            json!({
                "source": {"id": null, "name": format!("Wire {n}")},
                "author": if n % 2 == 0 { Value::Null } else { json!(format!("Reporter {n}")) },
                "title": format!("AI headline {n}"),
                "description": format!("What happened in AI, part {n}"),
                "url": format!("https://wire.example.com/ai/{n}")
            })
        })
        .collect();

    Mock::given(method("GET"))
        .and(path("/v2/everything"))
        .and(query_param("q", "AI"))
        .and(query_param("pageSize", "5"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"status": "ok", "articles": articles})),
        )
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/page"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            "<html><body><p>Alpha</p><p>Beta</p></body></html>",
            "text/html",
        ))
        .mount(&server)
        .await;

    server
}

fn config_for(server: &MockServer) -> DocentConfig {
    DocentConfig::default()
        .with_news_api_url(format!("{}/v2/everything", server.uri()))
        .with_news_api_key("test-news-key")
        .with_poll_interval(Duration::from_millis(10))
        .with_max_wait(Duration::from_secs(5))
}

// =============================================================================
// End-to-end
// =============================================================================

#[tokio::test]
async fn test_news_question_end_to_end() {
    let server = news_server().await;
    let api = Arc::new(InMemoryAssistantApi::with_script([
        ScriptStep::Status(RunStatus::Queued),
        ScriptStep::Status(RunStatus::InProgress),
        ScriptStep::Callbacks(vec![CallbackRequest::new(
            "call_news",
            "get_news",
            r#"{"topic": "AI"}"#,
        )]),
        ScriptStep::Status(RunStatus::InProgress),
        ScriptStep::Complete("Here are the latest AI stories.".into()),
    ]));
    let docent = Docent::init(config_for(&server), api.clone()).unwrap();

    let outcome = docent
        .ask_new("asst_news", "vs_kb", "What's new in AI?")
        .await
        .unwrap();

    assert!(outcome.is_success());
    assert_eq!(outcome.status(), RunStatus::Completed);

    // Exactly one batch with exactly one answer for the one request
    let submissions = api.submissions().await;
    assert_eq!(submissions.len(), 1);
    let (_, batch) = &submissions[0];
    assert_eq!(batch.len(), 1);
    assert_eq!(batch[0].tool_call_id, "call_news");

    let summaries: Vec<String> = serde_json::from_str(&batch[0].output).unwrap();
    assert!(summaries.len() <= 5);
    assert_eq!(summaries.len(), 5);
    assert!(summaries[0].contains("AI headline 1"));
    assert!(summaries[0].contains("Wire 1"));
    assert!(summaries[0].contains("What happened in AI, part 1"));
    assert!(summaries[0].contains("https://wire.example.com/ai/1"));
    assert!(summaries[1].contains("Author: unknown"));

    // Chronological: the prompt first, the latest assistant reply last
    assert_eq!(outcome.messages.len(), 2);
    assert_eq!(outcome.messages[0].role, MessageRole::User);
    assert_eq!(outcome.messages[0].content, "What's new in AI?");
    let last = outcome.messages.last().unwrap();
    assert_eq!(last.role, MessageRole::Assistant);
    assert_eq!(last.content, "Here are the latest AI stories.");
    assert_eq!(
        outcome.last_assistant_message().map(|m| m.content.as_str()),
        Some("Here are the latest AI stories.")
    );
}

#[tokio::test]
async fn test_mixed_batch_is_answered_in_one_submission() {
    let server = news_server().await;
    let page_url = format!("{}/page", server.uri());
    let requests = vec![
        CallbackRequest::new("call_1", "get_news", r#"{"topic": "AI"}"#),
        CallbackRequest::new("call_2", "scrape_website", json!({"url": page_url}).to_string()),
        CallbackRequest::new("call_3", "book_flight", r#"{"to": "LIS"}"#),
        CallbackRequest::new("call_4", "get_news", r#"{"topic": "#),
        CallbackRequest::new("call_5", "scrape_website", r#"{"link": "x"}"#),
    ];
    let api = Arc::new(InMemoryAssistantApi::with_script([
        ScriptStep::Callbacks(requests.clone()),
        ScriptStep::Complete("done".into()),
    ]));
    let docent = Docent::init(config_for(&server), api.clone()).unwrap();

    let outcome = docent.ask_new("asst", "vs", "Research please").await.unwrap();
    assert!(outcome.is_success());

    let submissions = api.submissions().await;
    assert_eq!(submissions.len(), 1, "all results go in a single batch");
    let batch = &submissions[0].1;

    // 1:1 with the requests, same ids, same order
    assert_eq!(batch.len(), requests.len());
    for (request, result) in requests.iter().zip(batch) {
        assert_eq!(request.id, result.tool_call_id);
    }

    assert!(batch[0].output.starts_with('['));
    assert!(batch[1].output.contains("<p>Alpha</p>\n<p>Beta</p>"));
    assert_eq!(batch[2].output, "Unknown capability: book_flight");
    assert!(batch[3].output.starts_with("Invalid arguments for get_news:"));
    assert_eq!(batch[4].output, "Missing required argument: url");
}

#[tokio::test]
async fn test_multiple_action_rounds() {
    let server = news_server().await;
    let api = Arc::new(InMemoryAssistantApi::with_script([
        ScriptStep::Callbacks(vec![CallbackRequest::new(
            "round_1",
            "get_news",
            r#"{"topic": "AI"}"#,
        )]),
        ScriptStep::Status(RunStatus::InProgress),
        ScriptStep::Callbacks(vec![CallbackRequest::new(
            "round_2",
            "scrape_website",
            json!({"url": format!("{}/page", server.uri())}).to_string(),
        )]),
        ScriptStep::Complete("summarised".into()),
    ]));
    let docent = Docent::init(config_for(&server), api.clone()).unwrap();

    let outcome = docent.ask_new("asst", "vs", "Dig deeper").await.unwrap();

    assert!(outcome.is_success());
    let submissions = api.submissions().await;
    assert_eq!(submissions.len(), 2);
    assert_eq!(submissions[0].1[0].tool_call_id, "round_1");
    assert_eq!(submissions[1].1[0].tool_call_id, "round_2");
}

// =============================================================================
// Terminal statuses and upstream errors
// =============================================================================

#[tokio::test]
async fn test_failed_run_is_returned_without_retry() {
    let api = Arc::new(InMemoryAssistantApi::with_script([
        ScriptStep::Status(RunStatus::InProgress),
        ScriptStep::Fail {
            code: "rate_limit_exceeded".into(),
            message: "Too many requests".into(),
        },
    ]));
    let gateway = ConversationGateway::new(api.clone());
    let thread = gateway.start_thread("hello", "vs").await.unwrap();

    let dispatcher = RunDispatcher::new(
        api.clone(),
        Arc::new(CapabilityRegistry::new()),
        fast_options(),
    );
    let outcome = dispatcher.run(&thread, "asst").await.unwrap();

    assert!(!outcome.is_success());
    assert_eq!(outcome.status(), RunStatus::Failed);
    assert_eq!(
        outcome.run.last_error.as_ref().map(|e| e.code.as_str()),
        Some("rate_limit_exceeded")
    );
    assert_eq!(outcome.messages.len(), 1);
    // create + one poll, no second run
    assert_eq!(api.run_observations().await, 2);
    assert!(api.submissions().await.is_empty());
}

#[tokio::test]
async fn test_expired_run_is_terminal() {
    let api = Arc::new(InMemoryAssistantApi::with_script([ScriptStep::Status(
        RunStatus::Expired,
    )]));
    let thread = ConversationGateway::new(api.clone())
        .start_thread("hello", "vs")
        .await
        .unwrap();
    let dispatcher = RunDispatcher::new(api, Arc::new(CapabilityRegistry::new()), fast_options());

    let outcome = dispatcher.run(&thread, "asst").await.unwrap();
    assert_eq!(outcome.status(), RunStatus::Expired);
}

#[tokio::test]
async fn test_unknown_thread_error_propagates() {
    let api = Arc::new(InMemoryAssistantApi::new());
    let dispatcher = RunDispatcher::new(api, Arc::new(CapabilityRegistry::new()), fast_options());

    let err = dispatcher.run("thread_missing", "asst").await.unwrap_err();
    assert!(err.is_not_found(), "got {err:?}");
}

#[tokio::test]
async fn test_requires_action_without_callbacks_is_a_dispatch_error() {
    let api = Arc::new(InMemoryAssistantApi::with_script([ScriptStep::Callbacks(
        Vec::new(),
    )]));
    let thread = ConversationGateway::new(api.clone())
        .start_thread("hello", "vs")
        .await
        .unwrap();
    let dispatcher = RunDispatcher::new(api, Arc::new(CapabilityRegistry::new()), fast_options());

    let err = dispatcher.run(&thread, "asst").await.unwrap_err();
    assert!(matches!(err, DocentError::Dispatch(_)));
}

// =============================================================================
// Deadline and cancellation
// =============================================================================

#[tokio::test]
async fn test_stuck_run_times_out_and_is_cancelled_remotely() {
    let api = Arc::new(InMemoryAssistantApi::with_script([ScriptStep::Status(
        RunStatus::InProgress,
    )]));
    let thread = ConversationGateway::new(api.clone())
        .start_thread("hello", "vs")
        .await
        .unwrap();
    let dispatcher = RunDispatcher::new(
        api.clone(),
        Arc::new(CapabilityRegistry::new()),
        DispatchOptions {
            poll_interval: Duration::from_millis(10),
            max_wait: Duration::from_millis(80),
        },
    );

    let err = dispatcher.run(&thread, "asst").await.unwrap_err();

    assert!(matches!(err, DocentError::Timeout(d) if d == Duration::from_millis(80)));
    assert_eq!(api.cancelled_runs().await.len(), 1);
}

#[tokio::test]
async fn test_cancellation_stops_polling() {
    let api = Arc::new(InMemoryAssistantApi::with_script([ScriptStep::Status(
        RunStatus::InProgress,
    )]));
    let thread = ConversationGateway::new(api.clone())
        .start_thread("hello", "vs")
        .await
        .unwrap();
    let dispatcher = RunDispatcher::new(
        api.clone(),
        Arc::new(CapabilityRegistry::new()),
        DispatchOptions {
            poll_interval: Duration::from_millis(10),
            max_wait: Duration::from_secs(30),
        },
    );

    let token = dispatcher.cancellation_token().clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        token.cancel();
    });

    let err = tokio::time::timeout(Duration::from_secs(5), dispatcher.run(&thread, "asst"))
        .await
        .expect("dispatch should stop promptly after cancellation")
        .unwrap_err();

    assert!(matches!(err, DocentError::Cancelled));
    assert_eq!(api.cancelled_runs().await.len(), 1);
}

struct SlowCapability;

#[async_trait]
impl Capability for SlowCapability {
    fn name(&self) -> &str {
        "slow"
    }

    fn description(&self) -> &str {
        "Takes a long time"
    }

    fn parameters_schema(&self) -> Value {
        json!({"type": "object", "properties": {}})
    }

    async fn execute(&self, _arguments: Value) -> CapabilityResult {
        tokio::time::sleep(Duration::from_secs(60)).await;
        CapabilityResult::success("late")
    }
}

#[tokio::test]
async fn test_shutdown_interrupts_running_capability() {
    let api = Arc::new(InMemoryAssistantApi::with_script([ScriptStep::Callbacks(
        vec![CallbackRequest::new("call_slow", "slow", "{}")],
    )]));
    let registry = CapabilityRegistry::builder().capability(SlowCapability).build();
    let docent = Arc::new(
        Docent::with_registry(
            DocentConfig::default().with_poll_interval(Duration::from_millis(10)),
            api.clone(),
            registry,
        )
        .unwrap(),
    );
    let thread = docent.gateway().start_thread("hello", "vs").await.unwrap();

    let handle = {
        let docent = docent.clone();
        tokio::spawn(async move { docent.dispatcher().run(&thread, "asst").await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    docent.shutdown();

    let err = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("dispatch should stop promptly after shutdown")
        .unwrap()
        .unwrap_err();

    assert!(matches!(err, DocentError::Cancelled));
    // Nothing partial was submitted
    assert!(api.submissions().await.is_empty());
    assert_eq!(api.cancelled_runs().await.len(), 1);
}
