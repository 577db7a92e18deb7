mod harness;

use std::time::Duration;

use harness::config::ConfigBuilder;
use harness::mock_upstream::MockUpstream;
use switchboard_config::SelectionStrategy;
use switchboard_core::HttpError;
use switchboard_llm::{DispatchInput, Dispatcher, LlmError, Message, Role};

const CODING_PROMPT: &str = "Write a Python function to calculate fibonacci numbers";

fn prompt(text: &str) -> DispatchInput {
    DispatchInput::Prompt(text.to_owned())
}

#[tokio::test]
async fn coding_prompt_goes_to_coding_pool() {
    let mock = MockUpstream::start().await.unwrap();
    let config = ConfigBuilder::new(&mock.base_url())
        .with_coding(&["coder-1", "coder-2"])
        .build();
    let dispatcher = Dispatcher::from_config(&config).unwrap();

    let response = dispatcher.dispatch(prompt(CODING_PROMPT)).await.unwrap();

    assert!(response.success);
    assert_eq!(response.backend_id, "coder-1");
    assert_eq!(response.category.as_str(), "coding");
    assert_eq!(response.attempt, 0);
    assert_eq!(response.content, "Hello from mock upstream");
    assert_eq!(response.usage.map(|u| u.total_tokens), Some(15));
    assert_eq!(mock.models(), ["coder-1"]);
}

#[tokio::test]
async fn unmatched_prompt_goes_to_general_pool() {
    let mock = MockUpstream::start().await.unwrap();
    let config = ConfigBuilder::new(&mock.base_url())
        .with_coding(&["coder-1"])
        .build();
    let dispatcher = Dispatcher::from_config(&config).unwrap();

    let response = dispatcher.dispatch(prompt("hello there")).await.unwrap();

    assert_eq!(response.backend_id, "generalist");
    assert_eq!(response.category.as_str(), "general");
}

#[tokio::test]
async fn sends_full_history_with_credentials() {
    let mock = MockUpstream::start().await.unwrap();
    let config = ConfigBuilder::new(&mock.base_url()).build();
    let dispatcher = Dispatcher::from_config(&config).unwrap();

    let input = DispatchInput::Messages(vec![
        Message {
            role: Role::System,
            content: "Answer briefly".to_owned(),
        },
        Message::user("hello there"),
    ]);
    dispatcher.dispatch(input).await.unwrap();

    let requests = mock.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].message_count, 2);
    assert!(!requests[0].stream);
    assert_eq!(requests[0].authorization.as_deref(), Some("Bearer test-key"));
    assert_eq!(requests[0].title.as_deref(), Some("Switchboard"));
}

#[tokio::test]
async fn transient_failure_is_retried_on_same_backend() {
    let mock = MockUpstream::builder().fail_first(1).start().await.unwrap();
    let config = ConfigBuilder::new(&mock.base_url())
        .with_general(&["primary", "backup"])
        .build();
    let dispatcher = Dispatcher::from_config(&config).unwrap();

    let response = dispatcher.dispatch(prompt("hello there")).await.unwrap();

    // a single failure stays below the circuit threshold
    assert_eq!(response.backend_id, "primary");
    assert_eq!(response.attempt, 1);
    assert_eq!(mock.models(), ["primary", "primary"]);

    let primary = dispatcher
        .health_snapshot()
        .into_iter()
        .find(|s| s.backend_id == "primary")
        .unwrap();
    assert_eq!(primary.total_requests, 2);
    assert_eq!(primary.successes, 1);
    assert!(primary.is_healthy);
}

#[tokio::test]
async fn open_circuit_fails_over_to_backup() {
    let mock = MockUpstream::builder().fail_model("primary").start().await.unwrap();
    let config = ConfigBuilder::new(&mock.base_url())
        .with_general(&["primary", "backup"])
        .with_failure_threshold(1)
        .build();
    let dispatcher = Dispatcher::from_config(&config).unwrap();

    let response = dispatcher.dispatch(prompt("hello there")).await.unwrap();
    assert_eq!(response.backend_id, "backup");
    assert_eq!(response.attempt, 1);

    // the open circuit keeps later requests off the failing backend
    let response = dispatcher.dispatch(prompt("hello again")).await.unwrap();
    assert_eq!(response.backend_id, "backup");
    assert_eq!(response.attempt, 0);

    assert_eq!(mock.models(), ["primary", "backup", "backup"]);

    let status = serde_json::to_value(dispatcher.status()).unwrap();
    let backends = status["backends"].as_array().unwrap();
    let primary = backends.iter().find(|b| b["backendId"] == "primary").unwrap();
    assert_eq!(primary["circuitBreaker"], "OPEN");
    assert_eq!(primary["isHealthy"], false);
}

#[tokio::test]
async fn exhausted_retries_surface_as_bad_gateway() {
    let mock = MockUpstream::builder().fail_first(u32::MAX).start().await.unwrap();
    let config = ConfigBuilder::new(&mock.base_url())
        .with_coding(&["coder-1"])
        .build();
    let dispatcher = Dispatcher::from_config(&config).unwrap();

    let error = dispatcher.dispatch(prompt(CODING_PROMPT)).await.unwrap_err();

    assert_eq!(error.status_code().as_u16(), 502);
    let LlmError::AllRetriesExhausted {
        category,
        attempts,
        source,
    } = error
    else {
        panic!("expected exhausted retries");
    };
    assert_eq!(category.as_str(), "coding");
    assert_eq!(attempts, 3);
    assert!(source.to_string().contains("500"), "{source}");
    assert_eq!(mock.requests().len(), 3);
}

#[tokio::test]
async fn slow_upstream_counts_as_failure() {
    let mock = MockUpstream::builder()
        .delay(Duration::from_millis(500))
        .start()
        .await
        .unwrap();
    let config = ConfigBuilder::new(&mock.base_url())
        .with_request_timeout(Duration::from_millis(100))
        .with_max_retries(0)
        .build();
    let dispatcher = Dispatcher::from_config(&config).unwrap();

    let error = dispatcher.dispatch(prompt("hello there")).await.unwrap_err();

    assert!(matches!(error, LlmError::AllRetriesExhausted { attempts: 1, .. }));
    let generalist = &dispatcher.health_snapshot()[0];
    assert_eq!(generalist.failures, 1);
    assert_eq!(generalist.successes, 0);
}

#[tokio::test]
async fn empty_input_is_rejected_without_upstream_call() {
    let mock = MockUpstream::start().await.unwrap();
    let config = ConfigBuilder::new(&mock.base_url()).build();
    let dispatcher = Dispatcher::from_config(&config).unwrap();

    let error = dispatcher.dispatch(prompt("  ")).await.unwrap_err();

    assert_eq!(error.status_code().as_u16(), 400);
    assert!(mock.requests().is_empty());
    assert_eq!(dispatcher.queue_stats().rejected, 0);
}

#[tokio::test]
async fn round_robin_spreads_requests() {
    let mock = MockUpstream::start().await.unwrap();
    let config = ConfigBuilder::new(&mock.base_url())
        .with_general(&["a", "b", "c"])
        .with_strategy(SelectionStrategy::RoundRobin)
        .build();
    let dispatcher = Dispatcher::from_config(&config).unwrap();

    for _ in 0..3 {
        dispatcher.dispatch(prompt("hello there")).await.unwrap();
    }

    assert_eq!(mock.models(), ["b", "c", "a"]);
}
