//! Mock completion service for integration tests
//!
//! Serves a minimal OpenAI-compatible `/v1/chat/completions` and records what
//! it was asked.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router, routing};
use futures_util::StreamExt;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

const DEFAULT_CONTENT: &str = "Hello from mock upstream";

/// Mock upstream that returns predictable responses
pub struct MockUpstream {
    addr: SocketAddr,
    shutdown: CancellationToken,
    state: Arc<MockState>,
}

#[derive(Default)]
struct MockState {
    /// Requests to fail before succeeding
    fail_first: AtomicU32,
    /// Models that always fail
    failing_models: Vec<String>,
    content: Option<String>,
    delay: Option<Duration>,
    /// Keep streamed bodies open instead of sending `[DONE]`
    stall_streams: bool,
    in_flight: AtomicU32,
    peak_in_flight: AtomicU32,
    requests: Mutex<Vec<RecordedRequest>>,
}

/// What the mock saw for one request
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub model: String,
    pub message_count: usize,
    pub stream: bool,
    pub authorization: Option<String>,
    pub title: Option<String>,
}

/// Configures a [`MockUpstream`] before it starts
#[derive(Default)]
pub struct MockUpstreamBuilder {
    state: MockState,
}

impl MockUpstreamBuilder {
    /// Fail the first `n` requests with 500
    pub fn fail_first(self, n: u32) -> Self {
        self.state.fail_first.store(n, Ordering::Relaxed);
        self
    }

    /// Always fail requests for `model`
    pub fn fail_model(mut self, model: &str) -> Self {
        self.state.failing_models.push(model.to_owned());
        self
    }

    /// Answer with `content` instead of the default text
    pub fn respond_with(mut self, content: &str) -> Self {
        self.state.content = Some(content.to_owned());
        self
    }

    /// Wait before answering
    pub fn delay(mut self, delay: Duration) -> Self {
        self.state.delay = Some(delay);
        self
    }

    /// Never finish streamed responses
    pub fn stall_streams(mut self) -> Self {
        self.state.stall_streams = true;
        self
    }

    pub async fn start(self) -> anyhow::Result<MockUpstream> {
        let state = Arc::new(self.state);

        let app = Router::new()
            .route("/v1/chat/completions", routing::post(handle_chat_completions))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let shutdown = CancellationToken::new();
        let shutdown_clone = shutdown.clone();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    shutdown_clone.cancelled().await;
                })
                .await
                .ok();
        });

        Ok(MockUpstream { addr, shutdown, state })
    }
}

impl MockUpstream {
    pub fn builder() -> MockUpstreamBuilder {
        MockUpstreamBuilder::default()
    }

    /// Start a mock that always succeeds
    pub async fn start() -> anyhow::Result<Self> {
        Self::builder().start().await
    }

    /// Base URL including `/v1`; the client appends `/chat/completions`
    pub fn base_url(&self) -> String {
        format!("http://{}/v1", self.addr)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().unwrap().clone()
    }

    /// Models requested, in arrival order
    pub fn models(&self) -> Vec<String> {
        self.requests().into_iter().map(|r| r.model).collect()
    }

    /// Highest number of requests handled at once
    pub fn peak_in_flight(&self) -> u32 {
        self.state.peak_in_flight.load(Ordering::SeqCst)
    }
}

impl Drop for MockUpstream {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<serde_json::Value>,
    #[serde(default)]
    stream: bool,
}

/// Decrements the in-flight count when the handler finishes
struct InFlight<'a>(&'a AtomicU32);

impl<'a> InFlight<'a> {
    fn enter(state: &'a MockState) -> Self {
        let now = state.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        state.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        Self(&state.in_flight)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

async fn handle_chat_completions(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(req): Json<ChatCompletionRequest>,
) -> Response {
    let _in_flight = InFlight::enter(&state);

    let header_value = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(ToOwned::to_owned)
    };

    state.requests.lock().unwrap().push(RecordedRequest {
        model: req.model.clone(),
        message_count: req.messages.len(),
        stream: req.stream,
        authorization: header_value(header::AUTHORIZATION.as_str()),
        title: header_value("x-title"),
    });

    if let Some(delay) = state.delay {
        tokio::time::sleep(delay).await;
    }

    let should_fail = state.failing_models.contains(&req.model)
        || state
            .fail_first
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();

    if should_fail {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({
                "error": {
                    "message": "mock upstream intentional failure",
                    "type": "server_error"
                }
            })),
        )
            .into_response();
    }

    let content = state.content.as_deref().unwrap_or(DEFAULT_CONTENT);

    if req.stream {
        return streaming_response(content, state.stall_streams);
    }

    Json(serde_json::json!({
        "id": "chatcmpl-test-123",
        "object": "chat.completion",
        "created": 1_700_000_000u64,
        "model": req.model,
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }],
        "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
    }))
    .into_response()
}

/// One SSE frame per word, framed the way hosted services do it
fn streaming_response(content: &str, stall: bool) -> Response {
    let delta = |delta: serde_json::Value| {
        let chunk = serde_json::json!({
            "object": "chat.completion.chunk",
            "choices": [{"index": 0, "delta": delta}]
        });
        format!("data: {chunk}\n\n")
    };

    let mut frames = vec![
        ": keep-alive\n\n".to_owned(),
        delta(serde_json::json!({"role": "assistant", "content": ""})),
    ];
    frames.extend(
        content
            .split_whitespace()
            .map(|word| delta(serde_json::json!({"content": format!("{word} ")}))),
    );

    let body = futures_util::stream::iter(frames.into_iter().map(Ok::<_, Infallible>));

    let body = if stall {
        Body::from_stream(body.chain(futures_util::stream::pending()))
    } else {
        let tail = [
            Ok(r#"data: {"choices":[],"usage":{"prompt_tokens":10,"completion_tokens":5,"total_tokens":15}}"#.to_owned() + "\n\n"),
            Ok("data: [DONE]\n\n".to_owned()),
        ];
        Body::from_stream(body.chain(futures_util::stream::iter(tail)))
    };

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/event-stream")
        .body(body)
        .unwrap()
}
