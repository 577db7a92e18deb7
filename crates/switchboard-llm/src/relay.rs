//! Streaming relay
//!
//! Turns an upstream `text/event-stream` body into a small set of outward
//! events. Incoming bytes are buffered and split on newlines, so payloads
//! split across network chunks are reassembled before parsing. Anything
//! that is not a `data:` line with a text delta is dropped.

use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;

use bytes::{Bytes, BytesMut};
use futures_util::{Stream, StreamExt};
use switchboard_routing::IntentCategory;
use switchboard_telemetry::{KeyValue, RouterMetrics, metrics::record_duration};
use tokio_util::sync::CancellationToken;

use crate::protocol::openai::OpenAiStreamChunk;
use crate::upstream::ByteStream;

const DATA_PREFIX: &str = "data: ";
const DONE_SENTINEL: &str = "[DONE]";
/// Longest line kept while waiting for its newline
const MAX_LINE_BYTES: usize = 1024 * 1024;

/// Event emitted to the caller of a streaming dispatch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayEvent {
    /// Always first: which backend is answering
    Metadata {
        backend_id: String,
        category: IntentCategory,
        attempt: u32,
    },
    /// Incremental text
    Content { content: String },
    /// Upstream signalled completion
    Done,
}

impl RelayEvent {
    /// Render as a server-sent event frame
    pub fn to_frame(&self) -> String {
        let payload = match self {
            Self::Metadata {
                backend_id,
                category,
                attempt,
            } => serde_json::json!({
                "backendId": backend_id,
                "category": category,
                "attempt": attempt,
            }),
            Self::Content { content } => serde_json::json!({ "content": content }),
            Self::Done => return format!("{DATA_PREFIX}{DONE_SENTINEL}\n\n"),
        };

        format!("{DATA_PREFIX}{payload}\n\n")
    }
}

/// Outward event stream of one streaming dispatch
///
/// Ends after [`RelayEvent::Done`], when the upstream body ends or fails, or
/// when its cancellation token fires. Dropping it drops the upstream body.
pub struct RelayStream {
    inner: Pin<Box<dyn Stream<Item = RelayEvent> + Send>>,
}

impl RelayStream {
    /// Relay `upstream`, starting with a metadata event
    pub fn new(
        backend_id: String,
        category: IntentCategory,
        attempt: u32,
        upstream: ByteStream,
        cancel: CancellationToken,
    ) -> Self {
        Self::build(backend_id, category, attempt, upstream, cancel, None)
    }

    pub(crate) fn with_metrics(
        backend_id: String,
        category: IntentCategory,
        attempt: u32,
        upstream: ByteStream,
        cancel: CancellationToken,
        metrics: RouterMetrics,
    ) -> Self {
        Self::build(backend_id, category, attempt, upstream, cancel, Some(metrics))
    }

    fn build(
        backend_id: String,
        category: IntentCategory,
        attempt: u32,
        upstream: ByteStream,
        cancel: CancellationToken,
        metrics: Option<RouterMetrics>,
    ) -> Self {
        let metadata = RelayEvent::Metadata {
            backend_id,
            category,
            attempt,
        };

        let state = RelayState {
            upstream,
            lines: LineBuffer::default(),
            pending: VecDeque::from([metadata]),
            cancel,
            finished: false,
            category,
            started: Instant::now(),
            metrics,
        };

        let inner = futures_util::stream::unfold(state, |mut state| async move {
            let event = state.next_event().await?;
            Some((event, state))
        });

        Self { inner: Box::pin(inner) }
    }
}

impl Stream for RelayStream {
    type Item = RelayEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}

impl std::fmt::Debug for RelayStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayStream").finish_non_exhaustive()
    }
}

struct RelayState {
    upstream: ByteStream,
    lines: LineBuffer,
    pending: VecDeque<RelayEvent>,
    cancel: CancellationToken,
    /// Set once the end sentinel was seen
    finished: bool,
    category: IntentCategory,
    started: Instant,
    metrics: Option<RouterMetrics>,
}

impl RelayState {
    async fn next_event(&mut self) -> Option<RelayEvent> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Some(event);
            }
            if self.finished {
                return None;
            }

            let chunk = tokio::select! {
                biased;
                () = self.cancel.cancelled() => {
                    tracing::debug!(category = %self.category, "caller went away, closing upstream stream");
                    return None;
                }
                chunk = self.upstream.next() => chunk,
            };

            match chunk {
                Some(Ok(bytes)) => self.consume(&bytes),
                Some(Err(error)) => {
                    tracing::warn!(category = %self.category, %error, "upstream stream failed, ending relay");
                    return None;
                }
                None => {
                    tracing::debug!(category = %self.category, "upstream stream ended without end sentinel");
                    return None;
                }
            }
        }
    }

    fn consume(&mut self, chunk: &[u8]) {
        for line in self.lines.push(chunk) {
            match parse_line(&line) {
                Line::Done => {
                    self.pending.push_back(RelayEvent::Done);
                    self.finished = true;
                    return;
                }
                Line::Content(content) => self.pending.push_back(RelayEvent::Content { content }),
                Line::Skip => {}
            }
        }
    }
}

impl Drop for RelayState {
    fn drop(&mut self) {
        if let Some(metrics) = &self.metrics {
            let attributes = [
                KeyValue::new("category", self.category.as_str()),
                KeyValue::new("completed", self.finished),
            ];
            record_duration(&metrics.stream_duration, self.started, &attributes);
        }
    }
}

/// Carry-over buffer that yields complete lines
///
/// Bytes already searched for a newline are not searched again. A line that
/// grows past the limit is discarded up to and including its newline.
#[derive(Debug)]
struct LineBuffer {
    carry: BytesMut,
    /// Prefix of `carry` known to hold no newline
    scanned: usize,
    /// Dropping the remainder of an oversized line
    discarding: bool,
    limit: usize,
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self::with_limit(MAX_LINE_BYTES)
    }
}

impl LineBuffer {
    fn with_limit(limit: usize) -> Self {
        Self {
            carry: BytesMut::new(),
            scanned: 0,
            discarding: false,
            limit,
        }
    }

    /// Append `chunk` and drain every complete line, without its newline
    ///
    /// A trailing partial line stays buffered.
    fn push(&mut self, chunk: &[u8]) -> Vec<Bytes> {
        self.carry.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(offset) = self.carry[self.scanned..].iter().position(|&byte| byte == b'\n') {
            let end = self.scanned + offset;
            let line = self.carry.split_to(end + 1).freeze();
            self.scanned = 0;

            if self.discarding {
                self.discarding = false;
                continue;
            }
            lines.push(line.slice(..end));
        }
        self.scanned = self.carry.len();

        if self.carry.len() > self.limit {
            tracing::debug!(limit = self.limit, "discarding oversized upstream line");
            self.carry.clear();
            self.scanned = 0;
            self.discarding = true;
        }

        lines
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Line {
    Done,
    Content(String),
    Skip,
}

fn parse_line(line: &[u8]) -> Line {
    let Ok(text) = std::str::from_utf8(line) else {
        return Line::Skip;
    };

    let Some(payload) = text.trim_end_matches('\r').strip_prefix(DATA_PREFIX) else {
        return Line::Skip;
    };

    let payload = payload.trim();
    if payload == DONE_SENTINEL {
        return Line::Done;
    }

    match serde_json::from_str::<OpenAiStreamChunk>(payload) {
        Ok(chunk) => chunk.into_delta_text().map_or(Line::Skip, Line::Content),
        Err(error) => {
            tracing::debug!(%error, "skipping unparseable stream payload");
            Line::Skip
        }
    }
}
