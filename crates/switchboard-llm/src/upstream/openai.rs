use async_trait::async_trait;
use futures_util::StreamExt;
use http::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, RequestBuilder, Response};
use secrecy::{ExposeSecret, SecretString};
use switchboard_config::UpstreamConfig;

use super::{ByteStream, Upstream};
use crate::error::LlmError;
use crate::protocol::openai::{OpenAiRequest, OpenAiResponse};
use crate::types::{Completion, CompletionRequest};

const REFERER: HeaderName = HeaderName::from_static("http-referer");
const TITLE: HeaderName = HeaderName::from_static("x-title");

/// Client for an OpenAI-compatible `/chat/completions` endpoint
///
/// One pooled `reqwest` client is shared by every in-flight request.
pub struct OpenAiUpstream {
    client: Client,
    completions_url: String,
    api_key: Option<SecretString>,
    request_timeout: std::time::Duration,
}

impl OpenAiUpstream {
    pub fn new(config: &UpstreamConfig) -> Result<Self, LlmError> {
        let client = Client::builder()
            .default_headers(app_headers(config)?)
            .connect_timeout(config.connect_timeout)
            .tcp_keepalive(config.tcp_keepalive)
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build HTTP client: {e}"))?;

        let base = config.base_url.as_str().trim_end_matches('/');

        Ok(Self {
            client,
            completions_url: format!("{base}/chat/completions"),
            api_key: config.api_key.clone(),
            request_timeout: config.request_timeout,
        })
    }

    fn post(&self, body: &OpenAiRequest<'_>) -> RequestBuilder {
        let builder = self.client.post(&self.completions_url).json(body);

        match &self.api_key {
            Some(key) => builder.bearer_auth(key.expose_secret()),
            None => builder,
        }
    }
}

impl std::fmt::Debug for OpenAiUpstream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiUpstream")
            .field("completions_url", &self.completions_url)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Upstream for OpenAiUpstream {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, LlmError> {
        let body = OpenAiRequest::new(request, false);

        let response = self
            .post(&body)
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| {
                tracing::debug!(model = %request.model, error = %e, "upstream request failed");
                LlmError::Upstream(e.to_string())
            })?;

        let response = ensure_success(response).await?;

        let wire: OpenAiResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Upstream(format!("failed to parse response: {e}")))?;

        wire.into_completion()
            .ok_or_else(|| LlmError::Upstream("response contained no choices".to_owned()))
    }

    async fn complete_stream(&self, request: &CompletionRequest) -> Result<ByteStream, LlmError> {
        let body = OpenAiRequest::new(request, true);

        // the deadline covers the response headers, not the body
        let response = tokio::time::timeout(self.request_timeout, self.post(&body).send())
            .await
            .map_err(|_| LlmError::Upstream("timed out waiting for response headers".to_owned()))?
            .map_err(|e| {
                tracing::debug!(model = %request.model, error = %e, "upstream stream request failed");
                LlmError::Upstream(e.to_string())
            })?;

        let response = ensure_success(response).await?;

        let stream = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| LlmError::Streaming(e.to_string())));

        Ok(Box::pin(stream))
    }
}

async fn ensure_success(response: Response) -> Result<Response, LlmError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    tracing::debug!(%status, "upstream returned error");

    Err(LlmError::Upstream(format!("upstream returned {status}: {body}")))
}

fn app_headers(config: &UpstreamConfig) -> Result<HeaderMap, LlmError> {
    let mut headers = HeaderMap::new();

    if let Some(app_url) = &config.app_url {
        let value = HeaderValue::from_str(app_url)
            .map_err(|e| anyhow::anyhow!("invalid upstream.app_url: {e}"))?;
        headers.insert(REFERER, value);
    }

    let title = HeaderValue::from_str(&config.app_name)
        .map_err(|e| anyhow::anyhow!("invalid upstream.app_name: {e}"))?;
    headers.insert(TITLE, title);

    Ok(headers)
}
