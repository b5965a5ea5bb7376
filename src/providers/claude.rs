// Anthropic Messages API provider
//
// Implements both the blocking and streaming halves of LlmProvider against
// the Claude API. Streaming parses the SSE byte stream and forwards text
// deltas as they arrive.

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::stream::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc;

use super::retry::{with_retry, RetryPolicy};
use super::types::{GenerationRequest, StreamChunk};
use super::LlmProvider;

const ANTHROPIC_VERSION: &str = "2023-06-01";
const REQUEST_TIMEOUT_SECS: u64 = 120;
const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";
const DEFAULT_MAX_TOKENS_CEILING: u32 = 8192;

#[derive(Clone)]
pub struct ClaudeProvider {
    client: Client,
    api_key: String,
    base_url: String,
    default_model: String,
    max_tokens_ceiling: u32,
}

impl ClaudeProvider {
    pub fn new(api_key: String) -> Result<Self> {
        Self::with_base_url(api_key, "https://api.anthropic.com".to_string())
    }

    pub fn with_base_url(api_key: String, base_url: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            api_key,
            base_url,
            default_model: DEFAULT_MODEL.to_string(),
            max_tokens_ceiling: DEFAULT_MAX_TOKENS_CEILING,
        })
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        let model = model.into();
        if !model.is_empty() {
            self.default_model = model;
        }
        self
    }

    /// Cap the max_tokens of every request sent through this provider.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        if max_tokens > 0 {
            self.max_tokens_ceiling = max_tokens;
        }
        self
    }

    fn to_api_request(&self, request: &GenerationRequest, stream: bool) -> ApiRequest {
        let model = if request.model.is_empty() {
            self.default_model.clone()
        } else {
            request.model.clone()
        };

        ApiRequest {
            model,
            max_tokens: request.max_tokens.min(self.max_tokens_ceiling),
            system: request.system.clone(),
            messages: vec![ApiMessage {
                role: "user".to_string(),
                content: request.prompt.clone(),
            }],
            temperature: request.temperature,
            stream,
        }
    }

    async fn post_messages(&self, api_request: &ApiRequest) -> Result<reqwest::Response> {
        let url = format!("{}/v1/messages", self.base_url);

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(api_request)
            .send()
            .await
            .context("Failed to send request to Claude API")?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            anyhow::bail!(
                "Claude API request failed\n\nStatus: {}\nBody: {}",
                status,
                error_body
            );
        }

        Ok(response)
    }

    async fn generate_once(&self, request: &GenerationRequest) -> Result<String> {
        let api_request = self.to_api_request(request, false);
        tracing::debug!("Sending request to Claude API (model: {})", api_request.model);

        let response = self.post_messages(&api_request).await?;

        let api_response: ApiResponse = response
            .json()
            .await
            .context("Failed to parse Claude API response")?;

        tracing::debug!(
            "Received response ({} content blocks)",
            api_response.content.len()
        );

        Ok(api_response.text())
    }
}

#[async_trait]
impl LlmProvider for ClaudeProvider {
    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        with_retry("claude.generate", RetryPolicy::default(), || {
            self.generate_once(request)
        })
        .await
    }

    async fn generate_stream(
        &self,
        request: &GenerationRequest,
    ) -> Result<mpsc::Receiver<Result<StreamChunk>>> {
        let (tx, rx) = mpsc::channel(100);

        let api_request = self.to_api_request(request, true);
        tracing::debug!(
            "Sending streaming request to Claude API (model: {})",
            api_request.model
        );

        let response = self.post_messages(&api_request).await?;

        // Parse the SSE stream in a background task; the receiver side sees
        // text deltas as they arrive and a final Done with the full text.
        tokio::spawn(async move {
            let mut stream = response.bytes_stream();
            let mut buffer: Vec<u8> = Vec::new();
            let mut accumulated = String::new();

            'outer: while let Some(chunk) = stream.next().await {
                match chunk {
                    Ok(bytes) => {
                        buffer.extend_from_slice(&bytes);

                        while let Some(newline_pos) = buffer.iter().position(|&b| b == b'\n') {
                            let line_bytes: Vec<u8> = buffer.drain(..=newline_pos).collect();
                            let line = String::from_utf8_lossy(&line_bytes);

                            let Some(json_str) = line.strip_prefix("data: ") else {
                                continue;
                            };
                            let json_str = json_str.trim();
                            if json_str.is_empty() {
                                continue;
                            }

                            let Ok(event) = serde_json::from_str::<StreamEvent>(json_str) else {
                                continue;
                            };

                            match event.event_type.as_str() {
                                "content_block_delta" => {
                                    if let Some(text) =
                                        event.delta.and_then(|d| d.text)
                                    {
                                        accumulated.push_str(&text);
                                        if tx
                                            .send(Ok(StreamChunk::TextDelta(text)))
                                            .await
                                            .is_err()
                                        {
                                            break 'outer;
                                        }
                                    }
                                }
                                "message_stop" => {
                                    tracing::debug!(
                                        "[STREAM] message_stop after {} chars",
                                        accumulated.len()
                                    );
                                    let _ = tx
                                        .send(Ok(StreamChunk::Done(accumulated.clone())))
                                        .await;
                                    break 'outer;
                                }
                                "error" => {
                                    let message = event
                                        .error
                                        .map(|e| e.message)
                                        .unwrap_or_else(|| "unknown stream error".to_string());
                                    let _ = tx
                                        .send(Err(anyhow::anyhow!(
                                            "Claude API stream error: {message}"
                                        )))
                                        .await;
                                    break 'outer;
                                }
                                _ => {}
                            }
                        }
                    }
                    Err(e) => {
                        let _ = tx
                            .send(Err(anyhow::Error::from(e).context("Stream read failed")))
                            .await;
                        break;
                    }
                }
            }
        });

        Ok(rx)
    }

    fn name(&self) -> &str {
        "claude"
    }

    fn default_model(&self) -> &str {
        &self.default_model
    }
}

// ─── Wire types ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
struct ApiRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<ApiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    stream: bool,
}

#[derive(Debug, Clone, Serialize)]
struct ApiMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    content: Vec<ApiContentBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum ApiContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(other)]
    Other,
}

impl ApiResponse {
    fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|block| match block {
                ApiContentBlock::Text { text } => Some(text.as_str()),
                ApiContentBlock::Other => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Debug, Deserialize)]
struct StreamEvent {
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    delta: Option<StreamDelta>,
    #[serde(default)]
    error: Option<StreamError>,
}

#[derive(Debug, Deserialize)]
struct StreamDelta {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamError {
    message: String,
}
