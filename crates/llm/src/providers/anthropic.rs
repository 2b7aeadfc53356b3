//! Anthropic Messages API provider.
//!
//! Streaming responses arrive as server-sent events; only `data:` lines are
//! decoded, event names are redundant with the JSON `type` tag.

use crate::client::{LlmClient, LlmRequest, LlmResponse, LlmStream, LlmStreamChunk, LlmUsage};
use crate::providers::drain_lines;
use faqdesk_core::{AppError, AppResult};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const API_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 1024;

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    messages: Vec<MessageParam<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct MessageParam<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    model: String,
    content: Vec<ContentBlock>,
    #[serde(default)]
    usage: ApiUsage,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text {
        text: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Default, Deserialize)]
struct ApiUsage {
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct StartMessage {
    model: String,
    #[serde(default)]
    usage: ApiUsage,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Delta {
    TextDelta {
        text: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(rename = "type")]
    kind: String,
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum StreamEvent {
    MessageStart { message: StartMessage },
    ContentBlockDelta { delta: Delta },
    MessageDelta {
        #[serde(default)]
        usage: ApiUsage,
    },
    MessageStop,
    Error { error: ApiError },
    #[serde(other)]
    Other,
}

/// Running state while decoding one SSE body.
#[derive(Debug, Default)]
struct SseState {
    buffer: Vec<u8>,
    model: String,
    input_tokens: u32,
    finished: bool,
}

impl SseState {
    /// Decode the complete lines currently buffered into stream chunks.
    fn drain(&mut self) -> Vec<AppResult<LlmStreamChunk>> {
        let mut out = Vec::new();

        for line in drain_lines(&mut self.buffer) {
            let Some(data) = line.strip_prefix("data:") else {
                continue;
            };
            if self.finished {
                break;
            }

            let event: StreamEvent = match serde_json::from_str(data.trim()) {
                Ok(event) => event,
                Err(e) => {
                    out.push(Err(AppError::Llm(format!("Failed to parse event: {}", e))));
                    continue;
                }
            };

            match event {
                StreamEvent::MessageStart { message } => {
                    self.model = message.model;
                    self.input_tokens = message.usage.input_tokens;
                }
                StreamEvent::ContentBlockDelta {
                    delta: Delta::TextDelta { text },
                } => out.push(Ok(LlmStreamChunk {
                    content: text,
                    model: self.model.clone(),
                    done: false,
                    usage: None,
                })),
                StreamEvent::MessageDelta { usage } => {
                    tracing::debug!("Anthropic output tokens so far: {}", usage.output_tokens);
                    out.push(Ok(LlmStreamChunk {
                        content: String::new(),
                        model: self.model.clone(),
                        done: false,
                        usage: Some(LlmUsage::new(self.input_tokens, usage.output_tokens)),
                    }));
                }
                StreamEvent::MessageStop => {
                    self.finished = true;
                    out.push(Ok(LlmStreamChunk {
                        content: String::new(),
                        model: self.model.clone(),
                        done: true,
                        usage: None,
                    }));
                }
                StreamEvent::Error { error } => {
                    self.finished = true;
                    out.push(Err(AppError::Llm(format!(
                        "Anthropic stream error ({}): {}",
                        error.kind, error.message
                    ))));
                }
                StreamEvent::ContentBlockDelta { .. } | StreamEvent::Other => {}
            }
        }

        out
    }
}

/// Client for the Anthropic Messages API.
pub struct AnthropicClient {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl AnthropicClient {
    /// Create a client against the public API endpoint.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Create a client with a custom endpoint and request timeout.
    pub fn with_options(
        api_key: impl Into<String>,
        base_url: Option<&str>,
        timeout: Duration,
    ) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Llm(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url
                .unwrap_or(DEFAULT_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            api_key: api_key.into(),
            client,
        })
    }

    fn to_messages_request<'a>(&self, request: &'a LlmRequest, stream: bool) -> MessagesRequest<'a> {
        MessagesRequest {
            model: &request.model,
            max_tokens: request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            system: request.system.as_deref(),
            messages: request
                .messages
                .iter()
                .map(|m| MessageParam {
                    role: m.role.as_str(),
                    content: &m.content,
                })
                .collect(),
            temperature: request.temperature,
            stream,
        }
    }

    async fn send(&self, body: &MessagesRequest<'_>) -> AppResult<reqwest::Response> {
        let url = format!("{}/v1/messages", self.base_url);

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(body)
            .send()
            .await
            .map_err(|e| AppError::Llm(format!("Failed to send request to Anthropic: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::Llm(format!(
                "Anthropic API error ({}): {}",
                status, error_text
            )));
        }

        Ok(response)
    }
}

#[async_trait::async_trait]
impl LlmClient for AnthropicClient {
    fn provider_name(&self) -> &str {
        "anthropic"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        tracing::info!("Sending request to Anthropic (model: {})", request.model);

        let body = self.to_messages_request(request, false);
        let response = self.send(&body).await?;

        let parsed: MessagesResponse = response
            .json()
            .await
            .map_err(|e| AppError::Llm(format!("Failed to parse Anthropic response: {}", e)))?;

        let content = parsed
            .content
            .into_iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text),
                ContentBlock::Other => None,
            })
            .collect::<String>();

        Ok(LlmResponse {
            content,
            model: parsed.model,
            usage: LlmUsage::new(parsed.usage.input_tokens, parsed.usage.output_tokens),
            done: true,
        })
    }

    async fn stream(&self, request: &LlmRequest) -> AppResult<LlmStream> {
        tracing::info!("Starting streaming request to Anthropic (model: {})", request.model);

        let body = self.to_messages_request(request, true);
        let response = self.send(&body).await?;

        let stream = response
            .bytes_stream()
            .scan(SseState::default(), |state, result| {
                let chunks = match result {
                    Ok(bytes) => {
                        state.buffer.extend_from_slice(&bytes);
                        state.drain()
                    }
                    Err(e) => vec![Err(AppError::Llm(format!("Stream error: {}", e)))],
                };
                futures::future::ready(Some(futures::stream::iter(chunks)))
            })
            .flatten();

        Ok(Box::pin(stream))
    }
}
