//! OpenAI-compatible chat-completion client.
//!
//! Credentials are read from `system_config` on every call, so changes made
//! by an administrator apply without a restart.

use std::collections::VecDeque;
use std::fmt::Display;
use std::pin::Pin;
use std::time::Duration;

use futures::stream::{self, Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::config::LlmConfig;
use crate::db::{config_keys, DbPool, SystemConfigRepository};
use crate::{FeedflowError, Result};

/// Stream of completion text fragments.
pub type TokenStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Completion API location and credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmSettings {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
}

impl LlmSettings {
    /// Read the settings from system config.
    ///
    /// Fails with `NotConfigured` if any of the three values is empty.
    pub async fn load(pool: &DbPool) -> Result<Self> {
        let repo = SystemConfigRepository::new(pool);
        let base_url = repo.get_non_empty(config_keys::OPENAI_BASE_URL).await?;
        let api_key = repo.get_non_empty(config_keys::OPENAI_API_KEY).await?;
        let model = repo.get_non_empty(config_keys::OPENAI_MODEL).await?;

        match (base_url, api_key, model) {
            (Some(base_url), Some(api_key), Some(model)) => Ok(Self {
                base_url,
                api_key,
                model,
            }),
            _ => Err(FeedflowError::NotConfigured),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

/// A two-message (system + user) completion request.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub system: String,
    pub user: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatBody<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    stream: bool,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ChunkResponse {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
}

#[derive(Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: ChunkDelta,
}

#[derive(Deserialize, Default)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
}

/// Chat-completion client.
#[derive(Debug, Clone)]
pub struct LlmClient {
    http: reqwest::Client,
    request_timeout: Duration,
}

impl LlmClient {
    /// Create a client.
    ///
    /// Non-streaming calls time out after `request_timeout_secs`; streaming
    /// calls only have a connect timeout.
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| FeedflowError::Upstream(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            http,
            request_timeout: Duration::from_secs(config.request_timeout_secs),
        })
    }

    /// Run a completion and return the trimmed reply text.
    pub async fn complete(&self, settings: &LlmSettings, request: &ChatRequest) -> Result<String> {
        let body = build_body(settings, request, false);
        debug!(model = %settings.model, "Sending completion request");

        let response = self
            .http
            .post(settings.endpoint())
            .bearer_auth(&settings.api_key)
            .timeout(self.request_timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| FeedflowError::Upstream(format!("completion request failed: {e}")))?;
        let response = check_status(response).await?;

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| FeedflowError::Upstream(format!("invalid completion response: {e}")))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .ok_or_else(|| FeedflowError::Upstream("empty completion response".to_string()))
    }

    /// Run a streaming completion.
    ///
    /// The returned stream yields content fragments in order and ends after
    /// the `[DONE]` marker or the end of the body. A transport failure
    /// mid-stream is yielded as an error and ends the stream.
    pub async fn stream(&self, settings: &LlmSettings, request: &ChatRequest) -> Result<TokenStream> {
        let body = build_body(settings, request, true);
        debug!(model = %settings.model, "Sending streaming completion request");

        let response = self
            .http
            .post(settings.endpoint())
            .bearer_auth(&settings.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| FeedflowError::Upstream(format!("completion request failed: {e}")))?;
        let response = check_status(response).await?;

        Ok(token_stream(Box::pin(response.bytes_stream())))
    }
}

fn build_body<'a>(settings: &'a LlmSettings, request: &'a ChatRequest, stream: bool) -> ChatBody<'a> {
    ChatBody {
        model: &settings.model,
        messages: [
            ChatMessage {
                role: "system",
                content: &request.system,
            },
            ChatMessage {
                role: "user",
                content: &request.user,
            },
        ],
        temperature: request.temperature,
        max_tokens: request.max_tokens,
        stream,
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    error!(status = status.as_u16(), body = %body, "Completion API returned an error");
    Err(FeedflowError::Upstream(format!(
        "completion API returned HTTP {}",
        status.as_u16()
    )))
}

/// One decoded server-sent event from the completion stream.
#[derive(Debug, Clone, PartialEq, Eq)]
enum SseData {
    Token(String),
    Done,
}

/// Incremental `data:` line decoder.
///
/// Lines may be split across chunks (and inside a UTF-8 sequence), so
/// bytes are buffered until a newline arrives.
#[derive(Debug, Default)]
struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    fn push(&mut self, chunk: &[u8]) -> Vec<SseData> {
        self.buffer.extend_from_slice(chunk);
        let mut events = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            if let Some(event) = decode_line(&String::from_utf8_lossy(&line)) {
                events.push(event);
            }
        }
        events
    }

    fn finish(&mut self) -> Option<SseData> {
        let rest = std::mem::take(&mut self.buffer);
        decode_line(&String::from_utf8_lossy(&rest))
    }
}

fn decode_line(line: &str) -> Option<SseData> {
    let data = line.trim().strip_prefix("data:")?.trim();
    if data == "[DONE]" {
        return Some(SseData::Done);
    }
    // Keep-alives and malformed chunks are skipped.
    let chunk: ChunkResponse = serde_json::from_str(data).ok()?;
    chunk
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.delta.content)
        .filter(|c| !c.is_empty())
        .map(SseData::Token)
}

struct DecodeState<S> {
    bytes: S,
    decoder: SseDecoder,
    pending: VecDeque<String>,
    finished: bool,
}

/// Turn a raw completion body into a stream of content fragments.
fn token_stream<S, B, E>(bytes: S) -> TokenStream
where
    S: Stream<Item = std::result::Result<B, E>> + Send + Unpin + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Display + Send + 'static,
{
    let state = DecodeState {
        bytes,
        decoder: SseDecoder::default(),
        pending: VecDeque::new(),
        finished: false,
    };

    let stream = stream::unfold(state, |mut st| async move {
        loop {
            if let Some(token) = st.pending.pop_front() {
                return Some((Ok(token), st));
            }
            if st.finished {
                return None;
            }
            match st.bytes.next().await {
                Some(Ok(chunk)) => {
                    for event in st.decoder.push(chunk.as_ref()) {
                        match event {
                            SseData::Token(token) => st.pending.push_back(token),
                            SseData::Done => {
                                st.finished = true;
                                break;
                            }
                        }
                    }
                }
                Some(Err(e)) => {
                    st.finished = true;
                    st.pending.clear();
                    let err = FeedflowError::Upstream(format!("completion stream interrupted: {e}"));
                    return Some((Err(err), st));
                }
                None => {
                    if let Some(SseData::Token(token)) = st.decoder.finish() {
                        st.pending.push_back(token);
                    }
                    st.finished = true;
                }
            }
        }
    });

    Box::pin(stream)
}
