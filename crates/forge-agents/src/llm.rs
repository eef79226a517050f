//! OpenAI-compatible LLM client.
//!
//! One thin reqwest adapter covers everything the pipeline needs from the
//! provider: chat completions (optionally multimodal, optionally with a
//! strict JSON schema response format, optionally with logprobs) and
//! embeddings. The [`LlmBackend`] trait is the seam the stages depend on;
//! tests script it in-process.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use forge_core::error::{ForgeError, ForgeResult};
use forge_core::retry::{with_retry, RetryPolicy};

/// One content part of a chat message; images ride along as data URLs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageUrl {
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: Vec<ContentPart>,
}

impl ChatMessage {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: "system".into(),
            content: vec![ContentPart::Text { text: text.into() }],
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: vec![ContentPart::Text { text: text.into() }],
        }
    }

    pub fn user_with_image(text: impl Into<String>, image_data_url: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: vec![
                ContentPart::Text { text: text.into() },
                ContentPart::ImageUrl {
                    image_url: ImageUrl {
                        url: image_data_url.into(),
                    },
                },
            ],
        }
    }
}

/// Structured-output directive for the completion.
#[derive(Debug, Clone)]
pub enum ResponseFormat {
    /// Any JSON object.
    JsonObject,
    /// Strict JSON schema; the provider validates the shape.
    JsonSchema {
        name: String,
        schema: serde_json::Value,
    },
}

#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    pub response_format: Option<ResponseFormat>,
    pub temperature: f64,
    pub max_tokens: Option<u32>,
    /// Request per-token logprobs; used to derive extraction confidence.
    pub logprobs: bool,
}

impl ChatRequest {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            response_format: None,
            temperature: 0.1,
            max_tokens: None,
            logprobs: false,
        }
    }

    pub fn with_json_schema(mut self, name: &str, schema: serde_json::Value) -> Self {
        self.response_format = Some(ResponseFormat::JsonSchema {
            name: name.to_string(),
            schema,
        });
        self
    }

    pub fn with_logprobs(mut self) -> Self {
        self.logprobs = true;
        self
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

#[derive(Debug, Clone)]
pub struct ChatResponse {
    pub content: String,
    /// Per-completion-token logprobs, when requested and reported.
    pub logprobs: Vec<f64>,
    pub usage: TokenUsage,
    pub model: String,
}

impl ChatResponse {
    /// `exp(mean(logprobs))`: the geometric-mean token probability of the
    /// completion, used as a confidence proxy.
    pub fn mean_logprob_confidence(&self) -> Option<f64> {
        if self.logprobs.is_empty() {
            return None;
        }
        let mean = self.logprobs.iter().sum::<f64>() / self.logprobs.len() as f64;
        Some(mean.exp().clamp(0.0, 1.0))
    }
}

/// The seam every LLM-facing stage depends on.
#[async_trait]
pub trait LlmBackend: Send + Sync {
    async fn complete(&self, request: ChatRequest) -> ForgeResult<ChatResponse>;
    async fn embed(&self, inputs: &[String]) -> ForgeResult<Vec<Vec<f32>>>;
}

/// Production client for any OpenAI-compatible endpoint.
pub struct OpenAiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    embedding_model: String,
    retry: RetryPolicy,
}

impl OpenAiClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        embedding_model: impl Into<String>,
    ) -> ForgeResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| ForgeError::UpstreamUnavailable(format!("http client: {e}")))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
            embedding_model: embedding_model.into(),
            retry: RetryPolicy::default(),
        })
    }

    fn map_status(status: reqwest::StatusCode, retry_after: Option<u64>, body: &str) -> ForgeError {
        match status.as_u16() {
            401 | 403 => ForgeError::UpstreamAuth(format!("provider returned {status}")),
            429 => ForgeError::UpstreamRateLimit {
                retry_after_secs: retry_after.unwrap_or(60),
            },
            500..=599 => {
                ForgeError::UpstreamUnavailable(format!("provider returned {status}: {body}"))
            }
            _ => ForgeError::InvalidInput(format!("provider rejected request ({status}): {body}")),
        }
    }

    fn build_body(&self, request: &ChatRequest) -> serde_json::Value {
        let mut body = json!({
            "model": self.model,
            "messages": request.messages,
            "temperature": request.temperature,
        });
        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = json!(max_tokens);
        }
        if request.logprobs {
            body["logprobs"] = json!(true);
        }
        match &request.response_format {
            Some(ResponseFormat::JsonObject) => {
                body["response_format"] = json!({ "type": "json_object" });
            }
            Some(ResponseFormat::JsonSchema { name, schema }) => {
                body["response_format"] = json!({
                    "type": "json_schema",
                    "json_schema": { "name": name, "strict": true, "schema": schema }
                });
            }
            None => {}
        }
        body
    }

    async fn complete_once(&self, request: &ChatRequest) -> ForgeResult<ChatResponse> {
        let url = format!("{}/chat/completions", self.base_url);
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&self.build_body(request))
            .send()
            .await
            .map_err(|e| ForgeError::UpstreamUnavailable(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok());
            let body = response.text().await.unwrap_or_default();
            return Err(Self::map_status(status, retry_after, &body));
        }

        let parsed: CompletionsResponse = response
            .json()
            .await
            .map_err(|e| ForgeError::InvalidInput(format!("unparsable completion: {e}")))?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ForgeError::InvalidInput("completion had no choices".into()))?;

        let logprobs = choice
            .logprobs
            .map(|lp| lp.content.into_iter().map(|t| t.logprob).collect())
            .unwrap_or_default();

        debug!(
            model = %parsed.model,
            prompt_tokens = parsed.usage.prompt_tokens,
            completion_tokens = parsed.usage.completion_tokens,
            "Completion received"
        );

        Ok(ChatResponse {
            content: choice.message.content,
            logprobs,
            usage: TokenUsage {
                prompt_tokens: parsed.usage.prompt_tokens,
                completion_tokens: parsed.usage.completion_tokens,
            },
            model: parsed.model,
        })
    }
}

#[async_trait]
impl LlmBackend for OpenAiClient {
    async fn complete(&self, request: ChatRequest) -> ForgeResult<ChatResponse> {
        with_retry(&self.retry, "llm.complete", || {
            self.complete_once(&request)
        })
        .await
    }

    async fn embed(&self, inputs: &[String]) -> ForgeResult<Vec<Vec<f32>>> {
        let url = format!("{}/embeddings", self.base_url);
        with_retry(&self.retry, "llm.embed", || async {
            let response = self
                .http
                .post(&url)
                .bearer_auth(&self.api_key)
                .json(&json!({ "model": self.embedding_model, "input": inputs }))
                .send()
                .await
                .map_err(|e| ForgeError::UpstreamUnavailable(format!("request failed: {e}")))?;

            let status = response.status();
            if !status.is_success() {
                let retry_after = response
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse().ok());
                let body = response.text().await.unwrap_or_default();
                return Err(Self::map_status(status, retry_after, &body));
            }

            let parsed: EmbeddingsResponse = response
                .json()
                .await
                .map_err(|e| ForgeError::InvalidInput(format!("unparsable embeddings: {e}")))?;

            let mut data = parsed.data;
            data.sort_by_key(|d| d.index);
            Ok(data.into_iter().map(|d| d.embedding).collect())
        })
        .await
    }
}

// ── Wire shapes ──────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct CompletionsResponse {
    model: String,
    choices: Vec<CompletionChoice>,
    #[serde(default)]
    usage: WireUsage,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: WireMessage,
    logprobs: Option<WireLogprobs>,
}

#[derive(Debug, Deserialize)]
struct WireMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct WireLogprobs {
    #[serde(default)]
    content: Vec<WireTokenLogprob>,
}

#[derive(Debug, Deserialize)]
struct WireTokenLogprob {
    logprob: f64,
}

#[derive(Debug, Default, Deserialize)]
struct WireUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingDatum {
    index: usize,
    embedding: Vec<f32>,
}

/// Rough cost estimate for the ledger, in USD per call.
pub fn estimate_cost_usd(usage: TokenUsage) -> f64 {
    // GPT-4-class list prices per million tokens.
    const PROMPT_PER_M: f64 = 2.50;
    const COMPLETION_PER_M: f64 = 10.00;
    (usage.prompt_tokens as f64 * PROMPT_PER_M
        + usage.completion_tokens as f64 * COMPLETION_PER_M)
        / 1_000_000.0
}
