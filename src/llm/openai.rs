use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{ChatCompletion, ChatCompletionRequest, LlmClient, LlmError};
use crate::http::user_agent;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_TEMPERATURE: f32 = 0.2;
const DEFAULT_TOP_P: f32 = 1.0;
const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[derive(Clone, Debug)]
pub struct OpenAiClientConfig {
    pub api_key: String,
    pub base_url: String,
    pub default_model: String,
    pub default_temperature: f32,
    pub default_top_p: f32,
    pub timeout: Duration,
}

impl OpenAiClientConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            default_model: DEFAULT_MODEL.to_string(),
            default_temperature: DEFAULT_TEMPERATURE,
            default_top_p: DEFAULT_TOP_P,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// `None` when `OPENAI_API_KEY` is unset or blank: the remote capability is unavailable.
    pub fn from_env() -> Option<Self> {
        let key = std::env::var("OPENAI_API_KEY").ok().filter(|k| !k.trim().is_empty())?;
        let mut cfg = Self::new(key);
        if let Ok(base) = std::env::var("OPENAI_BASE_URL") {
            cfg.base_url = base;
        }
        if let Ok(model) = std::env::var("OPENAI_MODEL") {
            cfg.default_model = model;
        }
        if let Some(t) = env_parse::<f32>("OPENAI_TEMPERATURE") {
            cfg.default_temperature = t;
        }
        if let Some(p) = env_parse::<f32>("OPENAI_TOP_P") {
            cfg.default_top_p = p;
        }
        if let Some(secs) = env_parse::<u64>("OPENAI_TIMEOUT_SECS") {
            cfg.timeout = Duration::from_secs(secs);
        }
        Some(cfg)
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

/// Chat-completions client for any OpenAI-compatible endpoint.
#[derive(Clone)]
pub struct OpenAiClient {
    http: Client,
    cfg: OpenAiClientConfig,
}

impl OpenAiClient {
    pub fn new(cfg: OpenAiClientConfig) -> Result<Self, LlmError> {
        let http = Client::builder().user_agent(user_agent()).timeout(cfg.timeout).build()?;
        Ok(Self { http, cfg })
    }

    pub fn model(&self) -> &str {
        &self.cfg.default_model
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.cfg.base_url.trim_end_matches('/'))
    }

    fn build_api_request(&self, req: &ChatCompletionRequest) -> ApiRequest {
        ApiRequest {
            model: req.model.clone().unwrap_or_else(|| self.cfg.default_model.clone()),
            temperature: req.temperature.unwrap_or(self.cfg.default_temperature),
            top_p: self.cfg.default_top_p,
            max_tokens: req.max_tokens,
            messages: req
                .messages
                .iter()
                .map(|m| ApiMessage { role: m.role.as_api_str().to_string(), content: Some(m.content.clone()) })
                .collect(),
        }
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn chat_completion(&self, request: ChatCompletionRequest) -> Result<ChatCompletion, LlmError> {
        if request.messages.is_empty() {
            return Err(LlmError::EmptyMessages);
        }
        let body = self.build_api_request(&request);
        let resp = self.http.post(self.endpoint()).bearer_auth(&self.cfg.api_key).json(&body).send().await?;
        let status = resp.status();
        let bytes = resp.bytes().await?;

        if !status.is_success() {
            let message = serde_json::from_slice::<ApiErrorEnvelope>(&bytes)
                .map(|env| env.error.message)
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(LlmError::Api { status, message });
        }

        let parsed: ApiResponse = serde_json::from_slice(&bytes)?;
        let content = parsed.choices.into_iter().find_map(|c| c.message.content).unwrap_or_default();
        let total_tokens = parsed.usage.and_then(|u| u.total_tokens);
        debug!(model = %body.model, total_tokens = ?total_tokens, "chat completion");
        Ok(ChatCompletion { content, total_tokens })
    }
}

#[derive(Debug, Serialize)]
struct ApiRequest {
    model: String,
    temperature: f32,
    top_p: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    messages: Vec<ApiMessage>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiMessage {
    role: String,
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    choices: Vec<ApiChoice>,
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiMessage,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    total_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}
