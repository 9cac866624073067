use async_trait::async_trait;
use reqwest::StatusCode;

pub mod openai;
#[cfg(test)]
pub mod mock;

pub use openai::{OpenAiClient, OpenAiClientConfig};

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("chat completion requires at least one message")]
    EmptyMessages,
    #[error("http error: {0}")]
    Http(#[source] reqwest::Error),
    #[error("request timed out")]
    Timeout,
    #[error("api error {status}: {message}")]
    Api { status: StatusCode, message: String },
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() { LlmError::Timeout } else { LlmError::Http(err) }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ChatRole {
    #[cfg(test)]
    System,
    User,
}

impl ChatRole {
    fn as_api_str(&self) -> &'static str {
        match self {
            #[cfg(test)]
            ChatRole::System => "system",
            ChatRole::User => "user",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self { role, content: content.into() }
    }
}

#[derive(Clone, Debug, PartialEq, Default)]
pub struct ChatCompletionRequest {
    pub model: Option<String>,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

impl ChatCompletionRequest {
    /// Single user-turn request, the shape every enrichment prompt uses.
    pub fn user(prompt: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            messages: vec![ChatMessage::new(ChatRole::User, prompt)],
            max_tokens: Some(max_tokens),
            ..Default::default()
        }
    }
}

#[derive(Clone, Debug, PartialEq, Default)]
pub struct ChatCompletion {
    pub content: String,
    pub total_tokens: Option<u32>,
}

/// Remote text-completion capability used for summaries and tags.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn chat_completion(&self, request: ChatCompletionRequest) -> Result<ChatCompletion, LlmError>;
}
