use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use reqwest::StatusCode;

use super::{ChatCompletion, ChatCompletionRequest, LlmClient, LlmError};

/// Replays queued completions and records every request it sees.
#[derive(Debug, Default)]
pub struct MockClient {
    responses: Mutex<VecDeque<Result<ChatCompletion, LlmError>>>,
    calls: Mutex<Vec<ChatCompletionRequest>>,
}

impl MockClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_response(&self, resp: Result<ChatCompletion, LlmError>) {
        self.responses.lock().unwrap().push_back(resp);
    }

    pub fn push_reply(&self, content: &str) {
        self.push_response(Ok(ChatCompletion { content: content.to_string(), total_tokens: None }));
    }

    pub fn calls(&self) -> Vec<ChatCompletionRequest> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmClient for MockClient {
    async fn chat_completion(&self, request: ChatCompletionRequest) -> Result<ChatCompletion, LlmError> {
        self.calls.lock().unwrap().push(request);
        self.responses.lock().unwrap().pop_front().unwrap_or_else(|| {
            Err(LlmError::Api { status: StatusCode::SERVICE_UNAVAILABLE, message: "mock queue drained".into() })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn returns_enqueued_then_errors_when_drained() {
        let mock = MockClient::new();
        mock.push_reply("hi");
        let req = ChatCompletionRequest::user("Hello", 8);

        assert_eq!(mock.chat_completion(req.clone()).await.unwrap().content, "hi");
        assert!(matches!(mock.chat_completion(req.clone()).await, Err(LlmError::Api { status: StatusCode::SERVICE_UNAVAILABLE, .. })));
        assert_eq!(mock.calls(), vec![req.clone(), req]);
    }
}
