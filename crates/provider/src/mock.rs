//! A scripted provider for driving the agent loop deterministically in
//! tests, in place of a real network call.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::ProviderError;
use crate::types::{ChatRequest, ChatResponse};
use crate::LLMProvider;

/// Replays a fixed sequence of responses, one per call to `chat`. Panics
/// (via an `Other` error) if called more times than scripted.
pub struct ScriptedProvider {
    responses: Mutex<std::vec::IntoIter<ChatResponse>>,
}

impl ScriptedProvider {
    pub fn new(responses: Vec<ChatResponse>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter()),
        }
    }
}

#[async_trait]
impl LLMProvider for ScriptedProvider {
    async fn chat(&self, _request: ChatRequest) -> Result<ChatResponse, ProviderError> {
        let mut responses = self.responses.lock().unwrap();
        responses
            .next()
            .ok_or_else(|| ProviderError::Other("scripted provider exhausted".to_string()))
    }
}
