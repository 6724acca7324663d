//! The LLM provider contract the agent loop consumes, plus one concrete
//! OpenAI-compatible adapter and a scripted mock used in tests.
//!
//! Building out a full multi-vendor provider stack (Anthropic, Gemini,
//! Ollama, ...) is explicitly out of scope; only the [`LLMProvider`]
//! contract matters to the loop, and a single adapter is kept so the CLI
//! has something real to construct.

mod error;
mod openai;
pub mod mock;
mod types;

pub use error::ProviderError;
pub use openai::OpenAiCompatibleProvider;
pub use types::{ChatRequest, ChatResponse, Message, Role, ToolDefinition, ToolInvocation, Usage};

use async_trait::async_trait;

/// One synchronous round-trip: transcript + tool schemas in, a classified
/// response out. No streaming; the provider owns its own request timeout.
#[async_trait]
pub trait LLMProvider: Send + Sync {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, ProviderError>;
}
