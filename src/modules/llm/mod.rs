//! Hosted chat-completion API client

mod openai_client;
mod types;

pub use openai_client::OpenAiClient;
pub use types::{ChatMessage, ChatRole, Completion, CompletionRequest};

use async_trait::async_trait;

use crate::core::error::Result;

/// Single-shot chat completion
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion>;
}
