//! Agent gateway: tool-calling language model providers

mod error;
mod gemini;
mod types;

pub use error::LlmError;
pub use gemini::GeminiProvider;
pub use types::*;

use anyhow::Result;
use async_trait::async_trait;

/// Trait for tool-calling language model gateways
///
/// Both rounds of a tool exchange go through `chat`: the second round simply
/// carries the assistant's tool call and a `Role::Tool` result message.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Get the provider name
    fn name(&self) -> &str;

    /// Send a chat completion request (non-streaming)
    async fn chat(
        &self,
        messages: &[Message],
        tools: Option<&[ToolDefinition]>,
    ) -> Result<LlmResponse>;
}
