// Text-generation capability
//
// The workflow never talks to a model API directly; every stage receives an
// explicitly injected LlmProvider handle. This keeps the engine deterministic
// under test (stub substitution) and avoids hidden process-wide state.

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::mpsc::Receiver;

pub mod claude;
pub mod retry;
pub mod types;

pub use claude::ClaudeProvider;
pub use types::{GenerationRequest, StreamChunk};

/// Trait for text-generation providers.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Send a request and wait for the complete response text.
    async fn generate(&self, request: &GenerationRequest) -> Result<String>;

    /// Send a request and stream the response.
    ///
    /// Returns a channel that receives text deltas as they are produced,
    /// followed by a final `StreamChunk::Done` carrying the full text.
    /// The channel is closed when the stream is complete.
    async fn generate_stream(
        &self,
        request: &GenerationRequest,
    ) -> Result<Receiver<Result<StreamChunk>>>;

    /// Provider name (e.g., "claude").
    fn name(&self) -> &str;

    /// Default model identifier for this provider.
    fn default_model(&self) -> &str;

    /// Whether the provider supports streaming.
    fn supports_streaming(&self) -> bool {
        true
    }
}
