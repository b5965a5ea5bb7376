// Unified request types for text-generation providers
//
// The workflow stages build a GenerationRequest and hand it to whichever
// LlmProvider is configured; providers transform it into their API format.

use serde::Serialize;

/// A single-turn generation request.
///
/// The pipeline never carries multi-turn tool conversations; each stage is
/// one instruction (optionally with a system prompt) and one text answer.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationRequest {
    /// The user-role instruction text.
    pub prompt: String,

    /// System prompt (sent as `system` for the Anthropic API).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    /// Model name; empty means "use the provider default".
    pub model: String,

    /// Maximum tokens to generate.
    pub max_tokens: u32,

    /// Sampling temperature (optional).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Whether the caller wants incremental output.
    #[serde(skip)]
    pub stream: bool,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            system: None,
            model: String::new(),
            max_tokens: 4096,
            temperature: None,
            stream: false,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }
}

/// Incremental output from a streaming generation call.
#[derive(Debug, Clone)]
pub enum StreamChunk {
    /// Incremental text fragment.
    TextDelta(String),
    /// Stream finished; carries the full accumulated text.
    Done(String),
}
