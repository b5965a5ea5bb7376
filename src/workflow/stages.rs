// Step functions for the generation stages
//
// Each stage builds its prompt from the current state, runs one generation
// call, and returns the produced text. Stages never mutate state or touch the
// checkpoint store; the engine applies the delta so a failed call leaves the
// persisted state at its last-known-good value.
//
// Streaming contract: the sink receives the cumulative text for the active
// stage on every fragment, so callers replace displayed text rather than
// appending.

use anyhow::Result;

use crate::providers::{GenerationRequest, LlmProvider, StreamChunk};
use crate::workflow::prompts;
use crate::workflow::state::SessionState;

/// Sink receiving the cumulative text of the active stage. Borrowed
/// closures are fine; callers are not required to hand over `'static` ones.
pub type TextSink<'a> = dyn Fn(&str) + Send + Sync + 'a;

/// Refine the raw project description.
pub async fn refine(
    provider: &dyn LlmProvider,
    state: &SessionState,
    on_text: &TextSink<'_>,
) -> Result<String> {
    let request = GenerationRequest::new(prompts::refine_prompt(&state.raw_input))
        .with_system(prompts::REFINE_SYSTEM);
    run_generation(provider, request, on_text).await
}

/// Generate the architecture specification.
///
/// First pass works from the refined description; when the latest feedback
/// record is unsatisfied this becomes a revision pass over the previous
/// specification plus that feedback detail.
pub async fn generate_spec(
    provider: &dyn LlmProvider,
    state: &SessionState,
    on_text: &TextSink<'_>,
) -> Result<String> {
    let prompt = if state.needs_revision() {
        let detail = state
            .latest_feedback()
            .map(|record| record.detail.as_str())
            .unwrap_or_default();
        tracing::info!("Revising architecture specification from feedback");
        prompts::revise_spec_prompt(&state.architecture_spec, detail)
    } else {
        tracing::info!("Generating initial architecture specification");
        prompts::generate_spec_prompt(&state.refined_description)
    };

    let request = GenerationRequest::new(prompt).with_system(prompts::ARCHITECT_SYSTEM);
    run_generation(provider, request, on_text).await
}

/// Render the approved specification as diagram code.
pub async fn render_diagram(
    provider: &dyn LlmProvider,
    state: &SessionState,
    on_text: &TextSink<'_>,
) -> Result<String> {
    let request = GenerationRequest::new(prompts::diagram_prompt(&state.architecture_spec))
        .with_system(prompts::DIAGRAM_SYSTEM);
    run_generation(provider, request, on_text).await
}

/// Run one generation call, forwarding cumulative text to the sink as
/// fragments arrive. Falls back to the blocking call (one sink invocation
/// with the full text) for providers without streaming support.
async fn run_generation(
    provider: &dyn LlmProvider,
    request: GenerationRequest,
    on_text: &TextSink<'_>,
) -> Result<String> {
    if !provider.supports_streaming() {
        let text = provider.generate(&request).await?;
        on_text(&text);
        return Ok(text);
    }

    let request = request.with_stream(true);
    let mut rx = provider.generate_stream(&request).await?;

    let mut accumulated = String::new();
    let mut finished: Option<String> = None;

    while let Some(chunk) = rx.recv().await {
        match chunk? {
            StreamChunk::TextDelta(delta) => {
                accumulated.push_str(&delta);
                on_text(&accumulated);
            }
            StreamChunk::Done(full) => {
                finished = Some(full);
            }
        }
    }

    Ok(finished.unwrap_or(accumulated))
}
