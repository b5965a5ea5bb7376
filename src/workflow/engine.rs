// Workflow engine: a persisted state machine with suspend/resume
//
// States: refine -> generate_spec -> review -> {generate_spec | render_diagram} -> done.
// The engine executes one stage at a time and checkpoints the full session
// state after every completed stage, so suspension at review survives across
// process-level calls. Suspension is a cooperative yield: `run` simply
// returns `RunOutcome::FeedbackRequired` instead of looping internally, and
// no background work continues.
//
// The engine catches nothing. Stage and classification failures bubble to the
// driver, and because state is only written after a stage succeeds, the
// checkpoint keeps its last-known-good value for a safe retry.

use std::sync::Arc;

use crate::error::{Result, WorkflowError};
use crate::providers::LlmProvider;
use crate::workflow::checkpoint::{Checkpointer, MemoryCheckpointer};
use crate::workflow::classifier;
use crate::workflow::stages::{self, TextSink};
use crate::workflow::state::{SessionState, Stage};

/// Sink receiving coarse progress updates ("Human review required", ...).
pub type StatusSink<'a> = dyn Fn(&str) + Send + Sync + 'a;

/// Why `run` returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Suspended at review, awaiting a feedback string.
    FeedbackRequired,
    /// Terminal state reached; diagram code is in the state.
    Completed,
}

/// One run segment: everything produced between a start/resume call and the
/// next suspension or completion.
#[derive(Debug)]
pub struct EngineRun {
    pub outcome: RunOutcome,
    /// Accumulated streamed text for this segment.
    pub message: String,
    /// Full session state at the point of suspension/completion.
    pub state: SessionState,
}

pub struct WorkflowEngine {
    provider: Arc<dyn LlmProvider>,
    checkpoints: Arc<dyn Checkpointer>,
}

impl WorkflowEngine {
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self::with_checkpointer(provider, Arc::new(MemoryCheckpointer::new()))
    }

    pub fn with_checkpointer(
        provider: Arc<dyn LlmProvider>,
        checkpoints: Arc<dyn Checkpointer>,
    ) -> Self {
        Self {
            provider,
            checkpoints,
        }
    }

    /// Seed and persist a fresh session.
    pub fn start_session(&self, session_id: &str, raw_input: &str) -> Result<()> {
        let state = SessionState::new(raw_input);
        self.checkpoints.save(session_id, &state)
    }

    /// Current persisted state for a session, if any.
    pub fn state_of(&self, session_id: &str) -> Result<Option<SessionState>> {
        self.checkpoints.load(session_id)
    }

    /// Drive the session until it suspends at review or reaches the terminal
    /// stage. Resumable: picks up from whatever stage the checkpoint names,
    /// never re-executing completed stages.
    pub async fn run(
        &self,
        session_id: &str,
        on_text: &TextSink<'_>,
        on_status: &StatusSink<'_>,
    ) -> Result<EngineRun> {
        let mut state = self.checkpoints.load_required(session_id)?;
        let mut message = String::new();

        loop {
            tracing::debug!("Session {} entering stage {}", session_id, state.stage);

            match state.stage {
                Stage::Refine => {
                    on_status("Refining project description...");
                    let text = stages::refine(self.provider.as_ref(), &state, on_text)
                        .await
                        .map_err(|e| WorkflowError::generation(Stage::Refine, e))?;

                    append_segment(
                        &mut message,
                        &format!("Refined project description:\n\n{text}"),
                    );
                    state.push_assistant(format!("Refined project description:\n\n{text}"));
                    state.refined_description = text;
                    state.stage = Stage::GenerateSpec;
                    state.touch();
                    self.checkpoints.save(session_id, &state)?;
                }

                Stage::GenerateSpec => {
                    let revising = state.needs_revision();
                    on_status(if revising {
                        "Updating architecture based on feedback..."
                    } else {
                        "Generating architecture specification..."
                    });
                    let text = stages::generate_spec(self.provider.as_ref(), &state, on_text)
                        .await
                        .map_err(|e| WorkflowError::generation(Stage::GenerateSpec, e))?;

                    let note = if revising {
                        format!("Updated architecture specification based on your feedback:\n\n{text}")
                    } else {
                        format!("Generated architecture specification:\n\n{text}")
                    };
                    append_segment(&mut message, &note);
                    state.push_assistant(note);
                    state.architecture_spec = text;
                    state.stage = Stage::Review;
                    state.touch();
                    self.checkpoints.save(session_id, &state)?;
                }

                Stage::Review => {
                    // Suspension point: hand the specification back to the
                    // caller and yield. No side effects happen here beyond
                    // the status emission; the checkpoint already holds this
                    // state.
                    on_status("Human review required");
                    tracing::info!("Session {} suspended for review", session_id);
                    return Ok(EngineRun {
                        outcome: RunOutcome::FeedbackRequired,
                        message,
                        state,
                    });
                }

                Stage::RenderDiagram => {
                    on_status("Rendering architecture diagram...");
                    let text = stages::render_diagram(self.provider.as_ref(), &state, on_text)
                        .await
                        .map_err(|e| WorkflowError::generation(Stage::RenderDiagram, e))?;

                    append_segment(
                        &mut message,
                        &format!("Generated diagram code:\n\n{text}"),
                    );
                    state.push_assistant(format!(
                        "Generated diagram code:\n\n{text}\n\nArchitecture visualization is complete!"
                    ));
                    state.diagram_code = text;
                    state.stage = Stage::Done;
                    state.touch();
                    self.checkpoints.save(session_id, &state)?;
                }

                Stage::Done => {
                    on_status("Architecture analysis completed!");
                    tracing::info!("Session {} completed", session_id);
                    return Ok(EngineRun {
                        outcome: RunOutcome::Completed,
                        message,
                        state,
                    });
                }
            }
        }
    }

    /// Resume a session suspended at review by injecting a feedback string.
    ///
    /// Classifies the feedback, appends the resulting record, routes
    /// (satisfied -> render_diagram, otherwise back to generate_spec), and
    /// continues running. A classification failure leaves the checkpoint
    /// untouched at review so a corrected string can be retried.
    pub async fn resume(
        &self,
        session_id: &str,
        feedback: &str,
        on_text: &TextSink<'_>,
        on_status: &StatusSink<'_>,
    ) -> Result<EngineRun> {
        let mut state = self.checkpoints.load_required(session_id)?;

        if state.stage != Stage::Review {
            return Err(WorkflowError::checkpoint(format!(
                "session '{session_id}' is at stage {} and not awaiting feedback",
                state.stage
            )));
        }

        on_status("Evaluating feedback...");
        let record =
            classifier::classify(self.provider.as_ref(), &state.architecture_spec, feedback)
                .await?;

        tracing::info!(
            "Session {} feedback classified: satisfied={}",
            session_id,
            record.is_satisfied
        );

        state.push_user(feedback);
        state.stage = if record.is_satisfied {
            Stage::RenderDiagram
        } else {
            Stage::GenerateSpec
        };
        state.feedback_history.push(record);
        state.touch();
        self.checkpoints.save(session_id, &state)?;

        self.run(session_id, on_text, on_status).await
    }
}

fn append_segment(message: &mut String, chunk: &str) {
    if !message.is_empty() {
        message.push_str("\n\n");
    }
    message.push_str(chunk);
}
