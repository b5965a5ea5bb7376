// Session driver
//
// Wraps one workflow engine instance and one active session, exposing exactly
// two entry points: `start` and `resume`. This is the single boundary where
// failures are caught and converted into a uniform SessionOutcome; the engine
// below it lets everything bubble.

use std::sync::Arc;

use uuid::Uuid;

use crate::error::WorkflowError;
use crate::providers::LlmProvider;
use crate::workflow::engine::{EngineRun, RunOutcome, WorkflowEngine};
use crate::workflow::state::SessionState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeStatus {
    /// Suspended at review; call `resume` with a feedback string.
    FeedbackRequired,
    /// Terminal: `state.diagram_code` holds the result.
    Completed,
    /// Something failed; `message` describes it and `error` carries the kind.
    Error,
}

/// Result of one `start`/`resume` call.
#[derive(Debug)]
pub struct SessionOutcome {
    pub status: OutcomeStatus,
    /// Accumulated streamed text for this run segment, or the error message.
    pub message: String,
    /// Session state at suspension/completion. `None` only when the failure
    /// happened before a session existed.
    pub state: Option<SessionState>,
    /// The underlying failure when `status == Error`.
    pub error: Option<WorkflowError>,
}

impl SessionOutcome {
    fn from_run(run: EngineRun) -> Self {
        let status = match run.outcome {
            RunOutcome::FeedbackRequired => OutcomeStatus::FeedbackRequired,
            RunOutcome::Completed => OutcomeStatus::Completed,
        };
        Self {
            status,
            message: run.message,
            state: Some(run.state),
            error: None,
        }
    }

    fn from_error(error: WorkflowError, state: Option<SessionState>) -> Self {
        Self {
            status: OutcomeStatus::Error,
            message: error.to_string(),
            state,
            error: Some(error),
        }
    }
}

/// Orchestrates one end-to-end session against a workflow engine.
pub struct SessionDriver {
    engine: WorkflowEngine,
    session_id: Option<String>,
}

impl SessionDriver {
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self::with_engine(WorkflowEngine::new(provider))
    }

    pub fn with_engine(engine: WorkflowEngine) -> Self {
        Self {
            engine,
            session_id: None,
        }
    }

    /// Session id of the most recent `start`, if any.
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// True when the active session is suspended awaiting feedback.
    pub fn awaiting_feedback(&self) -> bool {
        self.session_id
            .as_deref()
            .and_then(|id| self.engine.state_of(id).ok().flatten())
            .map(|state| state.stage == crate::workflow::state::Stage::Review)
            .unwrap_or(false)
    }

    /// Start a fresh session from a raw description and run until review
    /// suspends or the pipeline completes.
    pub async fn start(
        &mut self,
        raw_input: &str,
        on_text: impl Fn(&str) + Send + Sync,
        on_status: impl Fn(&str) + Send + Sync,
    ) -> SessionOutcome {
        let session_id = Uuid::new_v4().to_string();
        tracing::info!("Starting session {}", session_id);
        on_status("Analyzing architecture description...");

        if let Err(e) = self.engine.start_session(&session_id, raw_input) {
            return SessionOutcome::from_error(e, None);
        }
        self.session_id = Some(session_id.clone());

        match self.engine.run(&session_id, &on_text, &on_status).await {
            Ok(run) => SessionOutcome::from_run(run),
            Err(e) => {
                let state = self.engine.state_of(&session_id).ok().flatten();
                SessionOutcome::from_error(e, state)
            }
        }
    }

    /// Resume the suspended session with a feedback string and run until the
    /// next suspension or completion. Requires a prior `start` on this
    /// driver instance.
    pub async fn resume(
        &mut self,
        feedback: &str,
        on_text: impl Fn(&str) + Send + Sync,
        on_status: impl Fn(&str) + Send + Sync,
    ) -> SessionOutcome {
        let Some(session_id) = self.session_id.clone() else {
            return SessionOutcome::from_error(WorkflowError::NoActiveSession, None);
        };

        tracing::info!("Resuming session {}", session_id);
        on_status("Processing feedback...");

        match self
            .engine
            .resume(&session_id, feedback, &on_text, &on_status)
            .await
        {
            Ok(run) => SessionOutcome::from_run(run),
            Err(e) => {
                let state = self.engine.state_of(&session_id).ok().flatten();
                SessionOutcome::from_error(e, state)
            }
        }
    }
}
