// Error types for the workflow core

use thiserror::Error;

use crate::workflow::state::Stage;

/// Failures that can surface from the workflow engine and session driver.
///
/// The engine never catches these; they bubble up to the driver boundary,
/// which converts them into a uniform `SessionOutcome`.
#[derive(Error, Debug)]
pub enum WorkflowError {
    /// `resume` was called on a driver with no suspended session.
    #[error("no active session - call start before resume")]
    NoActiveSession,

    /// The generation capability failed or returned malformed output
    /// during a pipeline stage.
    #[error("generation failed during {stage} stage: {message}")]
    Generation { stage: Stage, message: String },

    /// The satisfaction classifier could not produce a valid structured
    /// judgment. The session remains suspended at review so corrected
    /// feedback can be retried.
    #[error("feedback classification failed: {0}")]
    Classification(String),

    /// Checkpoint store failure (missing session, wrong stage).
    #[error("checkpoint error: {0}")]
    Checkpoint(String),

    /// Configuration problem.
    #[error("configuration error: {0}")]
    Config(String),
}

impl WorkflowError {
    pub fn generation(stage: Stage, source: anyhow::Error) -> Self {
        Self::Generation {
            stage,
            message: format!("{source:#}"),
        }
    }

    pub fn checkpoint(message: impl Into<String>) -> Self {
        Self::Checkpoint(message.into())
    }

    /// True when the session is still suspended at review and may be
    /// resumed again with a corrected feedback string.
    pub fn is_retryable_at_review(&self) -> bool {
        matches!(
            self,
            Self::Classification(_)
                | Self::Generation {
                    stage: Stage::Review,
                    ..
                }
        )
    }
}

pub type Result<T> = std::result::Result<T, WorkflowError>;
