// Session state threaded through every pipeline stage
//
// One instance per session, owned by the workflow engine and persisted by the
// checkpoint store between suspensions. Generative fields are overwritten by
// their stage; feedback_history and messages are append-only.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The named steps of the pipeline, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Refine,
    GenerateSpec,
    Review,
    RenderDiagram,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Refine => "refine",
            Stage::GenerateSpec => "generate_spec",
            Stage::Review => "review",
            Stage::RenderDiagram => "render_diagram",
            Stage::Done => "done",
        };
        write!(f, "{name}")
    }
}

/// Structured judgment produced from one review-stage resume.
///
/// Only the most recent record determines routing; older records are kept
/// for the transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub is_satisfied: bool,
    pub detail: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    User,
    Assistant,
}

/// One role-tagged transcript entry. Display only; pipeline logic never
/// reads these back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

/// The mutable record for one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    /// Set once at session start, immutable thereafter.
    pub raw_input: String,
    /// Output of the refine stage; overwritten on each write.
    pub refined_description: String,
    /// Output of the generate stage; overwritten on revision.
    pub architecture_spec: String,
    /// Output of the final stage; written once per completion.
    pub diagram_code: String,
    /// The stage the engine will execute next.
    pub stage: Stage,
    /// Append-only log; the last element is the active judgment.
    pub feedback_history: Vec<FeedbackRecord>,
    /// Append-only transcript for display.
    pub messages: Vec<ChatMessage>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SessionState {
    pub fn new(raw_input: impl Into<String>) -> Self {
        let raw_input = raw_input.into();
        let now = Utc::now();
        let mut state = Self {
            raw_input: raw_input.clone(),
            refined_description: String::new(),
            architecture_spec: String::new(),
            diagram_code: String::new(),
            stage: Stage::Refine,
            feedback_history: Vec::new(),
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        state.push_user(raw_input);
        state
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.messages.push(ChatMessage {
            role: MessageRole::User,
            content: content.into(),
        });
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.messages.push(ChatMessage {
            role: MessageRole::Assistant,
            content: content.into(),
        });
    }

    pub fn latest_feedback(&self) -> Option<&FeedbackRecord> {
        self.feedback_history.last()
    }

    /// True when the next generate_spec pass should revise the existing
    /// specification instead of generating from the refined description.
    pub fn needs_revision(&self) -> bool {
        self.latest_feedback()
            .map(|record| !record.is_satisfied)
            .unwrap_or(false)
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
