// Workflow core: state machine, step functions, and review loop
//
// Module map:
// - `state`: the session record threaded through every stage
// - `stages`: the three generation step functions
// - `classifier`: free-text feedback -> structured judgment
// - `checkpoint`: persisted state keyed by session id
// - `engine`: sequencing, suspension at review, resume routing
// - `prompts`: instruction templates

pub mod checkpoint;
pub mod classifier;
pub mod engine;
pub mod prompts;
pub mod stages;
pub mod state;

pub use checkpoint::{Checkpointer, MemoryCheckpointer};
pub use engine::{EngineRun, RunOutcome, StatusSink, WorkflowEngine};
pub use stages::TextSink;
pub use state::{ChatMessage, FeedbackRecord, MessageRole, SessionState, Stage};
