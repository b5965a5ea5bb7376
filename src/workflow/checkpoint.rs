// Checkpoint store: persisted session state keyed by session id
//
// Suspension at review survives across calls because the engine writes the
// full SessionState here after every completed stage. Sessions are isolated
// by key; abandoning one never blocks another. The trait is the seam for a
// durable backend; the in-memory store is what ships.

use dashmap::DashMap;

use crate::error::{Result, WorkflowError};
use crate::workflow::state::SessionState;

pub trait Checkpointer: Send + Sync {
    fn save(&self, session_id: &str, state: &SessionState) -> Result<()>;
    fn load(&self, session_id: &str) -> Result<Option<SessionState>>;
    fn remove(&self, session_id: &str) -> Result<()>;
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Load a state, failing if the session id has no checkpoint.
    fn load_required(&self, session_id: &str) -> Result<SessionState> {
        self.load(session_id)?.ok_or_else(|| {
            WorkflowError::checkpoint(format!("no checkpoint for session '{session_id}'"))
        })
    }
}

/// In-memory checkpoint store.
#[derive(Default)]
pub struct MemoryCheckpointer {
    sessions: DashMap<String, SessionState>,
}

impl MemoryCheckpointer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Checkpointer for MemoryCheckpointer {
    fn save(&self, session_id: &str, state: &SessionState) -> Result<()> {
        tracing::debug!("Checkpointing session {} at stage {}", session_id, state.stage);
        self.sessions.insert(session_id.to_string(), state.clone());
        Ok(())
    }

    fn load(&self, session_id: &str) -> Result<Option<SessionState>> {
        Ok(self.sessions.get(session_id).map(|entry| entry.clone()))
    }

    fn remove(&self, session_id: &str) -> Result<()> {
        self.sessions.remove(session_id);
        Ok(())
    }

    fn len(&self) -> usize {
        self.sessions.len()
    }
}
