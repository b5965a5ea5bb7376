// End-to-end tests for the review-loop workflow
//
// A scripted stub provider stands in for the generation capability: it serves
// queued responses in order (streaming them in small fragments) and records
// every prompt, so revision inputs can be asserted on.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;

use archflow::agent::{OutcomeStatus, SessionDriver};
use archflow::error::WorkflowError;
use archflow::providers::{GenerationRequest, LlmProvider, StreamChunk};
use archflow::workflow::Stage;

struct StubProvider {
    responses: Mutex<VecDeque<String>>,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl StubProvider {
    fn new(responses: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.iter().map(|s| s.to_string()).collect()),
            prompts: Arc::new(Mutex::new(Vec::new())),
        })
    }

    fn next_response(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| anyhow::anyhow!("stub script exhausted"))
    }

    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmProvider for StubProvider {
    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        self.next_response(&request.prompt)
    }

    async fn generate_stream(
        &self,
        request: &GenerationRequest,
    ) -> Result<mpsc::Receiver<Result<StreamChunk>>> {
        let answer = self.next_response(&request.prompt)?;
        let (tx, rx) = mpsc::channel(16);
        tokio::spawn(async move {
            // Stream in small fragments to exercise cumulative delivery.
            for piece in answer.as_bytes().chunks(3) {
                let piece = String::from_utf8_lossy(piece).to_string();
                if tx.send(Ok(StreamChunk::TextDelta(piece))).await.is_err() {
                    return;
                }
            }
            let _ = tx.send(Ok(StreamChunk::Done(answer))).await;
        });
        Ok(rx)
    }

    fn name(&self) -> &str {
        "stub"
    }

    fn default_model(&self) -> &str {
        "stub-1"
    }
}

const SATISFIED: &str = r#"{"is_satisfied": true, "detail": ""}"#;

fn unsatisfied(detail: &str) -> String {
    format!(r#"{{"is_satisfied": false, "detail": "{detail}"}}"#)
}

fn sink(_: &str) {}

#[tokio::test]
async fn test_resume_before_start_is_no_active_session() {
    let provider = StubProvider::new(&[]);
    let mut driver = SessionDriver::new(provider);

    let outcome = driver.resume("looks good", sink, sink).await;
    assert_eq!(outcome.status, OutcomeStatus::Error);
    assert!(matches!(outcome.error, Some(WorkflowError::NoActiveSession)));
    assert!(outcome.state.is_none());
}

#[tokio::test]
async fn test_approve_path_end_to_end() {
    let provider = StubProvider::new(&[
        "Refined: Build a URL shortener",
        "Spec v1",
        SATISFIED,
        "diagram v1",
    ]);
    let mut driver = SessionDriver::new(provider.clone());

    let outcome = driver.start("Build a URL shortener", sink, sink).await;
    assert_eq!(outcome.status, OutcomeStatus::FeedbackRequired);
    let state = outcome.state.as_ref().unwrap();
    assert_eq!(state.stage, Stage::Review);
    assert_eq!(state.refined_description, "Refined: Build a URL shortener");
    assert_eq!(state.architecture_spec, "Spec v1");
    assert!(state.diagram_code.is_empty());
    assert!(outcome.message.contains("Spec v1"));

    let outcome = driver.resume("looks good", sink, sink).await;
    assert_eq!(outcome.status, OutcomeStatus::Completed);
    let state = outcome.state.as_ref().unwrap();
    assert_eq!(state.stage, Stage::Done);
    assert_eq!(state.diagram_code, "diagram v1");
    assert_eq!(state.feedback_history.len(), 1);
    assert!(state.feedback_history[0].is_satisfied);

    // The classifier saw the feedback verbatim; the diagram prompt saw the
    // approved spec.
    let prompts = provider.prompts();
    assert_eq!(prompts.len(), 4);
    assert_eq!(prompts[2], "looks good");
    assert!(prompts[3].contains("Spec v1"));
}

#[tokio::test]
async fn test_revision_path_incorporates_feedback() {
    let provider = StubProvider::new(&[
        "Refined",
        "Spec v1",
        &unsatisfied("add a caching layer"),
        "Spec v2",
    ]);
    let mut driver = SessionDriver::new(provider.clone());

    driver.start("Build a URL shortener", sink, sink).await;
    let outcome = driver.resume("add a caching layer", sink, sink).await;

    // Loops back through generate_spec and suspends again.
    assert_eq!(outcome.status, OutcomeStatus::FeedbackRequired);
    let state = outcome.state.as_ref().unwrap();
    assert_eq!(state.stage, Stage::Review);
    assert_eq!(state.architecture_spec, "Spec v2");
    assert!(state.diagram_code.is_empty());
    assert_eq!(state.feedback_history.len(), 1);
    assert!(!state.feedback_history[0].is_satisfied);
    assert_eq!(state.feedback_history[0].detail, "add a caching layer");

    // The revision prompt was built from the previous spec plus the
    // classified feedback detail, not from the refined description.
    let prompts = provider.prompts();
    let revision_prompt = &prompts[3];
    assert!(revision_prompt.contains("Spec v1"));
    assert!(revision_prompt.contains("add a caching layer"));
}

#[tokio::test]
async fn test_never_satisfied_never_renders() {
    let provider = StubProvider::new(&[
        "Refined",
        "Spec v1",
        &unsatisfied("more detail"),
        "Spec v2",
        &unsatisfied("still more"),
        "Spec v3",
    ]);
    let mut driver = SessionDriver::new(provider);

    driver.start("Build it", sink, sink).await;

    let outcome = driver.resume("more detail", sink, sink).await;
    assert_eq!(outcome.status, OutcomeStatus::FeedbackRequired);

    let outcome = driver.resume("still more", sink, sink).await;
    assert_eq!(outcome.status, OutcomeStatus::FeedbackRequired);

    let state = outcome.state.as_ref().unwrap();
    assert_eq!(state.architecture_spec, "Spec v3");
    assert!(state.diagram_code.is_empty());
    assert_eq!(state.feedback_history.len(), 2);
    assert!(state.feedback_history.iter().all(|r| !r.is_satisfied));
}

#[tokio::test]
async fn test_independent_drivers_do_not_share_state() {
    let provider_a = StubProvider::new(&["Refined A", "Spec A"]);
    let provider_b = StubProvider::new(&["Refined B", "Spec B"]);
    let mut driver_a = SessionDriver::new(provider_a);
    let mut driver_b = SessionDriver::new(provider_b);

    let outcome_a = driver_a.start("same input", sink, sink).await;
    let outcome_b = driver_b.start("same input", sink, sink).await;

    assert_ne!(driver_a.session_id(), driver_b.session_id());
    assert_eq!(
        outcome_a.state.as_ref().unwrap().architecture_spec,
        "Spec A"
    );
    assert_eq!(
        outcome_b.state.as_ref().unwrap().architecture_spec,
        "Spec B"
    );
}

#[tokio::test]
async fn test_classification_failure_keeps_session_suspended() {
    let provider = StubProvider::new(&[
        "Refined",
        "Spec v1",
        "this is not a judgment",
        SATISFIED,
        "diagram v1",
    ]);
    let mut driver = SessionDriver::new(provider);

    driver.start("Build it", sink, sink).await;

    let outcome = driver.resume("ambiguous feedback", sink, sink).await;
    assert_eq!(outcome.status, OutcomeStatus::Error);
    assert!(matches!(
        outcome.error,
        Some(WorkflowError::Classification(_))
    ));
    // The session is still suspended at review with nothing recorded.
    let state = outcome.state.as_ref().unwrap();
    assert_eq!(state.stage, Stage::Review);
    assert!(state.feedback_history.is_empty());
    assert!(driver.awaiting_feedback());

    // A corrected feedback string completes the session.
    let outcome = driver.resume("looks good", sink, sink).await;
    assert_eq!(outcome.status, OutcomeStatus::Completed);
    assert_eq!(outcome.state.unwrap().diagram_code, "diagram v1");
}

#[tokio::test]
async fn test_generation_failure_preserves_last_good_state() {
    // Script ends after the refine answer, so generate_spec fails.
    let provider = StubProvider::new(&["Refined"]);
    let mut driver = SessionDriver::new(provider);

    let outcome = driver.start("Build it", sink, sink).await;
    assert_eq!(outcome.status, OutcomeStatus::Error);
    assert!(matches!(
        outcome.error,
        Some(WorkflowError::Generation {
            stage: Stage::GenerateSpec,
            ..
        })
    ));

    // The refine output was persisted; the failing stage overwrote nothing.
    let state = outcome.state.as_ref().unwrap();
    assert_eq!(state.refined_description, "Refined");
    assert!(state.architecture_spec.is_empty());
}

#[tokio::test]
async fn test_streaming_sink_receives_cumulative_text() {
    let provider = StubProvider::new(&["Refined text", "Spec v1"]);
    let mut driver = SessionDriver::new(provider);

    let seen: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let seen_clone = seen.clone();
    driver
        .start(
            "Build it",
            move |text| seen_clone.lock().unwrap().push(text.to_string()),
            sink,
        )
        .await;

    let seen = seen.lock().unwrap();
    assert!(!seen.is_empty());
    // Within a stage every callback value extends the previous one; across
    // the stage boundary the text restarts.
    let refine_calls: Vec<&String> = seen
        .iter()
        .take_while(|t| "Refined text".starts_with(t.as_str()))
        .collect();
    assert_eq!(refine_calls.last().unwrap().as_str(), "Refined text");
    for pair in refine_calls.windows(2) {
        assert!(pair[1].starts_with(pair[0].as_str()));
    }
    assert_eq!(seen.last().unwrap().as_str(), "Spec v1");
}

#[tokio::test]
async fn test_sinks_accept_borrowed_closures() {
    // Closures capturing locals by reference must coerce to the sink
    // types; they are not 'static.
    let provider = StubProvider::new(&["Refined text", "Spec v1", SATISFIED, "flowchart TD"]);
    let mut driver = SessionDriver::new(provider);

    let seen: Mutex<Vec<String>> = Mutex::new(Vec::new());
    let statuses: Mutex<Vec<String>> = Mutex::new(Vec::new());

    driver
        .start(
            "Build it",
            |text| seen.lock().unwrap().push(text.to_string()),
            |status| statuses.lock().unwrap().push(status.to_string()),
        )
        .await;
    let outcome = driver
        .resume(
            "looks good",
            |text| seen.lock().unwrap().push(text.to_string()),
            |status| statuses.lock().unwrap().push(status.to_string()),
        )
        .await;

    assert_eq!(outcome.status, OutcomeStatus::Completed);
    assert!(!seen.lock().unwrap().is_empty());
    assert!(!statuses.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_transcript_records_user_and_assistant_turns() {
    let provider = StubProvider::new(&["Refined", "Spec v1", SATISFIED, "diagram v1"]);
    let mut driver = SessionDriver::new(provider);

    driver.start("Build it", sink, sink).await;
    let outcome = driver.resume("looks good", sink, sink).await;

    let state = outcome.state.unwrap();
    use archflow::workflow::MessageRole;
    let roles: Vec<MessageRole> = state.messages.iter().map(|m| m.role).collect();
    // user input, refine, spec, user feedback, diagram
    assert_eq!(
        roles,
        vec![
            MessageRole::User,
            MessageRole::Assistant,
            MessageRole::Assistant,
            MessageRole::User,
            MessageRole::Assistant,
        ]
    );
    assert_eq!(state.messages[0].content, "Build it");
    assert_eq!(state.messages[3].content, "looks good");
}
