// Satisfaction classifier
//
// Converts a free-text feedback string into a structured FeedbackRecord via
// one constrained generation call. A response that fails schema validation is
// a hard failure: defaulting to satisfied would end the loop prematurely, and
// defaulting to unsatisfied would loop forever on positive-but-ambiguous
// feedback, so ambiguity is surfaced as an error instead of guessed.

use serde::Deserialize;

use crate::error::{Result, WorkflowError};
use crate::providers::{GenerationRequest, LlmProvider};
use crate::workflow::prompts;
use crate::workflow::state::{FeedbackRecord, Stage};

const CLASSIFIER_MAX_TOKENS: u32 = 1024;

/// The exact shape the model must return. Extra keys are rejected.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawJudgment {
    is_satisfied: bool,
    detail: String,
}

/// Classify one feedback string against the specification under review.
pub async fn classify(
    provider: &dyn LlmProvider,
    architecture_spec: &str,
    feedback: &str,
) -> Result<FeedbackRecord> {
    let request = GenerationRequest::new(feedback)
        .with_system(prompts::classifier_system(architecture_spec))
        .with_max_tokens(CLASSIFIER_MAX_TOKENS);

    let response = provider
        .generate(&request)
        .await
        .map_err(|e| WorkflowError::generation(Stage::Review, e))?;

    let judgment = parse_judgment(&response)?;
    tracing::debug!(
        "Classified feedback: satisfied={} detail_len={}",
        judgment.is_satisfied,
        judgment.detail.len()
    );

    Ok(FeedbackRecord {
        is_satisfied: judgment.is_satisfied,
        detail: judgment.detail,
    })
}

fn parse_judgment(response: &str) -> Result<RawJudgment> {
    let body = strip_code_fence(response.trim());

    serde_json::from_str(body).map_err(|e| {
        WorkflowError::Classification(format!(
            "model returned an invalid judgment ({e}): {}",
            truncate(body, 200)
        ))
    })
}

/// Strip a surrounding markdown code fence (``` or ```json) if present.
fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let rest = rest.trim_start_matches(['\r', '\n']);
    rest.strip_suffix("```").map(str::trim_end).unwrap_or(rest)
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", truncated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_judgment() {
        let j = parse_judgment(r#"{"is_satisfied": true, "detail": ""}"#).unwrap();
        assert!(j.is_satisfied);
        assert!(j.detail.is_empty());

        let j =
            parse_judgment(r#"{"is_satisfied": false, "detail": "add a caching layer"}"#).unwrap();
        assert!(!j.is_satisfied);
        assert_eq!(j.detail, "add a caching layer");
    }

    #[test]
    fn test_parse_fenced_judgment() {
        let fenced = "```json\n{\"is_satisfied\": true, \"detail\": \"\"}\n```";
        assert!(parse_judgment(fenced).unwrap().is_satisfied);

        let bare_fence = "```\n{\"is_satisfied\": false, \"detail\": \"x\"}\n```";
        assert!(!parse_judgment(bare_fence).unwrap().is_satisfied);
    }

    #[test]
    fn test_parse_rejects_prose() {
        let err = parse_judgment("The user seems satisfied.").unwrap_err();
        assert!(matches!(err, WorkflowError::Classification(_)));
    }

    #[test]
    fn test_parse_rejects_missing_key() {
        let err = parse_judgment(r#"{"is_satisfied": true}"#).unwrap_err();
        assert!(matches!(err, WorkflowError::Classification(_)));
    }

    #[test]
    fn test_parse_rejects_extra_keys() {
        let err = parse_judgment(
            r#"{"is_satisfied": true, "detail": "", "confidence": 0.9}"#,
        )
        .unwrap_err();
        assert!(matches!(err, WorkflowError::Classification(_)));
    }

    #[test]
    fn test_parse_rejects_wrong_type() {
        let err = parse_judgment(r#"{"is_satisfied": "yes", "detail": ""}"#).unwrap_err();
        assert!(matches!(err, WorkflowError::Classification(_)));
    }
}
