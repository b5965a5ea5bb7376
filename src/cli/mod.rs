// Interactive terminal front end
//
// The terminal is the "external collaborator" of the workflow: it supplies
// the initial description, renders streamed stage output, and feeds review
// feedback back into the suspended session. Input validation (non-empty
// after trimming) happens here, not in the core.

use anyhow::Result;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::io::{self, Write};
use std::sync::Mutex;

use crate::agent::{OutcomeStatus, SessionDriver};

const REVIEW_PROMPT: &str =
    "Review the architecture above. Provide feedback, or say you are satisfied:";

pub async fn run_interactive(
    mut driver: SessionDriver,
    initial_input: Option<String>,
) -> Result<()> {
    let mut editor = DefaultEditor::new()?;

    let description = match initial_input
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
    {
        Some(text) => text,
        None => match read_nonempty(&mut editor, "Describe your system> ")? {
            Some(text) => text,
            None => return Ok(()),
        },
    };

    let mut outcome = {
        let printer = StreamPrinter::new();
        driver
            .start(
                &description,
                |text| printer.print(text),
                |status| StreamPrinter::status(status),
            )
            .await
    };

    loop {
        match outcome.status {
            OutcomeStatus::Completed => {
                let diagram = outcome
                    .state
                    .as_ref()
                    .map(|s| s.diagram_code.as_str())
                    .unwrap_or_default();
                println!("\n─── Diagram code ───\n{diagram}");
                return Ok(());
            }
            OutcomeStatus::FeedbackRequired => {
                println!("\n{REVIEW_PROMPT}");
            }
            OutcomeStatus::Error => {
                eprintln!("\nError: {}", outcome.message);
                if !driver.awaiting_feedback() {
                    anyhow::bail!("session failed: {}", outcome.message);
                }
                // Still suspended at review (e.g. the feedback could not be
                // classified); ask again.
                eprintln!("The session is still awaiting review. Try rephrasing your feedback.");
            }
        }

        let Some(feedback) = read_nonempty(&mut editor, "feedback> ")? else {
            return Ok(());
        };

        let printer = StreamPrinter::new();
        outcome = driver
            .resume(
                &feedback,
                |text| printer.print(text),
                |status| StreamPrinter::status(status),
            )
            .await;
    }
}

/// Prompt until the user enters a non-empty line. Returns `None` on ^C/^D.
fn read_nonempty(editor: &mut DefaultEditor, prompt: &str) -> Result<Option<String>> {
    loop {
        match editor.readline(prompt) {
            Ok(line) => {
                let trimmed = line.trim();
                if !trimmed.is_empty() {
                    let _ = editor.add_history_entry(trimmed);
                    return Ok(Some(trimmed.to_string()));
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => return Ok(None),
            Err(e) => return Err(e.into()),
        }
    }
}

/// Renders cumulative per-stage text as an append-only terminal stream.
///
/// The sink contract is "replace displayed text with this value"; a terminal
/// can't redraw cheaply, so this tracks what has already been written and
/// prints only the new suffix. A value that does not extend the previous one
/// means a new stage started.
struct StreamPrinter {
    printed: Mutex<String>,
}

impl StreamPrinter {
    fn new() -> Self {
        Self {
            printed: Mutex::new(String::new()),
        }
    }

    fn print(&self, cumulative: &str) {
        let mut printed = self.printed.lock().unwrap();
        match cumulative.strip_prefix(printed.as_str()) {
            Some(suffix) => print!("{suffix}"),
            None => {
                println!();
                print!("{cumulative}");
            }
        }
        printed.clear();
        printed.push_str(cumulative);
        let _ = io::stdout().flush();
    }

    fn status(status: &str) {
        eprintln!("\n[{status}]");
    }
}
