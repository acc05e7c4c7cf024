//! Line-oriented terminal front end
//!
//! Stands in for the on-screen forms when the engine runs from the CLI.
//! Each typed line becomes one session event:
//! - empty line: the "continue" key on a transition screen
//! - `tab`: submit the checkpoint form
//! - `1`-`9`: pick a scale value
//! - `y` / `n`: answer the incomplete-submission prompt
//! - `p <0-100>`: move the pointer to a scale position
//! - `quit`: tear the session down
//! - anything else: the checkpoint note

use std::io::BufRead;
use std::thread;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::record::RatingTarget;
use crate::sampling::PointerHandle;
use crate::session::{Key, SessionEvent, SessionNotice};

/// One parsed console line
#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleInput {
    Event(SessionEvent),
    Pointer(f64),
}

pub fn parse_line(line: &str) -> ConsoleInput {
    let trimmed = line.trim();

    let event = match trimmed.to_ascii_lowercase().as_str() {
        "" => SessionEvent::KeyPressed(Key::Other),
        "tab" => SessionEvent::KeyPressed(Key::Tab),
        "y" | "yes" => SessionEvent::ConfirmIncomplete,
        "n" | "no" => SessionEvent::DismissIncomplete,
        "quit" | "exit" => SessionEvent::Teardown,
        lower => {
            if let Some(value) = lower.strip_prefix("p ").and_then(|v| v.trim().parse::<f64>().ok()) {
                return ConsoleInput::Pointer(value);
            }
            match trimmed.parse::<u8>() {
                Ok(rating) => SessionEvent::RatingPicked(rating),
                Err(_) => SessionEvent::NoteChanged(line.trim_end_matches(['\r', '\n']).to_string()),
            }
        }
    };

    ConsoleInput::Event(event)
}

fn whose(target: RatingTarget, own: &'static str, partner: &'static str) -> &'static str {
    match target {
        RatingTarget::SelfRating => own,
        RatingTarget::Partner => partner,
    }
}

/// Text shown to the participant for a session notice
pub fn render_notice(notice: &SessionNotice) -> String {
    match notice {
        SessionNotice::TransitionShown { target } => format!(
            "The next part is concerned with {} during the conversation.\nPress Enter to continue.",
            whose(*target, "YOUR FEELINGS", "YOUR PARTNER'S FEELINGS")
        ),
        SessionNotice::SamplingStarted { target } => format!(
            "How positive or negative did {} feel during this moment in the conversation? (p <0-100> to move)",
            whose(*target, "YOU", "YOUR PARTNER")
        ),
        SessionNotice::CheckpointOpened { target, .. } => format!(
            "Write about how {} feeling during the part of the conversation you just watched.\n\
             Then rate 1 (not at all) to 9 (very): to what extent do you feel that {} elicited these feelings in {}?\n\
             Type `tab` to continue.",
            whose(*target, "YOU were", "YOUR PARTNER was"),
            whose(*target, "YOUR PARTNER", "YOU"),
            whose(*target, "YOU", "YOUR PARTNER"),
        ),
        SessionNotice::IncompleteSubmission { .. } => {
            "You haven't answered all the questions. Are you sure you want to go on? (y/n)".to_string()
        }
        SessionNotice::InvalidInput(message) => format!("Invalid input: {}", message),
        SessionNotice::Completed(reason) => format!("Video task finished ({:?}).", reason),
    }
}

/// Read stdin on a dedicated thread and forward parsed lines
///
/// Runs until stdin closes or the session stops accepting events. The
/// thread is detached; it does not keep the process alive.
pub fn spawn_stdin_reader(events: mpsc::Sender<SessionEvent>, pointer: PointerHandle) {
    thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    warn!("Failed to read stdin: {}", e);
                    break;
                }
            };

            match parse_line(&line) {
                ConsoleInput::Pointer(value) => pointer.set_value(value),
                ConsoleInput::Event(event) => {
                    if events.blocking_send(event).is_err() {
                        debug!("Session closed; stopping console input");
                        break;
                    }
                }
            }
        }
    });
}
