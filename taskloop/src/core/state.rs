//! Task lifecycle states and the legal transitions between them.
//!
//! A task file lives in exactly one folder at a time. Folders are modelled as
//! [`TaskState`]; only the moves listed in [`Transition`] exist, so a move such
//! as `Done -> Pending` cannot be expressed.

use std::fmt;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    /// Dropped into the inbox, not yet picked up.
    Incoming,
    /// Queued for processing; may cycle here on failure.
    Pending,
    /// Completed with a processed document.
    Done,
    /// Retry budget exhausted; a failure record is stored with the done tasks.
    FailedTerminal,
}

impl TaskState {
    /// Terminal states are absorbing.
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskState::Done | TaskState::FailedTerminal)
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskState::Incoming => write!(f, "INCOMING"),
            TaskState::Pending => write!(f, "PENDING"),
            TaskState::Done => write!(f, "DONE"),
            TaskState::FailedTerminal => write!(f, "FAILED_TERMINAL"),
        }
    }
}

/// Every legal state change of a task file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Transition {
    /// `Incoming -> Pending`: drained from the inbox.
    Drain,
    /// `Pending -> Done`: processed (or skipped because empty).
    Complete,
    /// `Pending -> Pending`: processing failed, retry budget remains.
    Retry,
    /// `Pending -> FailedTerminal`: retry budget exhausted.
    Escalate,
}

impl Transition {
    pub fn from(self) -> TaskState {
        match self {
            Transition::Drain => TaskState::Incoming,
            Transition::Complete | Transition::Retry | Transition::Escalate => TaskState::Pending,
        }
    }

    pub fn to(self) -> TaskState {
        match self {
            Transition::Drain | Transition::Retry => TaskState::Pending,
            Transition::Complete => TaskState::Done,
            Transition::Escalate => TaskState::FailedTerminal,
        }
    }
}
