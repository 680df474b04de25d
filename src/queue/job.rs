//! Sanitization job state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Lifecycle state of a queued job.
///
/// Transitions are monotonic: Queued → Processing → Succeeded | Failed.
/// A job never re-enters Queued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobState {
    /// Waiting at its FIFO position
    Queued,
    /// Currently being sanitized
    Processing,
    /// Terminal: a verifiable output artifact exists
    Succeeded,
    /// Terminal: sanitization failed
    Failed,
}

impl JobState {
    /// Whether the state is terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Succeeded | JobState::Failed)
    }

    fn rank(&self) -> u8 {
        match self {
            JobState::Queued => 0,
            JobState::Processing => 1,
            JobState::Succeeded | JobState::Failed => 2,
        }
    }
}

/// A single unit of sanitization work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SanitizationJob {
    /// Path of the document to sanitize
    pub path: PathBuf,
    /// When the job entered the queue
    pub enqueued_at: DateTime<Utc>,
    /// Current lifecycle state
    pub state: JobState,
    /// Terminal result message, set with the terminal state
    pub message: Option<String>,
}

impl SanitizationJob {
    /// Create a freshly queued job.
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            enqueued_at: Utc::now(),
            state: JobState::Queued,
            message: None,
        }
    }

    /// Advance the state machine. Backward transitions are rejected.
    pub fn advance(&mut self, next: JobState) {
        if next.rank() <= self.state.rank() {
            debug_assert!(false, "non-monotonic job transition {:?} -> {:?}", self.state, next);
            log::error!(
                "ignoring non-monotonic job transition {:?} -> {:?} for {}",
                self.state,
                next,
                self.path.display()
            );
            return;
        }
        self.state = next;
    }

    /// Mark the job terminal with its result message.
    pub fn finish(&mut self, state: JobState, message: impl Into<String>) {
        debug_assert!(state.is_terminal());
        self.advance(state);
        self.message = Some(message.into());
    }
}
