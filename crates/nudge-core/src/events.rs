use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::engagement::{InteractionKind, Trigger};
use crate::prompt::PromptOutcome;

/// Why a scheduler refused to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuppressReason {
    Triggered,
    Dismissed,
    Accepted,
    Disabled,
}

/// Every state change of a scheduler produces an Event.
/// The presentation layer consumes them; logging mirrors them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    SchedulerStarted {
        prompt: String,
        session_id: Uuid,
        at: DateTime<Utc>,
    },
    /// A persisted flag (or config) kept the scheduler from arming timers.
    SchedulerSuppressed {
        prompt: String,
        reason: SuppressReason,
        at: DateTime<Utc>,
    },
    InteractionAccepted {
        prompt: String,
        kind: InteractionKind,
        delta: f64,
        score: f64,
        at: DateTime<Utc>,
    },
    DecayApplied {
        prompt: String,
        score_before: f64,
        score_after: f64,
        at: DateTime<Utc>,
    },
    /// Fired at most once per scheduler instance.
    Triggered {
        prompt: String,
        trigger: Trigger,
        at: DateTime<Utc>,
    },
    PromptResolved {
        prompt: String,
        outcome: PromptOutcome,
        at: DateTime<Utc>,
    },
    SchedulerStopped {
        prompt: String,
        session_id: Uuid,
        fired: bool,
        at: DateTime<Utc>,
    },
}

impl Event {
    pub fn prompt(&self) -> &str {
        match self {
            Event::SchedulerStarted { prompt, .. }
            | Event::SchedulerSuppressed { prompt, .. }
            | Event::InteractionAccepted { prompt, .. }
            | Event::DecayApplied { prompt, .. }
            | Event::Triggered { prompt, .. }
            | Event::PromptResolved { prompt, .. }
            | Event::SchedulerStopped { prompt, .. } => prompt,
        }
    }

    pub fn trigger(&self) -> Option<&Trigger> {
        match self {
            Event::Triggered { trigger, .. } => Some(trigger),
            _ => None,
        }
    }
}

/// Epoch milliseconds to a UTC timestamp.
pub fn timestamp(ms: u64) -> DateTime<Utc> {
    i64::try_from(ms)
        .ok()
        .and_then(DateTime::from_timestamp_millis)
        .unwrap_or_default()
}

/// Current wall-clock time in epoch milliseconds.
pub fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
