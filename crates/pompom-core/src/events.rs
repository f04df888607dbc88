use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::timer::Phase;

/// Every state change of the timer produces an Event.
/// The presentation layer and notification collaborators subscribe to them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    PhaseStarted {
        phase: Phase,
        duration_secs: u64,
        at: DateTime<Utc>,
    },
    /// A phase ran down to zero without being reset.
    PhaseCompleted {
        phase: Phase,
        at: DateTime<Utc>,
    },
    TimerPaused {
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    TimerResumed {
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    TimerReset {
        at: DateTime<Utc>,
    },
}

impl Event {
    pub fn phase_started(phase: Phase, duration_secs: u64) -> Self {
        Event::PhaseStarted {
            phase,
            duration_secs,
            at: Utc::now(),
        }
    }

    pub fn phase_completed(phase: Phase) -> Self {
        Event::PhaseCompleted {
            phase,
            at: Utc::now(),
        }
    }

    /// Short name used in log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            Event::PhaseStarted { .. } => "phase_started",
            Event::PhaseCompleted { .. } => "phase_completed",
            Event::TimerPaused { .. } => "timer_paused",
            Event::TimerResumed { .. } => "timer_resumed",
            Event::TimerReset { .. } => "timer_reset",
        }
    }
}
