use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use super::phase::{ceil_secs, Phase, PhaseState, Status};

/// Minimum progress change worth republishing between whole-second updates.
pub const PROGRESS_EPSILON: f64 = 0.001;

/// Snapshot of everything a presentation layer renders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimerView {
    pub remaining_secs: u64,
    /// `MM:SS`
    pub time_text: String,
    pub status: Status,
    pub phase: Phase,
    /// Remaining fraction of the current phase, 1.0 at start.
    pub progress: f64,
}

impl TimerView {
    pub fn capture(state: &PhaseState, now: Instant) -> Self {
        let remaining_secs = if state.is_running() {
            ceil_secs(state.remaining(now))
        } else {
            state.remaining_secs()
        };
        Self {
            remaining_secs,
            time_text: format_mmss(remaining_secs),
            status: state.status(),
            phase: state.phase(),
            progress: state.progress(now),
        }
    }

    /// The zero view published at expiry.
    pub fn expired(state: &PhaseState) -> Self {
        Self {
            remaining_secs: 0,
            time_text: format_mmss(0),
            status: state.status(),
            phase: state.phase(),
            progress: 0.0,
        }
    }

    /// Whether publishing `self` over `previous` would show anything new.
    pub fn differs_from(&self, previous: &TimerView) -> bool {
        self.remaining_secs != previous.remaining_secs
            || self.status != previous.status
            || self.phase != previous.phase
            || (self.progress - previous.progress).abs() >= PROGRESS_EPSILON
    }
}

/// Format seconds as `MM:SS`. Minutes are not wrapped into hours.
pub fn format_mmss(total_secs: u64) -> String {
    format!("{:02}:{:02}", total_secs / 60, total_secs % 60)
}
