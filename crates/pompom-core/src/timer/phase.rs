//! Phase state of a work/break session.
//!
//! `PhaseState` never reads a clock: every operation that depends on time
//! takes `now` explicitly. The engine keeps one instance behind a mutex and
//! feeds it instants from its [`Clock`](super::Clock).

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Work,
    Break,
}

impl Phase {
    /// The phase that follows this one in a cycle.
    pub fn next(self) -> Phase {
        match self {
            Phase::Work => Phase::Break,
            Phase::Break => Phase::Work,
        }
    }
}

/// Status shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    Ready,
    Working,
    Paused,
    OnBreak,
}

impl Status {
    pub fn label(&self) -> &'static str {
        match self {
            Status::Ready => "Ready to start !",
            Status::Working => "Work Time - Focus !",
            Status::Paused => "Paused",
            Status::OnBreak => "Break Time - Relax !",
        }
    }
}

#[derive(Debug, Clone)]
pub struct PhaseState {
    phase: Phase,
    /// Last validated work length; reused by every automatic work restart.
    work_secs: u64,
    break_secs: u64,
    /// Length of the current phase.
    duration_secs: u64,
    end_at: Option<Instant>,
    running: bool,
    paused: bool,
    pause_started_at: Option<Instant>,
    remaining_secs: u64,
    /// Bumped by every user start; identifies the driver owning this state.
    epoch: u64,
}

impl PhaseState {
    /// Inert Ready state.
    pub fn new(work_secs: u64, break_secs: u64) -> Self {
        Self {
            phase: Phase::Work,
            work_secs,
            break_secs,
            duration_secs: work_secs,
            end_at: None,
            running: false,
            paused: false,
            pause_started_at: None,
            remaining_secs: work_secs,
            epoch: 0,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn work_secs(&self) -> u64 {
        self.work_secs
    }

    pub fn break_secs(&self) -> u64 {
        self.break_secs
    }

    pub fn duration_secs(&self) -> u64 {
        self.duration_secs
    }

    pub fn end_at(&self) -> Option<Instant> {
        self.end_at
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn remaining_secs(&self) -> u64 {
        self.remaining_secs
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Whether the driver started for `epoch` may still act on this state.
    pub fn is_owned_by(&self, epoch: u64) -> bool {
        self.running && self.epoch == epoch
    }

    pub fn status(&self) -> Status {
        match (self.running, self.paused, self.phase) {
            (false, _, _) => Status::Ready,
            (true, true, _) => Status::Paused,
            (true, false, Phase::Work) => Status::Working,
            (true, false, Phase::Break) => Status::OnBreak,
        }
    }

    /// Time left in the current phase. Frozen at the pause instant while
    /// paused; zero once `end_at` has passed (including clock skew).
    pub fn remaining(&self, now: Instant) -> Duration {
        match (self.running, self.end_at) {
            (true, Some(end_at)) => {
                let reference = if self.paused {
                    self.pause_started_at.unwrap_or(now)
                } else {
                    now
                };
                end_at.saturating_duration_since(reference)
            }
            _ => Duration::from_secs(self.remaining_secs),
        }
    }

    /// Fraction of the current phase still to go, in `[0, 1]`.
    pub fn progress(&self, now: Instant) -> f64 {
        if self.duration_secs == 0 {
            return 0.0;
        }
        let fraction = self.remaining(now).as_secs_f64() / self.duration_secs as f64;
        fraction.clamp(0.0, 1.0)
    }

    // ── Transitions ──────────────────────────────────────────────────

    /// Claim the state for a new driver. Returns the new epoch.
    pub fn next_epoch(&mut self) -> u64 {
        self.epoch = self.epoch.wrapping_add(1);
        self.epoch
    }

    pub fn begin_work(&mut self, now: Instant, work_secs: u64) {
        self.work_secs = work_secs;
        self.begin(now, Phase::Work, work_secs);
    }

    pub fn begin_break(&mut self, now: Instant) {
        self.begin(now, Phase::Break, self.break_secs);
    }

    fn begin(&mut self, now: Instant, phase: Phase, duration_secs: u64) {
        self.phase = phase;
        self.duration_secs = duration_secs;
        self.end_at = Some(now + Duration::from_secs(duration_secs));
        self.running = true;
        self.paused = false;
        self.pause_started_at = None;
        self.remaining_secs = duration_secs;
    }

    /// Enter pause. Returns false when idle or already paused.
    pub fn pause(&mut self, now: Instant) -> bool {
        if !self.running || self.paused {
            return false;
        }
        self.paused = true;
        self.pause_started_at = Some(now);
        true
    }

    /// Leave pause, pushing `end_at` forward by the time spent paused.
    /// Returns the pause length, or `None` when not paused.
    pub fn resume(&mut self, now: Instant) -> Option<Duration> {
        if !self.paused {
            return None;
        }
        self.paused = false;
        let paused_for = self
            .pause_started_at
            .take()
            .map(|started| now.saturating_duration_since(started))
            .unwrap_or_default();
        if let Some(end_at) = self.end_at.as_mut() {
            *end_at += paused_for;
        }
        Some(paused_for)
    }

    /// Record the remaining time observed by the loop.
    pub fn set_remaining_secs(&mut self, secs: u64) {
        self.remaining_secs = secs;
    }

    /// Back to the inert Ready values. Safe to call repeatedly.
    pub fn reset(&mut self) {
        self.phase = Phase::Work;
        self.duration_secs = self.work_secs;
        self.end_at = None;
        self.running = false;
        self.paused = false;
        self.pause_started_at = None;
        self.remaining_secs = self.work_secs;
    }
}

/// Whole seconds, rounded up, so a fresh phase reads its full length.
pub fn ceil_secs(duration: Duration) -> u64 {
    duration.as_secs() + u64::from(duration.subsec_nanos() > 0)
}
