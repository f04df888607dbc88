//! Phase sequencer.
//!
//! Decides what follows a naturally expired phase. The driver applies the
//! returned transition inside its own outer loop, so a long run of cycles
//! never nests calls or spawns new tasks.
//!
//! ```text
//! Ready -> Working -> (expiry) -> OnBreak -> (expiry) -> Working -> ...
//! Working | OnBreak <-> Paused
//! any running state -> Ready   (reset)
//! ```

use tokio::time::Instant;

use super::phase::{Phase, PhaseState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Work ran out: start the fixed-length break.
    BeginBreak,
    /// Break ran out: pass through Ready and start work again with the
    /// last validated work length.
    RestartWork,
}

impl Transition {
    pub fn after(completed: Phase) -> Self {
        match completed {
            Phase::Work => Transition::BeginBreak,
            Phase::Break => Transition::RestartWork,
        }
    }

    /// The phase this transition starts.
    pub fn target(self) -> Phase {
        match self {
            Transition::BeginBreak => Phase::Break,
            Transition::RestartWork => Phase::Work,
        }
    }
}

/// Outcome of one sequencing step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sequenced {
    pub completed: Phase,
    pub transition: Transition,
    pub duration_secs: u64,
}

/// Advance `state` past its expired phase.
pub fn advance(state: &mut PhaseState, now: Instant) -> Sequenced {
    let completed = state.phase();
    let transition = Transition::after(completed);
    match transition {
        Transition::BeginBreak => state.begin_break(now),
        Transition::RestartWork => {
            let work_secs = state.work_secs();
            state.reset();
            state.begin_work(now, work_secs);
        }
    }
    Sequenced {
        completed,
        transition,
        duration_secs: state.duration_secs(),
    }
}
