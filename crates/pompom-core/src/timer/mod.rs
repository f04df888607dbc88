mod clock;
mod engine;
mod phase;
mod runner;
mod sequencer;
mod signals;
mod view;

pub use clock::{Clock, TokioClock};
pub use engine::{minutes_to_secs, parse_minutes, TimerEngine, TimerSettings};
pub use phase::{Phase, PhaseState, Status};
pub use sequencer::{Sequenced, Transition};
pub use signals::Signal;
pub use view::{format_mmss, TimerView};
