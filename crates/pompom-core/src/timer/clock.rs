//! Clock source for the timer loop.
//!
//! All timer arithmetic runs on [`tokio::time::Instant`]. When the tokio
//! runtime's clock is paused (`tokio::time::pause`, or
//! `#[tokio::test(start_paused = true)]`) both `now()` and the ticker follow
//! the virtual clock, which is what the engine tests drive.

use std::time::Duration;

use tokio::time::{Instant, Interval, MissedTickBehavior};

/// Wall-clock "now" plus a periodic tick signal.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;

    /// A ticker firing every `period`. The first tick completes immediately.
    fn ticker(&self, period: Duration) -> Interval {
        let mut interval = tokio::time::interval(period);
        // A suspended loop must not replay a burst of missed ticks.
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        interval
    }
}

/// Default clock backed by the tokio time driver.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioClock;

impl Clock for TokioClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}
