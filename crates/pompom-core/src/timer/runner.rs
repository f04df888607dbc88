//! Timer loop and the driver task that sequences phases.
//!
//! A driver owns the control receivers for its whole lifetime, so a second
//! driver (after a quick reset + start) cannot run its loop until the first
//! has returned. Every wake-up, whether a tick or a signal, re-reads the
//! phase state under its mutex; signals never carry state themselves.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use super::engine::Shared;
use super::sequencer::{self, Transition};
use super::signals::ControlReceivers;
use super::view::TimerView;
use crate::events::Event;
use crate::notify::Notification;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LoopExit {
    /// Remaining time reached zero.
    Expired,
    /// Reset, or the state was claimed by a newer start.
    Stopped,
}

enum Poll {
    Running,
    Paused,
    Expired,
    Stopped,
}

/// Counts live timer loops.
#[derive(Debug, Default)]
pub(crate) struct LoopTracker {
    alive: AtomicUsize,
    peak: AtomicUsize,
}

pub(crate) struct LoopGuard<'a>(&'a LoopTracker);

impl LoopTracker {
    pub(crate) fn enter(&self) -> LoopGuard<'_> {
        let alive = self.alive.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(alive, Ordering::SeqCst);
        LoopGuard(self)
    }

    pub(crate) fn alive(&self) -> usize {
        self.alive.load(Ordering::SeqCst)
    }

    pub(crate) fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

impl Drop for LoopGuard<'_> {
    fn drop(&mut self) {
        self.0.alive.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Drive the session started under `epoch` until it is reset or superseded.
pub(crate) async fn drive(shared: Arc<Shared>, epoch: u64) {
    let mut rx = shared.receivers.lock().await;
    let _alive = shared.loops.enter();
    rx.drain();
    tracing::debug!(epoch, "timer loop started");

    loop {
        if run_phase(&shared, &mut rx, epoch).await == LoopExit::Stopped {
            tracing::debug!(epoch, "timer loop stopped");
            return;
        }

        let completed = {
            let state = shared.state();
            if !state.is_owned_by(epoch) {
                return;
            }
            let phase = state.phase();
            shared.emit(Event::phase_completed(phase));
            phase
        };
        tracing::info!(?completed, "phase expired");

        if !hold_at_zero(&shared, &mut rx).await {
            tracing::debug!(epoch, "stopped while holding at zero");
            return;
        }

        // Nothing queued before the next phase may leak into it.
        rx.drain();

        let step = {
            let now = shared.clock.now();
            let mut state = shared.state();
            if !state.is_owned_by(epoch) {
                return;
            }
            let step = sequencer::advance(&mut state, now);
            shared.emit(Event::phase_started(
                step.transition.target(),
                step.duration_secs,
            ));
            shared.publish(TimerView::capture(&state, now));
            step
        };
        tracing::info!(
            phase = ?step.transition.target(),
            duration_secs = step.duration_secs,
            "next phase started"
        );

        match step.transition {
            Transition::BeginBreak => {
                shared.announce(Notification::break_started(shared.settings.volume));
            }
            Transition::RestartWork => {
                shared.notifier.dismiss();
                shared.announce(Notification::work_started());
            }
        }
    }
}

/// Count one phase down. Returns once it expires or the loop must stop.
async fn run_phase(shared: &Shared, rx: &mut ControlReceivers, epoch: u64) -> LoopExit {
    let mut ticker = shared.clock.ticker(shared.settings.poll_interval);
    let mut last: Option<TimerView> = None;

    loop {
        match poll_state(shared, epoch, &mut last) {
            Poll::Stopped => return LoopExit::Stopped,
            Poll::Expired => return LoopExit::Expired,
            Poll::Paused => {
                if !wait_resumed(shared, rx, epoch).await {
                    return LoopExit::Stopped;
                }
                ticker.reset();
                continue;
            }
            Poll::Running => {}
        }

        tokio::select! {
            biased;
            Some(()) = rx.stop.recv() => {}
            Some(()) = rx.pause.recv() => {}
            _ = ticker.tick() => {}
        }
    }
}

fn poll_state(shared: &Shared, epoch: u64, last: &mut Option<TimerView>) -> Poll {
    let now = shared.clock.now();
    let mut state = shared.state();
    if !state.is_owned_by(epoch) {
        return Poll::Stopped;
    }
    if state.is_paused() {
        return Poll::Paused;
    }

    let remaining = state.remaining(now);
    if remaining.is_zero() {
        state.set_remaining_secs(0);
        shared.publish(TimerView::expired(&state));
        return Poll::Expired;
    }

    let view = TimerView::capture(&state, now);
    state.set_remaining_secs(view.remaining_secs);
    if last.as_ref().map_or(true, |prev| view.differs_from(prev)) {
        shared.publish(view.clone());
        *last = Some(view);
    }
    Poll::Running
}

/// Block until the state is no longer paused. Ticks are not consumed.
/// Returns false when the loop must stop instead.
async fn wait_resumed(shared: &Shared, rx: &mut ControlReceivers, epoch: u64) -> bool {
    loop {
        {
            let state = shared.state();
            if !state.is_owned_by(epoch) {
                return false;
            }
            if !state.is_paused() {
                return true;
            }
        }
        tokio::select! {
            biased;
            Some(()) = rx.stop.recv() => {}
            Some(()) = rx.resume.recv() => {}
            else => return false,
        }
    }
}

/// Keep `00:00` on screen briefly before the next phase. Returns false if
/// a stop arrived meanwhile.
async fn hold_at_zero(shared: &Shared, rx: &mut ControlReceivers) -> bool {
    let hold = shared.settings.expiry_hold;
    if hold.is_zero() {
        return true;
    }
    tokio::select! {
        biased;
        Some(()) = rx.stop.recv() => false,
        _ = tokio::time::sleep(hold) => true,
    }
}
