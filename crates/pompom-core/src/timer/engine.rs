//! Timer engine: the command API over a single work/break session.
//!
//! Commands (`start`, `pause`, `reset`) are plain synchronous methods and may
//! be called from any thread. The countdown itself runs in a driver task on
//! the tokio runtime captured at construction.
//!
//! ## State Transitions
//!
//! ```text
//! Ready -> Working -> OnBreak -> Working -> ...   (automatic on expiry)
//! Working | OnBreak <-> Paused                    (pause toggles)
//! any -> Ready                                    (reset)
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let engine = TimerEngine::new(TimerSettings::default(), Arc::new(LogNotifier))?;
//! let mut view = engine.subscribe_view();
//! engine.start(25)?;
//! while view.changed().await.is_ok() {
//!     println!("{}", view.borrow().time_text);
//! }
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

use super::clock::{Clock, TokioClock};
use super::phase::{ceil_secs, Phase, PhaseState, Status};
use super::runner::{self, LoopTracker};
use super::signals::{control_channels, ControlReceivers, ControlSenders, Signal};
use super::view::TimerView;
use crate::error::{CoreError, Result, ValidationError};
use crate::events::Event;
use crate::notify::{LogNotifier, Notification, Notifier};

const EVENT_CAPACITY: usize = 64;
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Engine parameters, usually built from [`Config`](crate::Config).
#[derive(Debug, Clone, PartialEq)]
pub struct TimerSettings {
    /// Work length used before the first start and after a reset.
    pub work_secs: u64,
    pub break_secs: u64,
    pub poll_interval: Duration,
    /// How long `00:00` stays up before the next phase begins.
    pub expiry_hold: Duration,
    /// Chime volume, 0 = muted.
    pub volume: u8,
    pub notifications_enabled: bool,
}

impl Default for TimerSettings {
    fn default() -> Self {
        Self {
            work_secs: 25 * 60,
            break_secs: 5 * 60,
            poll_interval: Duration::from_millis(50),
            expiry_hold: Duration::from_secs(1),
            volume: 50,
            notifications_enabled: true,
        }
    }
}

/// State shared between the command side and the driver task.
pub(crate) struct Shared {
    state: Mutex<PhaseState>,
    senders: ControlSenders,
    pub(crate) receivers: tokio::sync::Mutex<ControlReceivers>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) notifier: Arc<dyn Notifier>,
    pub(crate) settings: TimerSettings,
    view: watch::Sender<TimerView>,
    events: broadcast::Sender<Event>,
    pub(crate) loops: LoopTracker,
}

impl Shared {
    pub(crate) fn state(&self) -> MutexGuard<'_, PhaseState> {
        // PhaseState has no invariant a panicking holder could half-break.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn emit(&self, event: Event) {
        tracing::trace!(kind = event.kind(), "event");
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    pub(crate) fn publish(&self, view: TimerView) {
        self.view.send_replace(view);
    }

    pub(crate) fn announce(&self, notification: Notification) {
        if self.settings.notifications_enabled {
            self.notifier.notify(&notification);
        }
    }
}

/// Validate a user-supplied work length in minutes.
pub fn minutes_to_secs(minutes: i64) -> Result<u64, ValidationError> {
    u64::try_from(minutes)
        .ok()
        .filter(|m| *m > 0)
        .and_then(|m| m.checked_mul(60))
        .ok_or_else(|| ValidationError::InvalidDuration {
            input: minutes.to_string(),
        })
}

/// Parse minutes as typed by a user.
pub fn parse_minutes(input: &str) -> Result<i64, ValidationError> {
    input
        .trim()
        .parse::<i64>()
        .map_err(|_| ValidationError::InvalidDuration {
            input: input.trim().to_string(),
        })
}

/// Core timer engine.
pub struct TimerEngine {
    shared: Arc<Shared>,
    runtime: Handle,
    drivers: Mutex<Vec<JoinHandle<()>>>,
}

impl TimerEngine {
    /// Create an engine on the current tokio runtime with the default clock.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NoRuntime`] when called outside a tokio runtime.
    pub fn new(settings: TimerSettings, notifier: Arc<dyn Notifier>) -> Result<Self> {
        let runtime = Handle::try_current().map_err(|_| CoreError::NoRuntime)?;
        Ok(Self::with_parts(
            settings,
            Arc::new(TokioClock),
            notifier,
            runtime,
        ))
    }

    /// Engine with default settings that only logs notifications.
    pub fn with_defaults() -> Result<Self> {
        Self::new(TimerSettings::default(), Arc::new(LogNotifier))
    }

    pub fn with_parts(
        mut settings: TimerSettings,
        clock: Arc<dyn Clock>,
        notifier: Arc<dyn Notifier>,
        runtime: Handle,
    ) -> Self {
        settings.poll_interval = settings.poll_interval.max(MIN_POLL_INTERVAL);
        let state = PhaseState::new(settings.work_secs, settings.break_secs);
        let (view, _) = watch::channel(TimerView::capture(&state, clock.now()));
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let (senders, receivers) = control_channels();
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(state),
                senders,
                receivers: tokio::sync::Mutex::new(receivers),
                clock,
                notifier,
                settings,
                view,
                events,
                loops: LoopTracker::default(),
            }),
            runtime,
            drivers: Mutex::new(Vec::new()),
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn settings(&self) -> &TimerSettings {
        &self.shared.settings
    }

    /// Fresh snapshot computed from the clock right now.
    pub fn view(&self) -> TimerView {
        let now = self.shared.clock.now();
        TimerView::capture(&self.shared.state(), now)
    }

    pub fn status(&self) -> Status {
        self.shared.state().status()
    }

    pub fn phase(&self) -> Phase {
        self.shared.state().phase()
    }

    /// Remaining seconds of the current phase, rounded up.
    pub fn remaining_secs(&self) -> u64 {
        let now = self.shared.clock.now();
        let state = self.shared.state();
        if state.is_running() {
            ceil_secs(state.remaining(now))
        } else {
            state.remaining_secs()
        }
    }

    /// Length of the current phase.
    pub fn duration_secs(&self) -> u64 {
        self.shared.state().duration_secs()
    }

    /// Work length the next automatic restart will use.
    pub fn work_secs(&self) -> u64 {
        self.shared.state().work_secs()
    }

    pub fn is_running(&self) -> bool {
        self.shared.state().is_running()
    }

    pub fn is_paused(&self) -> bool {
        self.shared.state().is_paused()
    }

    /// Timer loops currently alive (0 or 1).
    pub fn active_loops(&self) -> usize {
        self.shared.loops.alive()
    }

    /// Most timer loops ever alive at once.
    pub fn peak_loops(&self) -> usize {
        self.shared.loops.peak()
    }

    pub fn subscribe_view(&self) -> watch::Receiver<TimerView> {
        self.shared.view.subscribe()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<Event> {
        self.shared.events.subscribe()
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Start a work phase of `minutes`. A no-op while already running.
    ///
    /// # Errors
    ///
    /// Returns an invalid-duration error for zero, negative or overflowing
    /// input; the state is left untouched.
    pub fn start(&self, minutes: i64) -> Result<()> {
        let work_secs = minutes_to_secs(minutes)?;
        let now = self.shared.clock.now();

        let epoch = {
            let mut state = self.shared.state();
            if state.is_running() {
                tracing::debug!("start ignored, timer already running");
                return Ok(());
            }
            state.begin_work(now, work_secs);
            let epoch = state.next_epoch();
            self.shared.emit(Event::phase_started(Phase::Work, work_secs));
            self.shared.publish(TimerView::capture(&state, now));
            epoch
        };
        tracing::info!(work_secs, epoch, "work phase started");

        let driver = self.runtime.spawn(runner::drive(self.shared.clone(), epoch));
        let mut drivers = self.drivers();
        drivers.retain(|handle| !handle.is_finished());
        drivers.push(driver);
        Ok(())
    }

    /// Start from user-entered text.
    ///
    /// # Errors
    ///
    /// Returns an invalid-duration error when the text is not a positive
    /// whole number.
    pub fn start_from_input(&self, input: &str) -> Result<()> {
        self.start(parse_minutes(input)?)
    }

    /// Toggle pause. A no-op when the timer is not running.
    pub fn pause(&self) {
        let now = self.shared.clock.now();
        let mut state = self.shared.state();
        if !state.is_running() {
            return;
        }

        if let Some(paused_for) = state.resume(now) {
            self.shared.senders.signal(Signal::Resume);
            let remaining_secs = ceil_secs(state.remaining(now));
            self.shared.emit(Event::TimerResumed {
                remaining_secs,
                at: chrono::Utc::now(),
            });
            self.shared.publish(TimerView::capture(&state, now));
            tracing::info!(remaining_secs, paused_ms = paused_for.as_millis() as u64, "resumed");
        } else if state.pause(now) {
            self.shared.senders.signal(Signal::Pause);
            let remaining_secs = ceil_secs(state.remaining(now));
            self.shared.emit(Event::TimerPaused {
                remaining_secs,
                at: chrono::Utc::now(),
            });
            self.shared.publish(TimerView::capture(&state, now));
            tracing::info!(remaining_secs, "paused");
        }
    }

    /// Stop any running phase and return to Ready. Safe to call at any time,
    /// any number of times.
    pub fn reset(&self) {
        let was_running = self.halt();
        self.shared.notifier.dismiss();
        if was_running {
            tracing::info!("timer reset");
        }
    }

    /// Wait for every driver task to finish.
    pub async fn join(&self) {
        let drivers = std::mem::take(&mut *self.drivers());
        for driver in drivers {
            if let Err(err) = driver.await {
                tracing::warn!(error = %err, "timer driver ended abnormally");
            }
        }
    }

    /// Reset and wait for the driver to exit.
    pub async fn shutdown(&self) {
        self.reset();
        self.join().await;
    }

    // ── Internal ─────────────────────────────────────────────────────

    /// Signal stop and restore Ready. Returns whether a phase was running.
    fn halt(&self) -> bool {
        let now = self.shared.clock.now();
        let mut state = self.shared.state();
        let was_running = state.is_running();
        if was_running {
            self.shared.senders.signal(Signal::Stop);
        }
        state.reset();
        self.shared.publish(TimerView::capture(&state, now));
        if was_running {
            self.shared.emit(Event::TimerReset {
                at: chrono::Utc::now(),
            });
        }
        was_running
    }

    fn drivers(&self) -> MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.drivers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for TimerEngine {
    fn drop(&mut self) {
        // The driver holds its own Arc; without this it would outlive us.
        self.halt();
    }
}

impl std::fmt::Debug for TimerEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerEngine")
            .field("state", &*self.shared.state())
            .field("settings", &self.shared.settings)
            .finish_non_exhaustive()
    }
}
