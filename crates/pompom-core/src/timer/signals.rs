//! Control channel set: stop, pause and resume signals for the timer loop.
//!
//! Each channel holds a single pending signal. Senders never block: when
//! the slot is already full, or the loop is not listening, the signal is
//! dropped. Signals only wake the loop; it always re-reads the phase state
//! afterwards, so a dropped or stale signal cannot put it in the wrong mode.

use tokio::sync::mpsc::{self, error::TrySendError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Stop,
    Pause,
    Resume,
}

/// Sending half, held by the command side.
#[derive(Debug, Clone)]
pub struct ControlSenders {
    stop: mpsc::Sender<()>,
    pause: mpsc::Sender<()>,
    resume: mpsc::Sender<()>,
}

/// Receiving half, held by whichever driver currently runs the loop.
#[derive(Debug)]
pub struct ControlReceivers {
    pub(crate) stop: mpsc::Receiver<()>,
    pub(crate) pause: mpsc::Receiver<()>,
    pub(crate) resume: mpsc::Receiver<()>,
}

pub fn control_channels() -> (ControlSenders, ControlReceivers) {
    let (stop_tx, stop_rx) = mpsc::channel(1);
    let (pause_tx, pause_rx) = mpsc::channel(1);
    let (resume_tx, resume_rx) = mpsc::channel(1);
    (
        ControlSenders {
            stop: stop_tx,
            pause: pause_tx,
            resume: resume_tx,
        },
        ControlReceivers {
            stop: stop_rx,
            pause: pause_rx,
            resume: resume_rx,
        },
    )
}

impl ControlSenders {
    /// Non-blocking send. Returns whether the signal was queued.
    pub fn signal(&self, signal: Signal) -> bool {
        let tx = match signal {
            Signal::Stop => &self.stop,
            Signal::Pause => &self.pause,
            Signal::Resume => &self.resume,
        };
        match tx.try_send(()) {
            Ok(()) => true,
            Err(TrySendError::Full(())) => {
                tracing::debug!(?signal, "signal slot full, dropped");
                false
            }
            Err(TrySendError::Closed(())) => {
                tracing::debug!(?signal, "no loop listening, dropped");
                false
            }
        }
    }
}

impl ControlReceivers {
    /// Discard any signals left over from an earlier loop. Returns how many.
    pub fn drain(&mut self) -> usize {
        let mut drained = 0;
        while self.stop.try_recv().is_ok() {
            drained += 1;
        }
        while self.pause.try_recv().is_ok() {
            drained += 1;
        }
        while self.resume.try_recv().is_ok() {
            drained += 1;
        }
        if drained > 0 {
            tracing::debug!(drained, "discarded stale control signals");
        }
        drained
    }
}
