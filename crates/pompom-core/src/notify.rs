//! Phase-change notifications.
//!
//! Sound playback and desktop notifications live outside the core. The
//! engine describes what should be announced and hands it to a [`Notifier`].

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    BreakStarted,
    WorkStarted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub title: String,
    pub body: String,
    /// Volume (1..=100) for the chime, `None` when no sound should play.
    pub sound_volume: Option<u8>,
    /// Ask for a notice that stays up until dismissed. Used for the break
    /// announcement when muted, since nothing audible marks it.
    pub sticky: bool,
}

impl Notification {
    pub fn break_started(volume: u8) -> Self {
        Self {
            kind: NotificationKind::BreakStarted,
            title: "Break Time".into(),
            body: "It's break time! Relax.".into(),
            sound_volume: (volume > 0).then_some(volume.min(100)),
            sticky: volume == 0,
        }
    }

    pub fn work_started() -> Self {
        Self {
            kind: NotificationKind::WorkStarted,
            title: "Work Time".into(),
            body: "Break is over. Focus time!".into(),
            sound_volume: None,
            sticky: false,
        }
    }
}

/// Receiver of phase-change announcements.
///
/// Called from the timer's driver task; implementations must not block for
/// long.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: &Notification);

    /// Take down any sticky notice still showing.
    fn dismiss(&self) {}
}

/// Notifier that only writes log lines.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notification: &Notification) {
        tracing::info!(
            kind = ?notification.kind,
            volume = ?notification.sound_volume,
            sticky = notification.sticky,
            "{}: {}",
            notification.title,
            notification.body
        );
    }
}
