//! # pompom Core Library
//!
//! Core logic for the pompom work/break timer. Front ends (the `pompom`
//! terminal binary, or any GUI) are thin layers that issue commands and
//! render what the engine publishes.
//!
//! ## Architecture
//!
//! - **Timer Engine**: command API over one work/break session; a tokio
//!   driver task counts each phase down and sequences Work -> Break -> Work
//! - **Storage**: TOML-based configuration
//! - **Events**: phase started/completed, pause/resume and reset events on a
//!   broadcast channel, plus a watch channel carrying the rendered view
//! - **Notify**: seam for the sound / desktop-notification collaborator
//!
//! ## Key Components
//!
//! - [`TimerEngine`]: Start / Pause (toggle) / Reset
//! - [`TimerView`]: `MM:SS` text, status and progress for rendering
//! - [`Config`]: Application configuration management
//! - [`Notifier`]: Trait for phase-change announcements

pub mod error;
pub mod events;
pub mod notify;
pub mod storage;
pub mod timer;

pub use error::{ConfigError, CoreError, ValidationError};
pub use events::Event;
pub use notify::{LogNotifier, Notification, NotificationKind, Notifier};
pub use storage::Config;
pub use timer::{Phase, Status, TimerEngine, TimerSettings, TimerView};
