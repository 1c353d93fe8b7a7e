//! Keyboard recording and playback session
//!
//! This module contains the engine behind the UI: capturing key events,
//! replaying them with fixed spacing for a number of passes, and saving or
//! loading recordings.
//!
//! # Components
//!
//! - [`Session`] - State machine and owner of the current recording
//! - [`Recorder`] - Captures events until the stop key or a stop request
//! - [`Player`] - Rewrites timing and replays, cancellable between passes
//! - [`codec`] - JSON recording files
//! - [`HotkeyWatcher`] - Global playback shortcuts

pub mod codec;
pub mod controller;
pub mod hotkeys;
pub mod player;
pub mod recorder;
pub mod types;

pub use controller::{Session, MAX_LOG_LINES};
pub use hotkeys::{HotkeyAction, HotkeyWatcher};
pub use player::{rewrite_timestamps, PlaybackHandle, PlaybackRequest, Player};
pub use recorder::{CaptureHandle, Recorder, StopKeyRelease};
pub use types::{
    CaptureStopReason, PlaybackOutcome, PlaybackProgress, ReplayCount, ReplaySpeed,
    SessionMessage, SessionState,
};
