//! # KeyReplay-RS: Keyboard Macro Recorder
//!
//! Records keyboard activity through a global hook and replays it on
//! demand, any number of passes at one of three fixed speeds. The engine
//! runs capture and playback on a background thread and reports back to
//! the UI thread over a channel.
//!
//! ## Architecture
//!
//! - **Hook**: [`hook::KeyboardHook`] abstracts global capture and key synthesis
//!   (`rdev` in production, [`hook::MockKeyboard`] in tests)
//! - **Session**: [`session::Session`] owns the recording and the
//!   Idle/Recording/Playing state machine
//! - **Frontend**: eframe/egui window that only talks to the session
//! - **Communication**: Crossbeam channels for thread-safe message passing
//!
//! ## Configuration
//!
//! Application state (settings, save folder, recent recordings) is stored in
//! the platform-appropriate data directory under `dev.keyreplay.keyreplay-rs`:
//!
//! - **Linux**: `~/.local/share/dev.keyreplay.keyreplay-rs/`
//! - **macOS**: `~/Library/Application Support/dev.keyreplay.keyreplay-rs/`
//! - **Windows**: `%APPDATA%\dev.keyreplay.keyreplay-rs\`
//!
//! ## Example
//!
//! ```ignore
//! use keyreplay_rs::{config::AppConfig, hook::RdevHook, session::Session};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let mut session = Session::new(Arc::new(RdevHook::new()), AppConfig::default());
//! session.start_recording()?;
//! // ... type, then press Esc ...
//! session.wait_idle(Duration::from_secs(60));
//! session.start_playback()?;
//! session.wait_idle(Duration::from_secs(60));
//! ```

pub mod app;
pub mod config;
pub mod error;
pub mod frontend;
pub mod hook;
pub mod keymap;
pub mod session;
pub mod types;

// Re-export commonly used types
pub use app::KeyReplayApp;
pub use config::{AppConfig, AppState, ReplaySettings};
pub use error::{KeyReplayError, Result};
pub use hook::{KeyboardHook, MockKeyboard, RdevHook};
pub use session::{Session, SessionState};
pub use types::{KeyAction, KeyEvent, Recording};
