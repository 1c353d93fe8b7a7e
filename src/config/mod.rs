//! Configuration module for keyreplay-rs
//!
//! Everything persisted between runs lives here:
//! - Application state persistence (settings, recent recordings)
//! - Replay, capture, playback timing and hotkey settings
//!
//! # Where Things Live
//!
//! The data directory comes from `dirs-next`:
//! - **Linux**: `~/.local/share/dev.keyreplay.keyreplay-rs/`
//! - **macOS**: `~/Library/Application Support/dev.keyreplay.keyreplay-rs/`
//! - **Windows**: `%APPDATA%\dev.keyreplay.keyreplay-rs\`
//!
//! # Files
//!
//! - `app_state.json` - Settings, save folder and recent recordings
//! - `logs/` - Daily log files
//! - Recordings (`keyboard_record_*.json`) - Saved wherever the user chooses
//!
//! # Example
//!
//! ```ignore
//! use keyreplay_rs::config::AppState;
//!
//! let mut state = AppState::load_or_default();
//! state.config.replay.replay_count = 3;
//! state.add_recent_recording("keyboard_record_20240101_120000.json", 42);
//! state.save()?;
//! ```

pub mod settings;

pub use settings::*;

use crate::error::{KeyReplayError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Directory name under the platform data dir
pub const APP_ID: &str = "dev.keyreplay.keyreplay-rs";

/// App state filename
pub const APP_STATE_FILE: &str = "app_state.json";

/// Log directory under the app data directory
pub const LOG_DIR: &str = "logs";

/// Maximum number of recent recordings to remember
pub const MAX_RECENT_RECORDINGS: usize = 10;

// ==================== App Data Directory ====================

/// Platform data directory for this app, if one exists
pub fn app_data_dir() -> Option<PathBuf> {
    dirs_next::data_dir().map(|p| p.join(APP_ID))
}

/// Create the app data directory if needed and return it
pub fn ensure_app_data_dir() -> Result<PathBuf> {
    let dir = app_data_dir().ok_or_else(|| {
        KeyReplayError::Config("Could not determine app data directory".to_string())
    })?;

    if !dir.exists() {
        std::fs::create_dir_all(&dir).map_err(|e| {
            KeyReplayError::Config(format!("Failed to create app data directory: {}", e))
        })?;
    }

    Ok(dir)
}

/// Full path of `app_state.json`
pub fn app_state_path() -> Option<PathBuf> {
    app_data_dir().map(|p| p.join(APP_STATE_FILE))
}

/// Directory for log files, falling back to the working directory
pub fn log_dir() -> PathBuf {
    app_data_dir()
        .map(|p| p.join(LOG_DIR))
        .unwrap_or_else(|| PathBuf::from(LOG_DIR))
}

// ==================== Recent Recording Entry ====================

/// A recording file the user saved or loaded recently
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecentRecording {
    /// Path to the recording file
    pub path: PathBuf,

    /// Number of events in the file when last used
    #[serde(default)]
    pub event_count: usize,

    /// Last time the file was saved or loaded
    pub last_used: DateTime<Utc>,
}

impl RecentRecording {
    /// Create a new recent recording entry
    pub fn new(path: impl Into<PathBuf>, event_count: usize) -> Self {
        Self {
            path: path.into(),
            event_count,
            last_used: Utc::now(),
        }
    }

    /// File name for display
    pub fn display_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    /// Check if the recording file still exists
    pub fn exists(&self) -> bool {
        self.path.exists()
    }
}

// ==================== App State ====================

/// Settings and history saved on exit and restored on launch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppState {
    /// Schema version
    #[serde(default = "default_app_state_version")]
    pub version: u32,

    /// Engine settings
    #[serde(default)]
    pub config: AppConfig,

    /// UI preferences
    #[serde(default)]
    pub ui_preferences: UiPreferences,

    /// Folder new recordings are saved into (None = working directory)
    #[serde(default)]
    pub recordings_dir: Option<PathBuf>,

    /// Recently saved or loaded recordings, most recent first
    #[serde(default)]
    pub recent_recordings: Vec<RecentRecording>,
}

fn default_app_state_version() -> u32 {
    1
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            version: 1,
            config: AppConfig::default(),
            ui_preferences: UiPreferences::default(),
            recordings_dir: None,
            recent_recordings: Vec::new(),
        }
    }
}

impl AppState {
    /// Read `app_state.json` from the data directory
    pub fn load() -> Result<Self> {
        let path = app_state_path().ok_or_else(|| {
            KeyReplayError::Config("Could not determine app state path".to_string())
        })?;
        Self::load_from(&path)
    }

    /// Load app state from a specific file, defaults if it does not exist
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| KeyReplayError::Config(format!("Failed to read app state: {}", e)))?;

        serde_json::from_str(&content)
            .map_err(|e| KeyReplayError::Config(format!("Failed to parse app state: {}", e)))
    }

    /// Like [`AppState::load`], but falls back to defaults
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|e| {
            tracing::warn!("Failed to load app state, using defaults: {}", e);
            Self::default()
        })
    }

    /// Write `app_state.json`, creating the directory
    pub fn save(&self) -> Result<()> {
        let dir = ensure_app_data_dir()?;
        self.save_to(dir.join(APP_STATE_FILE))
    }

    /// Save app state to a specific file
    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| KeyReplayError::Config(format!("Failed to serialize app state: {}", e)))?;

        std::fs::write(path.as_ref(), content)
            .map_err(|e| KeyReplayError::Config(format!("Failed to write app state: {}", e)))
    }

    /// Add or refresh a recent recording
    pub fn add_recent_recording(&mut self, path: impl AsRef<Path>, event_count: usize) {
        let path = path.as_ref().to_path_buf();

        self.recent_recordings.retain(|r| r.path != path);
        self.recent_recordings
            .insert(0, RecentRecording::new(path, event_count));
        self.recent_recordings.truncate(MAX_RECENT_RECORDINGS);
    }

    /// Remove a recording from recents (e.g., if the file was deleted)
    pub fn remove_recent_recording(&mut self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        self.recent_recordings.retain(|r| r.path != path);
    }

    /// Drop recent recordings whose files no longer exist
    pub fn cleanup_missing_recordings(&mut self) {
        self.recent_recordings.retain(|r| r.exists());
    }

    /// Folder new recordings are saved into
    pub fn save_dir(&self) -> PathBuf {
        self.recordings_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

/// UI preferences
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiPreferences {
    /// Dark theme
    #[serde(default = "default_true")]
    pub dark_mode: bool,

    /// UI zoom factor
    #[serde(default = "default_font_scale")]
    pub font_scale: f32,

    /// Show the info log panel
    #[serde(default = "default_true")]
    pub show_log: bool,
}

fn default_true() -> bool {
    true
}

fn default_font_scale() -> f32 {
    1.0
}

impl Default for UiPreferences {
    fn default() -> Self {
        Self {
            dark_mode: true,
            font_scale: 1.0,
            show_log: true,
        }
    }
}

// ==================== App Config ====================

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// Replay count and speed
    #[serde(default)]
    pub replay: ReplaySettings,

    /// Capture stop behavior
    #[serde(default)]
    pub capture: CaptureSettings,

    /// Lead-in and pass gap
    #[serde(default)]
    pub playback: PlaybackTiming,

    /// Global playback shortcuts
    #[serde(default)]
    pub hotkeys: HotkeySettings,
}

impl AppConfig {
    /// Default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration with no lead-in or pass gap, for tests and scripted runs
    pub fn immediate() -> Self {
        Self {
            playback: PlaybackTiming::immediate(),
            ..Self::default()
        }
    }
}

// ==================== Tests ====================
