//! Settings sections of the application configuration
//!
//! # Main Types
//!
//! - [`ReplaySettings`] - Pass count and speed level chosen by the user
//! - [`CaptureSettings`] - Sentinel key and stop-key injection timing
//! - [`PlaybackTiming`] - Lead-in delay and pause between passes
//! - [`HotkeySettings`] - Global playback shortcuts
//!
//! Replay settings are stored as plain numbers so that a hand-edited or
//! stale config file still loads; they are range-checked by
//! [`ReplaySettings::validate`] when a playback is started, never clamped.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{KeyReplayError, Result};
use crate::keymap;
use crate::session::types::{ReplayCount, ReplaySpeed};

/// Default sentinel key that ends a capture
pub const DEFAULT_SENTINEL_KEY: &str = "esc";

/// Shortest hold accepted for the injected stop key
pub const MIN_STOP_KEY_HOLD_MS: u64 = 100;

/// Replay pass count and speed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplaySettings {
    /// Number of passes (1..=100)
    #[serde(default = "default_replay_count")]
    pub replay_count: u32,

    /// Speed level (1..=3)
    #[serde(default = "default_replay_speed")]
    pub replay_speed: u32,
}

fn default_replay_count() -> u32 {
    1
}

fn default_replay_speed() -> u32 {
    1
}

impl Default for ReplaySettings {
    fn default() -> Self {
        Self {
            replay_count: default_replay_count(),
            replay_speed: default_replay_speed(),
        }
    }
}

impl ReplaySettings {
    /// Create settings from raw values without checking them
    pub fn new(replay_count: u32, replay_speed: u32) -> Self {
        Self {
            replay_count,
            replay_speed,
        }
    }

    /// Range-check both values
    pub fn validate(&self) -> Result<(ReplayCount, ReplaySpeed)> {
        let count = ReplayCount::try_from(self.replay_count)?;
        let speed = ReplaySpeed::try_from(self.replay_speed)?;
        Ok((count, speed))
    }
}

/// How a capture is ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureSettings {
    /// Key whose press ends the capture
    #[serde(default = "default_sentinel_key")]
    pub sentinel_key: String,

    /// How long the injected stop key is held down
    #[serde(default = "default_stop_key_hold_ms")]
    pub stop_key_hold_ms: u64,

    /// Delay after the injected stop key before the capture is stopped anyway
    #[serde(default = "default_stop_grace_ms")]
    pub stop_grace_ms: u64,

    /// Upper bound on a single capture, in seconds (None = unlimited)
    #[serde(default)]
    pub max_duration_secs: Option<u64>,
}

fn default_sentinel_key() -> String {
    DEFAULT_SENTINEL_KEY.to_string()
}

fn default_stop_key_hold_ms() -> u64 {
    300
}

fn default_stop_grace_ms() -> u64 {
    1000
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            sentinel_key: default_sentinel_key(),
            stop_key_hold_ms: default_stop_key_hold_ms(),
            stop_grace_ms: default_stop_grace_ms(),
            max_duration_secs: None,
        }
    }
}

impl CaptureSettings {
    /// Sentinel key in canonical form
    pub fn sentinel(&self) -> String {
        keymap::canonical_name(&self.sentinel_key)
    }

    /// Hold time for the injected stop key, never below the minimum
    pub fn stop_key_hold(&self) -> Duration {
        Duration::from_millis(self.stop_key_hold_ms.max(MIN_STOP_KEY_HOLD_MS))
    }

    pub fn stop_grace(&self) -> Duration {
        Duration::from_millis(self.stop_grace_ms)
    }

    pub fn max_duration(&self) -> Option<Duration> {
        self.max_duration_secs.map(Duration::from_secs)
    }

    /// Check the sentinel names a key that can be synthesized
    pub fn validate(&self) -> Result<()> {
        let sentinel = self.sentinel();
        if keymap::key_for_name(&sentinel).is_none() {
            return Err(KeyReplayError::Config(format!(
                "unknown sentinel key '{}'",
                self.sentinel_key
            )));
        }
        Ok(())
    }
}

/// Delays around replay passes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackTiming {
    /// Wait before the first pass so the user can focus the target window
    #[serde(default = "default_lead_in_ms")]
    pub lead_in_ms: u64,

    /// Pause between consecutive passes
    #[serde(default = "default_pass_gap_ms")]
    pub pass_gap_ms: u64,
}

fn default_lead_in_ms() -> u64 {
    5000
}

fn default_pass_gap_ms() -> u64 {
    300
}

impl Default for PlaybackTiming {
    fn default() -> Self {
        Self {
            lead_in_ms: default_lead_in_ms(),
            pass_gap_ms: default_pass_gap_ms(),
        }
    }
}

impl PlaybackTiming {
    /// No lead-in and no pause between passes
    pub fn immediate() -> Self {
        Self {
            lead_in_ms: 0,
            pass_gap_ms: 0,
        }
    }

    pub fn lead_in(&self) -> Duration {
        Duration::from_millis(self.lead_in_ms)
    }

    pub fn pass_gap(&self) -> Duration {
        Duration::from_millis(self.pass_gap_ms)
    }
}

/// Global shortcuts that work while another window has focus
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HotkeySettings {
    /// Whether the shortcuts are active
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Starts playback
    #[serde(default = "default_start_playback_key")]
    pub start_playback: String,

    /// Stops playback
    #[serde(default = "default_stop_playback_key")]
    pub stop_playback: String,
}

fn default_true() -> bool {
    true
}

fn default_start_playback_key() -> String {
    "f9".to_string()
}

fn default_stop_playback_key() -> String {
    "f10".to_string()
}

impl Default for HotkeySettings {
    fn default() -> Self {
        Self {
            enabled: true,
            start_playback: default_start_playback_key(),
            stop_playback: default_stop_playback_key(),
        }
    }
}
