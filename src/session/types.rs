//! Session data types

use std::time::Duration;

use crate::error::KeyReplayError;
use crate::types::Recording;

/// State of the recorder/player session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Neither capturing nor replaying
    #[default]
    Idle,
    /// Capturing key events
    Recording,
    /// Replaying the current recording
    Playing,
}

impl SessionState {
    /// Check if idle
    pub fn is_idle(&self) -> bool {
        matches!(self, SessionState::Idle)
    }

    /// Check if currently recording
    pub fn is_recording(&self) -> bool {
        matches!(self, SessionState::Recording)
    }

    /// Check if currently playing
    pub fn is_playing(&self) -> bool {
        matches!(self, SessionState::Playing)
    }

    /// Display name for the state
    pub fn display_name(&self) -> &'static str {
        match self {
            SessionState::Idle => "Idle",
            SessionState::Recording => "Recording",
            SessionState::Playing => "Playing",
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Number of replay passes, 1 to 100
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ReplayCount(u32);

impl ReplayCount {
    pub const MIN: u32 = 1;
    pub const MAX: u32 = 100;

    pub fn get(self) -> u32 {
        self.0
    }
}

impl TryFrom<u32> for ReplayCount {
    type Error = KeyReplayError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(KeyReplayError::InvalidConfiguration(format!(
                "replay count must be between {} and {}, got {}",
                Self::MIN,
                Self::MAX,
                value
            )))
        }
    }
}

/// Replay speed level, 1 (slowest) to 3 (fastest)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ReplaySpeed(u32);

impl ReplaySpeed {
    pub const MIN: u32 = 1;
    pub const MAX: u32 = 3;

    pub fn get(self) -> u32 {
        self.0
    }

    /// Seconds between consecutive replayed events
    ///
    /// Speed 1 gives 0.3 s, speed 2 gives 0.2 s, speed 3 gives 0.1 s.
    pub fn event_gap(self) -> f64 {
        0.1 * f64::from(4 - self.0)
    }
}

impl TryFrom<u32> for ReplaySpeed {
    type Error = KeyReplayError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(KeyReplayError::InvalidConfiguration(format!(
                "replay speed must be between {} and {}, got {}",
                Self::MIN,
                Self::MAX,
                value
            )))
        }
    }
}

/// Pass counter reported while replaying
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackProgress {
    /// Pass currently running, 1-based
    pub pass: u32,
    /// Total number of passes
    pub total: u32,
}

impl std::fmt::Display for PlaybackProgress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.pass, self.total)
    }
}

/// How a playback ended without error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackOutcome {
    /// Every requested pass ran
    Completed { passes: u32 },
    /// Stopped at a pass boundary
    Cancelled { completed_passes: u32, total: u32 },
}

impl PlaybackOutcome {
    /// Number of passes that ran to the end
    pub fn completed_passes(&self) -> u32 {
        match self {
            PlaybackOutcome::Completed { passes } => *passes,
            PlaybackOutcome::Cancelled {
                completed_passes, ..
            } => *completed_passes,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, PlaybackOutcome::Cancelled { .. })
    }
}

impl std::fmt::Display for PlaybackOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackOutcome::Completed { passes } => {
                write!(f, "Playback finished: {} passes", passes)
            }
            PlaybackOutcome::Cancelled {
                completed_passes,
                total,
            } => write!(
                f,
                "Playback stopped after {} of {} passes",
                completed_passes, total
            ),
        }
    }
}

/// Why a capture ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureStopReason {
    /// The sentinel key was pressed
    Sentinel,
    /// The stop flag was raised
    Forced,
    /// The maximum capture duration elapsed
    TimedOut,
}

impl CaptureStopReason {
    pub fn description(&self) -> &'static str {
        match self {
            CaptureStopReason::Sentinel => "stop key pressed",
            CaptureStopReason::Forced => "stopped",
            CaptureStopReason::TimedOut => "maximum duration reached",
        }
    }
}

/// Notification sent from a background worker to the session
#[derive(Debug, Clone)]
pub enum SessionMessage {
    /// Capture finished with the collected events
    RecordingFinished {
        recording: Recording,
        reason: CaptureStopReason,
        elapsed: Duration,
    },
    /// Capture aborted (hook stream lost)
    RecordingFailed(String),
    /// A replay pass is starting
    PlaybackProgress(PlaybackProgress),
    /// Playback ended normally or by cancellation
    PlaybackFinished(PlaybackOutcome),
    /// Playback aborted by a synthesis failure
    PlaybackFailed(String),
}
