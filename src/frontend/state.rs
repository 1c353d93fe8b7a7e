//! UI actions
//!
//! Panels never touch the session directly: they render from borrowed
//! state and return `AppAction`s, which the app applies after drawing.

use std::path::PathBuf;

use crate::config::ReplaySettings;

/// Something the user asked for this frame
#[derive(Debug, Clone, PartialEq)]
pub enum AppAction {
    // Capture
    StartRecording,
    StopRecording,
    ForceStopRecording,

    // Playback
    StartPlayback,
    StopPlayback,
    SetReplaySettings(ReplaySettings),

    // Files
    /// Save into the configured folder under a generated name
    Save,
    /// Save to a path picked by the user
    SaveAs(PathBuf),
    Load(PathBuf),
    SetSaveDir(PathBuf),
    Clear,

    // UI
    DismissNotice,
    ToggleLog,
}

/// Severity of a modal notice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Info,
    Error,
}

/// A message shown in a modal window until dismissed
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub title: String,
    pub message: String,
}

impl Notice {
    pub fn info(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Info,
            title: title.into(),
            message: message.into(),
        }
    }

    pub fn error(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Error,
            title: title.into(),
            message: message.into(),
        }
    }
}
