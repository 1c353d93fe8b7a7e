//! Recording files
//!
//! A recording is stored as a pretty-printed JSON array with one object per
//! event:
//!
//! ```json
//! [
//!   { "name": "a", "event_type": "down", "scan_code": 30, "time": 0.0 },
//!   { "name": "a", "event_type": "up", "scan_code": 30, "time": 0.05 }
//! ]
//! ```
//!
//! Every record must carry all four fields. Extra fields are ignored so
//! that files written by newer versions still load. The first invalid
//! record fails the whole load and the error names its index.

use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};

use crate::error::{KeyReplayError, Result, ResultExt};
use crate::types::{KeyEvent, Recording};

/// Prefix of generated recording file names
pub const FILE_PREFIX: &str = "keyboard_record_";

/// Extension of recording files
pub const FILE_EXTENSION: &str = "json";

/// Serialize a recording to pretty JSON text
pub fn serialize(recording: &Recording) -> Result<String> {
    serde_json::to_string_pretty(recording)
        .map_err(|e| KeyReplayError::malformed(format!("cannot serialize recording: {}", e)))
}

/// Parse a recording from JSON text
pub fn deserialize(text: &str) -> Result<Recording> {
    let records: Vec<serde_json::Value> = serde_json::from_str(text).map_err(|e| {
        KeyReplayError::malformed(format!("expected a JSON array of events: {}", e))
    })?;

    records
        .into_iter()
        .enumerate()
        .map(|(index, record)| {
            serde_json::from_value::<KeyEvent>(record)
                .map_err(|e| KeyReplayError::malformed_record(index, e.to_string()))
        })
        .collect()
}

/// Generated file name for a recording saved at `now`
///
/// `keyboard_record_<YYYYMMDD_HHMMSS>.json`
pub fn recording_file_name(now: DateTime<Local>) -> String {
    format!(
        "{}{}.{}",
        FILE_PREFIX,
        now.format("%Y%m%d_%H%M%S"),
        FILE_EXTENSION
    )
}

/// Write a recording into `dir` under a generated name
pub fn save_to_dir(recording: &Recording, dir: impl AsRef<Path>) -> Result<PathBuf> {
    let dir = dir.as_ref();
    if !dir.exists() {
        std::fs::create_dir_all(dir)
            .map_err(KeyReplayError::from)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }
    let path = dir.join(recording_file_name(Local::now()));
    save_to_path(recording, &path)?;
    Ok(path)
}

/// Write a recording to `path`, replacing any existing file
pub fn save_to_path(recording: &Recording, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let text = serialize(recording)?;
    std::fs::write(path, text)
        .map_err(KeyReplayError::from)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    tracing::info!("Saved {} events to {}", recording.len(), path.display());
    Ok(())
}

/// Read a recording from `path`
pub fn load_from_path(path: impl AsRef<Path>) -> Result<Recording> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .map_err(KeyReplayError::from)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let recording =
        deserialize(&text).with_context(|| format!("Failed to load {}", path.display()))?;
    tracing::info!("Loaded {} events from {}", recording.len(), path.display());
    Ok(recording)
}
