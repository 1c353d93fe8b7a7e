//! Core data types for keyboard recordings
//!
//! This module defines the event model shared by the recorder, the player
//! and the persistence codec.
//!
//! # Main Types
//!
//! - [`KeyAction`] - Press or release
//! - [`KeyEvent`] - One key press/release with identity, scan code and timestamp
//! - [`KeyRecord`] - The on-disk shape of an event, validated into a [`KeyEvent`]
//! - [`Recording`] - An ordered sequence of events from one capture
//!
//! # Timestamps
//!
//! Event times are seconds relative to the start of the capture session.
//! They never go negative and never decrease within one capture. The player
//! does not use them directly: it rewrites a private copy with fixed spacing
//! before each playback.

use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::hook::HookEvent;
use crate::keymap;

/// Whether a key went down or came up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyAction {
    /// Key pressed
    Down,
    /// Key released
    Up,
}

impl KeyAction {
    /// Wire name used in saved recordings
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyAction::Down => "down",
            KeyAction::Up => "up",
        }
    }
}

impl std::fmt::Display for KeyAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single keyboard event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "KeyRecord")]
pub struct KeyEvent {
    /// Key identity (canonical name, e.g. `"a"`, `"esc"`, `"right shift"`)
    pub name: String,
    /// Press or release
    #[serde(rename = "event_type")]
    pub action: KeyAction,
    /// Hardware scan code reported by the hook
    pub scan_code: u32,
    /// Seconds since the start of the capture
    pub time: f64,
}

impl KeyEvent {
    /// Create a new event
    pub fn new(name: impl Into<String>, action: KeyAction, scan_code: u32, time: f64) -> Self {
        Self {
            name: name.into(),
            action,
            scan_code,
            time,
        }
    }

    /// Build an event from a live hook event, timed relative to `capture_start`
    ///
    /// Events stamped before the capture started are pinned to zero.
    pub fn from_hook(event: &HookEvent, capture_start: Instant) -> Self {
        let elapsed = event.time.saturating_duration_since(capture_start);
        Self {
            name: keymap::canonical_name(&event.name),
            action: event.action,
            scan_code: event.scan_code,
            time: elapsed.as_secs_f64(),
        }
    }

    /// Check whether this is a press of the named key
    pub fn is_press_of(&self, key: &str) -> bool {
        self.action == KeyAction::Down && keymap::same_key(&self.name, key)
    }
}

impl std::fmt::Display for KeyEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} (scan {}) @ {:.3}s",
            self.name, self.action, self.scan_code, self.time
        )
    }
}

/// A stored event exactly as it appears in a recording file
///
/// Serde rejects missing fields and wrong types here; the semantic checks
/// live in the `TryFrom` conversion into [`KeyEvent`].
#[derive(Debug, Clone, Deserialize)]
pub struct KeyRecord {
    pub name: String,
    pub event_type: KeyAction,
    pub scan_code: u32,
    pub time: f64,
}

impl TryFrom<KeyRecord> for KeyEvent {
    type Error = String;

    fn try_from(record: KeyRecord) -> std::result::Result<Self, Self::Error> {
        if record.name.trim().is_empty() {
            return Err("key name must not be empty".to_string());
        }
        if !record.time.is_finite() {
            return Err(format!("time must be a finite number, got {}", record.time));
        }
        if record.time < 0.0 {
            return Err(format!("time must not be negative, got {}", record.time));
        }

        Ok(KeyEvent {
            name: record.name,
            action: record.event_type,
            scan_code: record.scan_code,
            time: record.time,
        })
    }
}

/// An ordered sequence of key events from one capture
///
/// Serializes as a bare JSON array of events.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Recording {
    events: Vec<KeyEvent>,
}

impl Recording {
    /// Create an empty recording
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a recording from events already in capture order
    pub fn from_events(events: Vec<KeyEvent>) -> Self {
        Self { events }
    }

    /// The events in capture order
    pub fn events(&self) -> &[KeyEvent] {
        &self.events
    }

    /// Get the number of events
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Check if the recording is empty
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Time of the last event in seconds
    pub fn duration(&self) -> f64 {
        self.events.last().map(|e| e.time).unwrap_or(0.0)
    }

    /// Count key presses per key, in the order keys were first pressed
    pub fn key_press_counts(&self) -> Vec<(String, usize)> {
        let mut counts: Vec<(String, usize)> = Vec::new();
        for event in self.events.iter().filter(|e| e.action == KeyAction::Down) {
            match counts.iter_mut().find(|(name, _)| *name == event.name) {
                Some((_, count)) => *count += 1,
                None => counts.push((event.name.clone(), 1)),
            }
        }
        counts
    }

    pub(crate) fn push(&mut self, event: KeyEvent) {
        self.events.push(event);
    }
}

impl FromIterator<KeyEvent> for Recording {
    fn from_iter<I: IntoIterator<Item = KeyEvent>>(iter: I) -> Self {
        Self {
            events: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Recording {
    type Item = &'a KeyEvent;
    type IntoIter = std::slice::Iter<'a, KeyEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn tap(name: &str, scan_code: u32, at: f64) -> [KeyEvent; 2] {
        [
            KeyEvent::new(name, KeyAction::Down, scan_code, at),
            KeyEvent::new(name, KeyAction::Up, scan_code, at + 0.05),
        ]
    }

    #[test]
    fn test_key_action_wire_names() {
        assert_eq!(serde_json::to_string(&KeyAction::Down).unwrap(), "\"down\"");
        assert_eq!(serde_json::to_string(&KeyAction::Up).unwrap(), "\"up\"");
        assert_eq!(KeyAction::Up.to_string(), "up");
        assert_eq!(
            KeyEvent::new("a", KeyAction::Down, 30, 1.25).to_string(),
            "a down (scan 30) @ 1.250s"
        );
    }

    #[test]
    fn test_event_serializes_with_stored_field_names() {
        let event = KeyEvent::new("a", KeyAction::Down, 30, 0.5);
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["name"], "a");
        assert_eq!(value["event_type"], "down");
        assert_eq!(value["scan_code"], 30);
        assert_eq!(value["time"], 0.5);
        assert_eq!(value.as_object().unwrap().len(), 4);
    }

    #[test]
    fn test_from_hook_is_relative_and_never_negative() {
        let start = Instant::now();
        let later = HookEvent {
            name: "A".to_string(),
            action: KeyAction::Down,
            scan_code: 30,
            time: start + Duration::from_millis(250),
        };
        let event = KeyEvent::from_hook(&later, start);
        assert_eq!(event.name, "a");
        assert!((event.time - 0.25).abs() < 1e-9);

        let earlier = HookEvent {
            time: start,
            ..later.clone()
        };
        let event = KeyEvent::from_hook(&earlier, start + Duration::from_millis(10));
        assert_eq!(event.time, 0.0);
    }

    #[test]
    fn test_record_validation() {
        let record = KeyRecord {
            name: "a".into(),
            event_type: KeyAction::Up,
            scan_code: 30,
            time: -1.0,
        };
        assert!(KeyEvent::try_from(record.clone()).is_err());

        let record = KeyRecord {
            name: "  ".into(),
            time: 1.0,
            ..record
        };
        assert!(KeyEvent::try_from(record).is_err());
    }

    #[test]
    fn test_recording_stats() {
        let mut recording = Recording::new();
        assert!(recording.is_empty());
        assert_eq!(recording.duration(), 0.0);

        for event in tap("h", 35, 0.0)
            .into_iter()
            .chain(tap("i", 23, 0.2))
            .chain(tap("h", 35, 0.4))
        {
            recording.push(event);
        }

        assert_eq!(recording.len(), 6);
        assert!((recording.duration() - 0.45).abs() < 1e-9);
        assert_eq!(
            recording.key_press_counts(),
            vec![("h".to_string(), 2), ("i".to_string(), 1)]
        );
    }

    #[test]
    fn test_is_press_of_uses_aliases() {
        let event = KeyEvent::new("esc", KeyAction::Down, 1, 0.0);
        assert!(event.is_press_of("escape"));
        assert!(event.is_press_of("Esc"));
        assert!(!KeyEvent::new("esc", KeyAction::Up, 1, 0.0).is_press_of("esc"));
    }
}
