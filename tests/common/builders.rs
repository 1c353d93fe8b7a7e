//! Test data builders for recordings

use keyreplay_rs::keymap;
use keyreplay_rs::{KeyAction, KeyEvent, Recording};

/// Builder for hand-made recordings with realistic capture timestamps
pub struct RecordingBuilder {
    events: Vec<KeyEvent>,
    clock: f64,
    step: f64,
}

impl RecordingBuilder {
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
            clock: 0.25,
            step: 0.08,
        }
    }

    /// Seconds between consecutive events
    pub fn step(mut self, step: f64) -> Self {
        self.step = step;
        self
    }

    pub fn down(mut self, name: &str) -> Self {
        self.push(name, KeyAction::Down);
        self
    }

    pub fn up(mut self, name: &str) -> Self {
        self.push(name, KeyAction::Up);
        self
    }

    /// Press and release
    pub fn tap(self, name: &str) -> Self {
        self.down(name).up(name)
    }

    pub fn build(self) -> Recording {
        Recording::from_events(self.events)
    }

    fn push(&mut self, name: &str, action: KeyAction) {
        let scan_code = keymap::scan_code_for_name(name).unwrap_or(0);
        self.events
            .push(KeyEvent::new(name, action, scan_code, self.clock));
        self.clock += self.step;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_builder() {
        let recording = RecordingBuilder::new().step(0.5).tap("a").build();

        assert_eq!(recording.len(), 2);
        assert_eq!(recording.events()[0].action, KeyAction::Down);
        assert_eq!(recording.events()[1].action, KeyAction::Up);
        let events = recording.events();
        assert!((events[1].time - events[0].time - 0.5).abs() < 1e-9);
    }
}
