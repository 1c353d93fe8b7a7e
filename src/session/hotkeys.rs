//! Global playback shortcuts
//!
//! The watcher holds its own hook subscription, so shortcuts keep working
//! while another application has focus. It only reports key presses; the
//! session decides whether the command is allowed in its current state.

use crate::config::HotkeySettings;
use crate::error::{KeyReplayError, Result};
use crate::hook::{KeyboardHook, Subscription};
use crate::keymap;
use crate::types::KeyAction;

/// Command bound to a global shortcut
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HotkeyAction {
    StartPlayback,
    StopPlayback,
}

/// Watches the keyboard for the configured shortcuts
#[derive(Debug)]
pub struct HotkeyWatcher {
    subscription: Subscription,
    start_key: String,
    stop_key: String,
}

impl HotkeyWatcher {
    /// Subscribe to the hook for the keys in `settings`
    pub fn new(hook: &dyn KeyboardHook, settings: &HotkeySettings) -> Result<Self> {
        let start_key = keymap::canonical_name(&settings.start_playback);
        let stop_key = keymap::canonical_name(&settings.stop_playback);
        for key in [&start_key, &stop_key] {
            if keymap::key_for_name(key).is_none() {
                return Err(KeyReplayError::Config(format!("unknown hotkey '{}'", key)));
            }
        }
        if start_key == stop_key {
            return Err(KeyReplayError::Config(format!(
                "start and stop playback share the hotkey '{}'",
                start_key
            )));
        }

        let subscription = hook.subscribe()?;
        tracing::info!(
            "Hotkeys active: {} starts playback, {} stops it",
            start_key,
            stop_key
        );
        Ok(Self {
            subscription,
            start_key,
            stop_key,
        })
    }

    /// Shortcuts pressed since the last poll, in order
    pub fn poll(&self) -> Vec<HotkeyAction> {
        self.subscription
            .drain()
            .into_iter()
            .filter(|event| event.action == KeyAction::Down)
            .filter_map(|event| {
                let name = keymap::canonical_name(&event.name);
                if name == self.start_key {
                    Some(HotkeyAction::StartPlayback)
                } else if name == self.stop_key {
                    Some(HotkeyAction::StopPlayback)
                } else {
                    None
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hook::MockKeyboard;

    #[test]
    fn test_poll_maps_presses() {
        let hook = MockKeyboard::new();
        let watcher = HotkeyWatcher::new(&hook, &HotkeySettings::default()).unwrap();

        hook.tap("a");
        hook.tap("F9");
        hook.emit("f10", KeyAction::Down);
        hook.emit("f10", KeyAction::Up);

        assert_eq!(
            watcher.poll(),
            vec![HotkeyAction::StartPlayback, HotkeyAction::StopPlayback]
        );
        assert!(watcher.poll().is_empty());
    }

    #[test]
    fn test_rejects_bad_bindings() {
        let hook = MockKeyboard::new();
        let same = HotkeySettings {
            stop_playback: "F9".to_string(),
            ..Default::default()
        };
        assert!(HotkeyWatcher::new(&hook, &same).is_err());

        let unknown = HotkeySettings {
            start_playback: "hyper".to_string(),
            ..Default::default()
        };
        assert!(HotkeyWatcher::new(&hook, &unknown).is_err());
        assert_eq!(hook.subscriber_count(), 0);
    }

    #[test]
    fn test_dropping_watcher_unsubscribes() {
        let hook = MockKeyboard::new();
        let watcher = HotkeyWatcher::new(&hook, &HotkeySettings::default()).unwrap();
        assert_eq!(hook.subscriber_count(), 1);
        drop(watcher);
        assert_eq!(hook.subscriber_count(), 0);
    }
}
