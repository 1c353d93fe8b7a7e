//! Mock Keyboard Hook for Testing
//!
//! This module provides a scriptable keyboard hook that never touches the
//! real keyboard. Tests feed it "physical" key events and inspect every
//! event the engine tried to synthesize.
//!
//! # Features
//!
//! - **Scripted input**: [`MockKeyboard::emit`] and [`MockKeyboard::tap`] deliver
//!   events to every subscriber as if the user typed them
//! - **Loopback**: synthesized presses/releases are fed back to subscribers,
//!   mimicking an OS hook that observes injected input (switch it off to
//!   simulate the stop key getting lost)
//! - **Failure injection**: refuse to install, or fail synthesis after N events
//! - **Time control**: by default `play` records rewritten timestamps without
//!   sleeping; [`MockKeyboard::with_realtime`] honors the gaps
//!
//! # Example
//!
//! ```ignore
//! use keyreplay_rs::hook::{KeyboardHook, MockKeyboard};
//! use keyreplay_rs::types::KeyAction;
//!
//! let hook = MockKeyboard::new();
//! let sub = hook.subscribe()?;
//! hook.tap("a");
//! assert_eq!(sub.drain().len(), 2);
//! ```

use crate::error::{KeyReplayError, Result};
use crate::keymap;
use crate::types::{KeyAction, KeyEvent};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use super::{play_with_delays, HookEvent, KeyboardHook, SubscriberRegistry, Subscription};

/// One event the engine asked the mock to synthesize
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesizedKey {
    pub name: String,
    pub action: KeyAction,
    pub scan_code: u32,
    /// Timestamp carried by the replayed event (None for direct press/release)
    pub time: Option<f64>,
    /// Replay pass this event belonged to (0 for direct press/release)
    pub pass: usize,
}

/// A keyboard hook driven entirely by the test
#[derive(Debug)]
pub struct MockKeyboard {
    registry: Arc<SubscriberRegistry>,
    install_error: Mutex<Option<String>>,
    loopback: AtomicBool,
    realtime: AtomicBool,
    fail_after: Mutex<Option<usize>>,
    synthesized: Mutex<Vec<SynthesizedKey>>,
    passes: AtomicUsize,
}

impl Default for MockKeyboard {
    fn default() -> Self {
        Self::new()
    }
}

impl MockKeyboard {
    /// Create a mock with loopback on and instant playback
    pub fn new() -> Self {
        Self {
            registry: SubscriberRegistry::new(),
            install_error: Mutex::new(None),
            loopback: AtomicBool::new(true),
            realtime: AtomicBool::new(false),
            fail_after: Mutex::new(None),
            synthesized: Mutex::new(Vec::new()),
            passes: AtomicUsize::new(0),
        }
    }

    /// Feed synthesized presses/releases back to subscribers
    pub fn with_loopback(self, enabled: bool) -> Self {
        self.loopback.store(enabled, Ordering::SeqCst);
        self
    }

    /// Sleep the gaps between replayed events
    pub fn with_realtime(self, enabled: bool) -> Self {
        self.realtime.store(enabled, Ordering::SeqCst);
        self
    }

    /// Make every subscribe attempt fail
    pub fn with_install_failure(self, message: impl Into<String>) -> Self {
        *lock(&self.install_error) = Some(message.into());
        self
    }

    /// Fail synthesis once `count` events have been synthesized
    pub fn with_synthesis_failure_after(self, count: usize) -> Self {
        *lock(&self.fail_after) = Some(count);
        self
    }

    /// Deliver a "physical" key event to all subscribers
    pub fn emit(&self, name: &str, action: KeyAction) {
        let scan_code = keymap::scan_code_for_name(name).unwrap_or(0);
        self.emit_event(HookEvent::now(keymap::canonical_name(name), action, scan_code));
    }

    /// Deliver a fully specified event to all subscribers
    pub fn emit_event(&self, event: HookEvent) {
        self.registry.broadcast(&event);
    }

    /// Press and release a key
    pub fn tap(&self, name: &str) {
        self.emit(name, KeyAction::Down);
        self.emit(name, KeyAction::Up);
    }

    /// Everything synthesized so far, in order
    pub fn synthesized(&self) -> Vec<SynthesizedKey> {
        lock(&self.synthesized).clone()
    }

    /// Events synthesized during replay pass `pass` (1-based)
    pub fn synthesized_in_pass(&self, pass: usize) -> Vec<SynthesizedKey> {
        lock(&self.synthesized)
            .iter()
            .filter(|k| k.pass == pass)
            .cloned()
            .collect()
    }

    /// Number of `play` calls (one per replay pass)
    pub fn play_count(&self) -> usize {
        self.passes.load(Ordering::SeqCst)
    }

    /// Number of live subscriptions
    pub fn subscriber_count(&self) -> usize {
        self.registry.len()
    }

    fn record(&self, key: SynthesizedKey) -> Result<()> {
        let mut synthesized = lock(&self.synthesized);
        if let Some(limit) = *lock(&self.fail_after) {
            if synthesized.len() >= limit {
                return Err(KeyReplayError::PlaybackSynthesis(format!(
                    "mock synthesis refused {} {}",
                    key.name, key.action
                )));
            }
        }
        synthesized.push(key);
        Ok(())
    }

    fn synthesize_named(&self, key: &str, action: KeyAction) -> Result<()> {
        let name = keymap::canonical_name(key);
        let scan_code = keymap::scan_code_for_name(&name).unwrap_or(0);
        self.record(SynthesizedKey {
            name: name.clone(),
            action,
            scan_code,
            time: None,
            pass: 0,
        })?;

        if self.loopback.load(Ordering::SeqCst) {
            self.emit_event(HookEvent::now(name, action, scan_code));
        }
        Ok(())
    }
}

impl KeyboardHook for MockKeyboard {
    fn subscribe(&self) -> Result<Subscription> {
        if let Some(message) = lock(&self.install_error).clone() {
            return Err(KeyReplayError::HookInstall(message));
        }
        Ok(self.registry.subscribe())
    }

    fn press(&self, key: &str) -> Result<()> {
        self.synthesize_named(key, KeyAction::Down)
    }

    fn release(&self, key: &str) -> Result<()> {
        self.synthesize_named(key, KeyAction::Up)
    }

    fn send(&self, event: &KeyEvent) -> Result<()> {
        self.record(SynthesizedKey {
            name: event.name.clone(),
            action: event.action,
            scan_code: event.scan_code,
            time: Some(event.time),
            pass: self.passes.load(Ordering::SeqCst),
        })
    }

    fn play(&self, events: &[KeyEvent]) -> Result<()> {
        self.passes.fetch_add(1, Ordering::SeqCst);
        if self.realtime.load(Ordering::SeqCst) {
            return play_with_delays(self, events);
        }
        for event in events {
            self.send(event)?;
        }
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tap_reaches_subscribers() {
        let hook = MockKeyboard::new();
        let sub = hook.subscribe().unwrap();
        hook.tap("A");

        let events = sub.drain();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].name, "a");
        assert_eq!(events[0].scan_code, 30);
        assert_eq!(events[1].action, KeyAction::Up);
    }

    #[test]
    fn test_loopback_can_be_disabled() {
        let hook = MockKeyboard::new().with_loopback(false);
        let sub = hook.subscribe().unwrap();
        hook.press("esc").unwrap();
        hook.release("esc").unwrap();

        assert!(sub.drain().is_empty());
        assert_eq!(hook.synthesized().len(), 2);
    }

    #[test]
    fn test_install_failure() {
        let hook = MockKeyboard::new().with_install_failure("permission denied");
        let err = hook.subscribe().unwrap_err();
        assert!(err.is_hook_install());
        assert_eq!(hook.subscriber_count(), 0);
    }

    #[test]
    fn test_synthesis_failure_after_limit() {
        let hook = MockKeyboard::new().with_synthesis_failure_after(1);
        let events = vec![
            KeyEvent::new("a", KeyAction::Down, 30, 1.0),
            KeyEvent::new("a", KeyAction::Up, 30, 1.2),
        ];
        let err = hook.play(&events).unwrap_err();
        assert!(err.is_playback_synthesis());
        assert_eq!(hook.synthesized().len(), 1);
    }

    #[test]
    fn test_play_tags_passes() {
        let hook = MockKeyboard::new();
        let events = vec![KeyEvent::new("a", KeyAction::Down, 30, 1.0)];
        hook.play(&events).unwrap();
        hook.play(&events).unwrap();

        assert_eq!(hook.play_count(), 2);
        assert_eq!(hook.synthesized_in_pass(1).len(), 1);
        assert_eq!(hook.synthesized_in_pass(2).len(), 1);
    }
}
