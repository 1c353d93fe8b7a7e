//! Global keyboard hook backed by `rdev`
//!
//! `rdev::listen` blocks its thread for the lifetime of the process, so the
//! listener is started once, lazily, on the first subscription and then
//! shared by every subscriber through the registry.

use crate::error::{KeyReplayError, Result};
use crate::keymap::{self, UNKNOWN_KEY_NAME};
use crate::types::{KeyAction, KeyEvent};
use crossbeam_channel::{bounded, RecvTimeoutError};
use rdev::{EventType, Key};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use super::{HookEvent, KeyboardHook, SubscriberRegistry, Subscription};

/// How long to wait for `rdev::listen` to report an install failure
const INSTALL_PROBE_WINDOW: Duration = Duration::from_millis(250);

/// The real OS keyboard hook
#[derive(Debug)]
pub struct RdevHook {
    registry: Arc<SubscriberRegistry>,
    /// True while the listener thread is running
    listening: Arc<AtomicBool>,
    /// Serializes listener start-up
    start_lock: Mutex<()>,
}

impl Default for RdevHook {
    fn default() -> Self {
        Self::new()
    }
}

impl RdevHook {
    /// Create a hook; nothing is installed until the first subscription
    pub fn new() -> Self {
        Self {
            registry: SubscriberRegistry::new(),
            listening: Arc::new(AtomicBool::new(false)),
            start_lock: Mutex::new(()),
        }
    }

    /// Check whether the OS listener is running
    pub fn is_listening(&self) -> bool {
        self.listening.load(Ordering::SeqCst)
    }

    fn ensure_listening(&self) -> Result<()> {
        let _guard = self
            .start_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if self.is_listening() {
            return Ok(());
        }

        let registry = Arc::clone(&self.registry);
        let listening = Arc::clone(&self.listening);
        let (error_tx, error_rx) = bounded::<String>(1);
        listening.store(true, Ordering::SeqCst);

        std::thread::Builder::new()
            .name("keyboard-hook".to_string())
            .spawn(move || {
                tracing::info!("Keyboard listener started");
                let result = rdev::listen(move |event| {
                    let (key, action) = match event.event_type {
                        EventType::KeyPress(key) => (key, KeyAction::Down),
                        EventType::KeyRelease(key) => (key, KeyAction::Up),
                        _ => return,
                    };
                    registry.broadcast(&hook_event(key, action, event.name));
                });

                listening.store(false, Ordering::SeqCst);
                if let Err(e) = result {
                    let message = format!("{:?}", e);
                    tracing::error!("Keyboard listener failed: {}", message);
                    let _ = error_tx.send(message);
                }
            })
            .map_err(|e| {
                self.listening.store(false, Ordering::SeqCst);
                KeyReplayError::HookInstall(format!("failed to spawn listener thread: {}", e))
            })?;

        match error_rx.recv_timeout(INSTALL_PROBE_WINDOW) {
            Ok(message) => Err(KeyReplayError::HookInstall(message)),
            // listen() returned without an error, or is still running
            Err(RecvTimeoutError::Disconnected) if !self.is_listening() => Err(
                KeyReplayError::HookInstall("keyboard listener exited".to_string()),
            ),
            Err(_) => Ok(()),
        }
    }

    fn simulate(&self, key: Key, action: KeyAction) -> Result<()> {
        let event_type = match action {
            KeyAction::Down => EventType::KeyPress(key),
            KeyAction::Up => EventType::KeyRelease(key),
        };
        rdev::simulate(&event_type).map_err(|e| {
            KeyReplayError::PlaybackSynthesis(format!("cannot synthesize {:?} {}: {:?}", key, action, e))
        })
    }
}

/// Translate an rdev key into a hook event stamped now
fn hook_event(key: Key, action: KeyAction, text: Option<String>) -> HookEvent {
    let (mut name, scan_code) = keymap::describe(key);
    if name == UNKNOWN_KEY_NAME {
        if let Some(text) = text.filter(|t| !t.trim().is_empty()) {
            name = keymap::canonical_name(&text);
        }
    }
    HookEvent {
        name,
        action,
        scan_code,
        time: Instant::now(),
    }
}

impl KeyboardHook for RdevHook {
    fn subscribe(&self) -> Result<Subscription> {
        self.ensure_listening()?;
        Ok(self.registry.subscribe())
    }

    fn press(&self, key: &str) -> Result<()> {
        let resolved = keymap::key_for_name(key).ok_or_else(|| {
            KeyReplayError::PlaybackSynthesis(format!("unknown key name '{}'", key))
        })?;
        self.simulate(resolved, KeyAction::Down)
    }

    fn release(&self, key: &str) -> Result<()> {
        let resolved = keymap::key_for_name(key).ok_or_else(|| {
            KeyReplayError::PlaybackSynthesis(format!("unknown key name '{}'", key))
        })?;
        self.simulate(resolved, KeyAction::Up)
    }

    fn send(&self, event: &KeyEvent) -> Result<()> {
        self.simulate(keymap::resolve(&event.name, event.scan_code), event.action)
    }
}
