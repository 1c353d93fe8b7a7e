//! Keyboard capture
//!
//! The recorder subscribes to the hook on the caller's thread, so an
//! install failure is reported synchronously, then collects events on a
//! background thread until one of the stop conditions holds:
//!
//! - the sentinel key is pressed (the press itself is not recorded)
//! - the cooperative stop flag is raised
//! - the configured maximum capture duration elapses
//!
//! # Stopping from the UI
//!
//! [`CaptureHandle::request_stop`] behaves like the user pressing the
//! sentinel key: it synthesizes a press, holds it, and releases it. Some
//! platforms never deliver synthesized input to a global hook, so after a
//! grace period the stop flag is raised as well. [`CaptureHandle::force_stop`]
//! raises the flag right away.
//!
//! The release of an injected stop key can land after the capture has
//! ended. [`StopKeyRelease`] lets the next capture wait for it, and a
//! capture never records a sentinel release before its first real event.

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crate::config::CaptureSettings;
use crate::error::{KeyReplayError, Result, ResultExt};
use crate::hook::{HookEvent, KeyboardHook, Subscription};
use crate::keymap;
use crate::types::{KeyAction, KeyEvent, Recording};

use super::types::{CaptureStopReason, SessionMessage};

/// How often the capture loop checks the stop flag
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Slack on top of the hold time when waiting for a stop-key release
const RELEASE_MARGIN: Duration = Duration::from_millis(50);

/// Starts captures against a keyboard hook
pub struct Recorder {
    hook: Arc<dyn KeyboardHook>,
    settings: CaptureSettings,
}

impl Recorder {
    /// Create a recorder
    pub fn new(hook: Arc<dyn KeyboardHook>, settings: CaptureSettings) -> Self {
        Self { hook, settings }
    }

    /// Begin capturing
    ///
    /// The finished recording is delivered as
    /// [`SessionMessage::RecordingFinished`] on `message_tx`.
    pub fn start(&self, message_tx: Sender<SessionMessage>) -> Result<CaptureHandle> {
        self.settings.validate()?;
        let subscription = self.hook.subscribe()?;
        let stop = Arc::new(AtomicBool::new(false));
        let sentinel = self.settings.sentinel();
        let max_duration = self.settings.max_duration();

        let thread_stop = Arc::clone(&stop);
        let thread_sentinel = sentinel.clone();
        let thread = std::thread::Builder::new()
            .name("key-capture".to_string())
            .spawn(move || {
                let started = Instant::now();
                let message = match capture_until_stopped(
                    &subscription,
                    &thread_sentinel,
                    &thread_stop,
                    max_duration,
                    started,
                ) {
                    Ok((recording, reason)) => {
                        tracing::info!(
                            "Capture ended ({}): {} events",
                            reason.description(),
                            recording.len()
                        );
                        SessionMessage::RecordingFinished {
                            recording,
                            reason,
                            elapsed: started.elapsed(),
                        }
                    }
                    Err(e) => {
                        tracing::error!("Capture failed: {}", e);
                        SessionMessage::RecordingFailed(e)
                    }
                };
                let _ = message_tx.send(message);
            })
            .map_err(KeyReplayError::from)
            .context("Failed to spawn capture thread")?;

        tracing::info!("Capture started, stop key '{}'", sentinel);
        Ok(CaptureHandle {
            hook: Arc::clone(&self.hook),
            stop,
            sentinel,
            hold: self.settings.stop_key_hold(),
            grace: self.settings.stop_grace(),
            stop_requested: false,
            release: None,
            thread: Some(thread),
        })
    }
}

/// Control over a running capture
pub struct CaptureHandle {
    hook: Arc<dyn KeyboardHook>,
    stop: Arc<AtomicBool>,
    sentinel: String,
    hold: Duration,
    grace: Duration,
    stop_requested: bool,
    release: Option<StopKeyRelease>,
    thread: Option<JoinHandle<()>>,
}

impl CaptureHandle {
    /// Inject the sentinel key, with the stop flag as fallback
    ///
    /// Returns immediately; the key is pressed and released on a helper
    /// thread. Repeated calls are ignored.
    pub fn request_stop(&mut self) {
        if self.stop_requested {
            return;
        }
        self.stop_requested = true;

        let hook = Arc::clone(&self.hook);
        let stop = Arc::clone(&self.stop);
        let sentinel = self.sentinel.clone();
        let (hold, grace) = (self.hold, self.grace);
        let (released_tx, released_rx) = bounded(1);

        let spawned = std::thread::Builder::new()
            .name("stop-key".to_string())
            .spawn(move || {
                inject_stop_key(hook.as_ref(), &sentinel, hold, grace, &stop, released_tx)
            });
        match spawned {
            Ok(_) => {
                self.release = Some(StopKeyRelease {
                    released: released_rx,
                    timeout: hold + RELEASE_MARGIN,
                });
            }
            Err(e) => {
                tracing::warn!("Could not spawn stop-key thread, forcing stop: {}", e);
                self.force_stop();
            }
        }
    }

    /// Take the pending release of an injected stop key, if any
    pub fn take_stop_key_release(&mut self) -> Option<StopKeyRelease> {
        self.release.take()
    }

    /// Raise the stop flag immediately
    pub fn force_stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    /// Whether a stop has been requested through [`request_stop`](Self::request_stop)
    pub fn stop_requested(&self) -> bool {
        self.stop_requested
    }

    /// Check whether the capture thread has exited
    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().map(|t| t.is_finished()).unwrap_or(true)
    }

    /// Force the capture to stop and wait for its thread
    pub fn stop_and_join(mut self) {
        self.force_stop();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                tracing::error!("Capture thread panicked");
            }
        }
    }
}

impl std::fmt::Debug for CaptureHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureHandle")
            .field("sentinel", &self.sentinel)
            .field("stop_requested", &self.stop_requested)
            .field("finished", &self.is_finished())
            .finish()
    }
}

/// Completion signal for the release half of an injected stop key
#[derive(Debug)]
pub struct StopKeyRelease {
    released: Receiver<()>,
    timeout: Duration,
}

impl StopKeyRelease {
    /// Block until the stop key has been released, bounded by the hold time
    ///
    /// Returns false if the release did not happen in time.
    pub fn wait(&self) -> bool {
        match self.released.recv_timeout(self.timeout) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => true,
            Err(RecvTimeoutError::Timeout) => false,
        }
    }
}

/// Press, hold and release the sentinel key, then raise the stop flag
fn inject_stop_key(
    hook: &dyn KeyboardHook,
    sentinel: &str,
    hold: Duration,
    grace: Duration,
    stop: &AtomicBool,
    released: Sender<()>,
) {
    tracing::debug!("Injecting stop key '{}' (hold {:?})", sentinel, hold);
    if let Err(e) = hook.press(sentinel) {
        tracing::warn!("Stop key press failed, forcing stop: {}", e);
        stop.store(true, Ordering::SeqCst);
        return;
    }
    std::thread::sleep(hold);
    if let Err(e) = hook.release(sentinel) {
        tracing::warn!("Stop key release failed: {}", e);
    }
    let _ = released.send(());

    std::thread::sleep(grace);
    if !stop.swap(true, Ordering::SeqCst) {
        tracing::debug!("Stop flag raised after grace period");
    }
}

/// Collect events until a stop condition holds
///
/// Returns an error message when the hook stream closes mid-capture.
pub fn capture_until_stopped(
    subscription: &Subscription,
    sentinel: &str,
    stop: &AtomicBool,
    max_duration: Option<Duration>,
    started: Instant,
) -> std::result::Result<(Recording, CaptureStopReason), String> {
    let mut recording = Recording::new();

    loop {
        if stop.load(Ordering::SeqCst) {
            // Keep what the hook already delivered
            for event in subscription.drain() {
                if record_event(&mut recording, &event, sentinel, started) {
                    return Ok((recording, CaptureStopReason::Sentinel));
                }
            }
            return Ok((recording, CaptureStopReason::Forced));
        }
        if max_duration.is_some_and(|max| started.elapsed() >= max) {
            return Ok((recording, CaptureStopReason::TimedOut));
        }

        match subscription.recv_timeout(POLL_INTERVAL) {
            Ok(event) => {
                if record_event(&mut recording, &event, sentinel, started) {
                    return Ok((recording, CaptureStopReason::Sentinel));
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                return Err("keyboard hook stream closed during capture".to_string());
            }
        }
    }
}

/// Add one hook event to `recording`; true when it is the sentinel press
fn record_event(
    recording: &mut Recording,
    event: &HookEvent,
    sentinel: &str,
    started: Instant,
) -> bool {
    let event = KeyEvent::from_hook(event, started);
    if event.is_press_of(sentinel) {
        return true;
    }
    // Leftover release of the key that stopped the previous capture
    if recording.is_empty()
        && event.action == KeyAction::Up
        && keymap::same_key(&event.name, sentinel)
    {
        tracing::debug!("Dropping leading '{}' release", sentinel);
        return false;
    }
    tracing::trace!("Captured {}", event);
    recording.push(event);
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hook::{MockKeyboard, SubscriberRegistry};
    use crate::types::KeyAction;
    use crossbeam_channel::unbounded;

    fn settings() -> CaptureSettings {
        CaptureSettings {
            stop_key_hold_ms: 100,
            stop_grace_ms: 50,
            ..Default::default()
        }
    }

    fn finished(rx: &crossbeam_channel::Receiver<SessionMessage>) -> (Recording, CaptureStopReason) {
        match rx.recv_timeout(Duration::from_secs(5)).unwrap() {
            SessionMessage::RecordingFinished {
                recording, reason, ..
            } => (recording, reason),
            other => panic!("unexpected message {:?}", other),
        }
    }

    #[test]
    fn test_sentinel_press_ends_capture() {
        let hook = Arc::new(MockKeyboard::new());
        let (tx, rx) = unbounded();
        let handle = Recorder::new(hook.clone(), settings()).start(tx).unwrap();

        hook.tap("a");
        hook.emit("esc", KeyAction::Down);
        hook.tap("b");

        let (recording, reason) = finished(&rx);
        assert_eq!(reason, CaptureStopReason::Sentinel);
        let names: Vec<_> = recording.events().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["a", "a"]);
        assert!(recording.events()[0].time <= recording.events()[1].time);

        handle.stop_and_join();
    }

    #[test]
    fn test_request_stop_injects_sentinel() {
        let hook = Arc::new(MockKeyboard::new());
        let (tx, rx) = unbounded();
        let mut handle = Recorder::new(hook.clone(), settings()).start(tx).unwrap();

        hook.tap("x");
        handle.request_stop();
        handle.request_stop();

        let (recording, reason) = finished(&rx);
        assert_eq!(reason, CaptureStopReason::Sentinel);
        assert_eq!(recording.len(), 2);

        std::thread::sleep(Duration::from_millis(250));
        let injected: Vec<_> = hook.synthesized().into_iter().map(|k| k.name).collect();
        assert_eq!(injected, vec!["esc", "esc"]);
    }

    #[test]
    fn test_stop_key_release_can_be_awaited() {
        let hook = Arc::new(MockKeyboard::new());
        let (tx, rx) = unbounded();
        let mut handle = Recorder::new(hook.clone(), settings()).start(tx).unwrap();
        assert!(handle.take_stop_key_release().is_none());

        handle.request_stop();
        finished(&rx);
        let release = handle.take_stop_key_release().unwrap();
        assert!(release.wait());

        let injected: Vec<_> = hook.synthesized().into_iter().map(|k| k.action).collect();
        assert_eq!(injected, vec![KeyAction::Down, KeyAction::Up]);
    }

    #[test]
    fn test_leading_sentinel_release_is_dropped() {
        let registry = SubscriberRegistry::new();
        let subscription = registry.subscribe();
        for (name, action, code) in [
            ("esc", KeyAction::Up, 1),
            ("b", KeyAction::Down, 48),
            ("esc", KeyAction::Up, 1),
        ] {
            registry.broadcast(&crate::hook::HookEvent::now(name, action, code));
        }

        let stop = AtomicBool::new(true);
        let (recording, _) =
            capture_until_stopped(&subscription, "esc", &stop, None, Instant::now()).unwrap();
        let names: Vec<_> = recording.events().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["b", "esc"]);
    }

    #[test]
    fn test_lost_stop_key_falls_back_to_flag() {
        let hook = Arc::new(MockKeyboard::new().with_loopback(false));
        let (tx, rx) = unbounded();
        let mut handle = Recorder::new(hook.clone(), settings()).start(tx).unwrap();

        hook.tap("x");
        handle.request_stop();

        let (recording, reason) = finished(&rx);
        assert_eq!(reason, CaptureStopReason::Forced);
        assert_eq!(recording.len(), 2);
    }

    #[test]
    fn test_force_stop() {
        let hook = Arc::new(MockKeyboard::new());
        let (tx, rx) = unbounded();
        let handle = Recorder::new(hook.clone(), settings()).start(tx).unwrap();

        handle.force_stop();
        let (recording, reason) = finished(&rx);
        assert_eq!(reason, CaptureStopReason::Forced);
        assert!(recording.is_empty());
        assert!(hook.synthesized().is_empty());
    }

    #[test]
    fn test_max_duration_times_out() {
        let hook = Arc::new(MockKeyboard::new());
        let (tx, rx) = unbounded();
        let settings = CaptureSettings {
            max_duration_secs: Some(0),
            ..settings()
        };
        let _handle = Recorder::new(hook, settings).start(tx).unwrap();

        let (_, reason) = finished(&rx);
        assert_eq!(reason, CaptureStopReason::TimedOut);
    }

    #[test]
    fn test_install_failure_is_synchronous() {
        let hook = Arc::new(MockKeyboard::new().with_install_failure("no access"));
        let (tx, rx) = unbounded();
        let err = Recorder::new(hook, settings()).start(tx).unwrap_err();
        assert!(err.is_hook_install());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_closed_stream_fails_capture() {
        let registry = SubscriberRegistry::new();
        let subscription = registry.subscribe();
        drop(registry);

        let stop = AtomicBool::new(false);
        let result = capture_until_stopped(&subscription, "esc", &stop, None, Instant::now());
        assert!(result.is_err());
    }

    #[test]
    fn test_events_pending_at_stop_are_kept() {
        let registry = SubscriberRegistry::new();
        let subscription = registry.subscribe();
        registry.broadcast(&crate::hook::HookEvent::now("q", KeyAction::Down, 16));

        let stop = AtomicBool::new(true);
        let (recording, reason) =
            capture_until_stopped(&subscription, "esc", &stop, None, Instant::now()).unwrap();
        assert_eq!(reason, CaptureStopReason::Forced);
        assert_eq!(recording.len(), 1);
    }
}
