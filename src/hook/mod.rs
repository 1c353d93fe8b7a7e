//! Global keyboard hook interface
//!
//! Everything the engine needs from the operating system goes through the
//! [`KeyboardHook`] trait: a live stream of key events, synthesis of single
//! events, and timed replay of a whole sequence. The real implementation
//! wraps `rdev`; [`MockKeyboard`] is a scriptable stand-in used by tests and
//! for running the engine without touching the real keyboard.
//!
//! # Subscriptions
//!
//! A hook fans every captured event out to all live [`Subscription`]s, so
//! the recorder and the global hotkeys can listen at the same time. A
//! subscription unregisters itself when dropped.

pub mod mock_hook;
pub mod rdev_hook;

pub use mock_hook::{MockKeyboard, SynthesizedKey};
pub use rdev_hook::RdevHook;

use crate::error::Result;
use crate::types::{KeyAction, KeyEvent};
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::{Duration, Instant};

/// A raw key event delivered by the hook
#[derive(Debug, Clone)]
pub struct HookEvent {
    /// Key name as reported by the hook
    pub name: String,
    /// Press or release
    pub action: KeyAction,
    /// Hardware scan code
    pub scan_code: u32,
    /// When the hook observed the event
    pub time: Instant,
}

impl HookEvent {
    /// Create an event stamped with the current instant
    pub fn now(name: impl Into<String>, action: KeyAction, scan_code: u32) -> Self {
        Self {
            name: name.into(),
            action,
            scan_code,
            time: Instant::now(),
        }
    }
}

/// Unified interface for keyboard capture and synthesis
///
/// Implementations must be shareable across threads: the recorder and the
/// player run on background threads while the UI thread may inject the
/// stop key.
#[cfg_attr(test, mockall::automock)]
pub trait KeyboardHook: Send + Sync {
    /// Start receiving live key events
    ///
    /// Fails with [`KeyReplayError::HookInstall`](crate::error::KeyReplayError::HookInstall)
    /// when the OS hook cannot be installed.
    fn subscribe(&self) -> Result<Subscription>;

    /// Press a single named key
    fn press(&self, key: &str) -> Result<()>;

    /// Release a single named key
    fn release(&self, key: &str) -> Result<()>;

    /// Synthesize one recorded event
    fn send(&self, event: &KeyEvent) -> Result<()>;

    /// Reproduce a sequence of events, spaced by their timestamps
    fn play(&self, events: &[KeyEvent]) -> Result<()> {
        play_with_delays(self, events)
    }
}

/// Send events in order, sleeping the gap between consecutive timestamps
///
/// The first event is sent immediately; only relative spacing matters.
pub fn play_with_delays<H: KeyboardHook + ?Sized>(hook: &H, events: &[KeyEvent]) -> Result<()> {
    let mut last_time: Option<f64> = None;
    for event in events {
        if let Some(previous) = last_time {
            let gap = event.time - previous;
            if gap > 0.0 {
                std::thread::sleep(Duration::from_secs_f64(gap));
            }
        }
        last_time = Some(event.time);
        hook.send(event)?;
    }
    Ok(())
}

/// Fan-out list of live subscribers
#[derive(Debug, Default)]
pub struct SubscriberRegistry {
    next_id: AtomicU64,
    senders: Mutex<Vec<(u64, Sender<HookEvent>)>>,
}

impl SubscriberRegistry {
    /// Create an empty registry
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Register a new subscriber
    pub fn subscribe(self: &Arc<Self>) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = unbounded();
        self.lock().push((id, tx));
        tracing::debug!("Hook subscriber {} registered", id);

        Subscription {
            id,
            receiver: rx,
            registry: Arc::downgrade(self),
        }
    }

    /// Deliver an event to every live subscriber, pruning closed ones
    pub fn broadcast(&self, event: &HookEvent) {
        self.lock()
            .retain(|(_, sender)| sender.send(event.clone()).is_ok());
    }

    /// Number of live subscribers
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn remove(&self, id: u64) {
        self.lock().retain(|(sub_id, _)| *sub_id != id);
        tracing::debug!("Hook subscriber {} removed", id);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(u64, Sender<HookEvent>)>> {
        self.senders.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A live stream of hook events
///
/// Dropping the subscription stops delivery.
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    receiver: Receiver<HookEvent>,
    registry: Weak<SubscriberRegistry>,
}

impl Subscription {
    /// Wait up to `timeout` for the next event
    pub fn recv_timeout(&self, timeout: Duration) -> std::result::Result<HookEvent, RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    /// Take the next event without blocking
    pub fn try_recv(&self) -> std::result::Result<HookEvent, TryRecvError> {
        self.receiver.try_recv()
    }

    /// Take every pending event
    pub fn drain(&self) -> Vec<HookEvent> {
        self.receiver.try_iter().collect()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(self.id);
        }
    }
}
