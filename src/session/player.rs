//! Replay of a recording
//!
//! Before each playback the player rewrites a private copy of the events
//! with fixed spacing: the first event sits at 1.0 s and every following
//! event `speed`-dependent steps later. The captured timing is discarded.
//!
//! Cancellation is checked only between passes (and during the lead-in),
//! so a pass that has started always runs to the end.

use crossbeam_channel::Sender;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crate::config::PlaybackTiming;
use crate::error::{KeyReplayError, Result, ResultExt};
use crate::hook::KeyboardHook;
use crate::types::KeyEvent;

use super::types::{PlaybackOutcome, PlaybackProgress, ReplayCount, ReplaySpeed, SessionMessage};

/// Timestamp given to the first replayed event
pub const FIRST_EVENT_TIME: f64 = 1.0;

/// Granularity of cancellable waits
const WAIT_SLICE: Duration = Duration::from_millis(25);

/// Copy `events` with evenly spaced timestamps for the given speed
///
/// Event `i` gets `1.0 + i * gap`; names, actions and scan codes are kept.
pub fn rewrite_timestamps(events: &[KeyEvent], speed: ReplaySpeed) -> Vec<KeyEvent> {
    let gap = speed.event_gap();
    events
        .iter()
        .enumerate()
        .map(|(i, event)| KeyEvent {
            time: FIRST_EVENT_TIME + i as f64 * gap,
            ..event.clone()
        })
        .collect()
}

/// Everything needed for one playback
#[derive(Debug, Clone)]
pub struct PlaybackRequest {
    /// Events in capture order (timestamps are rewritten)
    pub events: Vec<KeyEvent>,
    pub count: ReplayCount,
    pub speed: ReplaySpeed,
    pub timing: PlaybackTiming,
}

/// Replays recordings through a keyboard hook
pub struct Player {
    hook: Arc<dyn KeyboardHook>,
}

impl Player {
    /// Create a player
    pub fn new(hook: Arc<dyn KeyboardHook>) -> Self {
        Self { hook }
    }

    /// Run a playback on the current thread
    ///
    /// Sends [`SessionMessage::PlaybackProgress`] at the start of every pass.
    pub fn run(
        &self,
        request: &PlaybackRequest,
        cancel: &AtomicBool,
        message_tx: &Sender<SessionMessage>,
    ) -> Result<PlaybackOutcome> {
        if request.events.is_empty() {
            return Err(KeyReplayError::InvalidConfiguration(
                "nothing to replay: the recording is empty".to_string(),
            ));
        }

        let total = request.count.get();
        let events = rewrite_timestamps(&request.events, request.speed);

        if !wait_unless_cancelled(request.timing.lead_in(), cancel) {
            tracing::info!("Playback cancelled during lead-in");
            return Ok(PlaybackOutcome::Cancelled {
                completed_passes: 0,
                total,
            });
        }

        for pass in 1..=total {
            if cancel.load(Ordering::SeqCst) {
                tracing::info!("Playback cancelled after {} of {} passes", pass - 1, total);
                return Ok(PlaybackOutcome::Cancelled {
                    completed_passes: pass - 1,
                    total,
                });
            }

            let _ = message_tx.send(SessionMessage::PlaybackProgress(PlaybackProgress {
                pass,
                total,
            }));
            tracing::debug!("Replay pass {}/{} ({} events)", pass, total, events.len());

            let started = Instant::now();
            self.hook
                .play(&events)
                .with_context(|| format!("Replay pass {} of {}", pass, total))?;
            tracing::debug!("Pass {} took {:?}", pass, started.elapsed());

            if pass < total {
                wait_unless_cancelled(request.timing.pass_gap(), cancel);
            }
        }

        Ok(PlaybackOutcome::Completed { passes: total })
    }

    /// Run a playback on a background thread
    ///
    /// The result arrives as [`SessionMessage::PlaybackFinished`] or
    /// [`SessionMessage::PlaybackFailed`].
    pub fn start(
        &self,
        request: PlaybackRequest,
        message_tx: Sender<SessionMessage>,
    ) -> Result<PlaybackHandle> {
        let cancel = Arc::new(AtomicBool::new(false));
        let player = Player {
            hook: Arc::clone(&self.hook),
        };
        let thread_cancel = Arc::clone(&cancel);

        let thread = std::thread::Builder::new()
            .name("key-playback".to_string())
            .spawn(move || {
                let message = match player.run(&request, &thread_cancel, &message_tx) {
                    Ok(outcome) => SessionMessage::PlaybackFinished(outcome),
                    Err(e) => {
                        tracing::error!("Playback failed: {}", e);
                        SessionMessage::PlaybackFailed(e.to_string())
                    }
                };
                let _ = message_tx.send(message);
            })
            .map_err(KeyReplayError::from)
            .context("Failed to spawn playback thread")?;

        Ok(PlaybackHandle {
            cancel,
            thread: Some(thread),
        })
    }
}

/// Control over a running playback
#[derive(Debug)]
pub struct PlaybackHandle {
    cancel: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl PlaybackHandle {
    /// Stop at the next pass boundary
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    /// Wait for the playback thread
    pub fn join(mut self) {
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                tracing::error!("Playback thread panicked");
            }
        }
    }
}

/// Sleep for `duration`, waking early on cancellation
///
/// Returns false if cancelled.
fn wait_unless_cancelled(duration: Duration, cancel: &AtomicBool) -> bool {
    let deadline = Instant::now() + duration;
    loop {
        if cancel.load(Ordering::SeqCst) {
            return false;
        }
        let now = Instant::now();
        if now >= deadline {
            return true;
        }
        std::thread::sleep(WAIT_SLICE.min(deadline - now));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hook::mock_hook::MockKeyboard;
    use crate::hook::MockKeyboardHook;
    use crate::types::KeyAction;
    use crossbeam_channel::unbounded;
    use std::sync::atomic::AtomicU32;

    fn events() -> Vec<KeyEvent> {
        vec![
            KeyEvent::new("a", KeyAction::Down, 30, 0.0),
            KeyEvent::new("a", KeyAction::Up, 30, 0.05),
            KeyEvent::new("b", KeyAction::Down, 48, 2.5),
        ]
    }

    fn request(count: u32, speed: u32) -> PlaybackRequest {
        PlaybackRequest {
            events: events(),
            count: ReplayCount::try_from(count).unwrap(),
            speed: ReplaySpeed::try_from(speed).unwrap(),
            timing: PlaybackTiming::immediate(),
        }
    }

    #[test]
    fn test_rewrite_ignores_captured_gaps() {
        let fast = rewrite_timestamps(&events(), ReplaySpeed::try_from(3).unwrap());
        let times: Vec<f64> = fast.iter().map(|e| e.time).collect();
        for (actual, expected) in times.iter().zip([1.0, 1.1, 1.2]) {
            assert!((actual - expected).abs() < 1e-9, "{} != {}", actual, expected);
        }

        let slow = rewrite_timestamps(&events(), ReplaySpeed::try_from(1).unwrap());
        assert!((slow[2].time - 1.6).abs() < 1e-9);
        assert_eq!(slow[2].name, "b");
        assert_eq!(slow[2].scan_code, 48);
    }

    #[test]
    fn test_rewrite_does_not_touch_source() {
        let source = events();
        let _ = rewrite_timestamps(&source, ReplaySpeed::try_from(2).unwrap());
        assert_eq!(source, events());
    }

    #[test]
    fn test_all_passes_complete_with_progress() {
        let hook = Arc::new(MockKeyboard::new());
        let (tx, rx) = unbounded();
        let cancel = AtomicBool::new(false);

        let outcome = Player::new(hook.clone())
            .run(&request(3, 2), &cancel, &tx)
            .unwrap();
        assert_eq!(outcome, PlaybackOutcome::Completed { passes: 3 });
        assert_eq!(hook.play_count(), 3);
        assert_eq!(hook.synthesized().len(), 9);

        let progress: Vec<String> = rx
            .try_iter()
            .filter_map(|m| match m {
                SessionMessage::PlaybackProgress(p) => Some(p.to_string()),
                _ => None,
            })
            .collect();
        assert_eq!(progress, vec!["1/3", "2/3", "3/3"]);
    }

    #[test]
    fn test_cancel_during_pass_finishes_that_pass() {
        let cancel = Arc::new(AtomicBool::new(false));
        let calls = Arc::new(AtomicU32::new(0));

        let mut hook = MockKeyboardHook::new();
        let (flag, counter) = (Arc::clone(&cancel), Arc::clone(&calls));
        hook.expect_play().times(2).returning(move |_| {
            // Cancel arrives while pass 2 of 5 is running
            if counter.fetch_add(1, Ordering::SeqCst) + 1 == 2 {
                flag.store(true, Ordering::SeqCst);
            }
            Ok(())
        });

        let (tx, _rx) = unbounded();
        let outcome = Player::new(Arc::new(hook))
            .run(&request(5, 3), &cancel, &tx)
            .unwrap();
        assert_eq!(
            outcome,
            PlaybackOutcome::Cancelled {
                completed_passes: 2,
                total: 5
            }
        );
    }

    #[test]
    fn test_cancel_during_lead_in() {
        let mut hook = MockKeyboardHook::new();
        hook.expect_play().never();

        let mut req = request(2, 1);
        req.timing.lead_in_ms = 10_000;
        let cancel = Arc::new(AtomicBool::new(false));
        let (tx, _rx) = unbounded();

        let handle_cancel = Arc::clone(&cancel);
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(50));
            handle_cancel.store(true, Ordering::SeqCst);
        });

        let started = Instant::now();
        let outcome = Player::new(Arc::new(hook)).run(&req, &cancel, &tx).unwrap();
        assert_eq!(outcome.completed_passes(), 0);
        assert!(outcome.is_cancelled());
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_synthesis_failure_aborts_remaining_passes() {
        let mut hook = MockKeyboardHook::new();
        hook.expect_play()
            .times(1)
            .returning(|_| Err(KeyReplayError::PlaybackSynthesis("device gone".into())));

        let (tx, _rx) = unbounded();
        let cancel = AtomicBool::new(false);
        let err = Player::new(Arc::new(hook))
            .run(&request(3, 1), &cancel, &tx)
            .unwrap_err();
        assert!(err.is_playback_synthesis());
        assert!(err.to_string().contains("Replay pass 1 of 3"));
    }

    #[test]
    fn test_empty_request_is_rejected() {
        let mut hook = MockKeyboardHook::new();
        hook.expect_play().never();

        let mut req = request(1, 1);
        req.events.clear();
        let (tx, _rx) = unbounded();
        let err = Player::new(Arc::new(hook))
            .run(&req, &AtomicBool::new(false), &tx)
            .unwrap_err();
        assert!(err.is_invalid_configuration());
    }

    #[test]
    fn test_background_playback_reports_outcome() {
        let hook = Arc::new(MockKeyboard::new());
        let (tx, rx) = unbounded();
        let handle = Player::new(hook.clone()).start(request(2, 3), tx).unwrap();

        let outcome = loop {
            match rx.recv_timeout(Duration::from_secs(5)).unwrap() {
                SessionMessage::PlaybackFinished(outcome) => break outcome,
                SessionMessage::PlaybackProgress(_) => continue,
                other => panic!("unexpected message {:?}", other),
            }
        };
        assert_eq!(outcome, PlaybackOutcome::Completed { passes: 2 });
        handle.join();
    }
}
