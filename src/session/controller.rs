//! The session: one coordinator for capture, playback and files
//!
//! [`Session`] owns the current [`Recording`] and the state machine
//!
//! ```text
//!   Idle ──start_recording──▶ Recording ──finished / failed──▶ Idle
//!   Idle ──start_playback───▶ Playing   ──finished / failed / cancelled──▶ Idle
//! ```
//!
//! Commands run on the caller's thread and either succeed or return an
//! error without changing anything. Capture and playback run on a
//! background thread whose results come back as [`SessionMessage`]s;
//! they take effect when the owner calls [`Session::drain`] (once per UI
//! frame) or [`Session::wait_message`].

use chrono::Local;
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::{AppConfig, ReplaySettings};
use crate::error::{KeyReplayError, Result};
use crate::hook::KeyboardHook;
use crate::types::Recording;

use super::codec;
use super::hotkeys::HotkeyAction;
use super::player::{PlaybackHandle, PlaybackRequest, Player};
use super::recorder::{CaptureHandle, Recorder, StopKeyRelease};
use super::types::{PlaybackProgress, SessionMessage, SessionState};

/// Lines kept in the session log
pub const MAX_LOG_LINES: usize = 500;

/// Recorder/player session
pub struct Session {
    hook: Arc<dyn KeyboardHook>,
    config: AppConfig,
    state: SessionState,
    recording: Recording,
    progress: Option<PlaybackProgress>,
    log: VecDeque<String>,
    last_error: Option<String>,
    message_tx: Sender<SessionMessage>,
    message_rx: Receiver<SessionMessage>,
    capture: Option<CaptureHandle>,
    /// Release of a stop key injected into the previous capture
    stop_key: Option<StopKeyRelease>,
    playback: Option<PlaybackHandle>,
}

impl Session {
    /// Create an idle session with an empty recording
    pub fn new(hook: Arc<dyn KeyboardHook>, config: AppConfig) -> Self {
        let (message_tx, message_rx) = unbounded();
        Self {
            hook,
            config,
            state: SessionState::Idle,
            recording: Recording::new(),
            progress: None,
            log: VecDeque::new(),
            last_error: None,
            message_tx,
            message_rx,
            capture: None,
            stop_key: None,
            playback: None,
        }
    }

    // ==================== Status ====================

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Pass counter of the running playback
    pub fn progress(&self) -> Option<PlaybackProgress> {
        self.progress
    }

    /// The current recording
    pub fn recording(&self) -> &Recording {
        &self.recording
    }

    /// Human-readable activity log, oldest first
    pub fn log(&self) -> impl Iterator<Item = &str> {
        self.log.iter().map(String::as_str)
    }

    /// Most recent background failure
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Take the most recent background failure, clearing it
    pub fn take_last_error(&mut self) -> Option<String> {
        self.last_error.take()
    }

    /// Replay settings used by the next playback
    pub fn settings(&self) -> ReplaySettings {
        self.config.replay
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Whether a stop has already been requested for the running capture
    pub fn stop_requested(&self) -> bool {
        self.capture
            .as_ref()
            .map(CaptureHandle::stop_requested)
            .unwrap_or(false)
    }

    /// Whether the running playback has been asked to stop
    pub fn stop_pending(&self) -> bool {
        self.playback
            .as_ref()
            .map(PlaybackHandle::is_cancelled)
            .unwrap_or(false)
    }

    // ==================== Commands ====================

    /// Start capturing; the current recording is discarded
    pub fn start_recording(&mut self) -> Result<()> {
        self.require_idle("start recording")?;
        if let Some(release) = self.stop_key.take() {
            if !release.wait() {
                tracing::warn!("Previous stop key was not released in time");
            }
        }

        let recorder = Recorder::new(Arc::clone(&self.hook), self.config.capture.clone());
        let capture = recorder.start(self.message_tx.clone()).map_err(|e| {
            self.push_log(format!("Cannot start recording: {}", e));
            e
        })?;

        self.recording = Recording::new();
        self.capture = Some(capture);
        self.state = SessionState::Recording;
        self.push_log(format!(
            "Recording... press '{}' to stop",
            self.config.capture.sentinel()
        ));
        Ok(())
    }

    /// Stop capturing by injecting the stop key
    pub fn stop_recording(&mut self) -> Result<()> {
        let capture = self.require_capture("stop recording")?;
        if capture.stop_requested() {
            return Ok(());
        }
        capture.request_stop();
        self.push_log("Stopping recording...".to_string());
        Ok(())
    }

    /// Stop capturing without injecting the stop key
    pub fn force_stop_recording(&mut self) -> Result<()> {
        self.require_capture("force stop recording")?.force_stop();
        self.push_log("Recording force-stopped".to_string());
        Ok(())
    }

    /// Replay the current recording in the background
    pub fn start_playback(&mut self) -> Result<()> {
        self.require_idle("start playback")?;
        let (count, speed) = self.config.replay.validate()?;
        if self.recording.is_empty() {
            return Err(KeyReplayError::InvalidConfiguration(
                "no recording to play back".to_string(),
            ));
        }

        let request = PlaybackRequest {
            events: self.recording.events().to_vec(),
            count,
            speed,
            timing: self.config.playback,
        };
        let handle = Player::new(Arc::clone(&self.hook)).start(request, self.message_tx.clone())?;

        self.playback = Some(handle);
        self.progress = None;
        self.state = SessionState::Playing;
        let lead_in = self.config.playback.lead_in();
        if lead_in.is_zero() {
            self.push_log(format!("Playback started: {} passes at speed {}", count.get(), speed.get()));
        } else {
            self.push_log(format!(
                "Playback starts in {:.0} s: {} passes at speed {}",
                lead_in.as_secs_f64(),
                count.get(),
                speed.get()
            ));
        }
        Ok(())
    }

    /// Ask the playback to stop at the next pass boundary
    pub fn stop_playback(&mut self) -> Result<()> {
        let playback = self.playback.as_ref().filter(|_| self.state.is_playing()).ok_or_else(|| {
            KeyReplayError::PreconditionViolation("cannot stop playback: not playing".to_string())
        })?;
        if playback.is_cancelled() {
            return Ok(());
        }
        playback.cancel();
        self.push_log("Stopping playback after the current pass...".to_string());
        Ok(())
    }

    /// Discard the current recording and reset the log
    pub fn clear(&mut self) -> Result<()> {
        self.require_idle("clear the recording")?;
        if self.recording.is_empty() {
            return Err(KeyReplayError::InvalidConfiguration(
                "no recording to clear".to_string(),
            ));
        }
        self.recording = Recording::new();
        // Per-key statistics in the log describe the discarded recording
        self.log.clear();
        self.push_log("Recording cleared".to_string());
        Ok(())
    }

    /// Replace the current recording with the contents of `path`
    ///
    /// On failure the current recording is kept.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<usize> {
        self.require_idle("load a recording")?;
        let path = path.as_ref();
        let recording = codec::load_from_path(path).map_err(|e| {
            self.push_log(format!("Load failed: {}", e));
            e
        })?;

        let count = recording.len();
        self.recording = recording;
        self.push_log(format!("Loaded {} events from {}", count, path.display()));
        Ok(count)
    }

    /// Save the current recording into `dir` under a generated name
    pub fn save(&mut self, dir: impl AsRef<Path>) -> Result<PathBuf> {
        self.require_saveable()?;
        let path = codec::save_to_dir(&self.recording, dir)?;
        self.push_log(format!("Saved {} events to {}", self.recording.len(), path.display()));
        Ok(path)
    }

    /// Save the current recording to `path`
    pub fn save_to(&mut self, path: impl AsRef<Path>) -> Result<()> {
        self.require_saveable()?;
        let path = path.as_ref();
        codec::save_to_path(&self.recording, path)?;
        self.push_log(format!("Saved {} events to {}", self.recording.len(), path.display()));
        Ok(())
    }

    /// Validate and store replay settings for the next playback
    pub fn set_replay_settings(&mut self, settings: ReplaySettings) -> Result<()> {
        settings.validate()?;
        if settings != self.config.replay {
            tracing::debug!(
                "Replay settings: {} passes, speed {}",
                settings.replay_count,
                settings.replay_speed
            );
        }
        self.config.replay = settings;
        Ok(())
    }

    /// Run the command bound to a global shortcut
    pub fn handle_hotkey(&mut self, action: HotkeyAction) -> Result<()> {
        let result = match action {
            HotkeyAction::StartPlayback => self.start_playback(),
            HotkeyAction::StopPlayback => self.stop_playback(),
        };
        if let Err(ref e) = result {
            tracing::warn!("Hotkey {:?} rejected: {}", action, e);
        }
        result
    }

    /// Stop any background work
    ///
    /// A running capture is stopped and joined; a running playback is
    /// cancelled and left to finish its current pass.
    pub fn shutdown(&mut self) {
        if let Some(playback) = self.playback.take() {
            playback.cancel();
        }
        if let Some(capture) = self.capture.take() {
            capture.stop_and_join();
        }
        self.state = SessionState::Idle;
        self.progress = None;
        tracing::info!("Session shut down");
    }

    // ==================== Background messages ====================

    /// Apply every pending background message and return them in order
    pub fn drain(&mut self) -> Vec<SessionMessage> {
        let messages: Vec<_> = self.message_rx.try_iter().collect();
        for message in &messages {
            self.apply(message.clone());
        }
        messages
    }

    /// Wait up to `timeout` for one background message and apply it
    pub fn wait_message(&mut self, timeout: Duration) -> Option<SessionMessage> {
        match self.message_rx.recv_timeout(timeout) {
            Ok(message) => {
                self.apply(message.clone());
                Some(message)
            }
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Apply messages until the session is idle or `timeout` elapses
    pub fn wait_idle(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while !self.state.is_idle() {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            self.wait_message(deadline - now);
        }
        true
    }

    fn apply(&mut self, message: SessionMessage) {
        match message {
            SessionMessage::RecordingFinished {
                recording,
                reason,
                elapsed,
            } => {
                if !self.state.is_recording() {
                    tracing::warn!("Ignoring capture result outside of recording");
                    return;
                }
                self.finish_capture();
                self.state = SessionState::Idle;
                self.push_log(format!(
                    "Recording finished ({}): {} events in {:.1} s",
                    reason.description(),
                    recording.len(),
                    elapsed.as_secs_f64()
                ));
                for (key, count) in recording.key_press_counts() {
                    self.push_log(format!("  '{}' pressed {} time(s)", key, count));
                }
                self.recording = recording;
            }
            SessionMessage::RecordingFailed(error) => {
                self.finish_capture();
                self.state = SessionState::Idle;
                self.push_log(format!("Recording failed: {}", error));
                self.last_error = Some(error);
            }
            SessionMessage::PlaybackProgress(progress) => {
                self.progress = Some(progress);
                self.push_log(format!("Replaying pass {}", progress));
            }
            SessionMessage::PlaybackFinished(outcome) => {
                self.playback = None;
                self.progress = None;
                self.state = SessionState::Idle;
                self.push_log(outcome.to_string());
            }
            SessionMessage::PlaybackFailed(error) => {
                self.playback = None;
                self.progress = None;
                self.state = SessionState::Idle;
                self.push_log(format!("Playback failed: {}", error));
                self.last_error = Some(error);
            }
        }
    }

    // ==================== Helpers ====================

    fn finish_capture(&mut self) {
        self.stop_key = self
            .capture
            .take()
            .and_then(|mut capture| capture.take_stop_key_release());
    }

    fn require_idle(&self, action: &str) -> Result<()> {
        if self.state.is_idle() {
            return Ok(());
        }
        tracing::warn!("Rejected '{}' while {}", action, self.state);
        Err(KeyReplayError::PreconditionViolation(format!(
            "cannot {} while {}",
            action,
            self.state.display_name().to_lowercase()
        )))
    }

    fn require_capture(&mut self, action: &str) -> Result<&mut CaptureHandle> {
        let state = self.state;
        self.capture
            .as_mut()
            .filter(|_| state.is_recording())
            .ok_or_else(|| {
                KeyReplayError::PreconditionViolation(format!("cannot {}: not recording", action))
            })
    }

    fn require_saveable(&self) -> Result<()> {
        if self.state.is_recording() {
            return Err(KeyReplayError::PreconditionViolation(
                "cannot save while recording".to_string(),
            ));
        }
        if self.recording.is_empty() {
            return Err(KeyReplayError::InvalidConfiguration(
                "no recording to save".to_string(),
            ));
        }
        Ok(())
    }

    fn push_log(&mut self, line: String) {
        tracing::info!("{}", line);
        if self.log.len() >= MAX_LOG_LINES {
            self.log.pop_front();
        }
        self.log
            .push_back(format!("[{}] {}", Local::now().format("%H:%M:%S"), line));
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Some(playback) = &self.playback {
            playback.cancel();
        }
        if let Some(capture) = &self.capture {
            capture.force_stop();
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("state", &self.state)
            .field("events", &self.recording.len())
            .field("progress", &self.progress)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hook::MockKeyboard;
    use crate::types::{KeyAction, KeyEvent};

    const WAIT: Duration = Duration::from_secs(5);

    fn session_with(hook: Arc<MockKeyboard>) -> Session {
        let mut config = AppConfig::immediate();
        config.capture.stop_key_hold_ms = 100;
        config.capture.stop_grace_ms = 50;
        Session::new(hook, config)
    }

    fn record_taps(session: &mut Session, hook: &MockKeyboard, keys: &[&str]) {
        session.start_recording().unwrap();
        for key in keys {
            hook.tap(key);
        }
        hook.emit("esc", KeyAction::Down);
        assert!(session.wait_idle(WAIT));
    }

    #[test]
    fn test_record_then_play() {
        let hook = Arc::new(MockKeyboard::new());
        let mut session = session_with(hook.clone());

        record_taps(&mut session, &hook, &["h", "i"]);
        assert_eq!(session.recording().len(), 4);
        assert!(session.log().any(|l| l.contains("'h' pressed 1 time(s)")));

        session.set_replay_settings(ReplaySettings::new(2, 3)).unwrap();
        session.start_playback().unwrap();
        assert_eq!(session.state(), SessionState::Playing);
        assert!(session.wait_idle(WAIT));

        assert_eq!(hook.play_count(), 2);
        assert_eq!(hook.synthesized_in_pass(2).len(), 4);
        assert!(session.progress().is_none());
        assert!(session.log().any(|l| l.contains("Playback finished: 2 passes")));
    }

    #[test]
    fn test_commands_rejected_while_recording() {
        let hook = Arc::new(MockKeyboard::new());
        let mut session = session_with(hook.clone());
        record_taps(&mut session, &hook, &["a"]);

        session.start_recording().unwrap();
        assert!(session.recording().is_empty());

        assert!(session.start_playback().unwrap_err().is_precondition_violation());
        assert!(session.start_recording().unwrap_err().is_precondition_violation());
        assert!(session.clear().unwrap_err().is_precondition_violation());
        assert!(session.load("whatever.json").unwrap_err().is_precondition_violation());
        assert!(session.stop_playback().unwrap_err().is_precondition_violation());
        assert_eq!(session.state(), SessionState::Recording);

        session.force_stop_recording().unwrap();
        assert!(session.wait_idle(WAIT));
    }

    #[test]
    fn test_stop_recording_commands_need_a_capture() {
        let mut session = session_with(Arc::new(MockKeyboard::new()));
        assert!(session.stop_recording().unwrap_err().is_precondition_violation());
        assert!(session
            .force_stop_recording()
            .unwrap_err()
            .is_precondition_violation());
    }

    #[test]
    fn test_stop_recording_via_injected_key() {
        let hook = Arc::new(MockKeyboard::new());
        let mut session = session_with(hook.clone());

        session.start_recording().unwrap();
        hook.tap("z");
        session.stop_recording().unwrap();
        assert!(session.stop_requested());
        session.stop_recording().unwrap();

        assert!(session.wait_idle(WAIT));
        assert_eq!(session.recording().len(), 2);
    }

    #[test]
    fn test_empty_recording_guards() {
        let hook = Arc::new(MockKeyboard::new());
        let mut session = session_with(hook.clone());

        assert!(session.start_playback().unwrap_err().is_invalid_configuration());
        assert!(session.clear().unwrap_err().is_invalid_configuration());
        let dir = tempfile::tempdir().unwrap();
        assert!(session.save(dir.path()).unwrap_err().is_invalid_configuration());

        assert_eq!(session.state(), SessionState::Idle);
        assert!(hook.synthesized().is_empty());
    }

    #[test]
    fn test_invalid_settings_are_rejected_not_clamped() {
        let mut session = session_with(Arc::new(MockKeyboard::new()));
        let before = session.settings();

        assert!(session
            .set_replay_settings(ReplaySettings::new(101, 1))
            .unwrap_err()
            .is_invalid_configuration());
        assert!(session
            .set_replay_settings(ReplaySettings::new(1, 0))
            .unwrap_err()
            .is_invalid_configuration());
        assert_eq!(session.settings(), before);
    }

    #[test]
    fn test_hook_install_failure_keeps_idle() {
        let hook = Arc::new(MockKeyboard::new().with_install_failure("no permission"));
        let mut session = session_with(hook);

        assert!(session.start_recording().unwrap_err().is_hook_install());
        assert_eq!(session.state(), SessionState::Idle);
        assert!(session.log().any(|l| l.contains("no permission")));
    }

    #[test]
    fn test_playback_failure_returns_to_idle() {
        let hook = Arc::new(MockKeyboard::new().with_synthesis_failure_after(1));
        let mut session = session_with(hook.clone());
        record_taps(&mut session, &hook, &["a"]);

        session.start_playback().unwrap();
        assert!(session.wait_idle(WAIT));
        assert!(session.last_error().unwrap().contains("mock synthesis refused"));
        assert!(session.take_last_error().is_some());
        assert!(session.last_error().is_none());
    }

    #[test]
    fn test_failed_load_keeps_recording() {
        let hook = Arc::new(MockKeyboard::new());
        let mut session = session_with(hook.clone());
        record_taps(&mut session, &hook, &["a"]);

        let dir = tempfile::tempdir().unwrap();
        let bad = dir.path().join("bad.json");
        std::fs::write(&bad, r#"[{"name": "a", "event_type": "down", "time": 0.0}]"#).unwrap();

        assert!(session.load(&bad).unwrap_err().is_persistence_format());
        assert_eq!(session.recording().len(), 2);
    }

    #[test]
    fn test_save_load_clear() {
        let hook = Arc::new(MockKeyboard::new());
        let mut session = session_with(hook.clone());
        record_taps(&mut session, &hook, &["a", "b"]);
        let original = session.recording().clone();

        let dir = tempfile::tempdir().unwrap();
        let path = session.save(dir.path()).unwrap();
        assert!(session.log().any(|l| l.contains("'b' pressed 1 time(s)")));
        session.clear().unwrap();
        assert!(session.recording().is_empty());
        let log: Vec<_> = session.log().collect();
        assert_eq!(log.len(), 1);
        assert!(log[0].ends_with("Recording cleared"));

        assert_eq!(session.load(&path).unwrap(), 4);
        assert_eq!(session.recording(), &original);

        let explicit = dir.path().join("mine.json");
        session.save_to(&explicit).unwrap();
        assert!(explicit.exists());
    }

    #[test]
    fn test_hotkeys_route_to_playback_commands() {
        let hook = Arc::new(MockKeyboard::new());
        let mut session = session_with(hook.clone());
        session.config.playback.lead_in_ms = 10_000;
        session.recording = Recording::from_events(vec![KeyEvent::new("a", KeyAction::Down, 30, 0.0)]);

        session.handle_hotkey(HotkeyAction::StartPlayback).unwrap();
        assert!(session
            .handle_hotkey(HotkeyAction::StartPlayback)
            .unwrap_err()
            .is_precondition_violation());

        session.handle_hotkey(HotkeyAction::StopPlayback).unwrap();
        assert!(session.stop_pending());
        assert!(session.wait_idle(WAIT));
        assert!(hook.synthesized().is_empty());
        assert!(session.log().any(|l| l.contains("stopped after 0 of 1")));
    }

    #[test]
    fn test_drain_returns_applied_messages() {
        let hook = Arc::new(MockKeyboard::new());
        let mut session = session_with(hook.clone());
        record_taps(&mut session, &hook, &["a"]);

        session.start_playback().unwrap();
        let mut messages = Vec::new();
        let deadline = Instant::now() + WAIT;
        while !session.state().is_idle() && Instant::now() < deadline {
            messages.extend(session.drain());
            std::thread::sleep(Duration::from_millis(10));
        }

        assert!(matches!(
            messages.last(),
            Some(SessionMessage::PlaybackFinished(outcome)) if !outcome.is_cancelled()
        ));
        assert!(session.log().any(|l| l.contains("Playback finished: 1 passes")));
    }

    #[test]
    fn test_log_is_bounded() {
        let mut session = session_with(Arc::new(MockKeyboard::new()));
        for i in 0..(MAX_LOG_LINES + 20) {
            session.push_log(format!("line {}", i));
        }
        assert_eq!(session.log().count(), MAX_LOG_LINES);
        assert!(session.log().next().unwrap().ends_with("line 20"));
    }

    #[test]
    fn test_shutdown_stops_capture() {
        let hook = Arc::new(MockKeyboard::new());
        let mut session = session_with(hook.clone());
        session.start_recording().unwrap();
        session.shutdown();
        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(hook.subscriber_count(), 0);
    }
}
