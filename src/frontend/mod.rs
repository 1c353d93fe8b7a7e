//! Frontend module for egui UI
//!
//! A single window over the [`Session`]: the app drains background
//! messages and hotkeys every frame, renders the panels, then applies the
//! actions they returned.
//!
//! # Main Types
//!
//! - [`KeyReplayApp`] - Main application state implementing [`eframe::App`]
//! - [`AppAction`] - What a panel asks the app to do
//!
//! # Submodules
//!
//! - `panels` - Record, playback, file and log groups
//! - `status_bar` - Bottom status line
//! - `state` - Actions and modal notices

mod panels;
pub mod state;
mod status_bar;

pub use panels::*;
pub use state::{AppAction, Notice, NoticeKind};
pub use status_bar::{render_status_bar, StatusBarContext};

use egui::{Color32, RichText};
use std::sync::Arc;
use std::time::Duration;

use crate::config::AppState;
use crate::hook::KeyboardHook;
use crate::session::{HotkeyWatcher, PlaybackOutcome, Session, SessionMessage};

/// Repaint interval while capture or playback runs in the background
const BUSY_REPAINT: Duration = Duration::from_millis(100);

/// Repaint interval while idle, so global hotkeys are noticed
const IDLE_REPAINT: Duration = Duration::from_millis(250);

/// Main application
pub struct KeyReplayApp {
    session: Session,
    hotkeys: Option<HotkeyWatcher>,
    app_state: AppState,
    inputs: PlaybackInputs,
    notice: Option<Notice>,
    show_log: bool,
}

impl KeyReplayApp {
    /// Create the app around a keyboard hook
    pub fn new(
        _cc: &eframe::CreationContext<'_>,
        hook: Arc<dyn KeyboardHook>,
        app_state: AppState,
    ) -> Self {
        let mut notice = None;
        let hotkeys = if app_state.config.hotkeys.enabled {
            match HotkeyWatcher::new(hook.as_ref(), &app_state.config.hotkeys) {
                Ok(watcher) => Some(watcher),
                Err(e) => {
                    tracing::warn!("Global hotkeys unavailable: {}", e);
                    notice = Some(Notice::error("Hotkeys unavailable", e.to_string()));
                    None
                }
            }
        } else {
            None
        };

        let session = Session::new(hook, app_state.config.clone());
        Self {
            inputs: PlaybackInputs::from(session.settings()),
            show_log: app_state.ui_preferences.show_log,
            session,
            hotkeys,
            app_state,
            notice,
        }
    }

    /// Apply background messages and hotkeys; returns true if anything happened
    fn process_session_messages(&mut self) -> bool {
        let messages = self.session.drain();
        let mut changed = !messages.is_empty();

        if let Some(error) = self.session.take_last_error() {
            self.notice = Some(Notice::error("Operation failed", error));
        }
        let completed = messages.iter().find_map(|message| match message {
            SessionMessage::PlaybackFinished(outcome @ PlaybackOutcome::Completed { .. }) => {
                Some(*outcome)
            }
            _ => None,
        });
        if let (Some(outcome), None) = (completed, &self.notice) {
            self.notice = Some(Notice::info("Playback", outcome.to_string()));
        }

        let pressed = self
            .hotkeys
            .as_ref()
            .map(HotkeyWatcher::poll)
            .unwrap_or_default();
        for action in pressed {
            changed = true;
            // Rejections are logged by the session; no modal for hotkeys
            let _ = self.session.handle_hotkey(action);
        }
        changed
    }

    fn handle_action(&mut self, action: AppAction) {
        let result = match action {
            AppAction::StartRecording => self.session.start_recording(),
            AppAction::StopRecording => self.session.stop_recording(),
            AppAction::ForceStopRecording => self.session.force_stop_recording(),
            AppAction::StartPlayback => self.session.start_playback(),
            AppAction::StopPlayback => self.session.stop_playback(),
            AppAction::SetReplaySettings(settings) => {
                let result = self.session.set_replay_settings(settings);
                if result.is_ok() {
                    self.app_state.config.replay = settings;
                }
                result
            }
            AppAction::Save => {
                let dir = self.app_state.save_dir();
                self.session.save(dir).map(|path| {
                    self.app_state
                        .add_recent_recording(&path, self.session.recording().len());
                    self.notice = Some(Notice::info("Saved", path.display().to_string()));
                })
            }
            AppAction::SaveAs(path) => self.session.save_to(&path).map(|()| {
                self.app_state
                    .add_recent_recording(&path, self.session.recording().len());
            }),
            AppAction::Load(path) => match self.session.load(&path) {
                Ok(count) => {
                    self.app_state.add_recent_recording(&path, count);
                    Ok(())
                }
                Err(e) => {
                    if !path.exists() {
                        self.app_state.remove_recent_recording(&path);
                    }
                    Err(e)
                }
            },
            AppAction::SetSaveDir(dir) => {
                tracing::info!("Recordings folder set to {}", dir.display());
                self.app_state.recordings_dir = Some(dir);
                Ok(())
            }
            AppAction::Clear => self.session.clear(),
            AppAction::DismissNotice => {
                self.notice = None;
                Ok(())
            }
            AppAction::ToggleLog => {
                self.show_log = !self.show_log;
                self.app_state.ui_preferences.show_log = self.show_log;
                Ok(())
            }
        };

        if let Err(e) = result {
            tracing::warn!("Action failed: {}", e);
            if e.is_invalid_configuration() {
                // Put the inputs back to the values the session accepted
                self.inputs = PlaybackInputs::from(self.session.settings());
            }
            self.notice = Some(Notice::error("Cannot do that", e.to_string()));
        }
    }

    fn render_notice(&self, ctx: &egui::Context, actions: &mut Vec<AppAction>) {
        let Some(notice) = &self.notice else {
            return;
        };
        let color = match notice.kind {
            NoticeKind::Info => ctx.style().visuals.text_color(),
            NoticeKind::Error => Color32::LIGHT_RED,
        };
        egui::Window::new(notice.title.as_str())
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.label(RichText::new(&notice.message).color(color));
                ui.add_space(8.0);
                if ui.button("OK").clicked() {
                    actions.push(AppAction::DismissNotice);
                }
            });
    }
}

impl eframe::App for KeyReplayApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let had_messages = self.process_session_messages();
        let state = self.session.state();

        if had_messages {
            ctx.request_repaint();
        } else if state.is_idle() {
            ctx.request_repaint_after(IDLE_REPAINT);
        } else {
            ctx.request_repaint_after(BUSY_REPAINT);
        }

        let mut actions = Vec::new();

        egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
            egui::MenuBar::new().ui(ui, |ui| {
                ui.menu_button("View", |ui| {
                    if ui.checkbox(&mut self.show_log.clone(), "Info log").clicked() {
                        actions.push(AppAction::ToggleLog);
                        ui.close();
                    }
                });
            });
        });

        let hotkeys = self.app_state.config.hotkeys.clone();
        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            render_status_bar(
                ui,
                &StatusBarContext {
                    state,
                    progress: self.session.progress(),
                    event_count: self.session.recording().len(),
                    duration_secs: self.session.recording().duration(),
                    hotkeys: self
                        .hotkeys
                        .as_ref()
                        .map(|_| (hotkeys.start_playback.as_str(), hotkeys.stop_playback.as_str())),
                    last_error: self.notice.as_ref().and_then(|n| {
                        (n.kind == NoticeKind::Error).then_some(n.message.as_str())
                    }),
                },
            );
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            let sentinel = self.session.config().capture.sentinel();
            RecordPanel::render(
                ui,
                state,
                self.session.stop_requested(),
                &sentinel,
                self.session.recording().len(),
                &mut actions,
            );
            PlaybackPanel::render(
                ui,
                state,
                &mut self.inputs,
                self.session.progress(),
                self.session.stop_pending(),
                !self.session.recording().is_empty(),
                &mut actions,
            );
            FilePanel::render(
                ui,
                state,
                !self.session.recording().is_empty(),
                &self.app_state.save_dir(),
                &self.app_state.recent_recordings,
                &mut actions,
            );

            if self.show_log {
                ui.separator();
                ui.label(RichText::new("Info").strong());
                LogPanel::render(ui, self.session.log());
            }
        });

        self.render_notice(ctx, &mut actions);

        for action in actions {
            self.handle_action(action);
        }
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        self.session.shutdown();

        self.app_state.config = self.session.config().clone();
        self.app_state.cleanup_missing_recordings();
        if let Err(e) = self.app_state.save() {
            tracing::warn!("Failed to save app state: {}", e);
        }
    }
}
