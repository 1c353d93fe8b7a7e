//! Panel components for the frontend UI
//!
//! Each panel renders one group of the main window and reports what the
//! user clicked as [`AppAction`]s.
//!
//! # Panels
//!
//! - [`RecordPanel`] - Start/stop capture and capture status
//! - [`PlaybackPanel`] - Pass count, speed, start/stop and pass progress
//! - [`FilePanel`] - Save, load, save folder, clear and recent files
//! - [`LogPanel`] - Scrolling activity log

use egui::{Color32, RichText, Ui};
use std::path::Path;

use crate::config::{RecentRecording, ReplaySettings};
use crate::session::{PlaybackProgress, ReplayCount, ReplaySpeed, SessionState};

use super::state::AppAction;

/// Renders the capture controls
pub struct RecordPanel;

impl RecordPanel {
    pub fn render(
        ui: &mut Ui,
        state: SessionState,
        stop_requested: bool,
        sentinel: &str,
        event_count: usize,
        actions: &mut Vec<AppAction>,
    ) {
        ui.group(|ui| {
            ui.label(RichText::new("Record").strong());
            ui.horizontal(|ui| {
                if ui
                    .add_enabled(state.is_idle(), egui::Button::new("⏺ Start recording"))
                    .clicked()
                {
                    actions.push(AppAction::StartRecording);
                }

                let recording = state.is_recording();
                if ui
                    .add_enabled(recording && !stop_requested, egui::Button::new("⏹ Stop"))
                    .on_hover_text(format!("Sends '{}' to end the capture", sentinel))
                    .clicked()
                {
                    actions.push(AppAction::StopRecording);
                }
                if ui
                    .add_enabled(recording, egui::Button::new("Force stop"))
                    .on_hover_text("Ends the capture without sending the stop key")
                    .clicked()
                {
                    actions.push(AppAction::ForceStopRecording);
                }
            });

            if state.is_recording() {
                ui.colored_label(
                    Color32::LIGHT_RED,
                    format!("● Recording, press '{}' to stop", sentinel),
                );
            } else if event_count > 0 {
                ui.label(format!("{} events recorded", event_count));
            } else {
                ui.colored_label(Color32::GRAY, "No recording");
            }
        });
    }
}

/// Editable replay values, kept separately so invalid input can be shown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackInputs {
    pub replay_count: u32,
    pub replay_speed: u32,
}

impl From<ReplaySettings> for PlaybackInputs {
    fn from(settings: ReplaySettings) -> Self {
        Self {
            replay_count: settings.replay_count,
            replay_speed: settings.replay_speed,
        }
    }
}

impl PlaybackInputs {
    pub fn settings(&self) -> ReplaySettings {
        ReplaySettings::new(self.replay_count, self.replay_speed)
    }
}

/// Renders the playback controls
pub struct PlaybackPanel;

impl PlaybackPanel {
    pub fn render(
        ui: &mut Ui,
        state: SessionState,
        inputs: &mut PlaybackInputs,
        progress: Option<PlaybackProgress>,
        stop_pending: bool,
        can_play: bool,
        actions: &mut Vec<AppAction>,
    ) {
        ui.group(|ui| {
            ui.label(RichText::new("Playback").strong());

            let before = *inputs;
            egui::Grid::new("playback_grid")
                .num_columns(2)
                .spacing([8.0, 4.0])
                .show(ui, |ui| {
                    ui.label("Passes:");
                    ui.add(egui::DragValue::new(&mut inputs.replay_count).speed(0.2))
                        .on_hover_text(format!("{} to {}", ReplayCount::MIN, ReplayCount::MAX));
                    ui.end_row();

                    ui.label("Speed:");
                    ui.add(egui::DragValue::new(&mut inputs.replay_speed).speed(0.05))
                        .on_hover_text(format!(
                            "{} (slow) to {} (fast)",
                            ReplaySpeed::MIN,
                            ReplaySpeed::MAX
                        ));
                    ui.end_row();
                });
            if *inputs != before {
                actions.push(AppAction::SetReplaySettings(inputs.settings()));
            }

            ui.horizontal(|ui| {
                if ui
                    .add_enabled(state.is_idle() && can_play, egui::Button::new("▶ Play"))
                    .clicked()
                {
                    actions.push(AppAction::StartPlayback);
                }
                if ui
                    .add_enabled(
                        state.is_playing() && !stop_pending,
                        egui::Button::new("⏹ Stop playback"),
                    )
                    .on_hover_text("Stops after the current pass")
                    .clicked()
                {
                    actions.push(AppAction::StopPlayback);
                }
            });

            match (state, progress) {
                (SessionState::Playing, Some(progress)) => {
                    ui.colored_label(Color32::GREEN, format!("Pass {}", progress));
                }
                (SessionState::Playing, None) => {
                    ui.colored_label(Color32::YELLOW, "Starting soon, focus the target window");
                }
                _ => {}
            }
        });
    }
}

/// Renders save/load controls and the recent files list
pub struct FilePanel;

impl FilePanel {
    pub fn render(
        ui: &mut Ui,
        state: SessionState,
        has_recording: bool,
        save_dir: &Path,
        recent: &[RecentRecording],
        actions: &mut Vec<AppAction>,
    ) {
        ui.group(|ui| {
            ui.label(RichText::new("Files").strong());
            let idle = state.is_idle();

            ui.horizontal(|ui| {
                if ui
                    .add_enabled(has_recording && !state.is_recording(), egui::Button::new("💾 Save"))
                    .on_hover_text(format!("Save into {}", save_dir.display()))
                    .clicked()
                {
                    actions.push(AppAction::Save);
                }
                if ui
                    .add_enabled(has_recording && !state.is_recording(), egui::Button::new("Save as..."))
                    .clicked()
                {
                    if let Some(path) = rfd::FileDialog::new()
                        .add_filter("Recording", &[crate::session::codec::FILE_EXTENSION])
                        .set_directory(save_dir)
                        .save_file()
                    {
                        actions.push(AppAction::SaveAs(path));
                    }
                }
                if ui.add_enabled(idle, egui::Button::new("📂 Load...")).clicked() {
                    if let Some(path) = rfd::FileDialog::new()
                        .add_filter("Recording", &[crate::session::codec::FILE_EXTENSION])
                        .set_directory(save_dir)
                        .pick_file()
                    {
                        actions.push(AppAction::Load(path));
                    }
                }
                if ui
                    .add_enabled(idle && has_recording, egui::Button::new("🗑 Clear"))
                    .clicked()
                {
                    actions.push(AppAction::Clear);
                }
            });

            ui.horizontal(|ui| {
                ui.label(RichText::new(format!("Folder: {}", save_dir.display())).small());
                if ui.small_button("Change...").clicked() {
                    if let Some(dir) = rfd::FileDialog::new().set_directory(save_dir).pick_folder() {
                        actions.push(AppAction::SetSaveDir(dir));
                    }
                }
            });

            if !recent.is_empty() {
                ui.collapsing("Recent", |ui| {
                    for entry in recent {
                        let label = format!("{} ({} events)", entry.display_name(), entry.event_count);
                        if ui
                            .add_enabled(idle, egui::Button::new(label).small())
                            .on_hover_text(entry.path.display().to_string())
                            .clicked()
                        {
                            actions.push(AppAction::Load(entry.path.clone()));
                        }
                    }
                });
            }
        });
    }
}

/// Renders the activity log
pub struct LogPanel;

impl LogPanel {
    pub fn render<'a>(ui: &mut Ui, lines: impl Iterator<Item = &'a str>) {
        egui::ScrollArea::vertical()
            .auto_shrink([false, false])
            .stick_to_bottom(true)
            .show(ui, |ui| {
                for line in lines {
                    ui.label(RichText::new(line).monospace().small());
                }
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_playback_inputs_keep_raw_values() {
        let inputs = PlaybackInputs {
            replay_count: 0,
            replay_speed: 9,
        };
        let settings = inputs.settings();
        assert_eq!(settings, ReplaySettings::new(0, 9));
        assert!(settings.validate().is_err());
        assert_eq!(PlaybackInputs::from(settings), inputs);
    }
}
