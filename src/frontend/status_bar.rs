//! Status bar panel: bottom bar showing session state, recording size and errors.

use egui::{Color32, RichText, Ui};

use crate::session::{PlaybackProgress, SessionState};

/// Context needed to render the status bar.
pub struct StatusBarContext<'a> {
    pub state: SessionState,
    pub progress: Option<PlaybackProgress>,
    pub event_count: usize,
    pub duration_secs: f64,
    pub hotkeys: Option<(&'a str, &'a str)>,
    pub last_error: Option<&'a str>,
}

/// Render the status bar.
pub fn render_status_bar(ui: &mut Ui, ctx: &StatusBarContext<'_>) {
    ui.horizontal(|ui| {
        ui.spacing_mut().item_spacing.x = 8.0;

        let color = match ctx.state {
            SessionState::Idle => Color32::GRAY,
            SessionState::Recording => Color32::LIGHT_RED,
            SessionState::Playing => Color32::GREEN,
        };
        ui.colored_label(color, "●");
        let state_text = match ctx.progress {
            Some(progress) if ctx.state.is_playing() => {
                format!("{} {}", ctx.state.display_name(), progress)
            }
            _ => ctx.state.display_name().to_string(),
        };
        ui.label(RichText::new(state_text).small());

        ui.separator();

        ui.label(
            RichText::new(format!(
                "Events: {} ({:.2} s)",
                ctx.event_count, ctx.duration_secs
            ))
            .small(),
        );

        if let Some((start, stop)) = ctx.hotkeys {
            ui.separator();
            ui.label(
                RichText::new(format!("{}: play  {}: stop", start.to_uppercase(), stop.to_uppercase()))
                    .small(),
            );
        }

        if let Some(error) = ctx.last_error {
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                ui.colored_label(Color32::RED, RichText::new(error).small());
            });
        }
    });
}
