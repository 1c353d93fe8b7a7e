//! Keyboard Macro Recorder - Main Entry Point
//!
//! Records keystrokes with a global hook and replays them with configurable
//! pass count and speed.

use keyreplay_rs::{config, config::AppState, frontend::KeyReplayApp, hook::RdevHook};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() -> eframe::Result<()> {
    // Initialize logging: stderr plus a daily file under the app data dir
    let file_appender = tracing_appender::rolling::daily(config::log_dir(), "keyreplay.log");
    let (file_writer, _log_guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,keyreplay_rs=debug")),
        )
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(file_writer)
                .with_ansi(false),
        )
        .init();

    tracing::info!("Starting keyboard macro recorder");

    // Load application state (settings, recent recordings)
    let mut app_state = AppState::load_or_default();
    app_state.cleanup_missing_recordings();

    let hook = Arc::new(RdevHook::new());

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([460.0, 640.0])
            .with_min_inner_size([380.0, 420.0])
            .with_title("Keyboard Macro Recorder"),
        ..Default::default()
    };

    let result = eframe::run_native(
        "Keyboard Macro Recorder",
        native_options,
        Box::new(|cc| {
            let mut style = (*cc.egui_ctx.style()).clone();
            style.visuals = if app_state.ui_preferences.dark_mode {
                egui::Visuals::dark()
            } else {
                egui::Visuals::light()
            };
            style.visuals.window_shadow.offset = [0, 0];
            cc.egui_ctx.set_style(style);
            cc.egui_ctx
                .set_zoom_factor(app_state.ui_preferences.font_scale);

            Ok(Box::new(KeyReplayApp::new(cc, hook, app_state)))
        }),
    );

    tracing::info!("Shutting down...");
    result
}
