// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Playback transport and authoring buttons.

use crate::session::ViewingSession;
use crate::util::time::format_time;

/// Result of toolbar interaction.
pub enum ToolbarAction {
    None,
    TogglePlay,
    SkipBack,
    SkipForward,
    NewProduct,
    NewSurvey,
}

/// Display the toolbar for the open session.
pub fn show(ui: &mut egui::Ui, session: &ViewingSession, skip_secs: f64) -> ToolbarAction {
    let mut action = ToolbarAction::None;
    let ready = session.clock().is_loaded() && session.playback_error().is_none();

    ui.horizontal(|ui| {
        ui.spacing_mut().item_spacing.x = 8.0;

        if ui
            .add_enabled(ready, egui::Button::new(format!("⏪ -{:.0}s", skip_secs)))
            .clicked()
        {
            action = ToolbarAction::SkipBack;
        }

        let play_label = if session.is_playing() { "⏸ Pause" } else { "▶ Play" };
        if ui.add_enabled(ready, egui::Button::new(play_label)).clicked() {
            action = ToolbarAction::TogglePlay;
        }

        if ui
            .add_enabled(ready, egui::Button::new(format!("+{:.0}s ⏩", skip_secs)))
            .clicked()
        {
            action = ToolbarAction::SkipForward;
        }

        ui.label(
            egui::RichText::new(format!(
                "{} / {}",
                format_time(session.current_time()),
                format_time(session.duration())
            ))
            .monospace(),
        );

        ui.separator();

        ui.label("Add:");
        if ui.add_enabled(ready, egui::Button::new("🛒 Product")).clicked() {
            action = ToolbarAction::NewProduct;
        }
        if ui.add_enabled(ready, egui::Button::new("❓ Survey")).clicked() {
            action = ToolbarAction::NewSurvey;
        }

        ui.separator();

        let hint = if session.draft.is_some() {
            "Fill in the form on the right, then save"
        } else {
            "New annotations start at the playhead"
        };
        ui.label(egui::RichText::new(hint).italics().weak());
    });

    action
}
