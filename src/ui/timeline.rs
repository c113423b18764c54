// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Video timeline scrubber control.
//!
//! This module draws the scrubber track with one block per annotation and
//! the live playhead. Clicking the track seeks; clicking a block selects
//! that annotation.

use crate::models::annotation::{Annotation, AnnotationId};
use crate::models::overlap::has_overlap_with_other_type;
use crate::session::ViewingSession;
use crate::util::geometry::{block_span, click_to_time, percent_to_x, playhead_percent};
use crate::util::time::format_time;

const TRACK_HEIGHT: f32 = 36.0;
const PRODUCT_COLOR: egui::Color32 = egui::Color32::from_rgb(70, 130, 220);
const SURVEY_COLOR: egui::Color32 = egui::Color32::from_rgb(230, 160, 40);
const PLAYHEAD_COLOR: egui::Color32 = egui::Color32::from_rgb(235, 70, 70);
const CONFLICT_COLOR: egui::Color32 = egui::Color32::from_rgb(220, 50, 50);

/// Result of timeline interaction.
pub enum TimelineAction {
    None,
    Seek(f64),
    Select(AnnotationId),
}

/// Display the scrubber for `session`.
pub fn show(ui: &mut egui::Ui, session: &ViewingSession) -> TimelineAction {
    let mut action = TimelineAction::None;
    let duration = session.duration();
    let current = session.current_time();

    ui.horizontal(|ui| {
        ui.monospace(format_time(current));

        let label_width = 56.0;
        let width = (ui.available_width() - label_width).max(50.0);
        let (track_rect, track_response) =
            ui.allocate_exact_size(egui::vec2(width, TRACK_HEIGHT), egui::Sense::click_and_drag());

        let painter = ui.painter_at(track_rect);
        painter.rect_filled(track_rect, 4.0, egui::Color32::from_gray(45));

        // Blocks are interacted with after the track so they take the click
        for annotation in session.store().iter() {
            let Some(span) = block_span(annotation.start_time(), annotation.end_time(), duration) else {
                continue;
            };
            let left = percent_to_x(span.left, track_rect.left(), track_rect.width());
            let right = percent_to_x(span.left + span.width, track_rect.left(), track_rect.width());
            // Keep one-second surveys clickable on long videos
            let right = right.max(left + 4.0);
            let block = egui::Rect::from_min_max(
                egui::pos2(left, track_rect.top() + 6.0),
                egui::pos2(right, track_rect.bottom() - 6.0),
            );

            let selected = session.selected.as_ref() == Some(annotation.id());
            let color = block_color(annotation);
            painter.rect_filled(block, 3.0, if selected { color } else { color.gamma_multiply(0.7) });
            if selected {
                painter.rect_stroke(block, 3.0, egui::Stroke::new(2.0, egui::Color32::WHITE));
            }

            let id = ui.id().with(("timeline-block", annotation.id().to_string()));
            let response = ui
                .interact(block, id, egui::Sense::click())
                .on_hover_text(format!(
                    "{}\n{} - {}",
                    annotation.title(),
                    format_time(annotation.start_time()),
                    format_time(annotation.end_time())
                ));
            if response.clicked() {
                action = TimelineAction::Select(annotation.id().clone());
            }
        }

        // Outline where the open form would place its record
        let preview = session
            .draft
            .as_ref()
            .and_then(|d| d.build().ok())
            .and_then(|candidate| {
                let span = block_span(candidate.start_time(), candidate.end_time(), duration)?;
                Some((candidate, span))
            });
        if let Some((candidate, span)) = preview {
            let left = percent_to_x(span.left, track_rect.left(), track_rect.width());
            let right = percent_to_x(span.left + span.width, track_rect.left(), track_rect.width()).max(left + 4.0);
            let conflict = has_overlap_with_other_type(&candidate, session.store().iter());
            let color = if conflict { CONFLICT_COLOR } else { egui::Color32::from_gray(220) };
            painter.rect_stroke(
                egui::Rect::from_min_max(
                    egui::pos2(left, track_rect.top() + 2.0),
                    egui::pos2(right, track_rect.bottom() - 2.0),
                ),
                3.0,
                egui::Stroke::new(1.5, color),
            );
        }

        if matches!(action, TimelineAction::None) {
            if let Some(pos) = track_response.interact_pointer_pos() {
                if track_response.clicked() || track_response.dragged() {
                    action = TimelineAction::Seek(click_to_time(
                        pos.x,
                        track_rect.left(),
                        track_rect.width(),
                        duration,
                    ));
                }
            }
        }

        let x = percent_to_x(playhead_percent(current, duration), track_rect.left(), track_rect.width());
        painter.line_segment(
            [egui::pos2(x, track_rect.top()), egui::pos2(x, track_rect.bottom())],
            egui::Stroke::new(2.0, PLAYHEAD_COLOR),
        );
        painter.circle_filled(egui::pos2(x, track_rect.top() + 3.0), 4.0, PLAYHEAD_COLOR);

        ui.monospace(format_time(duration));
    });

    action
}

fn block_color(annotation: &Annotation) -> egui::Color32 {
    match annotation {
        Annotation::Product(_) => PRODUCT_COLOR,
        Annotation::Survey(_) => SURVEY_COLOR,
    }
}
