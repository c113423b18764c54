// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Video library panel.

use crate::io::sync::UploadProgress;
use crate::models::project::VideoRecord;
use crate::util::time::format_time;

/// Result of library panel interaction.
pub enum LibraryAction {
    None,
    Refresh,
    Open(String),
    Delete(String),
    Rename { id: String, title: String },
    Upload,
}

/// Title being edited for one video.
#[derive(Debug, Clone, Default)]
pub struct RenameDraft {
    pub id: String,
    pub title: String,
}

/// Display the video list and running uploads.
pub fn show(
    ui: &mut egui::Ui,
    videos: &[VideoRecord],
    open_id: Option<&str>,
    uploads: &[&UploadProgress],
    rename: &mut Option<RenameDraft>,
) -> LibraryAction {
    let mut action = LibraryAction::None;

    ui.horizontal(|ui| {
        ui.heading("Videos");
        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            if ui.button("⟳").on_hover_text("Refresh").clicked() {
                action = LibraryAction::Refresh;
            }
            if ui.button("⬆ Upload").clicked() {
                action = LibraryAction::Upload;
            }
        });
    });
    ui.separator();

    for progress in uploads {
        ui.label(egui::RichText::new(&progress.label).small());
        ui.add(egui::ProgressBar::new(progress.fraction).show_percentage());
    }
    if !uploads.is_empty() {
        ui.separator();
    }

    if videos.is_empty() {
        ui.label(egui::RichText::new("No videos").weak());
    }

    egui::ScrollArea::vertical().id_source("video_list").show(ui, |ui| {
        for video in videos {
            let is_open = open_id == Some(video.id.as_str());

            if let Some(draft) = rename.as_mut().filter(|d| d.id == video.id) {
                let mut finished = false;
                ui.horizontal(|ui| {
                    let response = ui.text_edit_singleline(&mut draft.title);
                    let submitted = response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
                    if ui.small_button("✔").clicked() || submitted {
                        let title = draft.title.trim();
                        if !title.is_empty() && title != video.title {
                            action = LibraryAction::Rename {
                                id: video.id.clone(),
                                title: title.to_string(),
                            };
                        }
                        finished = true;
                    }
                    if ui.small_button("✖").clicked() {
                        finished = true;
                    }
                });
                if finished {
                    *rename = None;
                }
                continue;
            }

            ui.horizontal(|ui| {
                let label = match video.duration {
                    Some(d) => format!("{} ({})", video.title, format_time(d)),
                    None => video.title.clone(),
                };
                if ui.selectable_label(is_open, label).clicked() && !is_open {
                    action = LibraryAction::Open(video.id.clone());
                }
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui.small_button("🗑").on_hover_text("Delete video").clicked() {
                        action = LibraryAction::Delete(video.id.clone());
                    }
                    if ui.small_button("✏").on_hover_text("Rename").clicked() {
                        *rename = Some(RenameDraft {
                            id: video.id.clone(),
                            title: video.title.clone(),
                        });
                    }
                });
            });
            if let Some(created) = &video.created_at {
                ui.label(egui::RichText::new(created).small().weak());
            }
        }
    });

    action
}
