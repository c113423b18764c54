// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Annotation properties panel.
//!
//! This module provides the side panel listing the annotations of the open
//! video and the form for creating or editing one. The form edits the
//! session draft in place; saving is left to the caller so nothing reaches
//! the store before the backend confirms it.

use super::canvas::{color_to_hex, hex_to_color};
use crate::error::ValidationError;
use crate::models::annotation::{AnnotationId, AnnotationKind, ImageRef, OptionType, Position};
use crate::models::draft::{ProductDraft, SurveyDraft};
use crate::session::survey::SurveyStatus;
use crate::session::{Draft, ViewingSession};
use crate::util::time::format_time;

/// Result of properties panel interaction.
pub enum PropertiesAction {
    None,
    Select(AnnotationId),
    Edit(AnnotationId),
    Delete(AnnotationId),
    Save,
    CancelEdit,
    PickImage,
    Rejected(ValidationError),
}

/// Display the annotation list and the open form.
pub fn show(ui: &mut egui::Ui, session: &mut ViewingSession, busy: bool) -> PropertiesAction {
    let mut action = PropertiesAction::None;

    ui.heading("Annotations");
    ui.separator();

    egui::ScrollArea::vertical()
        .id_source("annotation_list")
        .max_height(ui.available_height() * 0.4)
        .show(ui, |ui| {
            if session.store().is_empty() {
                ui.label(egui::RichText::new("No annotations yet").weak());
            }
            for annotation in session.store().iter() {
                let id = annotation.id();
                let selected = session.selected.as_ref() == Some(id);
                ui.horizontal(|ui| {
                    let mark = match session.survey_status(id) {
                        SurveyStatus::Completed if annotation.kind() == AnnotationKind::Survey => " ✔",
                        SurveyStatus::Dismissed => " ⏭",
                        _ => "",
                    };
                    let text = format!(
                        "{} {}  {}{}",
                        format_time(annotation.start_time()),
                        annotation.kind(),
                        annotation.title(),
                        mark
                    );
                    if ui.selectable_label(selected, text).clicked() {
                        action = PropertiesAction::Select(id.clone());
                    }
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if ui.add_enabled(!busy, egui::Button::new("🗑")).on_hover_text("Delete").clicked() {
                            action = PropertiesAction::Delete(id.clone());
                        }
                        if ui.small_button("✏").on_hover_text("Edit").clicked() {
                            action = PropertiesAction::Edit(id.clone());
                        }
                    });
                });
            }
        });

    ui.separator();

    let problem = session.validate_draft().err();
    let Some(draft) = session.draft.as_mut() else {
        ui.label(egui::RichText::new("Select an annotation to edit it, or add a new one from the toolbar").weak());
        return action;
    };

    let editing = draft.editing().is_some();
    ui.heading(match (&*draft, editing) {
        (Draft::Product(_), false) => "New product",
        (Draft::Product(_), true) => "Edit product",
        (Draft::Survey(_), false) => "New survey",
        (Draft::Survey(_), true) => "Edit survey",
    });

    egui::ScrollArea::vertical()
        .id_source("draft_form")
        .show(ui, |ui| {
            let form_action = match &mut *draft {
                Draft::Product(product) => product_form(ui, product),
                Draft::Survey(survey) => survey_form(ui, survey),
            };
            if !matches!(form_action, PropertiesAction::None) {
                action = form_action;
            }

            ui.add_space(8.0);
            if let Some(problem) = &problem {
                ui.colored_label(egui::Color32::from_rgb(230, 150, 60), format!("⚠ {}", problem));
            }
            ui.horizontal(|ui| {
                if ui
                    .add_enabled(!busy && problem.is_none(), egui::Button::new("💾 Save"))
                    .clicked()
                {
                    action = PropertiesAction::Save;
                }
                if ui.button("Cancel").clicked() {
                    action = PropertiesAction::CancelEdit;
                }
                if busy {
                    ui.spinner();
                }
            });
        });

    action
}

fn time_field(ui: &mut egui::Ui, label: &str, value: &mut String) {
    ui.horizontal(|ui| {
        ui.label(label);
        ui.add(egui::TextEdit::singleline(value).hint_text("MM:SS").desired_width(60.0));
    });
}

fn color_field(ui: &mut egui::Ui, label: &str, value: &mut String) {
    ui.horizontal(|ui| {
        ui.label(label);
        let mut color = hex_to_color(value).unwrap_or(egui::Color32::WHITE);
        if egui::color_picker::color_edit_button_srgba(ui, &mut color, egui::color_picker::Alpha::Opaque)
            .changed()
        {
            *value = color_to_hex(color);
        }
        ui.add(egui::TextEdit::singleline(value).desired_width(70.0));
    });
}

fn product_form(ui: &mut egui::Ui, draft: &mut ProductDraft) -> PropertiesAction {
    let mut action = PropertiesAction::None;

    time_field(ui, "Start:", &mut draft.start);
    time_field(ui, "End:", &mut draft.end);

    ui.label("Product name:");
    ui.text_edit_singleline(&mut draft.product_name);
    ui.label("Product URL:");
    ui.add(egui::TextEdit::singleline(&mut draft.product_url).hint_text("https://"));

    ui.horizontal(|ui| {
        ui.label("Image:");
        match &draft.image {
            Some(ImageRef::Remote(url)) => {
                ui.label(egui::RichText::new(url).small()).on_hover_text(url);
            }
            Some(ImageRef::Pending { file_name, .. }) => {
                ui.label(format!("{} (not uploaded)", file_name));
            }
            None => {
                ui.label(egui::RichText::new("none").weak());
            }
        }
    });
    ui.horizontal(|ui| {
        if ui.button("Choose…").clicked() {
            action = PropertiesAction::PickImage;
        }
        if draft.image.is_some() && ui.button("Remove").clicked() {
            draft.image = None;
        }
    });

    color_field(ui, "Text color:", &mut draft.font_color);
    color_field(ui, "Background:", &mut draft.background_color);

    ui.horizontal(|ui| {
        ui.label("Position:");
        egui::ComboBox::from_id_source("product_position")
            .selected_text(draft.position.label())
            .show_ui(ui, |ui| {
                for position in Position::ALL {
                    ui.selectable_value(&mut draft.position, position, position.label());
                }
            });
    });

    action
}

fn survey_form(ui: &mut egui::Ui, draft: &mut SurveyDraft) -> PropertiesAction {
    let mut action = PropertiesAction::None;

    time_field(ui, "Show at:", &mut draft.select_time);

    ui.label("Question:");
    ui.add(egui::TextEdit::multiline(&mut draft.question).desired_rows(2));

    ui.horizontal(|ui| {
        ui.label("Answers:");
        let mut option_type = draft.option_type;
        egui::ComboBox::from_id_source("survey_option_type")
            .selected_text(option_type_label(option_type))
            .show_ui(ui, |ui| {
                for candidate in [OptionType::SingleChoice, OptionType::MultipleChoice, OptionType::YesNo] {
                    ui.selectable_value(&mut option_type, candidate, option_type_label(candidate));
                }
            });
        if option_type != draft.option_type {
            draft.set_option_type(option_type);
        }
    });

    ui.label("Options (tick the correct answers):");
    let mut remove = None;
    let mut toggle = None;
    for (index, option) in draft.options.iter().enumerate() {
        ui.horizontal(|ui| {
            let mut correct = draft.correct_answers.contains(option);
            if ui.checkbox(&mut correct, option).changed() {
                toggle = Some(option.clone());
            }
            if ui.small_button("✖").clicked() {
                remove = Some(index);
            }
        });
    }
    if let Some(label) = toggle {
        draft.toggle_correct(&label);
    }
    if let Some(index) = remove {
        draft.remove_option(index);
    }

    ui.horizontal(|ui| {
        let response = ui.add(
            egui::TextEdit::singleline(&mut draft.new_option)
                .hint_text("New option")
                .desired_width(140.0),
        );
        let submitted = response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
        if ui.button("Add").clicked() || submitted {
            if let Err(e) = draft.add_option() {
                action = PropertiesAction::Rejected(e);
            }
        }
    });

    action
}

fn option_type_label(option_type: OptionType) -> &'static str {
    match option_type {
        OptionType::SingleChoice => "Single choice",
        OptionType::MultipleChoice => "Multiple choice",
        OptionType::YesNo => "Yes / No",
    }
}
