// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Player area with annotation overlays.
//!
//! This module draws the video frame area and every overlay visible at the
//! current playback time: product cards anchored to their corner, and
//! survey prompts the viewer can answer or skip.

use super::images::ProductImages;
use crate::io::media::SourceKind;
use crate::models::annotation::{
    Annotation, AnnotationId, Position, ProductCta, Survey, DEFAULT_BACKGROUND_COLOR,
    DEFAULT_FONT_COLOR,
};
use crate::session::ViewingSession;

const VIDEO_ASPECT: f32 = 16.0 / 9.0;
const CARD_SIZE: egui::Vec2 = egui::vec2(220.0, 64.0);
const CARD_MARGIN: f32 = 16.0;
const PROMPT_WIDTH: f32 = 320.0;
const THUMBNAIL_SIZE: f32 = 48.0;

/// Result of canvas interaction.
pub enum CanvasAction {
    None,
    AnswerSurvey(AnnotationId, Vec<String>),
    SkipSurvey(AnnotationId),
}

/// Parse `#RRGGBB` or `#RGB` into a color.
pub fn hex_to_color(hex: &str) -> Option<egui::Color32> {
    let digits = hex.trim().trim_start_matches('#');
    if !digits.is_ascii() {
        return None;
    }
    let channel = |s: &str| u8::from_str_radix(s, 16).ok();
    match digits.len() {
        6 => Some(egui::Color32::from_rgb(
            channel(&digits[0..2])?,
            channel(&digits[2..4])?,
            channel(&digits[4..6])?,
        )),
        3 => {
            let short = |i: usize| channel(&digits[i..i + 1]).map(|v| v * 17);
            Some(egui::Color32::from_rgb(short(0)?, short(1)?, short(2)?))
        }
        _ => None,
    }
}

/// Parse `hex`, falling back to `default` when it is not a valid color.
pub fn hex_or_default(hex: &str, default: &str) -> egui::Color32 {
    hex_to_color(hex)
        .or_else(|| hex_to_color(default))
        .unwrap_or(egui::Color32::GRAY)
}

/// Format a color as `#RRGGBB`.
pub fn color_to_hex(color: egui::Color32) -> String {
    format!("#{:02X}{:02X}{:02X}", color.r(), color.g(), color.b())
}

/// Display the player area and handle overlay interactions.
pub fn show(
    ui: &mut egui::Ui,
    session: Option<&mut ViewingSession>,
    images: &ProductImages,
) -> CanvasAction {
    let mut action = CanvasAction::None;
    ui.style_mut().visuals.extreme_bg_color = egui::Color32::from_gray(40);

    let available_size = ui.available_size();

    egui::Frame::canvas(ui.style()).show(ui, |ui| {
        ui.set_min_size(available_size);

        let Some(session) = session else {
            show_welcome(ui);
            return;
        };

        let video_rect = fit_video_rect(ui.min_rect(), ui.available_size());
        let painter = ui.painter().clone();
        painter.rect_filled(video_rect, 0.0, egui::Color32::BLACK);

        if let Some(error) = session.playback_error() {
            painter.text(
                video_rect.center(),
                egui::Align2::CENTER_CENTER,
                format!("⚠ {}", error),
                egui::FontId::proportional(16.0),
                egui::Color32::from_rgb(230, 90, 90),
            );
            return;
        }

        if !session.clock().is_loaded() {
            ui.allocate_ui_at_rect(video_rect, |ui| {
                ui.centered_and_justified(|ui| {
                    ui.spinner();
                });
            });
            return;
        }

        let badge = match SourceKind::of(&session.video().source_url) {
            SourceKind::Hls => "HLS",
            SourceKind::Direct => "FILE",
        };
        painter.text(
            video_rect.left_top() + egui::vec2(10.0, 10.0),
            egui::Align2::LEFT_TOP,
            format!("{}  {}", badge, session.video().title),
            egui::FontId::proportional(13.0),
            egui::Color32::from_gray(160),
        );

        let overlays: Vec<Annotation> = session.visible_overlays().into_iter().cloned().collect();
        let mut prompt_top = video_rect.center().y - 80.0;
        for overlay in &overlays {
            match overlay {
                Annotation::Product(product) => {
                    draw_product_card(ui, product, video_rect, images.texture(&product.id))
                }
                Annotation::Survey(survey) => {
                    let selection = session.answer_drafts.entry(survey.id.clone()).or_default();
                    let (height, prompt_action) =
                        show_survey_prompt(ui, survey, selection, video_rect, prompt_top);
                    prompt_top += height + 8.0;
                    if !matches!(prompt_action, CanvasAction::None) {
                        action = prompt_action;
                    }
                }
            }
        }
    });

    action
}

fn fit_video_rect(origin: egui::Rect, available: egui::Vec2) -> egui::Rect {
    let available_aspect = available.x / available.y.max(1.0);
    let (width, height) = if VIDEO_ASPECT > available_aspect {
        (available.x, available.x / VIDEO_ASPECT)
    } else {
        (available.y * VIDEO_ASPECT, available.y)
    };
    let offset = egui::vec2((available.x - width) / 2.0, (available.y - height) / 2.0);
    egui::Rect::from_min_size(origin.min + offset, egui::vec2(width, height))
}

fn card_rect(position: Position, video: egui::Rect) -> egui::Rect {
    let min = match position {
        Position::TopLeft => video.left_top() + egui::vec2(CARD_MARGIN, CARD_MARGIN + 24.0),
        Position::TopRight => egui::pos2(
            video.right() - CARD_MARGIN - CARD_SIZE.x,
            video.top() + CARD_MARGIN + 24.0,
        ),
        Position::BottomLeft => egui::pos2(
            video.left() + CARD_MARGIN,
            video.bottom() - CARD_MARGIN - CARD_SIZE.y,
        ),
        Position::BottomRight => video.right_bottom() - CARD_SIZE - egui::vec2(CARD_MARGIN, CARD_MARGIN),
        Position::Center => video.center() - CARD_SIZE / 2.0,
    };
    egui::Rect::from_min_size(min, CARD_SIZE)
}

fn draw_product_card(
    ui: &mut egui::Ui,
    product: &ProductCta,
    video: egui::Rect,
    texture: Option<&egui::TextureHandle>,
) {
    let rect = card_rect(product.position, video);
    let background = hex_or_default(&product.background_color, DEFAULT_BACKGROUND_COLOR);
    let foreground = hex_or_default(&product.font_color, DEFAULT_FONT_COLOR);

    let id = ui.id().with(("product-card", product.id.to_string()));
    let response = ui
        .interact(rect, id, egui::Sense::click())
        .on_hover_cursor(egui::CursorIcon::PointingHand)
        .on_hover_text(&product.product_url);

    let painter = ui.painter();
    painter.rect_filled(rect, 8.0, background);

    let mut text_left = rect.left() + 12.0;
    if let Some(texture) = texture {
        let slot = egui::Rect::from_min_size(
            egui::pos2(rect.left() + 8.0, rect.center().y - THUMBNAIL_SIZE / 2.0),
            egui::vec2(THUMBNAIL_SIZE, THUMBNAIL_SIZE),
        );
        painter.image(
            texture.id(),
            thumbnail_rect(slot, texture.size_vec2()),
            egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
            egui::Color32::WHITE,
        );
        text_left = slot.right() + 8.0;
    } else if product.image.is_some() {
        // Still loading, or unreadable
        painter.text(
            egui::pos2(text_left, rect.center().y),
            egui::Align2::LEFT_CENTER,
            "🖼",
            egui::FontId::proportional(24.0),
            foreground,
        );
        text_left += 34.0;
    }
    painter.text(
        egui::pos2(text_left, rect.top() + 20.0),
        egui::Align2::LEFT_CENTER,
        &product.product_name,
        egui::FontId::proportional(15.0),
        foreground,
    );
    painter.text(
        egui::pos2(text_left, rect.bottom() - 18.0),
        egui::Align2::LEFT_CENTER,
        "Shop now →",
        egui::FontId::proportional(12.0),
        foreground,
    );

    if response.clicked() {
        log::info!("Opening product link {}", product.product_url);
        ui.ctx().open_url(egui::OpenUrl::new_tab(&product.product_url));
    }
}

/// Largest rect with the image's aspect ratio centered in `slot`.
fn thumbnail_rect(slot: egui::Rect, image_size: egui::Vec2) -> egui::Rect {
    if image_size.x <= 0.0 || image_size.y <= 0.0 {
        return slot;
    }
    let scale = (slot.width() / image_size.x).min(slot.height() / image_size.y);
    egui::Rect::from_center_size(slot.center(), image_size * scale)
}

/// Draw one survey prompt. Returns its height and what the viewer did.
fn show_survey_prompt(
    ui: &mut egui::Ui,
    survey: &Survey,
    selection: &mut Vec<String>,
    video: egui::Rect,
    top: f32,
) -> (f32, CanvasAction) {
    let mut action = CanvasAction::None;
    let rect = egui::Rect::from_min_size(
        egui::pos2(video.center().x - PROMPT_WIDTH / 2.0, top),
        egui::vec2(PROMPT_WIDTH, 0.0),
    );

    let response = ui.allocate_ui_at_rect(rect, |ui| {
        egui::Frame::popup(ui.style()).show(ui, |ui| {
            ui.set_width(PROMPT_WIDTH - 16.0);
            ui.label(egui::RichText::new(&survey.question).strong().size(15.0));
            ui.add_space(6.0);

            for option in survey.display_options() {
                let mut checked = selection.contains(&option);
                if survey.option_type.allows_multiple() {
                    if ui.checkbox(&mut checked, &option).changed() {
                        selection.retain(|o| *o != option);
                        if checked {
                            selection.push(option.clone());
                        }
                    }
                } else if ui.radio(checked, &option).clicked() {
                    selection.clear();
                    selection.push(option.clone());
                }
            }

            ui.add_space(6.0);
            ui.horizontal(|ui| {
                if ui
                    .add_enabled(!selection.is_empty(), egui::Button::new("Submit"))
                    .clicked()
                {
                    action = CanvasAction::AnswerSurvey(survey.id.clone(), selection.clone());
                }
                if ui.button("Skip").clicked() {
                    action = CanvasAction::SkipSurvey(survey.id.clone());
                }
            });
        });
    });

    (response.response.rect.height(), action)
}

fn show_welcome(ui: &mut egui::Ui) {
    ui.centered_and_justified(|ui| {
        ui.vertical_centered(|ui| {
            ui.add_space(20.0);
            ui.heading(
                egui::RichText::new("Cuepoint")
                    .size(32.0)
                    .color(egui::Color32::from_gray(200)),
            );
            ui.label(
                egui::RichText::new("Product and survey overlays for video")
                    .size(14.0)
                    .color(egui::Color32::from_gray(150)),
            );
            ui.add_space(20.0);
            ui.label(
                egui::RichText::new("Pick a video from the library to begin annotating")
                    .color(egui::Color32::from_gray(180)),
            );
        });
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_colors() {
        assert_eq!(hex_to_color("#240CEF"), Some(egui::Color32::from_rgb(0x24, 0x0C, 0xEF)));
        assert_eq!(hex_to_color("fff"), Some(egui::Color32::WHITE));
        assert_eq!(hex_to_color("#12345"), None);
        assert_eq!(hex_to_color("#GG0000"), None);
        assert_eq!(hex_to_color("#ééé"), None);
        assert_eq!(color_to_hex(egui::Color32::from_rgb(36, 12, 239)), "#240CEF");
    }

    #[test]
    fn test_invalid_card_colors_use_defaults() {
        assert_eq!(
            hex_or_default("not a color", DEFAULT_BACKGROUND_COLOR),
            hex_to_color(DEFAULT_BACKGROUND_COLOR).unwrap()
        );
        assert_eq!(
            hex_or_default("", DEFAULT_FONT_COLOR),
            hex_to_color(DEFAULT_FONT_COLOR).unwrap()
        );
        assert_eq!(hex_or_default("#000", DEFAULT_FONT_COLOR), egui::Color32::BLACK);
    }

    #[test]
    fn test_thumbnail_keeps_aspect() {
        let slot = egui::Rect::from_min_size(egui::pos2(0.0, 0.0), egui::vec2(48.0, 48.0));
        let rect = thumbnail_rect(slot, egui::vec2(200.0, 100.0));
        assert!((rect.width() - 48.0).abs() < 0.01);
        assert!((rect.height() - 24.0).abs() < 0.01);
        assert_eq!(rect.center(), slot.center());
    }

    #[test]
    fn test_cards_stay_inside_video() {
        let video = egui::Rect::from_min_size(egui::pos2(0.0, 0.0), egui::vec2(1280.0, 720.0));
        for position in Position::ALL {
            let rect = card_rect(position, video);
            assert!(video.contains_rect(rect), "{:?} card escaped", position);
        }
    }

    #[test]
    fn test_fit_video_rect_letterboxes() {
        let origin = egui::Rect::from_min_size(egui::pos2(0.0, 0.0), egui::vec2(1000.0, 1000.0));
        let rect = fit_video_rect(origin, origin.size());
        assert!((rect.width() - 1000.0).abs() < 0.01);
        assert!((rect.height() - 562.5).abs() < 0.01);
        assert!((rect.center().y - 500.0).abs() < 0.01);
    }
}
