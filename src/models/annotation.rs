// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Annotation data structures.
//!
//! An annotation is a time-bound overlay attached to a video: either a
//! product call-to-action card or a survey prompt. Both share an id and a
//! `[start_time, end_time]` window; everything else depends on the variant.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Length of every survey window, in seconds.
pub const SURVEY_WINDOW_SECS: f64 = 1.0;

pub const DEFAULT_FONT_COLOR: &str = "#FFFFFF";
pub const DEFAULT_BACKGROUND_COLOR: &str = "#240CEF";

const LOCAL_ID_PREFIX: &str = "local-";

/// Identifier of an annotation.
///
/// Records created in this session carry a `Local` id until the backend
/// confirms them and hands back its own id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AnnotationId {
    Server(String),
    Local(Uuid),
}

impl AnnotationId {
    /// Generate a fresh client-side id.
    pub fn new_local() -> Self {
        AnnotationId::Local(Uuid::new_v4())
    }

    pub fn is_local(&self) -> bool {
        matches!(self, AnnotationId::Local(_))
    }
}

impl fmt::Display for AnnotationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnnotationId::Server(id) => write!(f, "{}", id),
            AnnotationId::Local(uuid) => write!(f, "{}{}", LOCAL_ID_PREFIX, uuid),
        }
    }
}

impl From<String> for AnnotationId {
    fn from(value: String) -> Self {
        value
            .strip_prefix(LOCAL_ID_PREFIX)
            .and_then(|rest| Uuid::parse_str(rest).ok())
            .map(AnnotationId::Local)
            .unwrap_or(AnnotationId::Server(value))
    }
}

impl From<AnnotationId> for String {
    fn from(value: AnnotationId) -> Self {
        value.to_string()
    }
}

/// Discriminant of an [`Annotation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnotationKind {
    Product,
    Survey,
}

impl fmt::Display for AnnotationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnnotationKind::Product => write!(f, "product"),
            AnnotationKind::Survey => write!(f, "survey"),
        }
    }
}

/// Where a product card is placed over the video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Position {
    TopLeft,
    TopRight,
    BottomLeft,
    #[default]
    BottomRight,
    Center,
}

impl Position {
    pub const ALL: [Position; 5] = [
        Position::TopLeft,
        Position::TopRight,
        Position::BottomLeft,
        Position::BottomRight,
        Position::Center,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Position::TopLeft => "Top left",
            Position::TopRight => "Top right",
            Position::BottomLeft => "Bottom left",
            Position::BottomRight => "Bottom right",
            Position::Center => "Center",
        }
    }
}

/// How a survey's options are answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OptionType {
    #[default]
    SingleChoice,
    MultipleChoice,
    /// Legacy type, read for compatibility and treated as single choice.
    YesNo,
}

impl OptionType {
    pub fn allows_multiple(&self) -> bool {
        matches!(self, OptionType::MultipleChoice)
    }
}

/// Image shown on a product card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ImageRef {
    /// Already hosted by the backend.
    Remote(String),
    /// Picked from disk, uploaded with the next create or update.
    Pending { file_name: String, bytes: Vec<u8> },
}

/// Product call-to-action card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductCta {
    pub id: AnnotationId,
    pub start_time: f64,
    pub end_time: f64,
    pub product_name: String,
    pub product_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageRef>,
    #[serde(default = "default_font_color")]
    pub font_color: String,
    #[serde(default = "default_background_color")]
    pub background_color: String,
    #[serde(default)]
    pub position: Position,
}

fn default_font_color() -> String {
    DEFAULT_FONT_COLOR.to_string()
}

fn default_background_color() -> String {
    DEFAULT_BACKGROUND_COLOR.to_string()
}

/// Survey prompt. Its window always lasts [`SURVEY_WINDOW_SECS`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Survey {
    pub id: AnnotationId,
    #[serde(alias = "selectTime")]
    pub start_time: f64,
    pub question: String,
    #[serde(default)]
    pub option_type: OptionType,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub correct_answers: Vec<String>,
}

impl Survey {
    pub fn end_time(&self) -> f64 {
        self.start_time + SURVEY_WINDOW_SECS
    }

    /// Options to present, filling in the legacy yes/no pair when empty.
    pub fn display_options(&self) -> Vec<String> {
        if self.options.is_empty() && self.option_type == OptionType::YesNo {
            vec!["Yes".to_string(), "No".to_string()]
        } else {
            self.options.clone()
        }
    }
}

/// A time-bound overlay record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Annotation {
    Product(ProductCta),
    Survey(Survey),
}

impl Annotation {
    pub fn id(&self) -> &AnnotationId {
        match self {
            Annotation::Product(p) => &p.id,
            Annotation::Survey(s) => &s.id,
        }
    }

    pub fn set_id(&mut self, id: AnnotationId) {
        match self {
            Annotation::Product(p) => p.id = id,
            Annotation::Survey(s) => s.id = id,
        }
    }

    pub fn kind(&self) -> AnnotationKind {
        match self {
            Annotation::Product(_) => AnnotationKind::Product,
            Annotation::Survey(_) => AnnotationKind::Survey,
        }
    }

    pub fn start_time(&self) -> f64 {
        match self {
            Annotation::Product(p) => p.start_time,
            Annotation::Survey(s) => s.start_time,
        }
    }

    pub fn end_time(&self) -> f64 {
        match self {
            Annotation::Product(p) => p.end_time,
            Annotation::Survey(s) => s.end_time(),
        }
    }

    /// Short label for lists and timeline blocks.
    pub fn title(&self) -> &str {
        match self {
            Annotation::Product(p) => &p.product_name,
            Annotation::Survey(s) => &s.question,
        }
    }

    /// Whether `time` falls inside the window, inclusive at both ends.
    pub fn is_active_at(&self, time: f64) -> bool {
        time >= self.start_time() && time <= self.end_time()
    }

    /// Whether the two windows share any instant.
    pub fn overlaps(&self, other: &Annotation) -> bool {
        self.start_time() < other.end_time() && self.end_time() > other.start_time()
    }

    /// Overwrite every field present in `patch`.
    ///
    /// Returns `false` and leaves the record alone if the patch is for the
    /// other variant.
    pub fn apply(&mut self, patch: &AnnotationPatch) -> bool {
        match (self, patch) {
            (Annotation::Product(p), AnnotationPatch::Product(patch)) => {
                if let Some(v) = patch.start_time {
                    p.start_time = v;
                }
                if let Some(v) = patch.end_time {
                    p.end_time = v;
                }
                if let Some(v) = &patch.product_name {
                    p.product_name = v.clone();
                }
                if let Some(v) = &patch.product_url {
                    p.product_url = v.clone();
                }
                if let Some(v) = &patch.image {
                    p.image = v.clone();
                }
                if let Some(v) = &patch.font_color {
                    p.font_color = v.clone();
                }
                if let Some(v) = &patch.background_color {
                    p.background_color = v.clone();
                }
                if let Some(v) = patch.position {
                    p.position = v;
                }
                true
            }
            (Annotation::Survey(s), AnnotationPatch::Survey(patch)) => {
                if let Some(v) = patch.start_time {
                    s.start_time = v;
                }
                if let Some(v) = &patch.question {
                    s.question = v.clone();
                }
                if let Some(v) = patch.option_type {
                    s.option_type = v;
                }
                if let Some(v) = &patch.options {
                    s.options = v.clone();
                }
                if let Some(v) = &patch.correct_answers {
                    s.correct_answers = v.clone();
                }
                true
            }
            _ => false,
        }
    }
}

/// Fields to overwrite on a product card. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductPatch {
    pub start_time: Option<f64>,
    pub end_time: Option<f64>,
    pub product_name: Option<String>,
    pub product_url: Option<String>,
    /// `Some(None)` removes the image.
    pub image: Option<Option<ImageRef>>,
    pub font_color: Option<String>,
    pub background_color: Option<String>,
    pub position: Option<Position>,
}

/// Fields to overwrite on a survey. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SurveyPatch {
    pub start_time: Option<f64>,
    pub question: Option<String>,
    pub option_type: Option<OptionType>,
    pub options: Option<Vec<String>>,
    pub correct_answers: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AnnotationPatch {
    Product(ProductPatch),
    Survey(SurveyPatch),
}

impl AnnotationPatch {
    /// Patch that overwrites every editable field with the values of `record`.
    pub fn replace_with(record: &Annotation) -> Self {
        match record {
            Annotation::Product(p) => AnnotationPatch::Product(ProductPatch {
                start_time: Some(p.start_time),
                end_time: Some(p.end_time),
                product_name: Some(p.product_name.clone()),
                product_url: Some(p.product_url.clone()),
                image: Some(p.image.clone()),
                font_color: Some(p.font_color.clone()),
                background_color: Some(p.background_color.clone()),
                position: Some(p.position),
            }),
            Annotation::Survey(s) => AnnotationPatch::Survey(SurveyPatch {
                start_time: Some(s.start_time),
                question: Some(s.question.clone()),
                option_type: Some(s.option_type),
                options: Some(s.options.clone()),
                correct_answers: Some(s.correct_answers.clone()),
            }),
        }
    }
}
