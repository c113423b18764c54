// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Pending form input for new or edited annotations.
//!
//! Drafts hold exactly what the user typed. Building a record from a draft
//! never consumes it, so a rejected submission leaves the input in place
//! for correction.

use super::annotation::{
    Annotation, AnnotationId, ImageRef, OptionType, Position, ProductCta, Survey,
    DEFAULT_BACKGROUND_COLOR, DEFAULT_FONT_COLOR,
};
use crate::error::ValidationError;
use crate::util::time::{format_time, parse_time};

#[derive(Debug, Clone, PartialEq)]
pub struct ProductDraft {
    /// Set when editing an existing record.
    pub editing: Option<AnnotationId>,
    /// Id of the last record sent to the backend from this form.
    pub submitted: Option<AnnotationId>,
    pub start: String,
    pub end: String,
    pub product_name: String,
    pub product_url: String,
    pub image: Option<ImageRef>,
    pub font_color: String,
    pub background_color: String,
    pub position: Position,
}

impl Default for ProductDraft {
    fn default() -> Self {
        Self {
            editing: None,
            submitted: None,
            start: format_time(0.0),
            end: format_time(0.0),
            product_name: String::new(),
            product_url: String::new(),
            image: None,
            font_color: DEFAULT_FONT_COLOR.to_string(),
            background_color: DEFAULT_BACKGROUND_COLOR.to_string(),
            position: Position::default(),
        }
    }
}

impl ProductDraft {
    /// Fresh draft whose window starts at the playhead.
    pub fn starting_at(time: f64) -> Self {
        Self {
            start: format_time(time),
            end: format_time(time + 5.0),
            ..Self::default()
        }
    }

    pub fn from_record(record: &ProductCta) -> Self {
        Self {
            editing: Some(record.id.clone()),
            submitted: None,
            start: format_time(record.start_time),
            end: format_time(record.end_time),
            product_name: record.product_name.clone(),
            product_url: record.product_url.clone(),
            image: record.image.clone(),
            font_color: record.font_color.clone(),
            background_color: record.background_color.clone(),
            position: record.position,
        }
    }

    /// Build the record this draft describes.
    ///
    /// New records get a local id. Overlap rules are checked separately
    /// against the store.
    pub fn build(&self) -> Result<Annotation, ValidationError> {
        let product_name = self.product_name.trim();
        if product_name.is_empty() {
            return Err(ValidationError::MissingField("Product name"));
        }
        let product_url = self.product_url.trim();
        if product_url.is_empty() {
            return Err(ValidationError::MissingField("Product URL"));
        }
        let start_time = parse_time(&self.start);
        let end_time = parse_time(&self.end);
        if end_time <= start_time {
            return Err(ValidationError::InvalidTimeRange {
                start: start_time,
                end: end_time,
            });
        }
        Ok(Annotation::Product(ProductCta {
            id: self.editing.clone().unwrap_or_else(AnnotationId::new_local),
            start_time,
            end_time,
            product_name: product_name.to_string(),
            product_url: product_url.to_string(),
            image: self.image.clone(),
            font_color: non_empty_or(&self.font_color, DEFAULT_FONT_COLOR),
            background_color: non_empty_or(&self.background_color, DEFAULT_BACKGROUND_COLOR),
            position: self.position,
        }))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SurveyDraft {
    pub editing: Option<AnnotationId>,
    pub submitted: Option<AnnotationId>,
    pub select_time: String,
    pub question: String,
    pub option_type: OptionType,
    pub options: Vec<String>,
    pub correct_answers: Vec<String>,
    /// Text box for the next option label.
    pub new_option: String,
}

impl SurveyDraft {
    pub fn starting_at(time: f64) -> Self {
        Self {
            select_time: format_time(time),
            ..Self::default()
        }
    }

    pub fn from_record(record: &Survey) -> Self {
        Self {
            editing: Some(record.id.clone()),
            submitted: None,
            select_time: format_time(record.start_time),
            question: record.question.clone(),
            option_type: record.option_type,
            options: record.display_options(),
            correct_answers: record.correct_answers.clone(),
            new_option: String::new(),
        }
    }

    /// Move the text in `new_option` into the option list.
    pub fn add_option(&mut self) -> Result<(), ValidationError> {
        let label = self.new_option.trim().to_string();
        if label.is_empty() {
            return Err(ValidationError::MissingField("Option"));
        }
        if self.options.contains(&label) {
            return Err(ValidationError::DuplicateOption(label));
        }
        self.options.push(label);
        self.new_option.clear();
        Ok(())
    }

    pub fn remove_option(&mut self, index: usize) {
        if index < self.options.len() {
            let label = self.options.remove(index);
            self.correct_answers.retain(|a| *a != label);
        }
    }

    /// Mark or unmark `label` as a correct answer. Single-choice surveys keep
    /// at most one.
    pub fn toggle_correct(&mut self, label: &str) {
        if let Some(index) = self.correct_answers.iter().position(|a| a == label) {
            self.correct_answers.remove(index);
            return;
        }
        if !self.option_type.allows_multiple() {
            self.correct_answers.clear();
        }
        self.correct_answers.push(label.to_string());
    }

    pub fn set_option_type(&mut self, option_type: OptionType) {
        self.option_type = option_type;
        if !option_type.allows_multiple() {
            self.correct_answers.truncate(1);
        }
    }

    pub fn build(&self) -> Result<Annotation, ValidationError> {
        let question = self.question.trim();
        if question.is_empty() {
            return Err(ValidationError::MissingField("Question"));
        }
        if self.options.is_empty() {
            return Err(ValidationError::NoOptions);
        }
        if let Some(unknown) = self
            .correct_answers
            .iter()
            .find(|a| !self.options.contains(a))
        {
            return Err(ValidationError::UnknownCorrectAnswer(unknown.clone()));
        }
        Ok(Annotation::Survey(Survey {
            id: self.editing.clone().unwrap_or_else(AnnotationId::new_local),
            start_time: parse_time(&self.select_time),
            question: question.to_string(),
            option_type: self.option_type,
            options: self.options.clone(),
            correct_answers: self.correct_answers.clone(),
        }))
    }
}

fn non_empty_or(value: &str, fallback: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        fallback.to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::annotation::AnnotationKind;

    #[test]
    fn test_product_draft_builds_from_mmss() {
        let draft = ProductDraft {
            start: "00:30".into(),
            end: "00:45".into(),
            product_name: " Hat ".into(),
            product_url: "https://shop.test/hat".into(),
            font_color: String::new(),
            ..Default::default()
        };
        let record = draft.build().unwrap();
        assert_eq!(record.kind(), AnnotationKind::Product);
        assert_eq!(record.start_time(), 30.0);
        assert_eq!(record.end_time(), 45.0);
        assert!(record.id().is_local());
        assert_eq!(record.title(), "Hat");
        match record {
            Annotation::Product(p) => assert_eq!(p.font_color, DEFAULT_FONT_COLOR),
            Annotation::Survey(_) => panic!("expected product"),
        }
    }

    #[test]
    fn test_product_draft_rejects_missing_and_inverted() {
        let mut draft = ProductDraft::starting_at(10.0);
        assert_eq!(draft.build(), Err(ValidationError::MissingField("Product name")));

        draft.product_name = "Hat".into();
        draft.product_url = "https://shop.test".into();
        draft.end = "00:05".into();
        assert!(matches!(
            draft.build(),
            Err(ValidationError::InvalidTimeRange { .. })
        ));
        // The draft is still intact for correction
        assert_eq!(draft.product_name, "Hat");
    }

    #[test]
    fn test_editing_keeps_id() {
        let draft = ProductDraft {
            editing: Some(AnnotationId::Server("8".into())),
            start: "00:01".into(),
            end: "00:02".into(),
            product_name: "Hat".into(),
            product_url: "u".into(),
            ..Default::default()
        };
        assert_eq!(draft.build().unwrap().id(), &AnnotationId::Server("8".into()));
    }

    #[test]
    fn test_survey_option_editing() {
        let mut draft = SurveyDraft::starting_at(60.0);
        draft.new_option = "Red".into();
        draft.add_option().unwrap();
        draft.new_option = "Red".into();
        assert_eq!(
            draft.add_option(),
            Err(ValidationError::DuplicateOption("Red".into()))
        );
        draft.new_option = "Blue".into();
        draft.add_option().unwrap();

        draft.toggle_correct("Red");
        draft.toggle_correct("Blue");
        assert_eq!(draft.correct_answers, vec!["Blue"]);

        draft.set_option_type(OptionType::MultipleChoice);
        draft.toggle_correct("Red");
        assert_eq!(draft.correct_answers, vec!["Blue", "Red"]);

        draft.remove_option(0);
        assert_eq!(draft.options, vec!["Blue"]);
        assert_eq!(draft.correct_answers, vec!["Blue"]);
    }

    #[test]
    fn test_survey_build() {
        let mut draft = SurveyDraft::starting_at(60.0);
        draft.question = "Which color?".into();
        assert_eq!(draft.build(), Err(ValidationError::NoOptions));

        draft.options = vec!["Red".into(), "Blue".into()];
        let record = draft.build().unwrap();
        assert_eq!(record.start_time(), 60.0);
        assert_eq!(record.end_time(), 61.0);
    }

    #[test]
    fn test_legacy_yes_no_record_loads_default_options() {
        let survey = Survey {
            id: AnnotationId::Server("3".into()),
            start_time: 5.0,
            question: "Ok?".into(),
            option_type: OptionType::YesNo,
            options: Vec::new(),
            correct_answers: Vec::new(),
        };
        let draft = SurveyDraft::from_record(&survey);
        assert_eq!(draft.options, vec!["Yes", "No"]);
        assert!(draft.build().is_ok());
    }
}
