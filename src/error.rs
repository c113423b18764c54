// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Error types for the annotation core.
//!
//! Validation failures are caught before any backend call and leave the
//! submitting form untouched. Backend failures leave the annotation store
//! untouched. Neither is fatal to the application.

use crate::models::annotation::AnnotationId;
use thiserror::Error;

/// A submission rejected before reaching the backend.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("End time ({end:.1}s) must be after start time ({start:.1}s)")]
    InvalidTimeRange { start: f64, end: f64 },

    #[error("Overlaps with another annotation ({conflicting}) of the other type")]
    Overlap { conflicting: AnnotationId },

    #[error("Option \"{0}\" is already in the list")]
    DuplicateOption(String),

    #[error("Correct answer \"{0}\" is not one of the options")]
    UnknownCorrectAnswer(String),

    #[error("At least one option is required")]
    NoOptions,

    #[error("Select exactly one answer")]
    SingleAnswerExpected,
}

#[derive(Error, Debug)]
pub enum CueError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Backend rejected request ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Playback failed: {0}")]
    Playback(String),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("Request cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, CueError>;
