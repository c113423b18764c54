// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Video records.
//!
//! A video carries its playback source, thumbnail and the annotations it
//! was saved with. This is also the unit exported to and imported from
//! local YAML/JSON files.

use super::annotation::Annotation;
use super::store::AnnotationStore;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoRecord {
    pub id: String,
    pub title: String,
    /// Direct file URL or HLS manifest.
    #[serde(alias = "hlsUrl", alias = "src")]
    pub source_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    /// Duration reported by the backend, if it knows it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
}

impl VideoRecord {
    pub fn new(id: String, title: String, source_url: String) -> Self {
        Self {
            id,
            title,
            source_url,
            thumbnail_url: None,
            created_at: None,
            duration: None,
            annotations: Vec::new(),
        }
    }

    /// Sorted store seeded with this video's saved annotations.
    pub fn store(&self) -> AnnotationStore {
        AnnotationStore::from_records(self.annotations.iter().cloned())
    }

    /// Copy of the record carrying the current contents of `store`.
    pub fn with_annotations(&self, store: &AnnotationStore) -> Self {
        Self {
            annotations: store.all().to_vec(),
            ..self.clone()
        }
    }
}

/// Partial update for a video. Only present fields are sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
}
