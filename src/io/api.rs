// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Backend access for videos and annotations.
//!
//! [`RestBackend`] talks to the remote REST API with bearer-token auth.
//! [`OfflineBackend`] keeps everything in memory so the editor works without
//! a server. Calls are blocking and are meant to run on a worker thread.

use crate::error::{CueError, Result};
use crate::models::annotation::{
    Annotation, AnnotationId, AnnotationKind, ImageRef, OptionType, Position, ProductCta, Survey,
    DEFAULT_BACKGROUND_COLOR, DEFAULT_FONT_COLOR,
};
use crate::models::project::{VideoRecord, VideoUpdate};
use reqwest::blocking::{multipart, Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// A video file picked for upload.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoUpload {
    pub title: String,
    pub file_name: String,
    /// Where the file was read from. Offline videos play from here.
    pub path: PathBuf,
    pub bytes: Vec<u8>,
}

/// Remote persistence for videos and their annotations.
pub trait Backend: Send + Sync {
    /// Persist a new annotation and return the stored copy with its
    /// backend id.
    fn create_annotation(&self, video_id: &str, record: &Annotation) -> Result<Annotation>;

    /// Replace an annotation by id and return the stored copy.
    fn update_annotation(&self, record: &Annotation) -> Result<Annotation>;

    fn delete_annotation(&self, id: &AnnotationId, kind: AnnotationKind) -> Result<()>;

    fn list_videos(&self) -> Result<Vec<VideoRecord>>;

    fn get_video(&self, id: &str) -> Result<VideoRecord>;

    fn create_video(&self, upload: &VideoUpload) -> Result<VideoRecord>;

    fn update_video(&self, id: &str, update: &VideoUpdate) -> Result<VideoRecord>;

    fn delete_video(&self, id: &str) -> Result<()>;

    /// Download a product image. Relative URLs resolve against the API.
    fn fetch_image(&self, url: &str) -> Result<Vec<u8>>;
}

/// Response body shape shared by every endpoint.
#[derive(Debug, Deserialize)]
pub struct ApiEnvelope<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiEnvelope<T> {
    /// Turn the envelope into its payload, or an error if the call failed.
    pub fn into_result(self, status: u16) -> Result<Option<T>> {
        if self.success && (200..300).contains(&status) {
            Ok(self.data)
        } else {
            Err(CueError::Api {
                status,
                message: self
                    .error
                    .unwrap_or_else(|| "request was not successful".to_string()),
            })
        }
    }
}

fn id_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireProduct {
    id: Value,
    start_time: f64,
    end_time: f64,
    product_name: String,
    #[serde(default)]
    product_url: String,
    #[serde(default)]
    image_url: Option<String>,
    #[serde(default)]
    font_color: Option<String>,
    #[serde(default)]
    background_color: Option<String>,
    #[serde(default)]
    position: Option<Position>,
}

impl From<WireProduct> for Annotation {
    fn from(wire: WireProduct) -> Self {
        Annotation::Product(ProductCta {
            id: AnnotationId::Server(id_text(&wire.id)),
            start_time: wire.start_time,
            end_time: wire.end_time,
            product_name: wire.product_name,
            product_url: wire.product_url,
            image: wire
                .image_url
                .filter(|u| !u.is_empty())
                .map(ImageRef::Remote),
            font_color: wire
                .font_color
                .unwrap_or_else(|| DEFAULT_FONT_COLOR.to_string()),
            background_color: wire
                .background_color
                .unwrap_or_else(|| DEFAULT_BACKGROUND_COLOR.to_string()),
            position: wire.position.unwrap_or_default(),
        })
    }
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireSurvey {
    #[serde(skip_serializing)]
    id: Value,
    #[serde(alias = "startTime")]
    select_time: f64,
    question: String,
    #[serde(default)]
    option_type: OptionType,
    #[serde(default)]
    options: Vec<String>,
    #[serde(default)]
    correct_answers: Vec<String>,
}

impl From<WireSurvey> for Annotation {
    fn from(wire: WireSurvey) -> Self {
        Annotation::Survey(Survey {
            id: AnnotationId::Server(id_text(&wire.id)),
            start_time: wire.select_time,
            question: wire.question,
            option_type: wire.option_type,
            options: wire.options,
            correct_answers: wire.correct_answers,
        })
    }
}

impl From<&Survey> for WireSurvey {
    fn from(survey: &Survey) -> Self {
        Self {
            id: Value::Null,
            select_time: survey.start_time,
            question: survey.question.clone(),
            option_type: survey.option_type,
            options: survey.options.clone(),
            correct_answers: survey.correct_answers.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireVideo {
    id: Value,
    #[serde(default)]
    title: String,
    #[serde(default)]
    hls_url: Option<String>,
    #[serde(default)]
    src: Option<String>,
    #[serde(default)]
    thumbnail_url: Option<String>,
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default)]
    duration: Option<f64>,
    #[serde(default, rename = "videoProductsCTA")]
    video_products_cta: Vec<WireProduct>,
    #[serde(default)]
    video_feedback_questions: Vec<WireSurvey>,
}

impl From<WireVideo> for VideoRecord {
    fn from(wire: WireVideo) -> Self {
        let annotations = wire
            .video_products_cta
            .into_iter()
            .map(Annotation::from)
            .chain(wire.video_feedback_questions.into_iter().map(Annotation::from))
            .collect();
        Self {
            id: id_text(&wire.id),
            title: wire.title,
            source_url: wire.hls_url.or(wire.src).unwrap_or_default(),
            thumbnail_url: wire.thumbnail_url,
            created_at: wire.created_at,
            duration: wire.duration,
            annotations,
        }
    }
}

/// Client for the remote REST API.
pub struct RestBackend {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl RestBackend {
    pub fn new(base_url: &str, token: Option<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Send a request and unwrap the response envelope.
    fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<Option<T>> {
        let response = self.authorized(request).send()?;
        let status = response.status();
        let body = response.text()?;
        let envelope: ApiEnvelope<T> = serde_json::from_str(&body).map_err(|e| {
            if status.is_success() {
                CueError::Json(e)
            } else {
                CueError::Api {
                    status: status.as_u16(),
                    message: status
                        .canonical_reason()
                        .unwrap_or("request failed")
                        .to_string(),
                }
            }
        })?;
        envelope.into_result(status.as_u16())
    }

    fn send_required<T: DeserializeOwned>(&self, request: RequestBuilder, what: &'static str) -> Result<T> {
        self.send(request)?.ok_or_else(|| CueError::Api {
            status: 200,
            message: format!("response carried no {}", what),
        })
    }

    fn product_form(product: &ProductCta) -> multipart::Form {
        let mut form = multipart::Form::new()
            .text("startTime", product.start_time.to_string())
            .text("endTime", product.end_time.to_string())
            .text("productName", product.product_name.clone())
            .text("productUrl", product.product_url.clone())
            .text("fontColor", product.font_color.clone())
            .text("backgroundColor", product.background_color.clone())
            .text("position", position_text(product.position));
        match &product.image {
            Some(ImageRef::Pending { file_name, bytes }) => {
                let part = multipart::Part::bytes(bytes.clone()).file_name(file_name.clone());
                form = form.part("image", part);
            }
            Some(ImageRef::Remote(url)) => {
                form = form.text("imageUrl", url.clone());
            }
            None => {}
        }
        form
    }

    fn server_id(id: &AnnotationId) -> Result<&str> {
        match id {
            AnnotationId::Server(id) => Ok(id),
            AnnotationId::Local(_) => Err(CueError::NotFound {
                entity: "annotation",
                id: id.to_string(),
            }),
        }
    }
}

fn position_text(position: Position) -> String {
    match serde_json::to_value(position) {
        Ok(Value::String(s)) => s,
        _ => "bottom-right".to_string(),
    }
}

fn annotation_path(kind: AnnotationKind) -> &'static str {
    match kind {
        AnnotationKind::Product => "products-cta",
        AnnotationKind::Survey => "feedback-questions",
    }
}

impl Backend for RestBackend {
    fn create_annotation(&self, video_id: &str, record: &Annotation) -> Result<Annotation> {
        let url = self.url(&format!("{}/{}", annotation_path(record.kind()), video_id));
        log::info!("Creating {} for video {}", record.kind(), video_id);
        match record {
            Annotation::Product(product) => {
                let request = self.client.post(url).multipart(Self::product_form(product));
                let wire: WireProduct = self.send_required(request, "product")?;
                Ok(wire.into())
            }
            Annotation::Survey(survey) => {
                let request = self.client.post(url).json(&WireSurvey::from(survey));
                let wire: WireSurvey = self.send_required(request, "survey")?;
                Ok(wire.into())
            }
        }
    }

    fn update_annotation(&self, record: &Annotation) -> Result<Annotation> {
        let id = Self::server_id(record.id())?;
        let url = self.url(&format!("{}/{}", annotation_path(record.kind()), id));
        log::info!("Updating {} {}", record.kind(), id);
        match record {
            Annotation::Product(product) => {
                let request = self.client.patch(url).multipart(Self::product_form(product));
                let wire: WireProduct = self.send_required(request, "product")?;
                Ok(wire.into())
            }
            Annotation::Survey(survey) => {
                let request = self.client.patch(url).json(&WireSurvey::from(survey));
                let wire: WireSurvey = self.send_required(request, "survey")?;
                Ok(wire.into())
            }
        }
    }

    fn delete_annotation(&self, id: &AnnotationId, kind: AnnotationKind) -> Result<()> {
        let id = Self::server_id(id)?;
        log::info!("Deleting {} {}", kind, id);
        let url = self.url(&format!("{}/{}", annotation_path(kind), id));
        self.send::<Value>(self.client.delete(url))?;
        Ok(())
    }

    fn list_videos(&self) -> Result<Vec<VideoRecord>> {
        let videos: Vec<WireVideo> = self.send(self.client.get(self.url("videos")))?.unwrap_or_default();
        Ok(videos.into_iter().map(VideoRecord::from).collect())
    }

    fn get_video(&self, id: &str) -> Result<VideoRecord> {
        let url = self.url(&format!("videos/{}", id));
        let wire: WireVideo = self.send_required(self.client.get(url), "video")?;
        Ok(wire.into())
    }

    fn create_video(&self, upload: &VideoUpload) -> Result<VideoRecord> {
        log::info!("Uploading video {} ({} bytes)", upload.file_name, upload.bytes.len());
        let form = multipart::Form::new().text("title", upload.title.clone()).part(
            "video",
            multipart::Part::bytes(upload.bytes.clone()).file_name(upload.file_name.clone()),
        );
        let request = self.client.post(self.url("videos")).multipart(form);
        let wire: WireVideo = self.send_required(request, "video")?;
        Ok(wire.into())
    }

    fn update_video(&self, id: &str, update: &VideoUpdate) -> Result<VideoRecord> {
        let mut form = multipart::Form::new();
        if let Some(title) = &update.title {
            form = form.text("title", title.clone());
        }
        if let Some(thumbnail) = &update.thumbnail_url {
            form = form.text("thumbnailUrl", thumbnail.clone());
        }
        let request = self.client.patch(self.url(&format!("videos/{}", id))).multipart(form);
        let wire: WireVideo = self.send_required(request, "video")?;
        Ok(wire.into())
    }

    fn delete_video(&self, id: &str) -> Result<()> {
        log::info!("Deleting video {}", id);
        self.send::<Value>(self.client.delete(self.url(&format!("videos/{}", id))))?;
        Ok(())
    }

    fn fetch_image(&self, url: &str) -> Result<Vec<u8>> {
        let url = if url.starts_with("http://") || url.starts_with("https://") {
            url.to_string()
        } else {
            self.url(url)
        };
        log::debug!("Fetching image {}", url);
        let response = self.client.get(url).send()?.error_for_status()?;
        Ok(response.bytes()?.to_vec())
    }
}

/// In-memory backend used when no API is configured.
#[derive(Default)]
pub struct OfflineBackend {
    videos: Mutex<HashMap<String, VideoRecord>>,
    next_id: AtomicU64,
}

impl OfflineBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make a video available to `list_videos`, e.g. after a local import.
    pub fn insert_video(&self, video: VideoRecord) {
        if let Ok(mut videos) = self.videos.lock() {
            videos.insert(video.id.clone(), video);
        }
    }

    fn issue_id(&self) -> String {
        format!("offline-{}", self.next_id.fetch_add(1, Ordering::Relaxed) + 1)
    }

    fn with_videos<T>(&self, f: impl FnOnce(&mut HashMap<String, VideoRecord>) -> Result<T>) -> Result<T> {
        let mut videos = self
            .videos
            .lock()
            .map_err(|_| CueError::Api { status: 500, message: "offline store poisoned".to_string() })?;
        f(&mut videos)
    }

    fn video_not_found(id: &str) -> CueError {
        CueError::NotFound {
            entity: "video",
            id: id.to_string(),
        }
    }
}

impl Backend for OfflineBackend {
    fn create_annotation(&self, video_id: &str, record: &Annotation) -> Result<Annotation> {
        let mut stored = record.clone();
        stored.set_id(AnnotationId::Server(self.issue_id()));
        self.with_videos(|videos| {
            if let Some(video) = videos.get_mut(video_id) {
                video.annotations.push(stored.clone());
            }
            Ok(())
        })?;
        Ok(stored)
    }

    fn update_annotation(&self, record: &Annotation) -> Result<Annotation> {
        self.with_videos(|videos| {
            for video in videos.values_mut() {
                if let Some(slot) = video.annotations.iter_mut().find(|a| a.id() == record.id()) {
                    *slot = record.clone();
                }
            }
            Ok(())
        })?;
        Ok(record.clone())
    }

    fn delete_annotation(&self, id: &AnnotationId, _kind: AnnotationKind) -> Result<()> {
        self.with_videos(|videos| {
            for video in videos.values_mut() {
                video.annotations.retain(|a| a.id() != id);
            }
            Ok(())
        })
    }

    fn list_videos(&self) -> Result<Vec<VideoRecord>> {
        self.with_videos(|videos| {
            let mut list: Vec<VideoRecord> = videos.values().cloned().collect();
            list.sort_by(|a, b| a.title.cmp(&b.title));
            Ok(list)
        })
    }

    fn get_video(&self, id: &str) -> Result<VideoRecord> {
        self.with_videos(|videos| videos.get(id).cloned().ok_or_else(|| Self::video_not_found(id)))
    }

    fn create_video(&self, upload: &VideoUpload) -> Result<VideoRecord> {
        let video = VideoRecord::new(
            self.issue_id(),
            upload.title.clone(),
            upload.path.display().to_string(),
        );
        self.insert_video(video.clone());
        Ok(video)
    }

    fn update_video(&self, id: &str, update: &VideoUpdate) -> Result<VideoRecord> {
        self.with_videos(|videos| {
            let video = videos.get_mut(id).ok_or_else(|| Self::video_not_found(id))?;
            if let Some(title) = &update.title {
                video.title = title.clone();
            }
            if let Some(thumbnail) = &update.thumbnail_url {
                video.thumbnail_url = Some(thumbnail.clone());
            }
            Ok(video.clone())
        })
    }

    fn delete_video(&self, id: &str) -> Result<()> {
        self.with_videos(|videos| {
            videos
                .remove(id)
                .map(|_| ())
                .ok_or_else(|| Self::video_not_found(id))
        })
    }

    /// Only images on local disk are reachable offline.
    fn fetch_image(&self, url: &str) -> Result<Vec<u8>> {
        if url.contains("://") {
            return Err(CueError::NotFound {
                entity: "image",
                id: url.to_string(),
            });
        }
        Ok(std::fs::read(url)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::annotation::fixtures::{product, survey};

    #[test]
    fn test_envelope_failure_carries_message() {
        let envelope: ApiEnvelope<Value> =
            serde_json::from_str(r#"{"success":false,"error":"Overlapping question"}"#).unwrap();
        match envelope.into_result(409) {
            Err(CueError::Api { status, message }) => {
                assert_eq!(status, 409);
                assert_eq!(message, "Overlapping question");
            }
            other => panic!("unexpected {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_envelope_success_requires_2xx() {
        let envelope: ApiEnvelope<Value> = serde_json::from_str(r#"{"success":true}"#).unwrap();
        assert!(envelope.into_result(500).is_err());
        let envelope: ApiEnvelope<Value> =
            serde_json::from_str(r#"{"success":true,"data":{"id":1}}"#).unwrap();
        assert!(envelope.into_result(201).unwrap().is_some());
    }

    #[test]
    fn test_wire_video_flattens_nested_annotations() {
        let json = r#"{
            "id": 12,
            "title": "Launch",
            "hlsUrl": "https://cdn.test/launch.m3u8",
            "createdAt": "2025-01-01T00:00:00Z",
            "videoProductsCTA": [
                {"id": 3, "startTime": 30, "endTime": 45, "productName": "Hat",
                 "productUrl": "https://shop.test", "imageUrl": "https://img.test/hat.png"}
            ],
            "videoFeedbackQuestions": [
                {"id": "q1", "selectTime": 60, "question": "Like it?",
                 "optionType": "multiple-choice", "options": ["A", "B"]}
            ]
        }"#;
        let wire: WireVideo = serde_json::from_str(json).unwrap();
        let video = VideoRecord::from(wire);
        assert_eq!(video.id, "12");
        assert_eq!(video.source_url, "https://cdn.test/launch.m3u8");
        assert_eq!(video.annotations.len(), 2);
        assert_eq!(video.annotations[0].id(), &AnnotationId::Server("3".into()));
        match &video.annotations[0] {
            Annotation::Product(p) => {
                assert_eq!(p.image, Some(ImageRef::Remote("https://img.test/hat.png".into())));
                assert_eq!(p.background_color, DEFAULT_BACKGROUND_COLOR);
            }
            Annotation::Survey(_) => panic!("expected product"),
        }
        assert_eq!(video.annotations[1].end_time(), 61.0);
    }

    #[test]
    fn test_wire_survey_body() {
        let survey = match survey("1", 42.0) {
            Annotation::Survey(s) => s,
            Annotation::Product(_) => unreachable!(),
        };
        let body = serde_json::to_value(WireSurvey::from(&survey)).unwrap();
        assert_eq!(body["selectTime"], 42.0);
        assert_eq!(body["optionType"], "single-choice");
        assert!(body.get("id").is_none());
    }

    #[test]
    fn test_local_ids_never_reach_rest_paths() {
        let id = AnnotationId::new_local();
        assert!(matches!(RestBackend::server_id(&id), Err(CueError::NotFound { .. })));
        assert_eq!(position_text(Position::TopLeft), "top-left");
    }

    #[test]
    fn test_offline_backend_issues_server_ids() {
        let backend = OfflineBackend::new();
        backend.insert_video(VideoRecord::new("v".into(), "Demo".into(), "demo.mp4".into()));

        let mut draft = product("x", 1.0, 2.0);
        draft.set_id(AnnotationId::new_local());
        let stored = backend.create_annotation("v", &draft).unwrap();
        assert!(!stored.id().is_local());
        assert_eq!(backend.get_video("v").unwrap().annotations.len(), 1);

        backend.delete_annotation(stored.id(), AnnotationKind::Product).unwrap();
        assert!(backend.get_video("v").unwrap().annotations.is_empty());
        assert!(backend.delete_video("missing").is_err());
    }

    #[test]
    fn test_offline_upload_plays_from_picked_file() {
        let backend = OfflineBackend::new();
        let video = backend
            .create_video(&VideoUpload {
                title: "Demo".into(),
                file_name: "demo.mp4".into(),
                path: PathBuf::from("/videos/demo.mp4"),
                bytes: vec![0; 4],
            })
            .unwrap();
        assert_eq!(PathBuf::from(&video.source_url), PathBuf::from("/videos/demo.mp4"));
        assert_eq!(backend.list_videos().unwrap().len(), 1);
    }
}
