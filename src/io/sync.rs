// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Background backend calls.
//!
//! Each request runs on its own thread and reports back over a channel,
//! like the other background loaders in the app. Results are applied by the
//! UI thread only after the backend confirmed them. A result whose session
//! token was cancelled in the meantime is dropped.

use super::api::{Backend, VideoUpload};
use crate::error::CueError;
use crate::models::annotation::{Annotation, AnnotationId, AnnotationKind, ImageRef};
use crate::models::project::{VideoRecord, VideoUpdate};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;

/// Cancellation flag shared by one viewing session and its requests.
#[derive(Debug, Clone, Default)]
pub struct SessionToken(Arc<AtomicBool>);

impl SessionToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Work for the backend.
#[derive(Debug, Clone)]
pub enum SyncRequest {
    CreateAnnotation {
        video_id: String,
        record: Annotation,
    },
    UpdateAnnotation(Annotation),
    DeleteAnnotation {
        id: AnnotationId,
        kind: AnnotationKind,
    },
    ListVideos,
    OpenVideo(String),
    UploadVideo(VideoUpload),
    UpdateVideo {
        id: String,
        update: VideoUpdate,
    },
    DeleteVideo(String),
    /// Download the image shown on a product card.
    FetchImage {
        id: AnnotationId,
        url: String,
    },
}

impl SyncRequest {
    fn describe(&self) -> String {
        match self {
            SyncRequest::CreateAnnotation { record, .. } => format!("create {}", record.kind()),
            SyncRequest::UpdateAnnotation(record) => format!("update {} {}", record.kind(), record.id()),
            SyncRequest::DeleteAnnotation { id, kind } => format!("delete {} {}", kind, id),
            SyncRequest::ListVideos => "list videos".to_string(),
            SyncRequest::OpenVideo(id) => format!("open video {}", id),
            SyncRequest::UploadVideo(upload) => format!("upload {}", upload.file_name),
            SyncRequest::UpdateVideo { id, .. } => format!("update video {}", id),
            SyncRequest::DeleteVideo(id) => format!("delete video {}", id),
            SyncRequest::FetchImage { url, .. } => format!("fetch image {}", url),
        }
    }

    /// Requests that run without marking the worker busy.
    fn is_background(&self) -> bool {
        matches!(self, SyncRequest::FetchImage { .. })
    }

    /// Requests that carry file payloads get a progress bar.
    fn is_upload(&self) -> bool {
        match self {
            SyncRequest::UploadVideo(_) => true,
            SyncRequest::CreateAnnotation { record, .. } | SyncRequest::UpdateAnnotation(record) => {
                matches!(
                    record,
                    Annotation::Product(p) if matches!(p.image, Some(ImageRef::Pending { .. }))
                )
            }
            _ => false,
        }
    }
}

/// What the backend confirmed.
#[derive(Debug, Clone)]
pub enum SyncOutcome {
    Created {
        /// Id the record was submitted under.
        local_id: AnnotationId,
        record: Annotation,
    },
    Updated(Annotation),
    Deleted(AnnotationId),
    Videos(Vec<VideoRecord>),
    VideoOpened(VideoRecord),
    VideoUploaded(VideoRecord),
    VideoUpdated(VideoRecord),
    VideoDeleted(String),
    /// Image bytes for a product card, or why they could not be fetched.
    ImageFetched {
        id: AnnotationId,
        url: String,
        result: std::result::Result<Vec<u8>, String>,
    },
    Failed {
        action: String,
        message: String,
    },
}

/// Simulated progress for an upload whose real progress is not reported.
///
/// Creeps towards 90% while the request runs and jumps to done when it
/// finishes.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadProgress {
    pub label: String,
    pub fraction: f32,
}

impl UploadProgress {
    const CEILING: f32 = 0.9;
    const RATE_PER_SEC: f32 = 0.3;

    fn new(label: String) -> Self {
        Self {
            label,
            fraction: 0.0,
        }
    }

    fn tick(&mut self, elapsed: f32) {
        let remaining = Self::CEILING - self.fraction;
        self.fraction += remaining * (Self::RATE_PER_SEC * elapsed).min(1.0);
    }
}

struct Envelope {
    job: u64,
    token: SessionToken,
    outcome: SyncOutcome,
}

pub struct SyncWorker {
    backend: Arc<dyn Backend>,
    sender: Sender<Envelope>,
    receiver: Receiver<Envelope>,
    next_job: u64,
    in_flight: HashMap<u64, SessionToken>,
    uploads: HashMap<u64, UploadProgress>,
}

impl SyncWorker {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        let (sender, receiver) = channel();
        Self {
            backend,
            sender,
            receiver,
            next_job: 0,
            in_flight: HashMap::new(),
            uploads: HashMap::new(),
        }
    }

    pub fn is_busy(&self) -> bool {
        !self.in_flight.is_empty()
    }

    /// Progress of every upload still running, in submission order.
    pub fn uploads(&self) -> Vec<&UploadProgress> {
        let mut jobs: Vec<(&u64, &UploadProgress)> = self.uploads.iter().collect();
        jobs.sort_by_key(|(job, _)| **job);
        jobs.into_iter().map(|(_, p)| p).collect()
    }

    /// Start `request` on a background thread on behalf of `token`.
    pub fn submit(&mut self, token: &SessionToken, request: SyncRequest) {
        self.next_job += 1;
        let job = self.next_job;
        let action = request.describe();
        log::debug!("Job {}: {}", job, action);

        if request.is_upload() {
            self.uploads.insert(job, UploadProgress::new(action.clone()));
        }
        if !request.is_background() {
            self.in_flight.insert(job, token.clone());
        }

        let backend = Arc::clone(&self.backend);
        let sender = self.sender.clone();
        let token = token.clone();
        std::thread::spawn(move || {
            let outcome = if token.is_cancelled() {
                log::debug!("Job {} skipped, session already closed", job);
                SyncOutcome::Failed {
                    action,
                    message: CueError::Cancelled.to_string(),
                }
            } else {
                run(backend.as_ref(), request)
            };
            let _ = sender.send(Envelope { job, token, outcome });
        });
    }

    /// Advance simulated upload progress.
    pub fn tick(&mut self, elapsed: f32) {
        for progress in self.uploads.values_mut() {
            progress.tick(elapsed);
        }
    }

    /// Collect finished jobs, dropping results for cancelled sessions.
    pub fn drain(&mut self) -> Vec<SyncOutcome> {
        let mut outcomes = Vec::new();
        while let Ok(envelope) = self.receiver.try_recv() {
            if let Some(outcome) = self.accept(envelope) {
                outcomes.push(outcome);
            }
        }
        outcomes
    }

    /// Forget progress and pending jobs that belong to `token`.
    ///
    /// Their results are still received, then discarded.
    pub fn release(&mut self, token: &SessionToken) {
        token.cancel();
        let stale: Vec<u64> = self
            .in_flight
            .iter()
            .filter(|(_, t)| Arc::ptr_eq(&t.0, &token.0))
            .map(|(job, _)| *job)
            .collect();
        for job in stale {
            self.uploads.remove(&job);
        }
    }

    fn accept(&mut self, envelope: Envelope) -> Option<SyncOutcome> {
        self.in_flight.remove(&envelope.job);
        self.uploads.remove(&envelope.job);
        if envelope.token.is_cancelled() {
            log::debug!("Job {} finished after its session closed, discarded", envelope.job);
            return None;
        }
        Some(envelope.outcome)
    }

    #[cfg(test)]
    fn wait(&mut self, timeout: std::time::Duration) -> Option<SyncOutcome> {
        let deadline = std::time::Instant::now() + timeout;
        loop {
            let remaining = deadline.checked_duration_since(std::time::Instant::now())?;
            let envelope = self.receiver.recv_timeout(remaining).ok()?;
            if let Some(outcome) = self.accept(envelope) {
                return Some(outcome);
            }
        }
    }
}

fn run(backend: &dyn Backend, request: SyncRequest) -> SyncOutcome {
    let action = request.describe();
    let result = match request {
        SyncRequest::CreateAnnotation { video_id, record } => backend
            .create_annotation(&video_id, &record)
            .map(|confirmed| SyncOutcome::Created {
                local_id: record.id().clone(),
                record: confirmed,
            }),
        SyncRequest::UpdateAnnotation(record) => {
            backend.update_annotation(&record).map(|confirmed| {
                // Keep the id the store knows the record by
                let mut confirmed = confirmed;
                confirmed.set_id(record.id().clone());
                SyncOutcome::Updated(confirmed)
            })
        }
        SyncRequest::DeleteAnnotation { id, kind } => backend
            .delete_annotation(&id, kind)
            .map(|_| SyncOutcome::Deleted(id)),
        SyncRequest::ListVideos => backend.list_videos().map(SyncOutcome::Videos),
        SyncRequest::OpenVideo(id) => backend.get_video(&id).map(SyncOutcome::VideoOpened),
        SyncRequest::UploadVideo(upload) => backend.create_video(&upload).map(SyncOutcome::VideoUploaded),
        SyncRequest::UpdateVideo { id, update } => backend
            .update_video(&id, &update)
            .map(SyncOutcome::VideoUpdated),
        SyncRequest::DeleteVideo(id) => backend
            .delete_video(&id)
            .map(|_| SyncOutcome::VideoDeleted(id)),
        SyncRequest::FetchImage { id, url } => {
            let result = backend.fetch_image(&url).map_err(|e| {
                log::warn!("Failed to {}: {}", action, e);
                e.to_string()
            });
            Ok(SyncOutcome::ImageFetched { id, url, result })
        }
    };
    result.unwrap_or_else(|e| {
        log::error!("Failed to {}: {}", action, e);
        SyncOutcome::Failed {
            action,
            message: e.to_string(),
        }
    })
}
