// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Main application state and egui App implementation.
//!
//! This module contains the main application structure that implements
//! the egui::App trait. It owns the backend worker and the video library,
//! holds at most one viewing session, and routes panel actions to them.

use crate::config::AppConfig;
use crate::io::api::{Backend, OfflineBackend, RestBackend, VideoUpload};
use crate::io::metadata::{DurationReader, SourceMetadata};
use crate::io::sync::{SessionToken, SyncOutcome, SyncRequest, SyncWorker};
use crate::io::{media, serialization};
use crate::models::annotation::{Annotation, AnnotationId};
use crate::models::project::{VideoRecord, VideoUpdate};
use crate::session::{Draft, ViewingSession};
use crate::ui::images::ProductImages;
use crate::ui::library::RenameDraft;
use crate::ui::{canvas, library, properties, timeline, toolbar};
use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Longest frame step fed to the playback clock.
const MAX_FRAME_SECS: f32 = 0.1;

/// Message shown in the status bar.
enum Status {
    Info(String),
    Error(String),
}

/// Main application state.
pub struct CuepointApp {
    config: AppConfig,

    /// Runs backend calls off the UI thread
    worker: SyncWorker,

    /// Reads durations the backend does not report
    durations: Arc<dyn DurationReader>,

    /// Set when running without a configured API
    offline: Option<Arc<OfflineBackend>>,

    /// Token for library requests, which outlive any one session
    library_token: SessionToken,

    /// Videos known to the backend
    videos: Vec<VideoRecord>,

    /// Currently open video, if any
    session: Option<ViewingSession>,

    /// Textures for product card images of the open video
    images: ProductImages,

    /// Video title being edited in the library
    rename: Option<RenameDraft>,

    status: Option<Status>,

    /// Loading state message
    loading_message: Option<String>,
}

impl CuepointApp {
    /// Create the application and start loading the video library.
    pub fn new(config: AppConfig) -> Result<Self> {
        let (backend, offline): (Arc<dyn Backend>, Option<Arc<OfflineBackend>>) =
            match config.api_base_url.as_deref() {
                Some(url) => {
                    log::info!("Using backend at {}", url);
                    let rest = RestBackend::new(
                        url,
                        config.api_token.clone(),
                        Duration::from_secs(config.request_timeout_secs),
                    )?;
                    (Arc::new(rest), None)
                }
                None => {
                    log::warn!("No API URL configured, working offline");
                    let offline = Arc::new(OfflineBackend::new());
                    (offline.clone(), Some(offline))
                }
            };

        let durations = SourceMetadata::new(
            config.ffprobe_path.clone(),
            Duration::from_secs(config.request_timeout_secs),
        )?;

        let mut app = Self {
            config,
            worker: SyncWorker::new(backend),
            durations: Arc::new(durations),
            offline,
            library_token: SessionToken::new(),
            videos: Vec::new(),
            session: None,
            images: ProductImages::default(),
            rename: None,
            status: None,
            loading_message: None,
        };
        app.refresh_library();
        Ok(app)
    }

    fn info(&mut self, message: impl Into<String>) {
        self.status = Some(Status::Info(message.into()));
    }

    fn error(&mut self, message: impl Into<String>) {
        let message = message.into();
        log::error!("{}", message);
        self.status = Some(Status::Error(message));
    }

    fn refresh_library(&mut self) {
        self.worker.submit(&self.library_token, SyncRequest::ListVideos);
    }

    /// Fetch a video with its annotations and open it once it arrives.
    fn open_video(&mut self, id: String) {
        self.loading_message = Some("Loading video...".to_string());
        self.worker.submit(&self.library_token, SyncRequest::OpenVideo(id));
    }

    /// Replace the current session with a fresh one for `video`.
    fn start_session(&mut self, video: VideoRecord) {
        self.close_session();
        let media = media::open_media(&video, Arc::clone(&self.durations));
        self.session = Some(ViewingSession::new(video, media, self.config.playback));
    }

    fn close_session(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.teardown();
            self.worker.release(session.token());
        }
        self.images.clear();
    }

    /// Validate the open form and send it to the backend.
    ///
    /// The form stays open until the backend confirms the write.
    fn save_draft(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let record = match session.submit_draft() {
            Ok(record) => record,
            Err(e) => {
                log::warn!("Rejected annotation: {}", e);
                self.status = Some(Status::Error(e.to_string()));
                return;
            }
        };
        let editing = session.draft.as_ref().and_then(Draft::editing).is_some();
        let request = if editing {
            SyncRequest::UpdateAnnotation(record)
        } else {
            SyncRequest::CreateAnnotation {
                video_id: session.video().id.clone(),
                record,
            }
        };
        let token = session.token().clone();
        self.worker.submit(&token, request);
        self.info("Saving...");
    }

    fn delete_annotation(&mut self, id: AnnotationId) {
        let Some(session) = self.session.as_ref() else {
            return;
        };
        let Some(record) = session.store().get(&id) else {
            return;
        };
        let request = SyncRequest::DeleteAnnotation {
            kind: record.kind(),
            id,
        };
        let token = session.token().clone();
        self.worker.submit(&token, request);
    }

    fn upload_video(&mut self) {
        let Some(path) = rfd::FileDialog::new()
            .add_filter("Videos", &["mp4", "mov", "m4v", "webm", "mkv"])
            .pick_file()
        else {
            return;
        };
        match read_upload(&path) {
            Ok(upload) => self.worker.submit(&self.library_token, SyncRequest::UploadVideo(upload)),
            Err(e) => self.error(format!("Failed to read {}: {}", path.display(), e)),
        }
    }

    fn pick_product_image(&mut self) {
        let Some(path) = rfd::FileDialog::new()
            .add_filter("Images", &["jpg", "jpeg", "png", "webp", "gif"])
            .pick_file()
        else {
            return;
        };
        match media::load_product_image(&path) {
            Ok(image) => {
                if let Some(Draft::Product(draft)) =
                    self.session.as_mut().and_then(|s| s.draft.as_mut())
                {
                    draft.image = Some(image);
                }
            }
            Err(e) => self.error(format!("Failed to load image: {}", e)),
        }
    }

    /// Export the open video and its annotations to a file.
    fn export_video(&mut self, path: PathBuf) {
        let Some(session) = self.session.as_ref() else {
            return;
        };
        match serialization::export(&session.snapshot(), &path) {
            Ok(()) => self.info(format!("Exported to {}", path.display())),
            Err(e) => self.error(format!("Failed to export: {}", e)),
        }
    }

    /// Open a previously exported video record.
    fn import_video(&mut self, path: PathBuf) {
        match serialization::import(&path) {
            Ok(video) => {
                if let Some(offline) = &self.offline {
                    offline.insert_video(video.clone());
                    self.refresh_library();
                }
                self.info(format!("Imported {}", video.title));
                self.start_session(video);
            }
            Err(e) => self.error(format!("Failed to import: {}", e)),
        }
    }

    fn handle_outcome(&mut self, ctx: &egui::Context, outcome: SyncOutcome) {
        match outcome {
            SyncOutcome::Created { local_id, record } => {
                if let Some(session) = self.session.as_mut() {
                    log::info!("Created {} {}", record.kind(), record.id());
                    session.apply_created(&local_id, record);
                    self.info("Saved");
                }
            }
            SyncOutcome::Updated(record) => {
                if let Some(session) = self.session.as_mut() {
                    if session.apply_updated(record) {
                        self.info("Saved");
                    } else {
                        self.error("Updated annotation is no longer in this video");
                    }
                }
            }
            SyncOutcome::Deleted(id) => {
                if let Some(session) = self.session.as_mut() {
                    session.apply_removed(&id);
                    self.info("Deleted");
                }
            }
            SyncOutcome::Videos(videos) => {
                log::info!("Library has {} videos", videos.len());
                self.videos = videos;
            }
            SyncOutcome::VideoOpened(video) => {
                self.loading_message = None;
                self.start_session(video);
            }
            SyncOutcome::VideoUploaded(video) => {
                self.info(format!("Uploaded {}", video.title));
                self.videos.push(video);
            }
            SyncOutcome::VideoUpdated(video) => {
                if let Some(session) = self.session.as_mut().filter(|s| s.video().id == video.id) {
                    session.set_video_title(video.title.clone());
                }
                if let Some(existing) = self.videos.iter_mut().find(|v| v.id == video.id) {
                    existing.title = video.title;
                    existing.thumbnail_url = video.thumbnail_url;
                }
            }
            SyncOutcome::VideoDeleted(id) => {
                self.videos.retain(|v| v.id != id);
                if self.session.as_ref().is_some_and(|s| s.video().id == id) {
                    self.close_session();
                }
                self.info("Video deleted");
            }
            SyncOutcome::ImageFetched { id, url, result } => {
                self.images.finish_fetch(ctx, &id, &url, result.as_deref().ok());
            }
            SyncOutcome::Failed { action, message } => {
                self.loading_message = None;
                self.error(format!("Failed to {}: {}", action, message));
            }
        }
    }

    fn handle_keys(&mut self, ctx: &egui::Context) {
        let Some(session) = self.session.as_mut() else {
            return;
        };

        if ctx.input(|i| i.key_pressed(egui::Key::Escape)) {
            if session.draft.take().is_none() {
                session.selected = None;
            }
        }

        // Skip while a text field has focus
        if ctx.wants_keyboard_input() {
            return;
        }
        if ctx.input(|i| i.key_pressed(egui::Key::Space)) {
            session.toggle_play();
        }
        if ctx.input(|i| i.key_pressed(egui::Key::ArrowLeft)) {
            session.skip_backward();
        }
        if ctx.input(|i| i.key_pressed(egui::Key::ArrowRight)) {
            session.skip_forward();
        }
        if ctx.input(|i| i.key_pressed(egui::Key::Delete)) {
            if let Some(id) = session.selected.clone() {
                self.delete_annotation(id);
            }
        }
    }

    fn menu_bar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
            egui::menu::bar(ui, |ui| {
                ui.menu_button("File", |ui| {
                    if ui.button("Upload Video...").clicked() {
                        self.upload_video();
                        ui.close_menu();
                    }
                    if ui.button("Import Annotations...").clicked() {
                        if let Some(path) = rfd::FileDialog::new()
                            .add_filter("Annotations", &["yaml", "yml", "json"])
                            .pick_file()
                        {
                            self.import_video(path);
                        }
                        ui.close_menu();
                    }
                    ui.separator();
                    let has_session = self.session.is_some();
                    ui.add_enabled_ui(has_session, |ui| {
                        ui.menu_button("Export Annotations", |ui| {
                            if ui.button("Export as YAML...").clicked() {
                                if let Some(path) = rfd::FileDialog::new()
                                    .add_filter("YAML", &["yaml", "yml"])
                                    .set_file_name("annotations.yaml")
                                    .save_file()
                                {
                                    self.export_video(path);
                                }
                                ui.close_menu();
                            }
                            if ui.button("Export as JSON...").clicked() {
                                if let Some(path) = rfd::FileDialog::new()
                                    .add_filter("JSON", &["json"])
                                    .set_file_name("annotations.json")
                                    .save_file()
                                {
                                    self.export_video(path);
                                }
                                ui.close_menu();
                            }
                        });
                    });
                    if ui.add_enabled(has_session, egui::Button::new("Close Video")).clicked() {
                        self.close_session();
                        ui.close_menu();
                    }
                    ui.separator();
                    if ui.button("Quit").clicked() {
                        ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                    }
                });
            });
        });
    }
}

fn read_upload(path: &std::path::Path) -> std::io::Result<VideoUpload> {
    let bytes = std::fs::read(path)?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "video".to_string());
    let title = path
        .file_stem()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| file_name.clone());
    Ok(VideoUpload {
        title,
        file_name,
        path: path.to_path_buf(),
        bytes,
    })
}

impl eframe::App for CuepointApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let dt = ctx.input(|i| i.stable_dt).min(MAX_FRAME_SECS);

        // Apply finished backend calls
        self.worker.tick(dt);
        for outcome in self.worker.drain() {
            self.handle_outcome(ctx, outcome);
        }

        if let Some(session) = self.session.as_mut() {
            session.advance(dt as f64);
        }

        // Keep the clock and progress bars moving
        let animating = self
            .session
            .as_ref()
            .is_some_and(|s| s.is_playing() || !s.clock().is_loaded());
        if animating || self.worker.is_busy() || self.loading_message.is_some() {
            ctx.request_repaint();
        }

        self.handle_keys(ctx);
        self.menu_bar(ctx);

        let busy = self.worker.is_busy();

        // Toolbar
        let toolbar_action = self.session.as_ref().map(|session| {
            egui::TopBottomPanel::top("toolbar")
                .show(ctx, |ui| toolbar::show(ui, session, self.config.playback.skip_secs))
                .inner
        });
        if let (Some(action), Some(session)) = (toolbar_action, self.session.as_mut()) {
            match action {
                toolbar::ToolbarAction::TogglePlay => session.toggle_play(),
                toolbar::ToolbarAction::SkipBack => session.skip_backward(),
                toolbar::ToolbarAction::SkipForward => session.skip_forward(),
                toolbar::ToolbarAction::NewProduct => session.open_new_product(),
                toolbar::ToolbarAction::NewSurvey => session.open_new_survey(),
                toolbar::ToolbarAction::None => {}
            }
        }

        // Status bar
        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                match &self.status {
                    Some(Status::Info(message)) => {
                        ui.label(message);
                    }
                    Some(Status::Error(message)) => {
                        ui.colored_label(egui::Color32::from_rgb(230, 90, 90), message);
                    }
                    None => {
                        ui.label(egui::RichText::new("Ready").weak());
                    }
                }
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if self.config.is_offline() {
                        ui.label(egui::RichText::new("offline").weak());
                    }
                    if busy {
                        ui.spinner();
                    }
                });
            });
        });

        // Timeline
        let timeline_action = self.session.as_ref().map(|session| {
            egui::TopBottomPanel::bottom("timeline")
                .show(ctx, |ui| {
                    ui.add_space(4.0);
                    let action = timeline::show(ui, session);
                    ui.add_space(4.0);
                    action
                })
                .inner
        });
        if let (Some(action), Some(session)) = (timeline_action, self.session.as_mut()) {
            match action {
                timeline::TimelineAction::Seek(t) => session.seek_to(t),
                timeline::TimelineAction::Select(id) => session.selected = Some(id),
                timeline::TimelineAction::None => {}
            }
        }

        // Library panel (left side)
        let uploads = self.worker.uploads().into_iter().cloned().collect::<Vec<_>>();
        let open_id = self.session.as_ref().map(|s| s.video().id.clone());
        let library_action = egui::SidePanel::left("library")
            .default_width(220.0)
            .show(ctx, |ui| {
                let uploads: Vec<_> = uploads.iter().collect();
                library::show(ui, &self.videos, open_id.as_deref(), &uploads, &mut self.rename)
            })
            .inner;
        match library_action {
            library::LibraryAction::Refresh => self.refresh_library(),
            library::LibraryAction::Open(id) => self.open_video(id),
            library::LibraryAction::Delete(id) => {
                self.worker.submit(&self.library_token, SyncRequest::DeleteVideo(id));
            }
            library::LibraryAction::Rename { id, title } => {
                let update = VideoUpdate {
                    title: Some(title),
                    ..VideoUpdate::default()
                };
                self.worker
                    .submit(&self.library_token, SyncRequest::UpdateVideo { id, update });
            }
            library::LibraryAction::Upload => self.upload_video(),
            library::LibraryAction::None => {}
        }

        // Properties panel (right side)
        let properties_action = self.session.as_mut().map(|session| {
            egui::SidePanel::right("properties")
                .default_width(280.0)
                .show(ctx, |ui| properties::show(ui, session, busy))
                .inner
        });
        match properties_action {
            Some(properties::PropertiesAction::Select(id)) => {
                if let Some(session) = self.session.as_mut() {
                    session.selected = Some(id);
                }
            }
            Some(properties::PropertiesAction::Edit(id)) => {
                if let Some(session) = self.session.as_mut() {
                    session.edit(&id);
                }
            }
            Some(properties::PropertiesAction::Delete(id)) => self.delete_annotation(id),
            Some(properties::PropertiesAction::Save) => self.save_draft(),
            Some(properties::PropertiesAction::CancelEdit) => {
                if let Some(session) = self.session.as_mut() {
                    session.draft = None;
                }
            }
            Some(properties::PropertiesAction::PickImage) => self.pick_product_image(),
            Some(properties::PropertiesAction::Rejected(e)) => {
                log::warn!("Rejected input: {}", e);
                self.status = Some(Status::Error(e.to_string()));
            }
            Some(properties::PropertiesAction::None) | None => {}
        }

        // Product images for the cards on screen
        if let Some(session) = self.session.as_ref() {
            let products = session.visible_overlays().into_iter().filter_map(|a| match a {
                Annotation::Product(product) => Some(product),
                Annotation::Survey(_) => None,
            });
            let fetches = self.images.prepare(ctx, products);
            for (id, url) in fetches {
                self.worker
                    .submit(session.token(), SyncRequest::FetchImage { id, url });
            }
        }

        // Main canvas (center)
        let canvas_action = egui::CentralPanel::default()
            .show(ctx, |ui| {
                if let Some(ref message) = self.loading_message {
                    ui.centered_and_justified(|ui| {
                        ui.vertical_centered(|ui| {
                            ui.add_space(20.0);
                            ui.spinner();
                            ui.add_space(10.0);
                            ui.label(
                                egui::RichText::new(message)
                                    .size(16.0)
                                    .color(egui::Color32::from_gray(200)),
                            );
                        });
                    });
                    canvas::CanvasAction::None
                } else {
                    canvas::show(ui, self.session.as_mut(), &self.images)
                }
            })
            .inner;

        match canvas_action {
            canvas::CanvasAction::AnswerSurvey(id, selected) => {
                if let Some(session) = self.session.as_mut() {
                    if let Err(e) = session.submit_survey_answer(&id, &selected) {
                        log::warn!("Rejected survey answer: {}", e);
                        self.status = Some(Status::Error(e.to_string()));
                    }
                }
            }
            canvas::CanvasAction::SkipSurvey(id) => {
                if let Some(session) = self.session.as_mut() {
                    session.dismiss_survey(&id);
                }
            }
            canvas::CanvasAction::None => {}
        }
    }
}
