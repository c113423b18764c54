// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Media sources and product images.
//!
//! This module classifies video sources, opens a media element for a video
//! record and loads product images picked from disk.

use super::metadata::DurationReader;
use crate::error::{CueError, Result};
use crate::models::annotation::ImageRef;
use crate::models::project::VideoRecord;
use crate::playback::{MediaElement, SimulatedMedia};
use std::path::Path;
use std::sync::mpsc::{channel, Receiver, TryRecvError};
use std::sync::Arc;

/// How a video source is delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// HLS manifest (`.m3u8`), needs a demuxer when not played natively.
    Hls,
    /// Single progressive file.
    Direct,
}

impl SourceKind {
    pub fn of(url: &str) -> Self {
        // Ignore query string and fragment
        let path = url.split(['?', '#']).next().unwrap_or(url);
        if path.to_ascii_lowercase().ends_with(".m3u8") {
            SourceKind::Hls
        } else {
            SourceKind::Direct
        }
    }
}

/// Open a media element for `video`.
///
/// Frames are not decoded; playback time runs against the video's
/// duration. When the record carries none, `durations` reads it from the
/// source on a background thread and the element reports it once known.
/// A video without a source opens in the failed state so the player shows
/// an error instead of spinning forever.
pub fn open_media(video: &VideoRecord, durations: Arc<dyn DurationReader>) -> Box<dyn MediaElement> {
    if video.source_url.trim().is_empty() {
        log::warn!("Video {} has no source", video.id);
        return Box::new(SimulatedMedia::failed("Video has no source URL"));
    }
    let kind = SourceKind::of(&video.source_url);
    match video.duration {
        Some(duration) if duration.is_finite() && duration > 0.0 => {
            log::info!(
                "Opening {:?} source {} ({:.1}s)",
                kind,
                video.source_url,
                duration
            );
            Box::new(SimulatedMedia::new(duration))
        }
        _ => {
            log::info!("Opening {:?} source {}, probing duration", kind, video.source_url);
            Box::new(PendingMedia::spawn(video.source_url.clone(), durations))
        }
    }
}

/// Media element whose duration arrives from a background lookup.
///
/// Play and seek requests made while the lookup runs are kept and carried
/// over once the duration is known.
pub struct PendingMedia {
    lookup: Option<Receiver<Result<f64>>>,
    inner: SimulatedMedia,
}

impl PendingMedia {
    pub fn spawn(source: String, durations: Arc<dyn DurationReader>) -> Self {
        let (sender, receiver) = channel();
        std::thread::spawn(move || {
            let _ = sender.send(durations.duration(&source));
        });
        Self {
            lookup: Some(receiver),
            inner: SimulatedMedia::default(),
        }
    }

    fn collect_duration(&mut self) {
        let Some(receiver) = &self.lookup else {
            return;
        };
        let result = match receiver.try_recv() {
            Ok(result) => result,
            Err(TryRecvError::Empty) => return,
            Err(TryRecvError::Disconnected) => {
                Err(CueError::Playback("Duration lookup stopped".to_string()))
            }
        };
        self.lookup = None;

        let position = self.inner.current_time();
        let playing = self.inner.is_playing();
        self.inner = match result {
            Ok(duration) if duration.is_finite() && duration > 0.0 => {
                log::info!("Source reports duration {:.1}s", duration);
                SimulatedMedia::new(duration)
            }
            Ok(_) => SimulatedMedia::failed("Video reports no duration"),
            Err(CueError::Playback(message)) => {
                log::warn!("Duration lookup failed: {}", message);
                SimulatedMedia::failed(message)
            }
            Err(e) => {
                log::warn!("Duration lookup failed: {}", e);
                SimulatedMedia::failed(e.to_string())
            }
        };
        self.inner.set_current_time(position);
        if playing {
            self.inner.play();
        }
    }
}

impl MediaElement for PendingMedia {
    fn tick(&mut self, elapsed: f64) {
        self.collect_duration();
        self.inner.tick(elapsed);
    }

    fn current_time(&self) -> f64 {
        self.inner.current_time()
    }

    fn duration(&self) -> Option<f64> {
        self.inner.duration()
    }

    fn is_playing(&self) -> bool {
        self.inner.is_playing()
    }

    fn play(&mut self) {
        self.inner.play();
    }

    fn pause(&mut self) {
        self.inner.pause();
    }

    fn set_current_time(&mut self, seconds: f64) {
        self.inner.set_current_time(seconds);
    }

    fn error(&self) -> Option<String> {
        self.inner.error()
    }
}

/// Decoded image data ready for display.
pub struct LoadedImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

/// Decode encoded image bytes into RGBA pixels.
pub fn decode_image(bytes: &[u8]) -> Result<LoadedImage> {
    let img = image::load_from_memory(bytes)?.to_rgba8();
    Ok(LoadedImage {
        width: img.width(),
        height: img.height(),
        pixels: img.into_raw(),
    })
}

/// Read a product image from disk for upload.
///
/// The file is decoded once so unreadable images are rejected before they
/// reach the backend.
pub fn load_product_image(path: &Path) -> Result<ImageRef> {
    let bytes = std::fs::read(path)?;
    let decoded = decode_image(&bytes)?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .ok_or_else(|| CueError::NotFound {
            entity: "file",
            id: path.display().to_string(),
        })?;
    log::info!(
        "Loaded product image {} ({}x{})",
        file_name,
        decoded.width,
        decoded.height
    );
    Ok(ImageRef::Pending { file_name, bytes })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::{ClockEvent, PlaybackClock};

    #[test]
    fn test_source_kind() {
        assert_eq!(SourceKind::of("https://cdn.test/a/master.m3u8"), SourceKind::Hls);
        assert_eq!(SourceKind::of("https://cdn.test/a/MASTER.M3U8?token=1"), SourceKind::Hls);
        assert_eq!(SourceKind::of("https://cdn.test/a/clip.mp4"), SourceKind::Direct);
    }

    /// Answers every lookup with a fixed duration, or fails when `None`.
    struct FixedDuration(Option<f64>);

    impl DurationReader for FixedDuration {
        fn duration(&self, source: &str) -> Result<f64> {
            self.0
                .ok_or_else(|| CueError::Playback(format!("no such file {}", source)))
        }
    }

    fn reader(duration: Option<f64>) -> Arc<dyn DurationReader> {
        Arc::new(FixedDuration(duration))
    }

    /// Advance `clock` until it reports something, or give up after a while.
    fn wait_for_events(clock: &mut PlaybackClock) -> Vec<ClockEvent> {
        for _ in 0..200 {
            let events = clock.advance(0.0);
            if !events.is_empty() {
                return events;
            }
            std::thread::sleep(std::time::Duration::from_millis(5));
        }
        Vec::new()
    }

    #[test]
    fn test_open_media_without_source_fails() {
        let video = VideoRecord::new("v".into(), "t".into(), " ".into());
        let media = open_media(&video, reader(Some(30.0)));
        assert!(media.error().is_some());
    }

    #[test]
    fn test_known_duration_skips_lookup() {
        let mut video = VideoRecord::new("v".into(), "t".into(), "clip.mp4".into());
        video.duration = Some(30.0);
        let mut media = open_media(&video, reader(None));
        media.tick(0.0);
        assert!(media.error().is_none());
        assert_eq!(media.duration(), Some(30.0));
    }

    #[test]
    fn test_hls_only_record_loads_duration_from_source() {
        let video: VideoRecord =
            serde_json::from_str(r#"{"id":"v","title":"t","hlsUrl":"https://cdn.test/a.m3u8"}"#).unwrap();
        let mut clock = PlaybackClock::new(open_media(&video, reader(Some(42.0))), 1.0);
        assert!(!clock.is_loaded());

        assert_eq!(wait_for_events(&mut clock), vec![ClockEvent::DurationLoaded(42.0)]);
        clock.play();
        clock.advance(1.5);
        assert_eq!(clock.current_time(), 1.5);
    }

    #[test]
    fn test_play_before_duration_arrives_is_kept() {
        let video = VideoRecord::new("v".into(), "t".into(), "upload.mp4".into());
        let mut clock = PlaybackClock::new(open_media(&video, reader(Some(10.0))), 1.0);
        clock.play();
        assert_eq!(wait_for_events(&mut clock), vec![ClockEvent::DurationLoaded(10.0)]);
        assert!(clock.is_playing());
    }

    #[test]
    fn test_failed_duration_lookup_becomes_playback_error() {
        let video = VideoRecord::new("v".into(), "t".into(), "missing.mp4".into());
        let mut clock = PlaybackClock::new(
            open_media(&video, reader(None)),
            1.0,
        );
        assert_eq!(
            wait_for_events(&mut clock),
            vec![ClockEvent::Failed("no such file missing.mp4".into())]
        );
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(decode_image(b"not an image"), Err(CueError::Image(_))));
    }

    #[test]
    fn test_decode_png() {
        let mut png = Vec::new();
        image::RgbaImage::new(2, 3)
            .write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
            .unwrap();
        let decoded = decode_image(&png).unwrap();
        assert_eq!((decoded.width, decoded.height), (2, 3));
        assert_eq!(decoded.pixels.len(), 2 * 3 * 4);
    }
}
