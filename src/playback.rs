// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Playback clock.
//!
//! [`PlaybackClock`] wraps a single time-reporting media element and turns
//! its readings into [`ClockEvent`]s. Every consumer of playback time reads
//! it from here.

/// A source of playback time, such as a decoder or a remote player.
pub trait MediaElement {
    /// Advance internal state by `elapsed` seconds of wall time.
    fn tick(&mut self, elapsed: f64);

    fn current_time(&self) -> f64;

    /// Total length, `None` until metadata has loaded.
    fn duration(&self) -> Option<f64>;

    fn is_playing(&self) -> bool;

    fn play(&mut self);

    fn pause(&mut self);

    fn set_current_time(&mut self, seconds: f64);

    /// Load or playback failure, if any.
    fn error(&self) -> Option<String>;
}

/// Media element that plays back in real time without decoding frames.
///
/// Used for authoring when only the timeline matters, and in tests.
#[derive(Debug, Clone, Default)]
pub struct SimulatedMedia {
    position: f64,
    playing: bool,
    /// Duration announced once the first tick has run.
    pending_duration: Option<f64>,
    duration: Option<f64>,
    failure: Option<String>,
}

impl SimulatedMedia {
    pub fn new(duration: f64) -> Self {
        Self {
            pending_duration: Some(duration),
            ..Self::default()
        }
    }

    /// Media whose source could not be opened.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            ..Self::default()
        }
    }
}

impl MediaElement for SimulatedMedia {
    fn tick(&mut self, elapsed: f64) {
        if self.failure.is_some() {
            return;
        }
        if let Some(duration) = self.pending_duration.take() {
            self.duration = Some(duration);
            return;
        }
        let Some(duration) = self.duration else {
            return;
        };
        if self.playing && elapsed > 0.0 {
            self.position = (self.position + elapsed).min(duration);
            if self.position >= duration {
                self.playing = false;
            }
        }
    }

    fn current_time(&self) -> f64 {
        self.position
    }

    fn duration(&self) -> Option<f64> {
        self.duration
    }

    fn is_playing(&self) -> bool {
        self.playing
    }

    fn play(&mut self) {
        if self.failure.is_none() {
            self.playing = true;
        }
    }

    fn pause(&mut self) {
        self.playing = false;
    }

    fn set_current_time(&mut self, seconds: f64) {
        self.position = seconds;
    }

    fn error(&self) -> Option<String> {
        self.failure.clone()
    }
}

/// Something the clock observed since the last poll.
#[derive(Debug, Clone, PartialEq)]
pub enum ClockEvent {
    /// Metadata loaded, sent once per media element.
    DurationLoaded(f64),
    /// Playback time changed. `rewind` is set when time moved backwards by
    /// more than the jitter tolerance.
    TimeUpdate {
        previous: f64,
        current: f64,
        rewind: bool,
    },
    /// The media element reported an error, sent once.
    Failed(String),
}

/// Result of an explicit seek.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Seek {
    pub previous: f64,
    pub current: f64,
}

pub struct PlaybackClock {
    media: Box<dyn MediaElement>,
    last_time: f64,
    duration: Option<f64>,
    failure_reported: bool,
    rewind_epsilon: f64,
}

impl PlaybackClock {
    pub fn new(media: Box<dyn MediaElement>, rewind_epsilon: f64) -> Self {
        let last_time = media.current_time();
        Self {
            media,
            last_time,
            duration: None,
            failure_reported: false,
            rewind_epsilon,
        }
    }

    /// Whether a move from `previous` to `current` counts as a rewind.
    pub fn is_rewind(&self, previous: f64, current: f64) -> bool {
        current < previous - self.rewind_epsilon
    }

    /// Advance the media by `elapsed` seconds and report what changed.
    pub fn advance(&mut self, elapsed: f64) -> Vec<ClockEvent> {
        self.media.tick(elapsed);
        self.poll()
    }

    /// Report changes since the last poll without advancing the media.
    pub fn poll(&mut self) -> Vec<ClockEvent> {
        let mut events = Vec::new();

        if let Some(message) = self.media.error() {
            if !self.failure_reported {
                log::error!("Playback failed: {}", message);
                self.failure_reported = true;
                events.push(ClockEvent::Failed(message));
            }
            return events;
        }

        if self.duration.is_none() {
            if let Some(duration) = self.media.duration() {
                log::info!("Media metadata loaded, duration {:.2}s", duration);
                self.duration = Some(duration);
                events.push(ClockEvent::DurationLoaded(duration));
            }
        }

        let current = self.media.current_time();
        if current != self.last_time {
            let previous = self.last_time;
            self.last_time = current;
            events.push(ClockEvent::TimeUpdate {
                previous,
                current,
                rewind: self.is_rewind(previous, current),
            });
        }

        events
    }

    pub fn current_time(&self) -> f64 {
        self.last_time
    }

    /// Duration in seconds, `0` while unknown.
    pub fn duration(&self) -> f64 {
        self.duration.unwrap_or(0.0)
    }

    pub fn is_loaded(&self) -> bool {
        self.duration.is_some()
    }

    pub fn is_playing(&self) -> bool {
        self.media.is_playing()
    }

    pub fn play(&mut self) {
        self.media.play();
    }

    pub fn pause(&mut self) {
        self.media.pause();
    }

    /// Jump to `seconds`, clamped to `[0, duration]`.
    ///
    /// The new time is recorded immediately, so the next poll does not
    /// report the jump a second time.
    pub fn seek_to(&mut self, seconds: f64) -> Seek {
        let upper = self.duration.unwrap_or(f64::INFINITY);
        let target = if seconds.is_finite() {
            seconds.clamp(0.0, upper)
        } else {
            0.0
        };
        let previous = self.last_time;
        self.media.set_current_time(target);
        self.last_time = target;
        Seek {
            previous,
            current: target,
        }
    }
}
