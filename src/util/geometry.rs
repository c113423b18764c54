// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Timeline geometry.
//!
//! This module maps between playback time and horizontal positions on the
//! scrubber track. Positions are expressed as percentages of the track
//! width so they are independent of the widget size.

/// Horizontal extent of an annotation block, in percent of the track width.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockSpan {
    pub left: f64,
    pub width: f64,
}

fn known_duration(duration: f64) -> Option<f64> {
    (duration.is_finite() && duration > 0.0).then_some(duration)
}

/// Position of the live playhead, `0` while the duration is unknown.
pub fn playhead_percent(current_time: f64, duration: f64) -> f64 {
    match known_duration(duration) {
        Some(d) => (current_time / d) * 100.0,
        None => 0.0,
    }
}

/// Offset and width of an annotation window on the track.
///
/// Returns `None` while the duration is unknown.
pub fn block_span(start_time: f64, end_time: f64, duration: f64) -> Option<BlockSpan> {
    let d = known_duration(duration)?;
    Some(BlockSpan {
        left: (start_time / d) * 100.0,
        width: ((end_time - start_time) / d) * 100.0,
    })
}

/// Convert a click on the track into a seek target in seconds.
///
/// The click position is clamped to the track so the result always lies in
/// `[0, duration]`.
pub fn click_to_time(click_x: f32, track_left: f32, track_width: f32, duration: f64) -> f64 {
    let Some(d) = known_duration(duration) else {
        return 0.0;
    };
    if track_width <= 0.0 {
        return 0.0;
    }
    let position = ((click_x - track_left) / track_width).clamp(0.0, 1.0);
    position as f64 * d
}

/// Convert a percentage back into an x coordinate inside a track.
pub fn percent_to_x(percent: f64, track_left: f32, track_width: f32) -> f32 {
    track_left + (percent / 100.0) as f32 * track_width
}
