// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Conversions between seconds and `MM:SS` display strings.
//!
//! Editing forms accept times as `MM:SS`, and every time label on the
//! timeline is produced by [`format_time`].

/// Format a number of seconds as `MM:SS`.
///
/// Fractional seconds are floored. Negative or non-finite input is clamped
/// to zero. Minutes are not wrapped into hours, so 3600 seconds is `60:00`.
pub fn format_time(total_seconds: f64) -> String {
    let total = if total_seconds.is_finite() && total_seconds > 0.0 {
        total_seconds.floor() as u64
    } else {
        0
    };
    format!("{:02}:{:02}", total / 60, total % 60)
}

/// Parse a `MM:SS` string back into seconds.
///
/// Missing or unparsable halves count as zero, so `"5"` is five minutes,
/// `":30"` is thirty seconds and `"ab:cd"` is zero.
pub fn parse_time(text: &str) -> f64 {
    let mut parts = text.trim().splitn(2, ':');
    let minutes = parse_part(parts.next());
    let seconds = parse_part(parts.next());
    (minutes * 60 + seconds) as f64
}

fn parse_part(part: Option<&str>) -> u64 {
    part.and_then(|p| p.trim().parse::<u64>().ok()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_examples() {
        assert_eq!(format_time(125.0), "02:05");
        assert_eq!(format_time(5.0), "00:05");
        assert_eq!(format_time(59.99), "00:59");
        assert_eq!(format_time(3600.0), "60:00");
    }

    #[test]
    fn test_format_clamps_bad_input() {
        assert_eq!(format_time(-4.0), "00:00");
        assert_eq!(format_time(f64::NAN), "00:00");
        assert_eq!(format_time(f64::INFINITY), "00:00");
    }

    #[test]
    fn test_parse_defaults_missing_parts() {
        assert_eq!(parse_time("02:05"), 125.0);
        assert_eq!(parse_time("5"), 300.0);
        assert_eq!(parse_time(":30"), 30.0);
        assert_eq!(parse_time("xx:10"), 10.0);
        assert_eq!(parse_time(""), 0.0);
    }

    #[test]
    fn test_roundtrip_every_well_formed_string() {
        for minutes in 0..100 {
            for seconds in 0..60 {
                let text = format!("{:02}:{:02}", minutes, seconds);
                assert_eq!(format_time(parse_time(&text)), text);
            }
        }
    }
}
