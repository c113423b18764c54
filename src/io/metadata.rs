// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Duration probing for video sources.
//!
//! Video records from the backend usually carry no duration, so it is read
//! from the media itself. HLS manifests are summed segment by segment and
//! every other source is asked through `ffprobe`.

use super::media::SourceKind;
use crate::error::{CueError, Result};
use m3u8_rs::Playlist;
use reqwest::blocking::Client;
use reqwest::Url;
use serde::Deserialize;
use std::path::Path;
use std::process::Command;
use std::time::Duration;

/// Master playlists followed before giving up.
const MAX_MANIFEST_DEPTH: usize = 3;

/// Finds the length of a media source. Calls may block.
pub trait DurationReader: Send + Sync {
    fn duration(&self, source: &str) -> Result<f64>;
}

/// What a single HLS manifest says about the stream.
#[derive(Debug, Clone, PartialEq)]
pub enum Manifest {
    /// Media playlist with its `#EXTINF` lengths summed.
    Media { duration: f64 },
    /// Master playlist pointing at the variant to follow.
    Master { variant: String },
}

/// Parse an HLS manifest.
pub fn parse_manifest(bytes: &[u8]) -> Result<Manifest> {
    match m3u8_rs::parse_playlist_res(bytes) {
        Ok(Playlist::MediaPlaylist(playlist)) => Ok(Manifest::Media {
            duration: playlist.segments.iter().map(|s| f64::from(s.duration)).sum(),
        }),
        Ok(Playlist::MasterPlaylist(playlist)) => playlist
            .variants
            .into_iter()
            .next()
            .map(|v| Manifest::Master { variant: v.uri })
            .ok_or_else(|| CueError::Playback("HLS master playlist has no variants".to_string())),
        Err(_) => Err(CueError::Playback("Unreadable HLS manifest".to_string())),
    }
}

fn is_remote(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}

/// Resolve a playlist entry against the manifest it was found in.
pub fn resolve(base: &str, uri: &str) -> Result<String> {
    if is_remote(uri) {
        return Ok(uri.to_string());
    }
    if is_remote(base) {
        let joined = Url::parse(base)
            .and_then(|url| url.join(uri))
            .map_err(|e| CueError::Playback(format!("Invalid manifest URL {}: {}", base, e)))?;
        return Ok(joined.to_string());
    }
    let parent = Path::new(base).parent().unwrap_or_else(|| Path::new(""));
    Ok(parent.join(uri).display().to_string())
}

#[derive(Debug, Default, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    format: FfprobeFormat,
}

#[derive(Debug, Default, Deserialize)]
struct FfprobeFormat {
    #[serde(default)]
    duration: Option<String>,
}

/// Read the container duration from `ffprobe -print_format json` output.
pub fn parse_ffprobe_duration(json: &str) -> Result<f64> {
    let output: FfprobeOutput = serde_json::from_str(json)?;
    output
        .format
        .duration
        .as_deref()
        .and_then(|d| d.trim().parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d > 0.0)
        .ok_or_else(|| CueError::Playback("ffprobe reported no duration".to_string()))
}

/// Reads manifests over HTTP or from disk and shells out to
/// `ffprobe` for everything else.
pub struct SourceMetadata {
    client: Client,
    ffprobe: String,
}

impl SourceMetadata {
    pub fn new(ffprobe: impl Into<String>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            ffprobe: ffprobe.into(),
        })
    }

    fn read(&self, location: &str) -> Result<Vec<u8>> {
        if is_remote(location) {
            let response = self.client.get(location).send()?.error_for_status()?;
            Ok(response.bytes()?.to_vec())
        } else {
            Ok(std::fs::read(location)?)
        }
    }

    fn hls_duration(&self, source: &str) -> Result<f64> {
        let mut location = source.to_string();
        for _ in 0..MAX_MANIFEST_DEPTH {
            match parse_manifest(&self.read(&location)?)? {
                Manifest::Media { duration } => return Ok(duration),
                Manifest::Master { variant } => {
                    log::debug!("Following HLS variant {}", variant);
                    location = resolve(&location, &variant)?;
                }
            }
        }
        Err(CueError::Playback(format!("Too many nested playlists in {}", source)))
    }

    fn ffprobe_duration(&self, source: &str) -> Result<f64> {
        let output = Command::new(&self.ffprobe)
            .args(["-v", "quiet", "-print_format", "json", "-show_format"])
            .arg(source)
            .output()
            .map_err(|e| CueError::Playback(format!("Could not run {}: {}", self.ffprobe, e)))?;

        if !output.status.success() {
            return Err(CueError::Playback(format!(
                "{} failed on {} (exit code {:?})",
                self.ffprobe,
                source,
                output.status.code()
            )));
        }
        parse_ffprobe_duration(&String::from_utf8_lossy(&output.stdout))
    }
}

impl DurationReader for SourceMetadata {
    fn duration(&self, source: &str) -> Result<f64> {
        log::info!("Probing duration of {}", source);
        match SourceKind::of(source) {
            SourceKind::Hls => self.hls_duration(source),
            SourceKind::Direct => self.ffprobe_duration(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MEDIA_PLAYLIST: &str = "#EXTM3U
#EXT-X-VERSION:3
#EXT-X-TARGETDURATION:10
#EXTINF:10.0,
seg0.ts
#EXTINF:10.0,
seg1.ts
#EXTINF:4.5,
seg2.ts
#EXT-X-ENDLIST
";

    const MASTER_PLAYLIST: &str = "#EXTM3U
#EXT-X-STREAM-INF:BANDWIDTH=1280000,RESOLUTION=1280x720
720p/index.m3u8
#EXT-X-STREAM-INF:BANDWIDTH=640000,RESOLUTION=640x360
360p/index.m3u8
";

    #[test]
    fn test_media_playlist_sums_segments() {
        match parse_manifest(MEDIA_PLAYLIST.as_bytes()).unwrap() {
            Manifest::Media { duration } => assert!((duration - 24.5).abs() < 1e-3),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_master_playlist_points_at_first_variant() {
        assert_eq!(
            parse_manifest(MASTER_PLAYLIST.as_bytes()).unwrap(),
            Manifest::Master { variant: "720p/index.m3u8".into() }
        );
        assert!(parse_manifest(b"not a playlist").is_err());
    }

    #[test]
    fn test_resolve_variant_paths() {
        assert_eq!(
            resolve("https://cdn.test/v/master.m3u8?sig=1", "720p/index.m3u8").unwrap(),
            "https://cdn.test/v/720p/index.m3u8"
        );
        assert_eq!(
            resolve("https://cdn.test/v/master.m3u8", "https://other.test/a.m3u8").unwrap(),
            "https://other.test/a.m3u8"
        );
        let local = resolve("/videos/v/master.m3u8", "720p/index.m3u8").unwrap();
        assert_eq!(Path::new(&local), Path::new("/videos/v/720p/index.m3u8"));
    }

    #[test]
    fn test_ffprobe_output() {
        let json = r#"{"format":{"filename":"a.mp4","duration":"120.500000"}}"#;
        assert!((parse_ffprobe_duration(json).unwrap() - 120.5).abs() < 1e-9);
        assert!(parse_ffprobe_duration(r#"{"format":{}}"#).is_err());
        assert!(parse_ffprobe_duration(r#"{"format":{"duration":"N/A"}}"#).is_err());
    }

    #[test]
    fn test_local_hls_follows_master_playlist() {
        let dir = std::env::temp_dir().join(format!("cuepoint-hls-{}", std::process::id()));
        std::fs::create_dir_all(dir.join("720p")).unwrap();
        std::fs::write(dir.join("master.m3u8"), MASTER_PLAYLIST).unwrap();
        std::fs::write(dir.join("720p").join("index.m3u8"), MEDIA_PLAYLIST).unwrap();

        let reader = SourceMetadata::new("ffprobe", Duration::from_secs(1)).unwrap();
        let duration = reader.duration(&dir.join("master.m3u8").display().to_string());
        let _ = std::fs::remove_dir_all(&dir);
        assert!((duration.unwrap() - 24.5).abs() < 1e-3);
    }
}
