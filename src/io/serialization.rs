// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Video record export and import.
//!
//! This module writes a video and its annotations to YAML or JSON and reads
//! them back. The format is picked from the file extension.

use crate::models::project::VideoRecord;
use anyhow::{bail, Result};
use std::path::Path;

/// File formats supported for export and import.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Yaml,
    Json,
}

impl Format {
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|s| s.to_str())
            .map(|s| s.to_ascii_lowercase());
        match extension.as_deref() {
            Some("yaml") | Some("yml") => Ok(Format::Yaml),
            Some("json") => Ok(Format::Json),
            other => bail!("Unsupported file extension: {:?}", other),
        }
    }
}

pub fn to_string(data: &VideoRecord, format: Format) -> Result<String> {
    Ok(match format {
        Format::Yaml => serde_yaml::to_string(data)?,
        Format::Json => serde_json::to_string_pretty(data)?,
    })
}

pub fn from_str(text: &str, format: Format) -> Result<VideoRecord> {
    Ok(match format {
        Format::Yaml => serde_yaml::from_str(text)?,
        Format::Json => serde_json::from_str(text)?,
    })
}

/// Export a video record, format chosen by extension.
pub fn export(data: &VideoRecord, path: &Path) -> Result<()> {
    let text = to_string(data, Format::from_path(path)?)?;
    std::fs::write(path, text)?;
    log::info!(
        "Exported {} annotations to {}",
        data.annotations.len(),
        path.display()
    );
    Ok(())
}

/// Import a video record, format chosen by extension.
pub fn import(path: &Path) -> Result<VideoRecord> {
    let format = Format::from_path(path)?;
    let text = std::fs::read_to_string(path)?;
    let data = from_str(&text, format)?;
    log::info!(
        "Imported {} annotations from {}",
        data.annotations.len(),
        path.display()
    );
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::annotation::fixtures::{product, survey};

    fn sample() -> VideoRecord {
        let mut video = VideoRecord::new("v1".into(), "Launch".into(), "https://cdn.test/v1.m3u8".into());
        video.duration = Some(120.0);
        video.annotations = vec![product("1", 30.0, 45.0), survey("2", 60.0)];
        video
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(Format::from_path(Path::new("a.YML")).unwrap(), Format::Yaml);
        assert_eq!(Format::from_path(Path::new("a.json")).unwrap(), Format::Json);
        assert!(Format::from_path(Path::new("a.txt")).is_err());
    }

    #[test]
    fn test_yaml_keeps_annotation_variants() {
        let text = to_string(&sample(), Format::Yaml).unwrap();
        assert!(text.contains("type: survey"));
        assert_eq!(from_str(&text, Format::Yaml).unwrap(), sample());
    }

    #[test]
    fn test_export_import_file() {
        let path = std::env::temp_dir().join(format!("cuepoint-{}.json", std::process::id()));
        export(&sample(), &path).unwrap();
        let imported = import(&path).unwrap();
        let _ = std::fs::remove_file(&path);
        assert_eq!(imported, sample());
    }
}
