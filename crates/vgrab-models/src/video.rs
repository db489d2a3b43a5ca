//! Video metadata models.

use serde::{Deserialize, Serialize};

use crate::timestamp::format_duration;

/// Title shown when the extractor does not report one.
pub const UNKNOWN_TITLE: &str = "Unknown title";

/// Uploader shown when the extractor does not report one.
pub const UNKNOWN_UPLOADER: &str = "Unknown";

/// Metadata record returned by the extractor in metadata-only mode.
///
/// Only the four fields the form renders are kept; the rest of the
/// extractor's JSON document is ignored on deserialization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VideoMetadata {
    /// Video title
    #[serde(default)]
    pub title: Option<String>,
    /// Duration in seconds (the extractor reports integers or floats)
    #[serde(default)]
    pub duration: Option<f64>,
    /// Channel or account that published the video
    #[serde(default)]
    pub uploader: Option<String>,
    /// Thumbnail URL, displayed by reference
    #[serde(default)]
    pub thumbnail: Option<String>,
}

impl VideoMetadata {
    /// Parse the extractor's JSON output.
    pub fn from_json(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    /// Title, or [`UNKNOWN_TITLE`] when absent or blank.
    pub fn display_title(&self) -> &str {
        non_blank(self.title.as_deref()).unwrap_or(UNKNOWN_TITLE)
    }

    /// Uploader, or [`UNKNOWN_UPLOADER`] when absent or blank.
    pub fn display_uploader(&self) -> &str {
        non_blank(self.uploader.as_deref()).unwrap_or(UNKNOWN_UPLOADER)
    }

    /// Duration rendered as `HH:MM:SS` / `MM:SS`.
    pub fn display_duration(&self) -> String {
        format_duration(self.duration)
    }

    /// Build the preview shown on the form.
    pub fn preview(&self) -> VideoPreview {
        VideoPreview {
            title: self.display_title().to_string(),
            uploader: self.display_uploader().to_string(),
            duration: self.display_duration(),
            duration_seconds: self.duration,
            thumbnail: non_blank(self.thumbnail.as_deref()).map(str::to_string),
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// Rendered preview of a video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoPreview {
    pub title: String,
    pub uploader: String,
    /// Formatted duration, or the unknown sentinel
    pub duration: String,
    /// Raw duration as reported by the extractor
    pub duration_seconds: Option<f64>,
    pub thumbnail: Option<String>,
}
