//! Output format choices and their extractor format selectors.

use serde::{Deserialize, Serialize};

/// Selector used for labels outside the fixed table.
pub const FALLBACK_SELECTOR: &str = "best";

/// Audio codec the audio-only choice is transcoded to.
pub const AUDIO_CODEC: &str = "mp3";

/// Audio bitrate (kbps) the audio-only choice is transcoded at.
pub const AUDIO_QUALITY: &str = "192";

/// One of the five output formats offered on the form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormatChoice {
    /// Best video merged with best audio
    BestQuality,
    /// MP4 video with M4A audio
    Mp4Video,
    /// Audio only, transcoded to MP3
    Mp3Audio,
    /// Capped at 720p
    Hd720,
    /// Capped at 480p
    Sd480,
}

impl FormatChoice {
    /// All choices in display order. The first one is the default.
    pub const ALL: [FormatChoice; 5] = [
        FormatChoice::BestQuality,
        FormatChoice::Mp4Video,
        FormatChoice::Mp3Audio,
        FormatChoice::Hd720,
        FormatChoice::Sd480,
    ];

    /// Label shown in the format selector.
    pub fn label(&self) -> &'static str {
        match self {
            FormatChoice::BestQuality => "En İyi Kalite (Video+Ses)",
            FormatChoice::Mp4Video => "MP4 (Video)",
            FormatChoice::Mp3Audio => "MP3 (Ses)",
            FormatChoice::Hd720 => "720p",
            FormatChoice::Sd480 => "480p",
        }
    }

    /// Extractor format-selection expression.
    pub fn selector(&self) -> &'static str {
        match self {
            FormatChoice::BestQuality => "bestvideo+bestaudio/best",
            FormatChoice::Mp4Video => "bestvideo[ext=mp4]+bestaudio[ext=m4a]/best",
            FormatChoice::Mp3Audio => "bestaudio[ext=m4a]/bestaudio",
            FormatChoice::Hd720 => "bestvideo[height<=720]+bestaudio/best[height<=720]",
            FormatChoice::Sd480 => "bestvideo[height<=480]+bestaudio/best[height<=480]",
        }
    }

    /// Look up a choice by its exact display label.
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.label() == label)
    }

    /// Whether downloads in this format need the audio extraction step.
    pub fn is_audio_only(&self) -> bool {
        matches!(self, FormatChoice::Mp3Audio)
    }
}

impl Default for FormatChoice {
    fn default() -> Self {
        Self::ALL[0]
    }
}

impl std::fmt::Display for FormatChoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Resolve a display label to its format selector, falling back to `best`.
pub fn format_code(label: &str) -> &'static str {
    FormatChoice::from_label(label)
        .map(|c| c.selector())
        .unwrap_or(FALLBACK_SELECTOR)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_labels() {
        assert_eq!(format_code("En İyi Kalite (Video+Ses)"), "bestvideo+bestaudio/best");
        assert_eq!(format_code("MP4 (Video)"), "bestvideo[ext=mp4]+bestaudio[ext=m4a]/best");
        assert_eq!(format_code("MP3 (Ses)"), "bestaudio[ext=m4a]/bestaudio");
        assert_eq!(
            format_code("720p"),
            "bestvideo[height<=720]+bestaudio/best[height<=720]"
        );
        assert_eq!(
            format_code("480p"),
            "bestvideo[height<=480]+bestaudio/best[height<=480]"
        );
    }

    #[test]
    fn test_unknown_labels_fall_back() {
        for label in ["", "1080p", "mp3 (ses)", "MP3", " 720p"] {
            assert_eq!(format_code(label), FALLBACK_SELECTOR, "label {:?}", label);
        }
    }

    #[test]
    fn test_label_round_trip_and_order() {
        let labels: Vec<&str> = FormatChoice::ALL.iter().map(|c| c.label()).collect();
        assert_eq!(
            labels,
            ["En İyi Kalite (Video+Ses)", "MP4 (Video)", "MP3 (Ses)", "720p", "480p"]
        );
        assert_eq!(FormatChoice::default(), FormatChoice::BestQuality);
        assert_eq!(FormatChoice::from_label("720p"), Some(FormatChoice::Hd720));
    }

    #[test]
    fn test_audio_only() {
        let audio: Vec<FormatChoice> = FormatChoice::ALL
            .into_iter()
            .filter(FormatChoice::is_audio_only)
            .collect();
        assert_eq!(audio, vec![FormatChoice::Mp3Audio]);
    }
}
