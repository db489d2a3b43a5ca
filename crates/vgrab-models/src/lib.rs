//! Shared data models for the vgrab download form.
//!
//! This crate provides:
//! - The extractor's metadata record and its rendered preview
//! - The fixed table of output formats
//! - Duration formatting and clip time-range validation
//! - Filename sanitization for downloaded artifacts

pub mod format;
pub mod timestamp;
pub mod utils;
pub mod video;

// Re-export common types
pub use format::{format_code, FormatChoice, AUDIO_CODEC, AUDIO_QUALITY, FALLBACK_SELECTOR};
pub use timestamp::{
    format_duration, parse_timestamp, validate_time_format, RangeBound, TimeRange, TimestampError,
    UNKNOWN_DURATION,
};
pub use utils::{ascii_filename, sanitize_filename, DEFAULT_BASE_FILENAME};
pub use video::{VideoMetadata, VideoPreview, UNKNOWN_TITLE, UNKNOWN_UPLOADER};
