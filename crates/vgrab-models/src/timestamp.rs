//! Duration formatting and time-range validation.
//!
//! The form accepts clip bounds as free text. Validation here is syntactic
//! by default: `HH:MM:SS` or `MM:SS` with one or two digits for the leading
//! groups and exactly two for seconds. Values such as `99:99` pass. The
//! semantic check (start before end, end inside the video) is opt-in through
//! [`TimeRange::check_bounds`].

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Sentinel rendered when the extractor reports no usable duration.
pub const UNKNOWN_DURATION: &str = "Unknown";

/// Slack allowed past the reported video duration in strict mode.
const DURATION_SLACK_SECS: f64 = 1.0;

static TIME_FORMAT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,2}:)?\d{1,2}:\d{2}$").expect("valid time regex"));

/// Render a duration in seconds for display.
///
/// `HH:MM:SS` from one hour up, `MM:SS` below. Hours are not wrapped at a
/// day. Absent, zero, negative or non-finite input yields
/// [`UNKNOWN_DURATION`]. Fractional seconds are truncated.
pub fn format_duration(seconds: Option<f64>) -> String {
    let total = match seconds {
        Some(s) if s.is_finite() && s > 0.0 => s.trunc() as u64,
        _ => return UNKNOWN_DURATION.to_string(),
    };

    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;

    if hours > 0 {
        format!("{:02}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{:02}:{:02}", minutes, secs)
    }
}

/// Check a clip bound against the accepted `HH:MM:SS` / `MM:SS` shape.
///
/// The empty string is valid and means "no clipping".
pub fn validate_time_format(value: &str) -> bool {
    value.is_empty() || TIME_FORMAT.is_match(value)
}

/// Parse a timestamp string to total seconds.
///
/// Supports `HH:MM:SS`, `MM:SS` and `SS`, each optionally with a fractional
/// seconds part.
pub fn parse_timestamp(ts: &str) -> Result<f64, TimestampError> {
    let ts = ts.trim();
    if ts.is_empty() {
        return Err(TimestampError::Empty);
    }

    let parts: Vec<&str> = ts.split(':').collect();
    if parts.len() > 3 {
        return Err(TimestampError::InvalidFormat(ts.to_string()));
    }

    let names = ["hours", "minutes", "seconds"];
    let offset = names.len() - parts.len();
    let mut total = 0.0;
    for (i, part) in parts.iter().enumerate() {
        let value: f64 = part
            .parse()
            .map_err(|_| TimestampError::InvalidValue(names[offset + i], part.to_string()))?;
        if value < 0.0 {
            return Err(TimestampError::Negative);
        }
        total = total * 60.0 + value;
    }

    Ok(total)
}

/// Which end of a time range a message refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RangeBound {
    Start,
    End,
}

impl std::fmt::Display for RangeBound {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RangeBound::Start => write!(f, "start"),
            RangeBound::End => write!(f, "end"),
        }
    }
}

/// Clip bounds that passed validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: String,
    pub end: String,
}

impl TimeRange {
    /// Build a range from the two form fields.
    ///
    /// Both empty means no clipping (`Ok(None)`). Exactly one empty is
    /// rejected before any format check, matching the order the form
    /// reports problems in.
    pub fn from_inputs(start: &str, end: &str) -> Result<Option<Self>, TimestampError> {
        match (start.is_empty(), end.is_empty()) {
            (true, true) => return Ok(None),
            (false, true) | (true, false) => return Err(TimestampError::Asymmetric),
            (false, false) => {}
        }

        if !validate_time_format(start) {
            return Err(TimestampError::BadBound(RangeBound::Start, start.to_string()));
        }
        if !validate_time_format(end) {
            return Err(TimestampError::BadBound(RangeBound::End, end.to_string()));
        }

        Ok(Some(Self {
            start: start.to_string(),
            end: end.to_string(),
        }))
    }

    /// The extractor's clip directive, `*start-end`.
    pub fn section_spec(&self) -> String {
        format!("*{}-{}", self.start, self.end)
    }

    /// Semantic check: start before end and end inside the video.
    pub fn check_bounds(&self, video_duration: Option<f64>) -> Result<(), TimestampError> {
        let start_secs = parse_timestamp(&self.start)?;
        let end_secs = parse_timestamp(&self.end)?;

        if start_secs >= end_secs {
            return Err(TimestampError::StartNotBeforeEnd);
        }

        if let Some(duration) = video_duration.filter(|d| *d > 0.0) {
            if end_secs > duration + DURATION_SLACK_SECS {
                return Err(TimestampError::ExceedsVideoDuration {
                    end_secs,
                    video_duration: duration,
                });
            }
        }

        Ok(())
    }
}

/// Timestamp parsing and range validation errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TimestampError {
    #[error("Timestamp cannot be empty")]
    Empty,

    #[error("Timestamp cannot be negative")]
    Negative,

    #[error("Invalid {0} value: {1}")]
    InvalidValue(&'static str, String),

    #[error("Invalid timestamp format '{0}'")]
    InvalidFormat(String),

    #[error("Both start and end times are required to clip a video")]
    Asymmetric,

    #[error("Invalid {0} time '{1}'. Use HH:MM:SS or MM:SS")]
    BadBound(RangeBound, String),

    #[error("Start time must be before end time")]
    StartNotBeforeEnd,

    #[error("End time ({end_secs:.1}s) exceeds video duration ({video_duration:.1}s)")]
    ExceedsVideoDuration { end_secs: f64, video_duration: f64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_hh_mm_ss(s: &str) -> bool {
        let parts: Vec<&str> = s.split(':').collect();
        parts.len() == 3 && parts.iter().all(|p| p.len() >= 2 && p.chars().all(|c| c.is_ascii_digit()))
    }

    fn is_mm_ss(s: &str) -> bool {
        let parts: Vec<&str> = s.split(':').collect();
        parts.len() == 2 && parts.iter().all(|p| p.len() == 2 && p.chars().all(|c| c.is_ascii_digit()))
    }

    #[test]
    fn test_format_duration_shapes() {
        for secs in [1u64, 59, 60, 599, 3599] {
            let out = format_duration(Some(secs as f64));
            assert!(is_mm_ss(&out), "{} -> {}", secs, out);
        }
        for secs in [3600u64, 3661, 35999, 86400, 360000] {
            let out = format_duration(Some(secs as f64));
            assert!(is_hh_mm_ss(&out), "{} -> {}", secs, out);
        }
    }

    #[test]
    fn test_format_duration_values() {
        assert_eq!(format_duration(Some(90.0)), "01:30");
        assert_eq!(format_duration(Some(3599.0)), "59:59");
        assert_eq!(format_duration(Some(3600.0)), "01:00:00");
        assert_eq!(format_duration(Some(3661.9)), "01:01:01");
        assert_eq!(format_duration(Some(90000.0)), "25:00:00");
    }

    #[test]
    fn test_format_duration_unknown() {
        assert_eq!(format_duration(None), UNKNOWN_DURATION);
        assert_eq!(format_duration(Some(0.0)), UNKNOWN_DURATION);
        assert_eq!(format_duration(Some(-5.0)), UNKNOWN_DURATION);
        assert_eq!(format_duration(Some(f64::NAN)), UNKNOWN_DURATION);
    }

    #[test]
    fn test_validate_time_format_accepts() {
        for value in ["", "0:00", "1:30", "01:30", "00:01:00", "1:2:03", "99:99", "99:99:99"] {
            assert!(validate_time_format(value), "{:?} should pass", value);
        }
    }

    #[test]
    fn test_validate_time_format_rejects() {
        for value in [
            "1-30",
            "99:99:99:99",
            "90",
            "1:3",
            "1:300",
            "100:00",
            "001:00:00",
            " 1:30",
            "1:30 ",
            "a:bc",
            ":30",
        ] {
            assert!(!validate_time_format(value), "{:?} should fail", value);
        }
    }

    #[test]
    fn test_parse_timestamp() {
        assert_eq!(parse_timestamp("00:01:00").unwrap(), 60.0);
        assert_eq!(parse_timestamp("01:30:45").unwrap(), 5445.0);
        assert_eq!(parse_timestamp("05:30").unwrap(), 330.0);
        assert_eq!(parse_timestamp("90").unwrap(), 90.0);
        assert!((parse_timestamp("00:00:30.500").unwrap() - 30.5).abs() < 0.001);

        assert!(matches!(parse_timestamp(""), Err(TimestampError::Empty)));
        assert!(matches!(parse_timestamp("abc"), Err(TimestampError::InvalidValue("seconds", _))));
        assert!(matches!(parse_timestamp("1:2:3:4"), Err(TimestampError::InvalidFormat(_))));
    }

    #[test]
    fn test_time_range_empty_means_no_clip() {
        assert_eq!(TimeRange::from_inputs("", "").unwrap(), None);
    }

    #[test]
    fn test_time_range_asymmetric() {
        assert_eq!(
            TimeRange::from_inputs("00:01:00", ""),
            Err(TimestampError::Asymmetric)
        );
        assert_eq!(TimeRange::from_inputs("", "02:00"), Err(TimestampError::Asymmetric));
        // Presence is checked before format
        assert_eq!(TimeRange::from_inputs("bogus", ""), Err(TimestampError::Asymmetric));
    }

    #[test]
    fn test_time_range_bad_format() {
        assert_eq!(
            TimeRange::from_inputs("1-30", "02:00"),
            Err(TimestampError::BadBound(RangeBound::Start, "1-30".to_string()))
        );
        assert_eq!(
            TimeRange::from_inputs("01:00", "2"),
            Err(TimestampError::BadBound(RangeBound::End, "2".to_string()))
        );
    }

    #[test]
    fn test_time_range_section_spec() {
        let range = TimeRange::from_inputs("00:01:00", "01:30").unwrap().unwrap();
        assert_eq!(range.section_spec(), "*00:01:00-01:30");
    }

    #[test]
    fn test_time_range_permissive_by_default() {
        // End before start and out-of-range minutes still pass the syntactic check
        let range = TimeRange::from_inputs("99:99", "00:10").unwrap();
        assert!(range.is_some());
    }

    #[test]
    fn test_check_bounds() {
        let ok = TimeRange::from_inputs("00:10", "01:00").unwrap().unwrap();
        assert!(ok.check_bounds(Some(120.0)).is_ok());
        assert!(ok.check_bounds(None).is_ok());

        let reversed = TimeRange::from_inputs("02:00", "01:00").unwrap().unwrap();
        assert_eq!(reversed.check_bounds(None), Err(TimestampError::StartNotBeforeEnd));

        let too_long = TimeRange::from_inputs("00:00", "05:00").unwrap().unwrap();
        assert!(matches!(
            too_long.check_bounds(Some(240.0)),
            Err(TimestampError::ExceedsVideoDuration { .. })
        ));
    }
}
