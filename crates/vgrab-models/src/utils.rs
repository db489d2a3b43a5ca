//! Filename helpers shared by the download path.

use std::sync::LazyLock;

use regex::Regex;

/// Base name used when a title sanitizes to nothing.
pub const DEFAULT_BASE_FILENAME: &str = "video";

static UNSAFE_FILENAME_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\-_. ]").expect("valid filename regex"));

/// Strip a video title down to a filesystem-safe base filename.
///
/// Keeps word characters (Unicode letters, digits, underscore), hyphens,
/// periods and spaces. Everything else is removed, not replaced.
pub fn sanitize_filename(title: &str) -> String {
    let cleaned = UNSAFE_FILENAME_CHARS.replace_all(title, "");
    let trimmed = cleaned.trim();

    // A name made only of dots would resolve to the directory itself
    if trimmed.is_empty() || trimmed.chars().all(|c| c == '.') {
        return DEFAULT_BASE_FILENAME.to_string();
    }

    trimmed.to_string()
}

/// ASCII-only rendition of a filename for the plain `filename=` parameter
/// of `Content-Disposition`.
pub fn ascii_filename(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_graphic() || c == ' ' { c } else { '_' })
        .filter(|c| *c != '"' && *c != '\\')
        .collect()
}
