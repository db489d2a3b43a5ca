//! Filesystem utilities for locating finished downloads.

use std::path::{Path, PathBuf};
use tokio::fs;

use crate::error::{MediaError, MediaResult};

/// Suffixes yt-dlp uses for in-flight or leftover fragments.
const TEMPORARY_SUFFIXES: &[&str] = &[".tmp", ".part", ".ytdl", ".temp"];

/// Whether a file name looks like an unfinished download.
pub fn is_temporary_file(name: &str) -> bool {
    TEMPORARY_SUFFIXES.iter().any(|suffix| name.ends_with(suffix)) || name.contains(".part-Frag")
}

/// Find the finished artifact in a per-download scratch directory.
///
/// Entries are considered in name order so the choice is deterministic when
/// yt-dlp leaves more than one file behind. Directories and temporary files
/// are skipped.
///
/// # Errors
///
/// Returns [`MediaError::ArtifactNotFound`] when no eligible file exists.
pub async fn find_artifact(dir: impl AsRef<Path>) -> MediaResult<PathBuf> {
    let dir = dir.as_ref();
    let mut entries = fs::read_dir(dir).await?;
    let mut candidates = Vec::new();

    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await?.is_file() {
            continue;
        }

        let name = entry.file_name().to_string_lossy().to_string();
        if is_temporary_file(&name) {
            tracing::debug!("Skipping temporary file in scratch dir: {}", name);
            continue;
        }

        candidates.push(entry.path());
    }

    candidates.sort();
    candidates
        .into_iter()
        .next()
        .ok_or_else(|| MediaError::ArtifactNotFound(dir.to_path_buf()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_is_temporary_file() {
        assert!(is_temporary_file("video.mp4.part"));
        assert!(is_temporary_file("video.f137.mp4.part-Frag12"));
        assert!(is_temporary_file("video.temp.mp4.tmp"));
        assert!(is_temporary_file("video.mp4.ytdl"));
        assert!(!is_temporary_file("video.mp4"));
        assert!(!is_temporary_file("tmp video.mp3"));
    }

    #[tokio::test]
    async fn test_find_artifact_skips_temporary_files() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.mp4.part"), b"partial").await.unwrap();
        fs::write(dir.path().join("b.mp4"), b"done").await.unwrap();
        fs::write(dir.path().join("c.tmp"), b"tmp").await.unwrap();

        let found = find_artifact(dir.path()).await.unwrap();
        assert_eq!(found, dir.path().join("b.mp4"));
    }

    #[tokio::test]
    async fn test_find_artifact_is_deterministic() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("zeta.mp4"), b"z").await.unwrap();
        fs::write(dir.path().join("alpha.webm"), b"a").await.unwrap();

        let found = find_artifact(dir.path()).await.unwrap();
        assert_eq!(found, dir.path().join("alpha.webm"));
    }

    #[tokio::test]
    async fn test_find_artifact_empty_dir() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("nested")).await.unwrap();
        fs::write(dir.path().join("only.part"), b"partial").await.unwrap();

        let result = find_artifact(dir.path()).await;
        assert!(matches!(result, Err(MediaError::ArtifactNotFound(_))));
    }
}
