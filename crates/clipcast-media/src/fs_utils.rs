//! Filesystem helpers for pipeline artifacts.

use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

/// Output path for the vertical rendition of `source`: `<stem>_vertical.mp4`
/// next to the source.
pub fn vertical_output_path(source: &Path) -> PathBuf {
    sibling_with_suffix(source, "_vertical.mp4")
}

/// Silent intermediate path used while rendering: `<stem>_vertical_noaudio.mp4`.
pub fn intermediate_path(source: &Path) -> PathBuf {
    sibling_with_suffix(source, "_vertical_noaudio.mp4")
}

fn sibling_with_suffix(source: &Path, suffix: &str) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "clip".to_string());
    source.with_file_name(format!("{}{}", stem, suffix))
}

/// Remove a file, logging instead of failing.
///
/// Returns `true` when the file is gone afterwards (including when it never
/// existed).
pub async fn remove_file_best_effort(path: &Path) -> bool {
    match fs::remove_file(path).await {
        Ok(()) => {
            debug!(path = %path.display(), "Removed file");
            true
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => true,
        Err(e) => {
            warn!(path = %path.display(), "Failed to remove file: {}", e);
            false
        }
    }
}

/// Remove several files best effort; returns how many could not be removed.
pub async fn remove_files_best_effort<'a, I>(paths: I) -> usize
where
    I: IntoIterator<Item = &'a Path>,
{
    let mut failures = 0;
    for path in paths {
        if !remove_file_best_effort(path).await {
            failures += 1;
        }
    }
    failures
}
