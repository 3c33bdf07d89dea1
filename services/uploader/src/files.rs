//! Source file lifecycle: validation, archival, deletion
//!
//! These operations run only after a confirmed-successful upload; a failed
//! upload leaves source files untouched.

use crate::models::{CAPTION_EXTENSION, VIDEO_EXTENSION};
use chrono::Utc;
use common::error::{UploadError, UploadResult};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Whether `path` is an uploadable video: exists, regular file, readable,
/// `.mp4` extension, non-zero length
pub async fn is_valid_video(path: &Path) -> bool {
    is_valid_file(path, VIDEO_EXTENSION).await
}

/// Whether `path` is an uploadable caption file (`.srt`)
pub async fn is_valid_caption(path: &Path) -> bool {
    is_valid_file(path, CAPTION_EXTENSION).await
}

async fn is_valid_file(path: &Path, extension: &str) -> bool {
    let has_extension = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(extension));
    if !has_extension {
        return false;
    }

    let meta = match tokio::fs::metadata(path).await {
        Ok(meta) => meta,
        Err(_) => return false,
    };
    if !meta.is_file() || meta.len() == 0 {
        return false;
    }

    // Readability check; metadata alone cannot tell us
    tokio::fs::File::open(path).await.is_ok()
}

/// Move `path` into `dest_dir`, creating the directory as needed
///
/// A same-named file at the destination is never overwritten; the moved file
/// gets a millisecond-timestamp suffix on its stem instead. Returns the final
/// destination path.
pub async fn move_to_processed(path: &Path, dest_dir: &Path) -> UploadResult<PathBuf> {
    tokio::fs::create_dir_all(dest_dir)
        .await
        .map_err(UploadError::File)?;

    let file_name = path
        .file_name()
        .ok_or_else(|| {
            UploadError::File(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("Path has no file name: {}", path.display()),
            ))
        })?
        .to_string_lossy()
        .into_owned();

    let mut destination = dest_dir.join(&file_name);
    if tokio::fs::try_exists(&destination)
        .await
        .map_err(UploadError::File)?
    {
        let millis = Utc::now().timestamp_millis();
        destination = dest_dir.join(timestamped_name(&file_name, millis));
    }

    tokio::fs::rename(path, &destination)
        .await
        .map_err(UploadError::File)?;

    info!("Moved {} to {}", path.display(), destination.display());
    Ok(destination)
}

/// Delete `path`; a file that no longer exists counts as success
pub async fn remove_file(path: &Path) -> UploadResult<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {
            info!("Deleted {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!("File already gone: {}", path.display());
            Ok(())
        }
        Err(e) => Err(UploadError::File(e)),
    }
}

/// Append `_{millis}` to the stem of `file_name`, keeping the extension
fn timestamped_name(file_name: &str, millis: i64) -> String {
    match file_name.rsplit_once('.') {
        Some((stem, ext)) => format!("{stem}_{millis}.{ext}"),
        None => format!("{file_name}_{millis}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[tokio::test]
    async fn test_validity_checks() {
        let dir = tempfile::tempdir().unwrap();

        let video = dir.path().join("clip.mp4");
        fs::write(&video, "data").unwrap();
        assert!(is_valid_video(&video).await);
        assert!(!is_valid_caption(&video).await);

        let empty = dir.path().join("empty.mp4");
        fs::write(&empty, "").unwrap();
        assert!(!is_valid_video(&empty).await);

        let upper = dir.path().join("loud.MP4");
        fs::write(&upper, "data").unwrap();
        assert!(is_valid_video(&upper).await);

        assert!(!is_valid_video(&dir.path().join("missing.mp4")).await);
        assert!(!is_valid_video(dir.path()).await);
    }

    #[tokio::test]
    async fn test_move_creates_destination_dir() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("clip.mp4");
        fs::write(&source, "data").unwrap();

        let dest_dir = dir.path().join("archive").join("2025");
        let moved = move_to_processed(&source, &dest_dir).await.unwrap();

        assert!(!source.exists());
        assert_eq!(moved, dest_dir.join("clip.mp4"));
        assert_eq!(fs::read_to_string(moved).unwrap(), "data");
    }

    #[tokio::test]
    async fn test_move_collision_gets_distinct_name() {
        let dir = tempfile::tempdir().unwrap();
        let dest_dir = dir.path().join("processed");
        fs::create_dir_all(&dest_dir).unwrap();
        fs::write(dest_dir.join("clip.mp4"), "old").unwrap();

        let source = dir.path().join("clip.mp4");
        fs::write(&source, "new").unwrap();

        let moved = move_to_processed(&source, &dest_dir).await.unwrap();
        assert_ne!(moved, dest_dir.join("clip.mp4"));
        assert_eq!(fs::read_to_string(dest_dir.join("clip.mp4")).unwrap(), "old");
        assert_eq!(fs::read_to_string(&moved).unwrap(), "new");

        let name = moved.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("clip_") && name.ends_with(".mp4"));
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("clip.mp4");
        fs::write(&file, "data").unwrap();

        remove_file(&file).await.unwrap();
        assert!(!file.exists());
        // Second delete of a now-missing file still succeeds
        remove_file(&file).await.unwrap();
    }

    #[test]
    fn test_timestamped_name() {
        assert_eq!(timestamped_name("clip.mp4", 1700000000000), "clip_1700000000000.mp4");
        assert_eq!(timestamped_name("noext", 7), "noext_7");
    }
}
