//! Directory scanning and video/caption pairing
//!
//! Pairs are produced in the underlying directory-listing order, which is
//! platform-defined and not sorted. A missing or unreadable source directory
//! yields no work rather than an error.

use crate::models::{CAPTION_EXTENSION, ScannedFile, VIDEO_EXTENSION, VideoWithCaption};
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};

/// Scan `video_dir` for videos and `caption_dir` for captions, pairing them
/// by base filename (case-insensitive)
pub async fn scan(video_dir: &Path, caption_dir: &Path) -> Vec<VideoWithCaption> {
    let videos = list_files(video_dir, VIDEO_EXTENSION).await;
    if videos.is_empty() {
        return Vec::new();
    }

    // First caption per base name wins; there is no fallback search
    let mut captions: HashMap<String, ScannedFile> = HashMap::new();
    for caption in list_files(caption_dir, CAPTION_EXTENSION).await {
        captions
            .entry(caption.base_name().to_lowercase())
            .or_insert(caption);
    }

    let pairs: Vec<VideoWithCaption> = videos
        .into_iter()
        .map(|video| {
            let caption = captions.get(&video.base_name().to_lowercase()).cloned();
            VideoWithCaption { video, caption }
        })
        .collect();

    info!(
        "Found {} video files, {} with captions",
        pairs.len(),
        pairs.iter().filter(|p| p.caption.is_some()).count()
    );
    pairs
}

/// List regular files in `dir` whose extension matches `extension`
/// (case-insensitive), snapshotting size and mtime
///
/// Any listing failure degrades to an empty list with a warning.
async fn list_files(dir: &Path, extension: &str) -> Vec<ScannedFile> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Cannot list directory {}: {}", dir.display(), e);
            return Vec::new();
        }
    };

    let mut files = Vec::new();
    loop {
        let entry = match entries.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(e) => {
                warn!("Error reading directory {}: {}", dir.display(), e);
                break;
            }
        };

        let path = entry.path();
        if !has_extension(&path, extension) {
            continue;
        }

        match entry.metadata().await {
            Ok(meta) if meta.is_file() => files.push(ScannedFile {
                size_bytes: meta.len(),
                modified: meta.modified().unwrap_or(std::time::SystemTime::UNIX_EPOCH),
                path,
            }),
            Ok(_) => {}
            Err(e) => warn!("Cannot stat {}: {}", path.display(), e),
        }
    }
    files
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(extension))
}
