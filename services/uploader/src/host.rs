//! The video-host capability seam
//!
//! The pipeline depends on this trait rather than on any concrete hosting
//! client; credential acquisition and transport live behind it. A host must
//! be initialized with a valid authorization context before its first use —
//! an uninitialized host is run-fatal, not a per-item failure.

use crate::models::Visibility;
use async_trait::async_trait;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use tracing::info;

/// Fixed tag set attached to every upload
pub const UPLOAD_TAGS: [&str; 2] = ["auto-upload", "video"];
/// Language code used for caption uploads
pub const CAPTION_LANGUAGE: &str = "en";
/// Display name used for caption uploads
pub const CAPTION_NAME: &str = "Auto-generated subtitle";

/// Errors declared by a video host
#[derive(Error, Debug)]
pub enum HostError {
    #[error("Video host is not initialized")]
    NotInitialized,

    #[error("Upload failed: {0}")]
    Upload(String),
}

/// Abstract capability to publish videos and captions to a remote host
#[async_trait]
pub trait VideoHost: Send + Sync {
    /// Whether the host holds a valid authorization context
    fn is_initialized(&self) -> bool;

    /// Upload one video file; returns the host-assigned video id
    ///
    /// May suspend for the duration of the network transfer. Per-upload
    /// timeouts are the host's own responsibility.
    async fn upload_video(
        &self,
        file: &Path,
        title: &str,
        description: &str,
        tags: &[&str],
        category_id: &str,
        visibility: Visibility,
    ) -> Result<String, HostError>;

    /// Attach a caption file to an already-uploaded video; returns the
    /// host-assigned caption id
    async fn upload_caption(
        &self,
        video_id: &str,
        file: &Path,
        language: &str,
        name: &str,
    ) -> Result<String, HostError>;
}

/// Host that logs uploads and returns synthetic ids without any network I/O
///
/// Used by the service binary for local verification runs; files still move
/// through the full pipeline, including relocation.
#[derive(Debug, Default)]
pub struct DryRunHost {
    counter: AtomicU64,
}

impl DryRunHost {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VideoHost for DryRunHost {
    fn is_initialized(&self) -> bool {
        true
    }

    async fn upload_video(
        &self,
        file: &Path,
        title: &str,
        _description: &str,
        _tags: &[&str],
        _category_id: &str,
        visibility: Visibility,
    ) -> Result<String, HostError> {
        let id = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        info!(
            "[dry-run] Would upload {} as \"{}\" ({})",
            file.display(),
            title,
            visibility
        );
        Ok(format!("dry-run-video-{id}"))
    }

    async fn upload_caption(
        &self,
        video_id: &str,
        file: &Path,
        language: &str,
        _name: &str,
    ) -> Result<String, HostError> {
        info!(
            "[dry-run] Would attach caption {} ({}) to {}",
            file.display(),
            language,
            video_id
        );
        Ok(format!("dry-run-caption-{video_id}"))
    }
}
