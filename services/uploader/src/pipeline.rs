//! The per-run upload pipeline
//!
//! One run scans for video/caption pairs and processes them strictly
//! sequentially: validate, derive metadata, upload the video, attach the
//! caption, then archive or delete the sources. A single item's failure
//! never aborts the run; only precondition-level failures (an uninitialized
//! host) are run-fatal. Every run ends with a [`RunReport`].

use crate::files;
use crate::host::{CAPTION_LANGUAGE, CAPTION_NAME, HostError, UPLOAD_TAGS, VideoHost};
use crate::metadata;
use crate::models::{ItemOutcome, ItemResult, RunReport, UploadConfig, VideoWithCaption};
use crate::scanner;
use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info, warn};

/// Default pause between items, to stay under the host's rate limits
pub const DEFAULT_INTER_ITEM_DELAY: Duration = Duration::from_secs(5);

/// Drives one end-to-end upload run
pub struct UploadPipeline {
    host: Arc<dyn VideoHost>,
    inter_item_delay: Duration,
}

impl UploadPipeline {
    pub fn new(host: Arc<dyn VideoHost>) -> Self {
        Self {
            host,
            inter_item_delay: DEFAULT_INTER_ITEM_DELAY,
        }
    }

    /// Override the pause between items; tests inject zero
    pub fn with_inter_item_delay(mut self, delay: Duration) -> Self {
        self.inter_item_delay = delay;
        self
    }

    /// Execute one run against `config`
    ///
    /// Items are processed in scan order. The inter-item delay occurs only
    /// between items, never after the last one. `Err` is reserved for
    /// run-fatal conditions; per-item failures land in the report.
    pub async fn run(&self, config: &UploadConfig) -> Result<RunReport> {
        if !self.host.is_initialized() {
            return Err(HostError::NotInitialized.into());
        }

        let pairs = scanner::scan(
            Path::new(&config.video_dir),
            Path::new(&config.caption_dir),
        )
        .await;

        if pairs.is_empty() {
            info!("No videos found to upload");
            return Ok(RunReport::no_videos());
        }

        let total = pairs.len();
        let mut outcomes = Vec::with_capacity(total);

        for (index, pair) in pairs.into_iter().enumerate() {
            info!(
                "Processing video {}/{}: {}",
                index + 1,
                total,
                pair.video.file_name()
            );

            let result = self.process_pair(&pair, config).await;
            match &result {
                ItemResult::Failed(reason) => {
                    error!("Upload failed for {}: {}", pair.video.file_name(), reason)
                }
                ItemResult::SkippedInvalid(reason) => {
                    warn!("Skipping {}: {}", pair.video.file_name(), reason)
                }
                _ => info!("Uploaded {}", pair.video.file_name()),
            }
            outcomes.push(ItemOutcome { pair, result });

            if index + 1 < total && !self.inter_item_delay.is_zero() {
                sleep(self.inter_item_delay).await;
            }
        }

        let report = RunReport::from_outcomes(&outcomes);
        info!(
            "Run finished: {} uploaded, {} failed",
            report.uploaded, report.failed
        );
        Ok(report)
    }

    /// Process a single pair; every failure is converted into an ItemResult
    async fn process_pair(&self, pair: &VideoWithCaption, config: &UploadConfig) -> ItemResult {
        if !files::is_valid_video(&pair.video.path).await {
            return ItemResult::SkippedInvalid("not a readable, non-empty video file".to_string());
        }

        let caption = match &pair.caption {
            Some(caption) if files::is_valid_caption(&caption.path).await => Some(caption),
            Some(caption) => {
                warn!("Ignoring invalid caption file {}", caption.path.display());
                None
            }
            None => None,
        };

        let caption_body = match caption {
            Some(caption) => match tokio::fs::read_to_string(&caption.path).await {
                Ok(body) => Some(body),
                Err(e) => {
                    warn!("Cannot read caption {}: {}", caption.path.display(), e);
                    None
                }
            },
            None => None,
        };

        let file_name = pair.video.file_name();
        let title = metadata::title_for(&file_name, caption_body.as_deref());
        let description = metadata::description_for(
            &file_name,
            metadata::file_size_mb(pair.video.size_bytes),
            pair.caption.is_some(),
        );

        let video_id = match self
            .host
            .upload_video(
                &pair.video.path,
                &title,
                &description,
                &UPLOAD_TAGS,
                &config.category_id,
                config.visibility,
            )
            .await
        {
            Ok(video_id) => video_id,
            Err(e) => return ItemResult::Failed(e.to_string()),
        };

        let result = match caption {
            Some(caption) => {
                match self
                    .host
                    .upload_caption(&video_id, &caption.path, CAPTION_LANGUAGE, CAPTION_NAME)
                    .await
                {
                    Ok(_) => ItemResult::Uploaded(video_id),
                    Err(e) => {
                        // The primary asset made it; the item still counts
                        warn!("Caption upload failed for {}: {}", file_name, e);
                        ItemResult::CaptionFailed(video_id)
                    }
                }
            }
            None => ItemResult::UploadedNoCaption(video_id),
        };

        // Best-effort cleanup; failures never change the recorded outcome
        self.cleanup(pair, config).await;

        result
    }

    async fn cleanup(&self, pair: &VideoWithCaption, config: &UploadConfig) {
        let mut sources = vec![&pair.video.path];
        if let Some(caption) = &pair.caption {
            sources.push(&caption.path);
        }

        for path in sources {
            let result = if config.delete_after_upload {
                files::remove_file(path).await
            } else {
                files::move_to_processed(path, Path::new(&config.processed_dir))
                    .await
                    .map(|_| ())
            };
            if let Err(e) = result {
                error!("Cleanup failed for {}: {}", path.display(), e);
            }
        }
    }
}
