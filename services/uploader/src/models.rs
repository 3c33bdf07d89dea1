use common::error::{UploadError, UploadResult};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::SystemTime;

/// Extension that marks a file as an uploadable video (case-insensitive)
pub const VIDEO_EXTENSION: &str = "mp4";
/// Extension that marks a file as a caption/subtitle file (case-insensitive)
pub const CAPTION_EXTENSION: &str = "srt";

/// Snapshot of one file taken at scan time
///
/// The underlying file may change or disappear before upload; the pipeline
/// re-validates before use instead of trusting this snapshot.
#[derive(Debug, Clone)]
pub struct ScannedFile {
    pub path: PathBuf,
    pub size_bytes: u64,
    pub modified: SystemTime,
}

impl ScannedFile {
    /// File name component, lossy for non-UTF-8 paths
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// File name without its final extension
    pub fn base_name(&self) -> String {
        self.path
            .file_stem()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// A video file optionally paired with one caption file
///
/// Pairs are matched on filename-without-extension, case-insensitive, with at
/// most one caption per video.
#[derive(Debug, Clone)]
pub struct VideoWithCaption {
    pub video: ScannedFile,
    pub caption: Option<ScannedFile>,
}

/// Publication access level of an uploaded video
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Private,
    Public,
    Unlisted,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Private => "private",
            Visibility::Public => "public",
            Visibility::Unlisted => "unlisted",
        }
    }
}

impl std::str::FromStr for Visibility {
    type Err = UploadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "private" => Ok(Visibility::Private),
            "public" => Ok(Visibility::Public),
            "unlisted" => Ok(Visibility::Unlisted),
            other => Err(UploadError::Configuration(format!(
                "Unknown visibility: {other}"
            ))),
        }
    }
}

impl std::fmt::Display for Visibility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A channel selected as the upload target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelRef {
    pub id: String,
    pub title: String,
}

/// Configuration for the upload scheduler and pipeline
///
/// Persisted by the settings store and passed into each run as a read-only
/// snapshot; no run mutates shared configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadConfig {
    pub account_name: String,
    pub video_dir: String,
    pub caption_dir: String,
    pub processed_dir: String,
    pub interval_minutes: u64,
    pub visibility: Visibility,
    pub category_id: String,
    pub delete_after_upload: bool,
    pub channel: Option<ChannelRef>,
}

impl UploadConfig {
    pub const DEFAULT_INTERVAL_MINUTES: u64 = 60;
    pub const MIN_INTERVAL_MINUTES: u64 = 15;
    pub const DEFAULT_CATEGORY_ID: &'static str = "22";

    /// Validate that this configuration can drive a run
    ///
    /// Unknown visibility values are already unrepresentable; this checks the
    /// stringly-typed fields and the interval lower bound.
    pub fn validate(&self) -> UploadResult<()> {
        if self.account_name.trim().is_empty() {
            return Err(UploadError::Configuration(
                "Account name is required".to_string(),
            ));
        }
        if self.video_dir.trim().is_empty() {
            return Err(UploadError::Configuration(
                "Video directory is required".to_string(),
            ));
        }
        if self.caption_dir.trim().is_empty() {
            return Err(UploadError::Configuration(
                "Caption directory is required".to_string(),
            ));
        }
        if self.processed_dir.trim().is_empty() {
            return Err(UploadError::Configuration(
                "Processed directory is required".to_string(),
            ));
        }
        if self.interval_minutes < Self::MIN_INTERVAL_MINUTES {
            return Err(UploadError::Configuration(format!(
                "Upload interval must be at least {} minutes",
                Self::MIN_INTERVAL_MINUTES
            )));
        }
        if self.category_id.is_empty() || !self.category_id.chars().all(|c| c.is_ascii_digit()) {
            return Err(UploadError::Configuration(format!(
                "Category id must be a numeric code, got: {}",
                self.category_id
            )));
        }
        Ok(())
    }
}

/// Outcome of processing one video/caption pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemResult {
    /// Video and caption both uploaded
    Uploaded(String),
    /// Video uploaded; no caption was present
    UploadedNoCaption(String),
    /// Video uploaded but the caption upload failed; still a success
    CaptionFailed(String),
    /// Video upload failed
    Failed(String),
    /// Source file failed validation and was skipped
    SkippedInvalid(String),
}

impl ItemResult {
    /// Whether the primary asset made it to the host
    pub fn is_uploaded(&self) -> bool {
        matches!(
            self,
            ItemResult::Uploaded(_) | ItemResult::UploadedNoCaption(_) | ItemResult::CaptionFailed(_)
        )
    }
}

/// One processed pair together with its result
#[derive(Debug, Clone)]
pub struct ItemOutcome {
    pub pair: VideoWithCaption,
    pub result: ItemResult,
}

impl ItemOutcome {
    /// Human-readable report line for this item
    pub fn line(&self) -> String {
        let name = self.pair.video.file_name();
        match &self.result {
            ItemResult::Uploaded(_) => format!("✅ {name} (with subtitle)"),
            ItemResult::UploadedNoCaption(_) => format!("✅ {name}"),
            ItemResult::CaptionFailed(_) => format!("✅ {name} (subtitle failed)"),
            ItemResult::Failed(reason) => format!("❌ {name}: {reason}"),
            ItemResult::SkippedInvalid(reason) => format!("❌ Invalid video file: {name} ({reason})"),
        }
    }
}

/// Summary of one complete pipeline run
///
/// Immutable once produced; handed to the scheduler as the run's result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub uploaded: u32,
    pub failed: u32,
    pub lines: Vec<String>,
}

impl RunReport {
    /// Report for a run that found nothing to do
    pub fn no_videos() -> Self {
        RunReport {
            uploaded: 0,
            failed: 0,
            lines: vec!["No videos found to upload".to_string()],
        }
    }

    /// Build the report from per-item outcomes, in processing order
    ///
    /// Skipped-invalid items count toward the failed total but are rendered
    /// with a distinct line so the report stays auditable.
    pub fn from_outcomes(outcomes: &[ItemOutcome]) -> Self {
        let uploaded = outcomes.iter().filter(|o| o.result.is_uploaded()).count() as u32;
        let failed = outcomes.len() as u32 - uploaded;
        let lines = outcomes.iter().map(|o| o.line()).collect();
        RunReport {
            uploaded,
            failed,
            lines,
        }
    }

    /// Multi-line human-readable summary of the whole run
    pub fn summary(&self) -> String {
        let mut out = String::from("Upload completed!\n");
        out.push_str(&format!("✅ Uploaded: {}\n", self.uploaded));
        out.push_str(&format!("❌ Failed: {}\n", self.failed));
        out.push_str("\nDetails:\n");
        for line in &self.lines {
            out.push_str(line);
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::SystemTime;

    fn config() -> UploadConfig {
        UploadConfig {
            account_name: "user@example.com".to_string(),
            video_dir: "/videos".to_string(),
            caption_dir: "/captions".to_string(),
            processed_dir: "/processed".to_string(),
            interval_minutes: 60,
            visibility: Visibility::Private,
            category_id: "22".to_string(),
            delete_after_upload: false,
            channel: None,
        }
    }

    fn pair(name: &str) -> VideoWithCaption {
        VideoWithCaption {
            video: ScannedFile {
                path: PathBuf::from(name),
                size_bytes: 1,
                modified: SystemTime::UNIX_EPOCH,
            },
            caption: None,
        }
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(config().validate().is_ok());
    }

    #[test]
    fn test_empty_required_fields_rejected() {
        let mut c = config();
        c.account_name = "  ".to_string();
        assert!(c.validate().is_err());

        let mut c = config();
        c.processed_dir = String::new();
        assert!(c.validate().is_err());
    }

    #[test]
    fn test_interval_below_minimum_rejected() {
        let mut c = config();
        c.interval_minutes = 5;
        assert!(c.validate().is_err());
    }

    #[test]
    fn test_non_numeric_category_rejected() {
        let mut c = config();
        c.category_id = "pets".to_string();
        assert!(c.validate().is_err());
    }

    #[test]
    fn test_visibility_parsing() {
        assert_eq!("unlisted".parse::<Visibility>().unwrap(), Visibility::Unlisted);
        assert!("friends-only".parse::<Visibility>().is_err());
    }

    #[test]
    fn test_report_counts_caption_failure_as_uploaded() {
        let outcomes = vec![
            ItemOutcome {
                pair: pair("a.mp4"),
                result: ItemResult::CaptionFailed("vid-1".to_string()),
            },
            ItemOutcome {
                pair: pair("b.mp4"),
                result: ItemResult::Failed("network error".to_string()),
            },
            ItemOutcome {
                pair: pair("c.mp4"),
                result: ItemResult::SkippedInvalid("empty file".to_string()),
            },
        ];
        let report = RunReport::from_outcomes(&outcomes);
        assert_eq!(report.uploaded, 1);
        assert_eq!(report.failed, 2);
        assert_eq!(report.lines.len(), 3);
        assert!(report.lines[0].starts_with("✅"));
    }
}
