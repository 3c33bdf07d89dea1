//! Integration tests for the upload pipeline
//!
//! These tests drive full runs against temporary directories and a scripted
//! in-memory video host, covering the sequential guarantee, caption failure
//! handling, cleanup isolation, and the run-fatal path.

use async_trait::async_trait;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tempfile::TempDir;
use uploader::host::{HostError, VideoHost};
use uploader::models::{UploadConfig, Visibility};
use uploader::pipeline::UploadPipeline;

/// Host whose failures are scripted per video file name
#[derive(Default)]
struct MockHost {
    uninitialized: bool,
    fail_videos: Vec<String>,
    fail_captions: bool,
    counter: AtomicU64,
    video_calls: Mutex<Vec<String>>,
    caption_calls: Mutex<Vec<String>>,
}

impl MockHost {
    fn video_calls(&self) -> Vec<String> {
        self.video_calls.lock().unwrap().clone()
    }

    fn caption_calls(&self) -> Vec<String> {
        self.caption_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl VideoHost for MockHost {
    fn is_initialized(&self) -> bool {
        !self.uninitialized
    }

    async fn upload_video(
        &self,
        file: &Path,
        _title: &str,
        _description: &str,
        _tags: &[&str],
        _category_id: &str,
        _visibility: Visibility,
    ) -> Result<String, HostError> {
        let name = file.file_name().unwrap().to_string_lossy().into_owned();
        self.video_calls.lock().unwrap().push(name.clone());
        if self.fail_videos.contains(&name) {
            return Err(HostError::Upload("simulated network failure".to_string()));
        }
        let id = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        Ok(format!("vid-{id}"))
    }

    async fn upload_caption(
        &self,
        video_id: &str,
        _file: &Path,
        _language: &str,
        _name: &str,
    ) -> Result<String, HostError> {
        self.caption_calls.lock().unwrap().push(video_id.to_string());
        if self.fail_captions {
            return Err(HostError::Upload("caption rejected".to_string()));
        }
        Ok(format!("cap-{video_id}"))
    }
}

struct Fixture {
    _root: TempDir,
    config: UploadConfig,
}

impl Fixture {
    fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir_all(root.path().join("videos")).unwrap();
        fs::create_dir_all(root.path().join("captions")).unwrap();

        let config = UploadConfig {
            account_name: "user@example.com".to_string(),
            video_dir: root.path().join("videos").display().to_string(),
            caption_dir: root.path().join("captions").display().to_string(),
            processed_dir: root.path().join("processed").display().to_string(),
            interval_minutes: 60,
            visibility: Visibility::Private,
            category_id: "22".to_string(),
            delete_after_upload: false,
            channel: None,
        };
        Fixture {
            _root: root,
            config,
        }
    }

    fn add_video(&self, name: &str) {
        fs::write(Path::new(&self.config.video_dir).join(name), "video-bytes").unwrap();
    }

    fn add_caption(&self, name: &str, body: &str) {
        fs::write(Path::new(&self.config.caption_dir).join(name), body).unwrap();
    }

    fn video_exists(&self, name: &str) -> bool {
        Path::new(&self.config.video_dir).join(name).exists()
    }

    fn processed_exists(&self, name: &str) -> bool {
        Path::new(&self.config.processed_dir).join(name).exists()
    }
}

fn pipeline(host: Arc<MockHost>) -> UploadPipeline {
    UploadPipeline::new(host).with_inter_item_delay(Duration::ZERO)
}

#[tokio::test]
async fn test_one_failure_never_short_circuits_the_run() {
    let fixture = Fixture::new();
    fixture.add_video("a.mp4");
    fixture.add_video("b.mp4");
    fixture.add_video("c.mp4");

    let host = Arc::new(MockHost {
        fail_videos: vec!["b.mp4".to_string()],
        ..MockHost::default()
    });

    let report = pipeline(host.clone()).run(&fixture.config).await.unwrap();

    assert_eq!(report.uploaded, 2);
    assert_eq!(report.failed, 1);
    assert_eq!(report.lines.len(), 3);
    // All three were attempted, including the one after the failure
    assert_eq!(host.video_calls().len(), 3);

    // Successful uploads were relocated; the failed one stays put
    assert!(fixture.video_exists("b.mp4"));
    assert!(!fixture.video_exists("a.mp4"));
    assert!(!fixture.video_exists("c.mp4"));
    assert!(fixture.processed_exists("a.mp4"));
    assert!(fixture.processed_exists("c.mp4"));
}

#[tokio::test]
async fn test_caption_failure_still_counts_as_uploaded() {
    let fixture = Fixture::new();
    fixture.add_video("trip.mp4");
    fixture.add_caption("trip.srt", "주소: Seoul Station\n");

    let host = Arc::new(MockHost {
        fail_captions: true,
        ..MockHost::default()
    });

    let report = pipeline(host.clone()).run(&fixture.config).await.unwrap();

    assert_eq!(report.uploaded, 1);
    assert_eq!(report.failed, 0);
    assert!(report.lines[0].contains("subtitle failed"));
    assert_eq!(host.caption_calls().len(), 1);

    // Both source files were still relocated
    assert!(fixture.processed_exists("trip.mp4"));
    assert!(fixture.processed_exists("trip.srt"));
}

#[tokio::test]
async fn test_cleanup_failure_never_downgrades_the_outcome() {
    let mut fixture = Fixture::new();
    fixture.add_video("clip.mp4");

    // Point the processed directory below a regular file so relocation
    // cannot create it
    let blocker = Path::new(&fixture.config.video_dir)
        .parent()
        .unwrap()
        .join("blocker");
    fs::write(&blocker, "not a directory").unwrap();
    fixture.config.processed_dir = blocker.join("processed").display().to_string();

    let host = Arc::new(MockHost::default());
    let report = pipeline(host).run(&fixture.config).await.unwrap();

    assert_eq!(report.uploaded, 1);
    assert_eq!(report.failed, 0);
    // The source stayed behind because the move failed
    assert!(fixture.video_exists("clip.mp4"));
}

#[tokio::test]
async fn test_delete_after_upload_removes_sources() {
    let mut fixture = Fixture::new();
    fixture.config.delete_after_upload = true;
    fixture.add_video("clip.mp4");
    fixture.add_caption("clip.srt", "시간: 2025. 5. 18. 17시 53분 8초\n");

    let host = Arc::new(MockHost::default());
    let report = pipeline(host).run(&fixture.config).await.unwrap();

    assert_eq!(report.uploaded, 1);
    assert!(!fixture.video_exists("clip.mp4"));
    assert!(!Path::new(&fixture.config.caption_dir).join("clip.srt").exists());
    assert!(!Path::new(&fixture.config.processed_dir).exists());
}

#[tokio::test]
async fn test_invalid_video_is_skipped_without_an_upload_attempt() {
    let fixture = Fixture::new();
    fixture.add_video("good.mp4");
    fs::write(Path::new(&fixture.config.video_dir).join("empty.mp4"), "").unwrap();

    let host = Arc::new(MockHost::default());
    let report = pipeline(host.clone()).run(&fixture.config).await.unwrap();

    assert_eq!(report.uploaded, 1);
    assert_eq!(report.failed, 1);
    assert_eq!(host.video_calls(), vec!["good.mp4".to_string()]);
    assert!(report.lines.iter().any(|l| l.contains("Invalid video file")));
    // The invalid file is left in place
    assert!(fixture.video_exists("empty.mp4"));
}

#[tokio::test]
async fn test_empty_directory_produces_no_videos_report() {
    let fixture = Fixture::new();
    let host = Arc::new(MockHost::default());

    let report = pipeline(host).run(&fixture.config).await.unwrap();

    assert_eq!(report.uploaded, 0);
    assert_eq!(report.failed, 0);
    assert_eq!(report.lines, vec!["No videos found to upload".to_string()]);
}

#[tokio::test]
async fn test_uninitialized_host_is_run_fatal() {
    let fixture = Fixture::new();
    fixture.add_video("clip.mp4");

    let host = Arc::new(MockHost {
        uninitialized: true,
        ..MockHost::default()
    });

    let result = pipeline(host.clone()).run(&fixture.config).await;
    assert!(result.is_err());
    // Nothing was attempted and sources are untouched
    assert!(host.video_calls().is_empty());
    assert!(fixture.video_exists("clip.mp4"));
}

#[tokio::test(start_paused = true)]
async fn test_delay_occurs_only_between_items() {
    let fixture = Fixture::new();
    fixture.add_video("a.mp4");
    fixture.add_video("b.mp4");
    fixture.add_video("c.mp4");

    let host = Arc::new(MockHost::default());
    let pipeline = UploadPipeline::new(host).with_inter_item_delay(Duration::from_secs(5));

    let started = tokio::time::Instant::now();
    let report = pipeline.run(&fixture.config).await.unwrap();
    let elapsed = started.elapsed();

    assert_eq!(report.uploaded, 3);
    // Two gaps for three items, none after the last
    assert!(elapsed >= Duration::from_secs(10), "elapsed {elapsed:?}");
    assert!(elapsed < Duration::from_secs(15), "elapsed {elapsed:?}");
}
