//! Run scheduling and configuration persistence
//!
//! [`ConfigStore`] maps [`UploadConfig`] and the run-state flag onto the
//! settings store, one key per field. [`UploadScheduler`] owns the periodic
//! trigger: `start` replaces any existing recurring job, `run_once` enqueues
//! a single immediate invocation, and a run-level mutex serializes scheduled
//! and on-demand runs so overlapping scans cannot double-upload the same
//! files. After a run-fatal failure the next attempt is retried with
//! exponential backoff.

use crate::host::VideoHost;
use crate::models::{ChannelRef, UploadConfig, Visibility};
use crate::pipeline::{DEFAULT_INTER_ITEM_DELAY, UploadPipeline};
use common::error::{UploadError, UploadResult};
use common::store::SettingsStore;
use serde_json::json;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};
use tracing::{error, info, warn};
use uuid::Uuid;

/// Namespace under which all uploader settings are stored
pub const STORE_NAMESPACE: &str = "uploader";

/// Base delay before retrying after a run-fatal failure
const BACKOFF_BASE: Duration = Duration::from_secs(15 * 60);
/// Cap on backoff doublings (15min, 30min, 1h, 2h, 4h)
const MAX_BACKOFF_DOUBLINGS: u32 = 4;

mod keys {
    pub const ACCOUNT_NAME: &str = "account_name";
    pub const VIDEO_DIRECTORY: &str = "video_directory";
    pub const CAPTION_DIRECTORY: &str = "caption_directory";
    pub const PROCESSED_DIRECTORY: &str = "processed_directory";
    pub const UPLOAD_INTERVAL: &str = "upload_interval_minutes";
    pub const VISIBILITY: &str = "visibility";
    pub const CATEGORY_ID: &str = "category_id";
    pub const DELETE_AFTER_UPLOAD: &str = "delete_after_upload";
    pub const CHANNEL_ID: &str = "channel_id";
    pub const CHANNEL_TITLE: &str = "channel_title";
    pub const IS_RUNNING: &str = "is_running";
}

/// Result payload of one run, surfaced to observers
#[derive(Debug, Clone)]
pub struct RunStatus {
    pub success: bool,
    pub message: String,
    pub uploaded: u32,
    pub failed: u32,
}

/// Callback invoked with every run's status
pub type RunObserver = Arc<dyn Fn(&RunStatus) + Send + Sync>;

/// Typed persistence of [`UploadConfig`] and the run-state flag
#[derive(Debug, Clone)]
pub struct ConfigStore {
    store: SettingsStore,
}

impl ConfigStore {
    pub fn new(store: SettingsStore) -> Self {
        Self { store }
    }

    /// Persist `config`, one key per field; rejects invalid configurations
    pub async fn save(&self, config: &UploadConfig) -> UploadResult<()> {
        config.validate()?;

        self.store
            .set(keys::ACCOUNT_NAME, json!(config.account_name))
            .await?;
        self.store
            .set(keys::VIDEO_DIRECTORY, json!(config.video_dir))
            .await?;
        self.store
            .set(keys::CAPTION_DIRECTORY, json!(config.caption_dir))
            .await?;
        self.store
            .set(keys::PROCESSED_DIRECTORY, json!(config.processed_dir))
            .await?;
        self.store
            .set(keys::UPLOAD_INTERVAL, json!(config.interval_minutes))
            .await?;
        self.store
            .set(keys::VISIBILITY, json!(config.visibility.as_str()))
            .await?;
        self.store
            .set(keys::CATEGORY_ID, json!(config.category_id))
            .await?;
        self.store
            .set(keys::DELETE_AFTER_UPLOAD, json!(config.delete_after_upload))
            .await?;
        match &config.channel {
            Some(channel) => {
                self.store.set(keys::CHANNEL_ID, json!(channel.id)).await?;
                self.store
                    .set(keys::CHANNEL_TITLE, json!(channel.title))
                    .await?;
            }
            None => {
                self.store.remove(keys::CHANNEL_ID).await?;
                self.store.remove(keys::CHANNEL_TITLE).await?;
            }
        }
        Ok(())
    }

    /// Load the persisted configuration, or `None` if any of the four
    /// required fields was never saved
    ///
    /// Declared defaults apply only to fields that were never saved: interval
    /// 60 (also when the stored value is not numeric), visibility private,
    /// category "22".
    pub async fn load(&self) -> UploadResult<Option<UploadConfig>> {
        let account_name = self.store.get_string(keys::ACCOUNT_NAME).await?;
        let video_dir = self.store.get_string(keys::VIDEO_DIRECTORY).await?;
        let caption_dir = self.store.get_string(keys::CAPTION_DIRECTORY).await?;
        let processed_dir = self.store.get_string(keys::PROCESSED_DIRECTORY).await?;

        let (Some(account_name), Some(video_dir), Some(caption_dir), Some(processed_dir)) =
            (account_name, video_dir, caption_dir, processed_dir)
        else {
            return Ok(None);
        };

        let interval_minutes = self
            .store
            .get_u64(keys::UPLOAD_INTERVAL)
            .await?
            .unwrap_or(UploadConfig::DEFAULT_INTERVAL_MINUTES);

        let visibility = match self.store.get_string(keys::VISIBILITY).await? {
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                warn!("Ignoring unknown stored visibility: {raw}");
                Visibility::default()
            }),
            None => Visibility::default(),
        };

        let category_id = self
            .store
            .get_string(keys::CATEGORY_ID)
            .await?
            .unwrap_or_else(|| UploadConfig::DEFAULT_CATEGORY_ID.to_string());

        let delete_after_upload = self
            .store
            .get_bool(keys::DELETE_AFTER_UPLOAD)
            .await?
            .unwrap_or(false);

        let channel = match (
            self.store.get_string(keys::CHANNEL_ID).await?,
            self.store.get_string(keys::CHANNEL_TITLE).await?,
        ) {
            (Some(id), Some(title)) => Some(ChannelRef { id, title }),
            _ => None,
        };

        Ok(Some(UploadConfig {
            account_name,
            video_dir,
            caption_dir,
            processed_dir,
            interval_minutes,
            visibility,
            category_id,
            delete_after_upload,
            channel,
        }))
    }

    /// Remove all persisted configuration and run state
    pub async fn clear(&self) -> UploadResult<()> {
        self.store.clear().await
    }

    pub async fn set_running(&self, running: bool) -> UploadResult<()> {
        self.store.set(keys::IS_RUNNING, json!(running)).await
    }

    pub async fn is_running(&self) -> UploadResult<bool> {
        Ok(self.store.get_bool(keys::IS_RUNNING).await?.unwrap_or(false))
    }
}

/// Everything a scheduled invocation needs, cloned into job closures
#[derive(Clone)]
struct RunContext {
    host: Arc<dyn VideoHost>,
    scheduler: JobScheduler,
    run_lock: Arc<Mutex<()>>,
    consecutive_failures: Arc<AtomicU32>,
    observer: Option<RunObserver>,
    inter_item_delay: Duration,
}

impl RunContext {
    /// Execute one run under the run lock and surface its status
    ///
    /// Boxed rather than `async fn`: the retry job calls back into
    /// `execute`, and without the indirection the future type would be
    /// recursively defined in terms of itself.
    fn execute(&self, config: UploadConfig) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(self.execute_inner(config))
    }

    async fn execute_inner(&self, config: UploadConfig) {
        let _guard = self.run_lock.lock().await;
        info!("Upload run started");

        let pipeline =
            UploadPipeline::new(self.host.clone()).with_inter_item_delay(self.inter_item_delay);

        let status = match pipeline.run(&config).await {
            Ok(report) => {
                self.consecutive_failures.store(0, Ordering::Relaxed);
                RunStatus {
                    success: true,
                    message: report.summary(),
                    uploaded: report.uploaded,
                    failed: report.failed,
                }
            }
            Err(e) => {
                let failures = self.consecutive_failures.fetch_add(1, Ordering::Relaxed) + 1;
                let delay = retry_delay(failures);
                error!(
                    "Upload run failed: {e}; retrying in {} minutes",
                    delay.as_secs() / 60
                );
                self.schedule_retry(config.clone(), delay).await;
                RunStatus {
                    success: false,
                    message: format!("Upload run failed: {e}"),
                    uploaded: 0,
                    failed: 0,
                }
            }
        };

        if let Some(observer) = &self.observer {
            observer(&status);
        }
    }

    /// Enqueue a one-shot retry after `delay`
    async fn schedule_retry(&self, config: UploadConfig, delay: Duration) {
        let ctx = self.clone();
        let job = Job::new_one_shot_async(delay, move |_, _| {
            let ctx = ctx.clone();
            let config = config.clone();
            Box::pin(async move {
                ctx.execute(config).await;
            })
        });

        match job {
            Ok(job) => {
                if let Err(e) = self.scheduler.add(job).await {
                    error!("Failed to schedule retry: {e}");
                }
            }
            Err(e) => error!("Failed to build retry job: {e}"),
        }
    }
}

/// Exponential backoff: base 15 minutes, doubling per consecutive failure
fn retry_delay(consecutive_failures: u32) -> Duration {
    let doublings = consecutive_failures
        .saturating_sub(1)
        .min(MAX_BACKOFF_DOUBLINGS);
    BACKOFF_BASE * 2u32.pow(doublings)
}

fn sched_err(e: JobSchedulerError) -> UploadError {
    UploadError::Scheduler(e.to_string())
}

/// Owns the persisted configuration and the periodic upload trigger
pub struct UploadScheduler {
    config_store: ConfigStore,
    scheduler: JobScheduler,
    ctx: RunContext,
    recurring_job: Mutex<Option<Uuid>>,
}

impl UploadScheduler {
    /// Create the scheduler and start its tick loop; no run is scheduled yet
    pub async fn new(config_store: ConfigStore, host: Arc<dyn VideoHost>) -> UploadResult<Self> {
        let scheduler = JobScheduler::new().await.map_err(sched_err)?;
        scheduler.start().await.map_err(sched_err)?;

        let ctx = RunContext {
            host,
            scheduler: scheduler.clone(),
            run_lock: Arc::new(Mutex::new(())),
            consecutive_failures: Arc::new(AtomicU32::new(0)),
            observer: None,
            inter_item_delay: DEFAULT_INTER_ITEM_DELAY,
        };

        Ok(Self {
            config_store,
            scheduler,
            ctx,
            recurring_job: Mutex::new(None),
        })
    }

    /// Register a callback for run results
    pub fn with_observer(mut self, observer: RunObserver) -> Self {
        self.ctx.observer = Some(observer);
        self
    }

    /// Override the pipeline's pause between items
    pub fn with_inter_item_delay(mut self, delay: Duration) -> Self {
        self.ctx.inter_item_delay = delay;
        self
    }

    pub fn config_store(&self) -> &ConfigStore {
        &self.config_store
    }

    /// Persist `config` and (re)schedule the recurring run at its interval
    ///
    /// Replaces any previously scheduled recurring run; there is at most one
    /// active at a time.
    pub async fn start(&self, config: &UploadConfig) -> UploadResult<()> {
        config.validate()?;
        self.config_store.save(config).await?;

        let interval = Duration::from_secs(config.interval_minutes * 60);
        let ctx = self.ctx.clone();
        let job_config = config.clone();
        let job = Job::new_repeated_async(interval, move |_, _| {
            let ctx = ctx.clone();
            let config = job_config.clone();
            Box::pin(async move {
                ctx.execute(config).await;
            })
        })
        .map_err(sched_err)?;

        let mut slot = self.recurring_job.lock().await;
        if let Some(previous) = slot.take() {
            if let Err(e) = self.scheduler.remove(&previous).await {
                warn!("Failed to remove previous recurring job: {e}");
            }
        }
        let id = self.scheduler.add(job).await.map_err(sched_err)?;
        *slot = Some(id);
        drop(slot);

        self.config_store.set_running(true).await?;
        info!(
            "Automatic upload scheduled every {} minutes",
            config.interval_minutes
        );
        Ok(())
    }

    /// Cancel the recurring run and clear the run-state flag
    pub async fn stop(&self) -> UploadResult<()> {
        let mut slot = self.recurring_job.lock().await;
        if let Some(id) = slot.take() {
            self.scheduler.remove(&id).await.map_err(sched_err)?;
        }
        drop(slot);

        self.config_store.set_running(false).await?;
        info!("Automatic upload stopped");
        Ok(())
    }

    /// Enqueue a single immediate run; does not alter the run-state flag
    pub async fn run_once(&self, config: &UploadConfig) -> UploadResult<()> {
        config.validate()?;

        let ctx = self.ctx.clone();
        let job_config = config.clone();
        let job = Job::new_one_shot_async(Duration::from_secs(0), move |_, _| {
            let ctx = ctx.clone();
            let config = job_config.clone();
            Box::pin(async move {
                ctx.execute(config).await;
            })
        })
        .map_err(sched_err)?;

        self.scheduler.add(job).await.map_err(sched_err)?;
        info!("Immediate upload run queued");
        Ok(())
    }

    /// Whether a recurring run is scheduled, per the persisted flag
    pub async fn is_running(&self) -> UploadResult<bool> {
        self.config_store.is_running().await
    }
}
