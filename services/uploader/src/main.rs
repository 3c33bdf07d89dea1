use anyhow::Result;
use common::store::{SettingsStore, StoreConfig};
use std::env;
use std::sync::Arc;
use tracing::{Level, info};
use tracing_subscriber::EnvFilter;
use uploader::host::DryRunHost;
use uploader::models::UploadConfig;
use uploader::scheduler::{ConfigStore, RunStatus, STORE_NAMESPACE, UploadScheduler};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_max_level(Level::INFO)
        .init();

    info!("Starting tubedrop upload service");

    let store_config = StoreConfig::from_env();
    let store = SettingsStore::new(&store_config.path, STORE_NAMESPACE);
    let config_store = ConfigStore::new(store);

    // Real hosts implement VideoHost behind their own credential flow; the
    // service binary ships with a dry-run host for local verification.
    let host = Arc::new(DryRunHost::new());

    let scheduler = UploadScheduler::new(config_store, host)
        .await?
        .with_observer(Arc::new(|status: &RunStatus| {
            info!(
                "Run result: success={} uploaded={} failed={}",
                status.success, status.uploaded, status.failed
            );
        }));

    // Prefer the persisted configuration; fall back to environment variables
    let config = match scheduler.config_store().load().await? {
        Some(config) => config,
        None => config_from_env(),
    };

    scheduler.start(&config).await?;
    info!(
        "Watching {} every {} minutes",
        config.video_dir, config.interval_minutes
    );

    // Keep the service running
    tokio::signal::ctrl_c().await?;
    info!("Shutting down tubedrop upload service");
    scheduler.stop().await?;

    Ok(())
}

/// Build an initial configuration from environment variables
fn config_from_env() -> UploadConfig {
    UploadConfig {
        account_name: env::var("TUBEDROP_ACCOUNT")
            .unwrap_or_else(|_| "uploader@localhost".to_string()),
        video_dir: env::var("TUBEDROP_VIDEO_DIR").unwrap_or_else(|_| "videos".to_string()),
        caption_dir: env::var("TUBEDROP_CAPTION_DIR").unwrap_or_else(|_| "captions".to_string()),
        processed_dir: env::var("TUBEDROP_PROCESSED_DIR")
            .unwrap_or_else(|_| "processed".to_string()),
        interval_minutes: env::var("TUBEDROP_INTERVAL_MINUTES")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(UploadConfig::DEFAULT_INTERVAL_MINUTES),
        visibility: env::var("TUBEDROP_VISIBILITY")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or_default(),
        category_id: env::var("TUBEDROP_CATEGORY_ID")
            .unwrap_or_else(|_| UploadConfig::DEFAULT_CATEGORY_ID.to_string()),
        delete_after_upload: env::var("TUBEDROP_DELETE_AFTER_UPLOAD")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(false),
        channel: None,
    }
}
