//! tubedrop upload service
//!
//! Scans a watch directory for video files and matching subtitle files,
//! derives publishable metadata for each pair, uploads them through a
//! [`host::VideoHost`] capability, and archives or deletes the sources on
//! success. Runs unattended on a repeating schedule driven by
//! [`scheduler::UploadScheduler`], producing a [`models::RunReport`] per run.

pub mod files;
pub mod host;
pub mod metadata;
pub mod models;
pub mod pipeline;
pub mod scanner;
pub mod scheduler;
