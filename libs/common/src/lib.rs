//! Common library for the tubedrop application
//!
//! This crate provides shared functionality used across the tubedrop
//! services, including the persistent settings store, error handling, and
//! other common utilities.

pub mod error;
pub mod store;
