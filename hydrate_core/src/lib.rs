#![forbid(unsafe_code)]

//! Core domain model and business logic for the hydrate water-intake tracker.
//!
//! This crate provides:
//! - Domain types (intake records, user profile, statistics views)
//! - Record storage with local-day bucketing
//! - Goal and profile policies with validation
//! - Statistics (progress, weekly trend, streak, rolling average)
//! - Persistence gateway (file-backed and in-memory)
//! - Export, reminder scheduling and input sanitizing

pub mod types;
pub mod error;
pub mod config;
pub mod logging;
pub mod persistence;
pub mod records;
pub mod goal;
pub mod profile;
pub mod statistics;
pub mod reminder;
pub mod sanitize;
pub mod export;
pub mod tracker;

// Re-export commonly used types
pub use error::{Error, ErrorKind, Result, StorageError, ValidationError};
pub use types::*;
pub use config::{Config, StatisticsConfig, StreakMode};
pub use persistence::{FileStore, KeyValueStore, MemoryStore};
pub use records::RecordStore;
pub use goal::GoalPolicy;
pub use profile::ProfilePolicy;
pub use statistics::Statistics;
pub use tracker::Tracker;
