//! Error types for the hydrate_core library.
//!
//! Two families matter to callers: [`ValidationError`] (the input broke a domain
//! rule and the user can fix it) and [`StorageError`] (the persistence gateway
//! failed). Both fold into the crate-level [`Error`].

use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// A domain constraint was violated by caller input
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("Water amount must be between 1 and 5000 ml (got {0})")]
    Amount(i64),

    #[error("Daily goal must be between 1 and 10000 ml (got {0})")]
    DailyGoal(i64),

    #[error("Height must be between 100 and 250 cm (got {0})")]
    Height(u32),

    #[error("Weight must be greater than 0 and at most 250 kg (got {0})")]
    Weight(f64),

    #[error("Reminder interval must be between 15 and 480 minutes (got {0})")]
    ReminderInterval(u32),

    #[error("Working hours must satisfy 0 <= start < end <= 23 (got {start}-{end})")]
    WorkingHours { start: u8, end: u8 },

    /// Free-form input that could not be parsed at all
    #[error("Invalid {field}: {input:?}")]
    Unparseable { field: &'static str, input: String },
}

/// The persistence gateway could not complete a read or write
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage I/O failed for key '{key}': {source}")]
    Io {
        key: String,
        #[source]
        source: io::Error,
    },

    #[error("stored value for key '{key}' is corrupt: {reason}")]
    Corrupt { key: String, reason: String },

    #[error("failed to encode value for key '{key}': {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

impl StorageError {
    pub fn key(&self) -> &str {
        match self {
            StorageError::Io { key, .. }
            | StorageError::Corrupt { key, .. }
            | StorageError::Encode { key, .. } => key,
        }
    }
}

/// Who is expected to act on an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caller-fixable: show the message and ask for different input
    Validation,
    /// Environment-caused: the durable store misbehaved
    Storage,
    /// Everything else (config files, export targets, ...)
    Internal,
}

/// Core error type for hydrate_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Validation(_) => ErrorKind::Validation,
            Error::Storage(_) => ErrorKind::Storage,
            _ => ErrorKind::Internal,
        }
    }

    pub fn is_caller_fixable(&self) -> bool {
        self.kind() == ErrorKind::Validation
    }
}
