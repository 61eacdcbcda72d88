//! Error types for the quest_core library.

use chrono::NaiveDate;
use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for quest_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Caller supplied an empty or out-of-range selection when encoding a rule
    #[error("Invalid recurrence rule: {0}")]
    InvalidRule(String),

    /// A stored rule string does not match the recurrence grammar
    #[error("Malformed recurrence rule: {0}")]
    MalformedRule(String),

    /// Window end precedes its start
    #[error("Invalid date range: {end} is before {start}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    /// Failure raised by a caller-supplied instance source
    #[error("Instance lookup failed: {0}")]
    Lookup(#[source] Box<dyn std::error::Error + Send + Sync>),

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

    /// Unknown IANA timezone name
    #[error("Unknown timezone: {0}")]
    Timezone(String),

    /// Unparseable calendar date
    #[error("Invalid date: {0}")]
    InvalidDate(String),

    /// No template with the given id
    #[error("Unknown quest template: {0}")]
    UnknownTemplate(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Wrap an arbitrary data-source failure as a lookup error
    pub fn lookup<E>(err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Error::Lookup(err.into())
    }
}
