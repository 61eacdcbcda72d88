#![forbid(unsafe_code)]

//! Core domain model and business logic for the Questlog system.
//!
//! This crate provides:
//! - Domain types (quest templates, instances, priorities)
//! - Recurrence rule encoding, decoding and display text
//! - Activity windows and streak evaluation
//! - Timezone-aware calendar helpers
//! - Persistence (instance log, template book, CSV export)

pub mod types;
pub mod error;
pub mod dates;
pub mod recurrence;
pub mod activity;
pub mod config;
pub mod logging;
pub mod store;
pub mod templates;
pub mod export;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use config::Config;
pub use dates::CalendarDate;
pub use recurrence::{
    decode, encode_daily, encode_monthly, encode_weekly, to_human_readable, Frequency,
    RecurrenceRule,
};
pub use activity::{
    build_activity_window, compute_streak, ActivityRecord, ActivitySummary, InstanceSource,
    DEFAULT_MAX_LOOKBACK,
};
pub use store::{InstanceIndex, InstanceLog, InstanceSink};
pub use export::write_activity_csv;
