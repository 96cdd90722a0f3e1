//! Crowd index estimation.
//!
//! This module turns the posted waits around an evaluation timestamp into a
//! 0–100 crowd index per park: it weights attractions by popularity, compares
//! against a same-slot historical baseline, normalizes for hour and weekday,
//! and rates how much the result can be trusted.

pub mod baseline;
pub mod calculator;
pub mod level;
pub mod popularity;
pub mod summary;
pub mod types;
pub mod utility;

pub use calculator::CrowdIndexEngine;
pub use level::{CrowdLevel, classify};
pub use summary::{CrowdSummary, SummaryError, crowd_index_summary, get_crowd_index_summary};
pub use types::{Confidence, CrowdIndexError, CrowdIndexResult, Failure, FailureKind};
