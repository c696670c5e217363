#![forbid(unsafe_code)]

//! Data model for paced batch runs: per-item outcomes, the caller-visible run
//! state and the progress arithmetic shared by the executor and its consumers.

pub mod progress;
pub mod types;

pub use crate::progress::{progress_percent, ProgressCounts};
pub use crate::types::{
    ItemError, ItemErrorKind, ItemOutcome, ItemResult, ItemStatus, RunState, RunStatus, RunSummary,
};
