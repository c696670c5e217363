#![forbid(unsafe_code)]

//! Runtime engine for paced batch execution.
//!
//! An [`Executor`] applies one caller-supplied asynchronous operation to a list of
//! identifiers, strictly one at a time, with pauses between items and between
//! batches, bounded retries on rate-limit errors and cooperative pause, resume
//! and cancel.

pub mod executor;
pub mod retry;

pub use batchrun_core::{
    ItemError, ItemErrorKind, ItemOutcome, ItemResult, ItemStatus, RunState, RunStatus, RunSummary,
};
pub use crate::executor::{
    BoxError, Callbacks, ConfigError, Event, EventSink, Executor, ExecutorConfig, ExecutorError,
    Operation, OperationFn, RunHandle, StartError,
};
pub use crate::retry::RetryConfig;
