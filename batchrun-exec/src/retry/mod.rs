mod attempt;
mod classify;
mod config;
mod decision;

pub use attempt::run_with_retry;
pub use classify::{classify_message, parse_retry_delay, FailureClass};
pub use config::RetryConfig;
pub use decision::{decide_retry, RetryDecision, RetryReason};
