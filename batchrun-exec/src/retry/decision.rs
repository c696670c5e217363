use std::time::Duration;

use crate::retry::classify::{classify_message, parse_retry_delay, FailureClass};
use crate::retry::config::RetryConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    RetryAfter { delay: Duration, reason: RetryReason },
    Stop { reason: RetryReason },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryReason {
    NotRetryable,
    AttemptsExhausted,
    /// The error message said how long to wait.
    RetryAfterHint,
    DefaultBackoff,
}

/// Decide whether a failed attempt should be retried and how long to wait.
///
/// - `retries_done`: retries already performed for this item (0 after the first attempt).
/// - `message`: the operation error's message; the only input to classification.
pub fn decide_retry(cfg: &RetryConfig, retries_done: u32, message: &str) -> RetryDecision {
    if classify_message(message) == FailureClass::Terminal {
        return RetryDecision::Stop {
            reason: RetryReason::NotRetryable,
        };
    }

    if retries_done >= cfg.max_retries {
        return RetryDecision::Stop {
            reason: RetryReason::AttemptsExhausted,
        };
    }

    match parse_retry_delay(message) {
        Some(delay) => RetryDecision::RetryAfter {
            delay: clamp(delay, cfg.max_delay),
            reason: RetryReason::RetryAfterHint,
        },
        None => RetryDecision::RetryAfter {
            delay: clamp(cfg.default_delay, cfg.max_delay),
            reason: RetryReason::DefaultBackoff,
        },
    }
}

fn clamp(delay: Duration, max: Option<Duration>) -> Duration {
    match max {
        Some(max) if delay > max => max,
        _ => delay,
    }
}
