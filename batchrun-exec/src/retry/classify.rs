use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;

static RETRY_IN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)retry in (\d+) seconds?").expect("valid regex"));

const RATE_LIMIT_MARKER: &str = "rate limit";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// The remote service throttled the call; worth another attempt later.
    RateLimited,
    Terminal,
}

/// Classify an operation error by its message.
pub fn classify_message(message: &str) -> FailureClass {
    if message.to_ascii_lowercase().contains(RATE_LIMIT_MARKER) {
        FailureClass::RateLimited
    } else {
        FailureClass::Terminal
    }
}

/// Extract the `retry in N second(s)` hint from an error message.
pub fn parse_retry_delay(message: &str) -> Option<Duration> {
    let caps = RETRY_IN_RE.captures(message)?;
    let secs = caps.get(1)?.as_str().parse::<u64>().ok()?;
    Some(Duration::from_secs(secs))
}
