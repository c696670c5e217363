use crate::types::{ItemResult, ItemStatus};

/// Percentage of `total` that `processed` represents, rounded half-up.
///
/// Returns `0` when `total == 0`.
pub fn progress_percent(processed: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    let processed = processed as u128;
    let total = total as u128;
    ((processed * 200 + total) / (total * 2)) as u32
}

/// Counters derived from an ordered slice of results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgressCounts {
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub progress: u32,
}

impl ProgressCounts {
    pub fn tally<T>(results: &[ItemResult<T>], total: usize) -> Self {
        let succeeded = results
            .iter()
            .filter(|r| r.status() == ItemStatus::Success)
            .count();
        let processed = results.len();
        Self {
            processed,
            succeeded,
            failed: processed - succeeded,
            progress: progress_percent(processed, total),
        }
    }
}
