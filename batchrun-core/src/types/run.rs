use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::progress::progress_percent;
use crate::types::item::ItemResult;
use crate::types::status::{ItemStatus, RunStatus};
use crate::types::summary::RunSummary;

/// Caller-visible state of the current (or last) run.
///
/// Every counter is derived from `results` and `total`; `record` keeps them in
/// step so a snapshot never shows `succeeded + failed != processed`.
#[derive(Debug, Clone, PartialEq)]
pub struct RunState<T> {
    pub run_id: Option<Uuid>,
    pub status: RunStatus,
    pub total: usize,
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub progress: u32,
    pub results: Vec<ItemResult<T>>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl<T> Default for RunState<T> {
    fn default() -> Self {
        Self::idle()
    }
}

impl<T> RunState<T> {
    pub fn idle() -> Self {
        Self {
            run_id: None,
            status: RunStatus::Idle,
            total: 0,
            processed: 0,
            succeeded: 0,
            failed: 0,
            progress: 0,
            results: Vec::new(),
            started_at: None,
            finished_at: None,
        }
    }

    /// Fresh running state for a new run, discarding whatever the previous run left.
    pub fn begin(run_id: Uuid, total: usize) -> Self {
        Self {
            run_id: Some(run_id),
            status: RunStatus::Running,
            total,
            results: Vec::with_capacity(total),
            started_at: Some(Utc::now()),
            ..Self::idle()
        }
    }

    /// Append one terminal item outcome and recompute the derived counters.
    pub fn record(&mut self, result: ItemResult<T>) {
        match result.status() {
            ItemStatus::Success => self.succeeded += 1,
            ItemStatus::Failed => self.failed += 1,
        }
        self.results.push(result);
        self.processed = self.results.len();
        self.progress = progress_percent(self.processed, self.total);
    }

    pub fn finish(&mut self, status: RunStatus) {
        self.status = status;
        self.finished_at = Some(Utc::now());
    }

    pub fn failed_ids(&self) -> Vec<String> {
        self.results
            .iter()
            .filter(|r| r.is_failed())
            .map(|r| r.id.clone())
            .collect()
    }

    pub fn has_errors(&self) -> bool {
        self.failed > 0
    }

    pub fn is_idle(&self) -> bool {
        self.status == RunStatus::Idle
    }

    pub fn is_running(&self) -> bool {
        self.status == RunStatus::Running
    }

    pub fn is_paused(&self) -> bool {
        self.status == RunStatus::Paused
    }

    pub fn is_completed(&self) -> bool {
        self.status == RunStatus::Completed
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == RunStatus::Cancelled
    }

    pub fn summary(&self) -> RunSummary {
        let duration_ms = match (self.started_at, self.finished_at) {
            (Some(start), Some(end)) => Some((end - start).num_milliseconds().max(0) as u64),
            _ => None,
        };
        RunSummary {
            run_id: self.run_id,
            status: self.status,
            total: self.total,
            processed: self.processed,
            succeeded: self.succeeded,
            failed: self.failed,
            progress: self.progress,
            failed_ids: self.failed_ids(),
            started_at: self.started_at,
            finished_at: self.finished_at,
            duration_ms,
        }
    }
}
