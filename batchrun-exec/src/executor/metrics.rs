use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use batchrun_core::RunStatus;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::executor::events::{Event, EventSink};

#[derive(Debug, Clone, Default)]
pub struct RunMetrics {
    pub run_id: Option<Uuid>,
    pub status: String,
    pub started_at: Option<Instant>,
    pub finished_at: Option<Instant>,
    pub total_duration: Option<Duration>,
    pub items_total: usize,
    pub items_succeeded: usize,
    pub items_failed: usize,
    pub retries: usize,
    pub backoff: Duration,
    pub pauses: usize,
}

impl RunMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&mut self, run_id: Uuid, total: usize) {
        *self = Self {
            run_id: Some(run_id),
            status: RunStatus::Running.as_str().to_string(),
            started_at: Some(Instant::now()),
            items_total: total,
            ..Default::default()
        };
    }

    pub fn record_item_success(&mut self) {
        self.items_succeeded += 1;
    }

    pub fn record_item_failure(&mut self) {
        self.items_failed += 1;
    }

    pub fn record_retry(&mut self, delay: Duration) {
        self.retries += 1;
        self.backoff += delay;
    }

    pub fn record_pause(&mut self) {
        self.pauses += 1;
    }

    pub fn finish(&mut self, status: RunStatus) {
        self.status = status.as_str().to_string();
        self.finished_at = Some(Instant::now());
        if let (Some(started), Some(finished)) = (self.started_at, self.finished_at) {
            self.total_duration = Some(finished.duration_since(started));
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "run_id": self.run_id.map(|id| id.to_string()),
            "status": self.status,
            "duration_ms": self.total_duration.map(|d| d.as_millis() as u64),
            "items": {
                "total": self.items_total,
                "succeeded": self.items_succeeded,
                "failed": self.items_failed,
            },
            "retries": {
                "count": self.retries,
                "backoff_ms": self.backoff.as_millis() as u64,
            },
            "pauses": self.pauses,
        })
    }
}

#[derive(Default)]
pub struct MetricsCollector {
    metrics: Arc<Mutex<RunMetrics>>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn start(&self, run_id: Uuid, total: usize) {
        self.metrics.lock().await.start(run_id, total);
    }

    pub async fn record_item_success(&self) {
        self.metrics.lock().await.record_item_success();
    }

    pub async fn record_item_failure(&self) {
        self.metrics.lock().await.record_item_failure();
    }

    pub async fn record_retry(&self, delay: Duration) {
        self.metrics.lock().await.record_retry(delay);
    }

    pub async fn record_pause(&self) {
        self.metrics.lock().await.record_pause();
    }

    pub async fn finish(&self, status: RunStatus) {
        self.metrics.lock().await.finish(status);
    }

    pub async fn get_metrics(&self) -> RunMetrics {
        self.metrics.lock().await.clone()
    }
}

/// Updates a [`MetricsCollector`] from the event stream, then forwards to `base`.
pub struct MetricsEventSink<T> {
    collector: Arc<MetricsCollector>,
    base: Arc<dyn EventSink<T>>,
}

impl<T> MetricsEventSink<T> {
    pub fn new(collector: Arc<MetricsCollector>, base: Arc<dyn EventSink<T>>) -> Self {
        Self { collector, base }
    }
}

#[async_trait]
impl<T> EventSink<T> for MetricsEventSink<T>
where
    T: Send + Sync + 'static,
{
    async fn emit(&self, event: Event<T>) {
        match &event {
            Event::RunStarted { run_id, total } => {
                self.collector.start(*run_id, *total).await;
            }
            Event::ItemCompleted { result, .. } => {
                if result.is_success() {
                    self.collector.record_item_success().await;
                } else {
                    self.collector.record_item_failure().await;
                }
            }
            Event::RetryScheduled { delay, .. } => {
                self.collector.record_retry(*delay).await;
            }
            Event::Paused { .. } => {
                self.collector.record_pause().await;
            }
            Event::RunFinished { status, .. } => {
                self.collector.finish(*status).await;
            }
            _ => {}
        }

        self.base.emit(event).await;
    }
}
