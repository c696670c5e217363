use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use batchrun_core::{ItemResult, RunStatus};
use serde::Serialize;
use serde_json::json;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Notifications emitted by the control loop, in the order things happen.
///
/// For each item the loop emits `ItemStarted`, zero or more `RetryScheduled`,
/// `ItemCompleted`, then `Progress`. `RunFinished` closes every run exactly once,
/// unless the run was detached by a reset.
#[derive(Debug, Clone)]
pub enum Event<T> {
    RunStarted {
        run_id: Uuid,
        total: usize,
    },
    ItemStarted {
        run_id: Uuid,
        id: String,
        index: usize,
    },
    RetryScheduled {
        run_id: Uuid,
        id: String,
        retry: u32,
        delay: Duration,
    },
    ItemCompleted {
        run_id: Uuid,
        result: ItemResult<T>,
    },
    Progress {
        run_id: Uuid,
        processed: usize,
        total: usize,
    },
    Paused {
        run_id: Uuid,
        processed: usize,
    },
    Resumed {
        run_id: Uuid,
    },
    RunFinished {
        run_id: Uuid,
        status: RunStatus,
        results: Vec<ItemResult<T>>,
    },
}

impl<T> Event<T> {
    pub fn run_id(&self) -> Uuid {
        match self {
            Event::RunStarted { run_id, .. }
            | Event::ItemStarted { run_id, .. }
            | Event::RetryScheduled { run_id, .. }
            | Event::ItemCompleted { run_id, .. }
            | Event::Progress { run_id, .. }
            | Event::Paused { run_id, .. }
            | Event::Resumed { run_id }
            | Event::RunFinished { run_id, .. } => *run_id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Event::RunStarted { .. } => "run.started",
            Event::ItemStarted { .. } => "item.started",
            Event::RetryScheduled { .. } => "item.retry_scheduled",
            Event::ItemCompleted { .. } => "item.completed",
            Event::Progress { .. } => "run.progress",
            Event::Paused { .. } => "run.paused",
            Event::Resumed { .. } => "run.resumed",
            Event::RunFinished { .. } => "run.finished",
        }
    }
}

impl<T: Serialize> Event<T> {
    pub fn to_json(&self) -> serde_json::Value {
        let run_id = self.run_id().to_string();
        let kind = self.kind();
        match self {
            Event::RunStarted { total, .. } => {
                json!({ "type": kind, "run_id": run_id, "total": total })
            }
            Event::ItemStarted { id, index, .. } => {
                json!({ "type": kind, "run_id": run_id, "id": id, "index": index })
            }
            Event::RetryScheduled { id, retry, delay, .. } => {
                json!({ "type": kind, "run_id": run_id, "id": id, "retry": retry, "delay_ms": delay.as_millis() as u64 })
            }
            Event::ItemCompleted { result, .. } => {
                json!({ "type": kind, "run_id": run_id, "result": result })
            }
            Event::Progress { processed, total, .. } => {
                json!({ "type": kind, "run_id": run_id, "processed": processed, "total": total })
            }
            Event::Paused { processed, .. } => {
                json!({ "type": kind, "run_id": run_id, "processed": processed })
            }
            Event::Resumed { .. } => json!({ "type": kind, "run_id": run_id }),
            Event::RunFinished { status, results, .. } => {
                let failed = results.iter().filter(|r| r.is_failed()).count();
                json!({
                    "type": kind,
                    "run_id": run_id,
                    "status": status.as_str(),
                    "processed": results.len(),
                    "failed": failed
                })
            }
        }
    }
}

/// Receives run notifications.
///
/// Sinks are awaited inline by the control loop, so they should return quickly;
/// hand work to another task (see [`ChannelEventSink`]) when it may block.
#[async_trait]
pub trait EventSink<T>: Send + Sync {
    async fn emit(&self, event: Event<T>);
}

pub struct CompositeEventSink<T> {
    sinks: Vec<Arc<dyn EventSink<T>>>,
}

impl<T> Default for CompositeEventSink<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> CompositeEventSink<T> {
    pub fn new() -> Self {
        Self { sinks: Vec::new() }
    }

    pub fn add(&mut self, sink: Arc<dyn EventSink<T>>) {
        self.sinks.push(sink);
    }

    pub fn with(mut self, sink: Arc<dyn EventSink<T>>) -> Self {
        self.add(sink);
        self
    }
}

#[async_trait]
impl<T> EventSink<T> for CompositeEventSink<T>
where
    T: Clone + Send + Sync + 'static,
{
    async fn emit(&self, event: Event<T>) {
        for sink in &self.sinks {
            sink.emit(event.clone()).await;
        }
    }
}

/// Forwards events to an unbounded channel without waiting for the consumer.
pub struct ChannelEventSink<T> {
    tx: mpsc::UnboundedSender<Event<T>>,
}

impl<T> ChannelEventSink<T> {
    pub fn new(tx: mpsc::UnboundedSender<Event<T>>) -> Self {
        Self { tx }
    }

    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Event<T>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl<T> EventSink<T> for ChannelEventSink<T>
where
    T: Send + Sync + 'static,
{
    async fn emit(&self, event: Event<T>) {
        // A dropped receiver just means nobody is listening any more.
        let _ = self.tx.send(event);
    }
}

/// Writes each event as one JSON line on stdout.
pub struct StdoutEventSink;

#[async_trait]
impl<T> EventSink<T> for StdoutEventSink
where
    T: Serialize + Send + Sync + 'static,
{
    async fn emit(&self, event: Event<T>) {
        println!("{}", serde_json::to_string(&event.to_json()).unwrap_or_default());
    }
}

pub struct NoOpEventSink;

#[async_trait]
impl<T> EventSink<T> for NoOpEventSink
where
    T: Send + Sync + 'static,
{
    async fn emit(&self, _event: Event<T>) {}
}
