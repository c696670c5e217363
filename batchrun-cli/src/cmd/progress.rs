use std::io::Write;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use batchrun_exec::{Event, EventSink};

/// Renders a single-line progress indicator on stderr.
#[derive(Default)]
pub struct ProgressEventSink {
    retries: AtomicU64,
}

impl ProgressEventSink {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl<T> EventSink<T> for ProgressEventSink
where
    T: Send + Sync + 'static,
{
    async fn emit(&self, event: Event<T>) {
        match event {
            Event::RetryScheduled { id, delay, .. } => {
                self.retries.fetch_add(1, Ordering::Relaxed);
                eprintln!("\r{id}: rate limited, retrying in {}ms", delay.as_millis());
            }
            Event::Progress {
                processed, total, ..
            } => {
                let pct = batchrun_core::progress_percent(processed, total);
                eprint!(
                    "\r[{processed}/{total}] {pct:>3}% retries={}",
                    self.retries.load(Ordering::Relaxed)
                );
                let _ = std::io::stderr().flush();
            }
            Event::Paused { processed, .. } => {
                eprintln!("\rpaused after {processed} items");
            }
            Event::RunFinished { status, .. } => {
                eprintln!("\r{status}");
            }
            _ => {}
        }
    }
}
