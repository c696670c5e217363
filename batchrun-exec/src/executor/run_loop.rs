use std::sync::Arc;

use batchrun_core::{ItemResult, RunState, RunStatus};
use tokio::sync::{watch, Mutex};
use tracing::{debug, info};
use uuid::Uuid;

use crate::executor::config::ExecutorConfig;
use crate::executor::control::Control;
use crate::executor::events::{Event, EventSink};
use crate::executor::operation::Operation;
use crate::executor::pacing::BatchPlan;
use crate::retry::run_with_retry;

pub(crate) struct RunContext<T> {
    pub run_id: Uuid,
    pub ids: Vec<String>,
    pub config: ExecutorConfig,
    pub operation: Arc<dyn Operation<T>>,
    pub event_sink: Arc<dyn EventSink<T>>,
    pub control: Control,
    pub state: Arc<watch::Sender<RunState<T>>>,
    pub slot: Arc<Mutex<()>>,
}

enum LoopExit {
    Exhausted,
    Cancelled,
    /// The state was reset under the run; nothing more may be published.
    Detached,
}

impl<T> RunContext<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Apply `f` to the shared state if it still belongs to this run.
    fn update(&self, f: impl FnOnce(&mut RunState<T>)) -> bool {
        self.state.send_if_modified(|s| {
            if s.run_id != Some(self.run_id) {
                return false;
            }
            f(s);
            true
        })
    }

    async fn emit(&self, event: Event<T>) {
        self.event_sink.emit(event).await;
    }

    /// Drive the whole run to a terminal state and return its ordered results.
    pub async fn drive(self) -> Vec<ItemResult<T>> {
        // One control loop at a time, so a run detached by reset cannot overlap
        // its successor's operation calls.
        let _slot = match self.slot.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                debug!(run_id = %self.run_id, "waiting for the previous run to return");
                self.slot.lock().await
            }
        };

        let total = self.ids.len();
        let plan = BatchPlan::new(total, self.config.batch_size);
        info!(
            run_id = %self.run_id,
            total,
            batches = plan.total_batches(),
            "batch run started"
        );
        self.emit(Event::RunStarted {
            run_id: self.run_id,
            total,
        })
        .await;

        let mut results = Vec::with_capacity(total);
        let exit = self.process(&plan, &mut results).await;

        let status = match exit {
            LoopExit::Exhausted if self.control.is_cancelled() => RunStatus::Cancelled,
            LoopExit::Exhausted => RunStatus::Completed,
            LoopExit::Cancelled => RunStatus::Cancelled,
            LoopExit::Detached => {
                debug!(run_id = %self.run_id, processed = results.len(), "run detached by reset");
                return results;
            }
        };

        if !self.update(|s| s.finish(status)) {
            return results;
        }
        info!(
            run_id = %self.run_id,
            status = status.as_str(),
            processed = results.len(),
            failed = results.iter().filter(|r| r.is_failed()).count(),
            "batch run finished"
        );
        self.emit(Event::RunFinished {
            run_id: self.run_id,
            status,
            results: results.clone(),
        })
        .await;
        results
    }

    async fn process(&self, plan: &BatchPlan, results: &mut Vec<ItemResult<T>>) -> LoopExit {
        for (b, range) in plan.batches().enumerate() {
            if self.control.is_cancelled() {
                return LoopExit::Cancelled;
            }
            debug!(run_id = %self.run_id, batch = b, items = range.len(), "batch started");

            for index in range {
                if !self.wait_if_paused(results.len()).await {
                    return LoopExit::Cancelled;
                }

                let id = &self.ids[index];
                self.emit(Event::ItemStarted {
                    run_id: self.run_id,
                    id: id.clone(),
                    index,
                })
                .await;

                let result = run_with_retry(
                    self.operation.as_ref(),
                    id,
                    &self.config.retry,
                    self.run_id,
                    self.event_sink.as_ref(),
                )
                .await;

                if !self.update(|s| s.record(result.clone())) {
                    return LoopExit::Detached;
                }
                results.push(result.clone());

                self.emit(Event::ItemCompleted {
                    run_id: self.run_id,
                    result,
                })
                .await;
                self.emit(Event::Progress {
                    run_id: self.run_id,
                    processed: results.len(),
                    total: plan.len(),
                })
                .await;

                if !plan.is_last_item(index) {
                    self.control
                        .sleep_unless_cancelled(self.config.delay_between_items)
                        .await;
                }
            }

            if !plan.is_last_batch(b) && !self.control.is_cancelled() {
                self.control
                    .sleep_unless_cancelled(self.config.delay_between_batches)
                    .await;
            }
        }
        LoopExit::Exhausted
    }

    /// Suspend while paused. Returns `false` if the run was cancelled.
    async fn wait_if_paused(&self, processed: usize) -> bool {
        if self.control.is_cancelled() {
            return false;
        }
        if !self.control.is_paused() {
            return true;
        }

        debug!(run_id = %self.run_id, processed, "run paused");
        self.emit(Event::Paused {
            run_id: self.run_id,
            processed,
        })
        .await;
        if !self.control.wait_while_paused().await {
            return false;
        }
        debug!(run_id = %self.run_id, "run resumed");
        self.emit(Event::Resumed { run_id: self.run_id }).await;
        true
    }
}
