use std::sync::{Arc, Mutex, PoisonError};

use batchrun_core::{ItemResult, RunState, RunStatus};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::executor::config::ExecutorConfig;
use crate::executor::control::Control;
use crate::executor::events::EventSink;
use crate::executor::operation::Operation;
use crate::executor::result::{ExecutorError, StartError};
use crate::executor::run_loop::RunContext;

struct ActiveRun {
    run_id: Uuid,
    control: Control,
}

struct Inner<T> {
    config: ExecutorConfig,
    operation: Arc<dyn Operation<T>>,
    event_sink: Arc<dyn EventSink<T>>,
    state: Arc<watch::Sender<RunState<T>>>,
    active: Mutex<Option<ActiveRun>>,
    /// Held by a run's control loop for its whole life, detached runs included.
    slot: Arc<tokio::sync::Mutex<()>>,
}

/// Applies one operation to a list of ids, one at a time, under a rate limit.
///
/// At most one run is active per executor and at most one operation call is in
/// flight. Cloning yields another handle to the same executor. Runs are spawned on
/// the ambient tokio runtime.
pub struct Executor<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for Executor<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

/// Completion handle for one run.
pub struct RunHandle<T> {
    run_id: Uuid,
    handle: JoinHandle<Vec<ItemResult<T>>>,
}

impl<T> RunHandle<T> {
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Wait for the run to end and return its ordered results.
    pub async fn wait(self) -> Result<Vec<ItemResult<T>>, ExecutorError> {
        self.handle
            .await
            .map_err(|e| ExecutorError::TaskJoin(format!("run {}: {}", self.run_id, e)))
    }
}

impl<T> Executor<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(
        config: ExecutorConfig,
        operation: Arc<dyn Operation<T>>,
        event_sink: Arc<dyn EventSink<T>>,
    ) -> Self {
        let (state, _rx) = watch::channel(RunState::idle());
        Self {
            inner: Arc::new(Inner {
                config,
                operation,
                event_sink,
                state: Arc::new(state),
                active: Mutex::new(None),
                slot: Arc::new(tokio::sync::Mutex::new(())),
            }),
        }
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.inner.config
    }

    /// Begin processing `ids` and return immediately.
    ///
    /// Rejected without touching state when `ids` is empty or a run is still
    /// running or paused.
    pub fn start(&self, ids: Vec<String>) -> Result<RunHandle<T>, StartError> {
        if ids.is_empty() {
            warn!("start called with no ids; ignoring");
            return Err(StartError::EmptyIds);
        }

        let mut active = self.lock_active();
        let (status, current_run) = {
            let s = self.inner.state.borrow();
            (s.status, s.run_id)
        };
        if let (true, Some(run_id)) = (status.is_active(), current_run) {
            warn!(%run_id, status = status.as_str(), "start rejected: run still active");
            return Err(StartError::AlreadyActive { run_id });
        }

        let run_id = Uuid::new_v4();
        let control = Control::new();
        self.inner
            .state
            .send_replace(RunState::begin(run_id, ids.len()));
        *active = Some(ActiveRun {
            run_id,
            control: control.clone(),
        });
        drop(active);

        let ctx = RunContext {
            run_id,
            ids,
            config: self.inner.config.clone(),
            operation: self.inner.operation.clone(),
            event_sink: self.inner.event_sink.clone(),
            control,
            state: self.inner.state.clone(),
            slot: self.inner.slot.clone(),
        };
        let handle = tokio::spawn(ctx.drive());
        Ok(RunHandle { run_id, handle })
    }

    /// Start a run and wait for it to end.
    pub async fn run(&self, ids: Vec<String>) -> Result<Vec<ItemResult<T>>, ExecutorError> {
        let handle = self.start(ids)?;
        handle.wait().await
    }

    /// Ask the run to stop before its next item. No-op unless running.
    pub fn pause(&self) {
        let active = self.lock_active();
        let Some(run) = active.as_ref() else { return };
        let paused = self.inner.state.send_if_modified(|s| {
            if s.run_id != Some(run.run_id) || s.status != RunStatus::Running {
                return false;
            }
            s.status = RunStatus::Paused;
            true
        });
        if paused {
            run.control.pause();
            debug!(run_id = %run.run_id, "pause requested");
        }
    }

    /// No-op unless paused.
    pub fn resume(&self) {
        let active = self.lock_active();
        let Some(run) = active.as_ref() else { return };
        let resumed = self.inner.state.send_if_modified(|s| {
            if s.run_id != Some(run.run_id) || s.status != RunStatus::Paused {
                return false;
            }
            s.status = RunStatus::Running;
            true
        });
        if resumed {
            run.control.resume();
            debug!(run_id = %run.run_id, "resume requested");
        }
    }

    /// Request cancellation. The run reaches `Cancelled` once the loop notices,
    /// after any operation call already in flight has returned.
    pub fn cancel(&self) {
        let active = self.lock_active();
        let Some(run) = active.as_ref() else { return };
        if !self.inner.state.borrow().status.is_active() {
            return;
        }
        if run.control.cancel() {
            debug!(run_id = %run.run_id, "cancel requested");
        }
    }

    /// Return to the idle zero state.
    ///
    /// A run that is still active is cancelled and detached: it stops at its next
    /// check and nothing it does afterwards is published. A run started after the
    /// reset makes no operation call until the detached run has returned.
    pub fn reset(&self) {
        let mut active = self.lock_active();
        if let Some(run) = active.take() {
            if self.inner.state.borrow().status.is_active() {
                warn!(run_id = %run.run_id, "reset while run active; cancelling it");
                run.control.cancel();
            }
        }
        self.inner.state.send_replace(RunState::idle());
    }

    /// Consistent snapshot of the current run state.
    pub fn state(&self) -> RunState<T> {
        self.inner.state.borrow().clone()
    }

    /// Receiver that observes every state update.
    pub fn subscribe(&self) -> watch::Receiver<RunState<T>> {
        self.inner.state.subscribe()
    }

    pub fn status(&self) -> RunStatus {
        self.inner.state.borrow().status
    }

    pub fn failed_ids(&self) -> Vec<String> {
        self.inner.state.borrow().failed_ids()
    }

    pub fn is_idle(&self) -> bool {
        self.status() == RunStatus::Idle
    }

    pub fn is_running(&self) -> bool {
        self.status() == RunStatus::Running
    }

    pub fn is_paused(&self) -> bool {
        self.status() == RunStatus::Paused
    }

    pub fn is_completed(&self) -> bool {
        self.status() == RunStatus::Completed
    }

    pub fn is_cancelled(&self) -> bool {
        self.status() == RunStatus::Cancelled
    }

    pub fn has_errors(&self) -> bool {
        self.inner.state.borrow().has_errors()
    }

    fn lock_active(&self) -> std::sync::MutexGuard<'_, Option<ActiveRun>> {
        self.inner
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
