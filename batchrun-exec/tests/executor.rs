use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use batchrun_exec::executor::{
    BoxError, Callbacks, ChannelEventSink, Event, Executor, ExecutorConfig, NoOpEventSink,
    Operation, OperationFn, StartError,
};
use batchrun_exec::{ItemErrorKind, ItemResult, ItemStatus, RetryConfig, RunStatus};
use tokio::time::Instant;

type Behaviour = Box<dyn Fn(&str, u32) -> Result<String, String> + Send + Sync>;

// Operation whose outcome depends on the id and the attempt number (1-based).
struct ScriptedOperation {
    calls: Mutex<Vec<String>>,
    behaviour: Behaviour,
}

impl ScriptedOperation {
    fn new(behaviour: impl Fn(&str, u32) -> Result<String, String> + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            behaviour: Box::new(behaviour),
        })
    }

    fn always_ok() -> Arc<Self> {
        Self::new(|id, _| Ok(format!("done:{id}")))
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn calls_for(&self, id: &str) -> usize {
        self.calls().iter().filter(|c| c.as_str() == id).count()
    }
}

#[async_trait]
impl Operation<String> for ScriptedOperation {
    async fn call(&self, id: &str) -> Result<String, BoxError> {
        let attempt = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(id.to_string());
            calls.iter().filter(|c| c.as_str() == id).count() as u32
        };
        (self.behaviour)(id, attempt).map_err(Into::into)
    }
}

fn ids(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("item-{i}")).collect()
}

fn executor(op: Arc<ScriptedOperation>) -> Executor<String> {
    Executor::<String>::new(ExecutorConfig::default(), op, Arc::new(NoOpEventSink))
}

fn executor_with_events(
    op: Arc<ScriptedOperation>,
) -> (Executor<String>, tokio::sync::mpsc::UnboundedReceiver<Event<String>>) {
    let (sink, rx) = ChannelEventSink::<String>::channel();
    (
        Executor::<String>::new(ExecutorConfig::default(), op, Arc::new(sink)),
        rx,
    )
}

#[tokio::test(start_paused = true)]
async fn all_items_succeed_in_input_order() {
    let op = ScriptedOperation::always_ok();
    let exec = executor(op.clone());
    let input = ids(7);

    let results = exec.run(input.clone()).await.unwrap();

    let order: Vec<&str> = results.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(order, input.iter().map(String::as_str).collect::<Vec<_>>());
    assert!(results.iter().all(|r| r.status() == ItemStatus::Success));
    assert_eq!(op.calls(), input);

    let state = exec.state();
    assert_eq!(state.status, RunStatus::Completed);
    assert_eq!(state.total, 7);
    assert_eq!(state.processed, 7);
    assert_eq!(state.succeeded, 7);
    assert_eq!(state.failed, 0);
    assert_eq!(state.progress, 100);
    assert_eq!(state.results, results);
    assert!(exec.is_completed());
    assert!(!exec.has_errors());
}

#[tokio::test(start_paused = true)]
async fn terminal_errors_are_attempted_once_and_do_not_stop_the_run() {
    let op = ScriptedOperation::new(|id, _| Err(format!("record {id} not found")));
    let exec = executor(op.clone());
    let input = ids(4);

    let results = exec.run(input.clone()).await.unwrap();

    assert_eq!(results.len(), 4);
    for id in &input {
        assert_eq!(op.calls_for(id), 1);
    }
    for r in &results {
        let err = r.error().unwrap();
        assert_eq!(err.kind, ItemErrorKind::Terminal);
        assert_eq!(err.attempts, 1);
    }
    let state = exec.state();
    assert_eq!(state.status, RunStatus::Completed);
    assert_eq!(state.failed, 4);
    assert_eq!(state.failed_ids(), input);
    assert!(exec.has_errors());
}

#[tokio::test(start_paused = true)]
async fn rate_limited_item_recovers_within_retry_budget() {
    let op = ScriptedOperation::new(|id, attempt| {
        if id == "b" && attempt <= 2 {
            Err("Rate limit exceeded".to_string())
        } else {
            Ok(id.to_uppercase())
        }
    });
    let exec = executor(op.clone());

    let results = exec
        .run(vec!["a".into(), "b".into(), "c".into()])
        .await
        .unwrap();

    assert_eq!(op.calls_for("b"), 3);
    assert_eq!(op.calls_for("a"), 1);
    assert_eq!(results[1].value().map(String::as_str), Some("B"));
    assert_eq!(exec.state().succeeded, 3);
}

#[tokio::test(start_paused = true)]
async fn rate_limited_item_fails_after_max_retries_plus_one_attempts() {
    let op = ScriptedOperation::new(|_, _| Err("rate limit exceeded, retry in 1 second".to_string()));
    let exec = executor(op.clone());

    let started = Instant::now();
    let results = exec.run(vec!["x".into()]).await.unwrap();

    assert_eq!(op.calls_for("x"), 4);
    let err = results[0].error().unwrap();
    assert_eq!(err.kind, ItemErrorKind::RetriesExhausted);
    assert_eq!(err.attempts, 4);
    assert!(err.message.contains("rate limit"));
    // three one-second backoffs, no pacing delay after the only item
    assert_eq!(started.elapsed().as_secs(), 3);
}

#[tokio::test(start_paused = true)]
async fn backoff_and_item_delays_add_up_for_the_reference_scenario() {
    let op = ScriptedOperation::new(|id, attempt| {
        if id == "b" && attempt == 1 {
            Err("rate limit exceeded, retry in 2 seconds".to_string())
        } else {
            Ok(id.to_string())
        }
    });
    let exec = executor(op);

    let started = Instant::now();
    let results = exec
        .run(vec!["a".into(), "b".into(), "c".into()])
        .await
        .unwrap();
    let elapsed = started.elapsed();

    let ids: Vec<&str> = results.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, ["a", "b", "c"]);
    assert!(results.iter().all(ItemResult::is_success));
    assert_eq!(exec.state().failed, 0);
    // 2s backoff + two 500ms item gaps; a single batch so no batch delay
    assert!(elapsed >= Duration::from_millis(3000), "{elapsed:?}");
    assert!(elapsed < Duration::from_millis(3100), "{elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn batch_delay_is_inserted_between_batches_only() {
    let exec = executor(ScriptedOperation::always_ok());

    let started = Instant::now();
    exec.run(ids(7)).await.unwrap();
    let elapsed = started.elapsed();

    // 6 item gaps * 500ms + 2 batch gaps * 2000ms
    assert!(elapsed >= Duration::from_millis(7000), "{elapsed:?}");
    assert!(elapsed < Duration::from_millis(7100), "{elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn cancel_after_second_item_stops_the_run() {
    let op = ScriptedOperation::always_ok();
    let (exec, mut rx) = executor_with_events(op.clone());
    let handle = exec.start(ids(10)).unwrap();

    let mut completed = 0;
    let mut completed_after_cancel = 0;
    let mut cancelled = false;
    while let Some(event) = rx.recv().await {
        match event {
            Event::ItemCompleted { .. } => {
                if cancelled {
                    completed_after_cancel += 1;
                }
                completed += 1;
                if completed == 2 {
                    exec.cancel();
                    cancelled = true;
                }
            }
            Event::RunFinished { status, results, .. } => {
                assert_eq!(status, RunStatus::Cancelled);
                assert_eq!(results.len(), 2);
                break;
            }
            _ => {}
        }
    }

    let results = handle.wait().await.unwrap();
    assert_eq!(completed_after_cancel, 0);
    assert_eq!(results.len(), 2);
    assert_eq!(op.calls().len(), 2);

    let state = exec.state();
    assert_eq!(state.status, RunStatus::Cancelled);
    assert!(state.processed < state.total);
    assert_eq!(state.progress, 20);
}

#[tokio::test(start_paused = true)]
async fn cancel_does_not_interrupt_an_operation_in_flight() {
    let op = OperationFn::new(|id: String| async move {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok::<_, BoxError>(id)
    });
    let exec =
        Executor::<String>::new(ExecutorConfig::default(), Arc::new(op), Arc::new(NoOpEventSink));
    let handle = exec.start(ids(3)).unwrap();

    tokio::time::sleep(Duration::from_secs(1)).await;
    exec.cancel();
    assert!(exec.is_running(), "cancellation is only observed by the loop");

    let results = handle.wait().await.unwrap();
    assert_eq!(results.len(), 1);
    assert!(results[0].is_success());
    assert!(exec.is_cancelled());
}

#[tokio::test(start_paused = true)]
async fn pause_then_resume_matches_uninterrupted_run() {
    let behaviour = |id: &str, _: u32| {
        if id == "item-2" {
            Err("validation failed".to_string())
        } else {
            Ok(format!("ok:{id}"))
        }
    };

    let baseline = executor(ScriptedOperation::new(behaviour))
        .run(ids(5))
        .await
        .unwrap();

    let (exec, mut rx) = executor_with_events(ScriptedOperation::new(behaviour));
    let handle = exec.start(ids(5)).unwrap();
    let mut saw_pause = false;
    let mut saw_resume = false;
    while let Some(event) = rx.recv().await {
        match event {
            Event::ItemCompleted { .. } if !saw_pause => {
                exec.pause();
                assert!(exec.is_paused());
                saw_pause = true;
            }
            Event::Paused { processed, .. } => {
                assert_eq!(processed, 1);
                tokio::time::sleep(Duration::from_secs(30)).await;
                assert_eq!(exec.state().processed, 1);
                assert!(exec.is_paused());
                exec.resume();
                assert!(exec.is_running());
            }
            Event::Resumed { .. } => saw_resume = true,
            Event::RunFinished { .. } => break,
            _ => {}
        }
    }

    let results = handle.wait().await.unwrap();
    assert!(saw_resume);
    assert_eq!(results, baseline);
    assert!(exec.is_completed());
}

#[tokio::test(start_paused = true)]
async fn cancel_while_paused_ends_the_run() {
    let (exec, mut rx) = executor_with_events(ScriptedOperation::always_ok());
    let handle = exec.start(ids(4)).unwrap();

    while let Some(event) = rx.recv().await {
        match event {
            Event::ItemCompleted { .. } => exec.pause(),
            Event::Paused { .. } => exec.cancel(),
            Event::Resumed { .. } => panic!("cancelled run must not resume"),
            Event::RunFinished { status, .. } => {
                assert_eq!(status, RunStatus::Cancelled);
                break;
            }
            _ => {}
        }
    }
    assert_eq!(handle.wait().await.unwrap().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn pause_and_resume_are_noops_in_the_wrong_state() {
    let exec = executor(ScriptedOperation::always_ok());
    exec.pause();
    exec.resume();
    assert!(exec.is_idle());

    let handle = exec.start(ids(2)).unwrap();
    exec.resume();
    assert!(exec.is_running());
    exec.pause();
    exec.pause();
    assert!(exec.is_paused());
    exec.resume();
    handle.wait().await.unwrap();

    exec.pause();
    assert!(exec.is_completed());
}

#[tokio::test(start_paused = true)]
async fn start_rejects_empty_ids_without_state_change() {
    let exec = executor(ScriptedOperation::always_ok());
    assert_eq!(exec.start(Vec::new()).err(), Some(StartError::EmptyIds));
    assert!(exec.is_idle());
    assert!(exec.state().run_id.is_none());
}

#[tokio::test(start_paused = true)]
async fn start_is_rejected_while_a_run_is_active() {
    let op = ScriptedOperation::always_ok();
    let exec = executor(op.clone());
    let first = exec.start(ids(3)).unwrap();
    let first_id = first.run_id();

    match exec.start(ids(2)) {
        Err(StartError::AlreadyActive { run_id }) => assert_eq!(run_id, first_id),
        other => panic!("expected AlreadyActive, got {:?}", other.map(|h| h.run_id())),
    }
    exec.pause();
    assert!(matches!(
        exec.start(ids(2)),
        Err(StartError::AlreadyActive { .. })
    ));
    exec.resume();
    first.wait().await.unwrap();

    // a finished run may be replaced directly; counters start over
    let second = exec.start(vec!["z".into()]).unwrap();
    assert_ne!(second.run_id(), first_id);
    let state = exec.state();
    assert_eq!(state.run_id, Some(second.run_id()));
    assert_eq!(state.total, 1);
    assert_eq!(state.processed, 0);
    second.wait().await.unwrap();
    assert_eq!(exec.state().results.len(), 1);
    assert_eq!(op.calls().len(), 4);
}

#[tokio::test(start_paused = true)]
async fn reset_returns_to_idle_after_completion() {
    let exec = executor(ScriptedOperation::always_ok());
    exec.run(ids(2)).await.unwrap();
    assert!(exec.is_completed());

    exec.reset();
    let state = exec.state();
    assert!(state.is_idle());
    assert_eq!(state.total, 0);
    assert!(state.results.is_empty());
}

#[tokio::test(start_paused = true)]
async fn reset_mid_run_detaches_the_run() {
    let op = ScriptedOperation::always_ok();
    let (exec, mut rx) = executor_with_events(op.clone());
    let handle = exec.start(ids(5)).unwrap();

    while let Some(event) = rx.recv().await {
        if let Event::ItemCompleted { .. } = event {
            exec.reset();
            break;
        }
    }
    assert!(exec.is_idle());

    let results = handle.wait().await.unwrap();
    assert_eq!(results.len(), 1);
    assert!(exec.is_idle());
    assert_eq!(exec.state().processed, 0);
    while let Ok(event) = rx.try_recv() {
        assert!(
            !matches!(event, Event::RunFinished { .. } | Event::ItemCompleted { .. }),
            "detached run published {}",
            event.kind()
        );
    }

    // the executor is usable again right away
    exec.run(ids(2)).await.unwrap();
    assert!(exec.is_completed());
}

// Slow operation that records how many of its calls overlap.
#[derive(Default)]
struct SlowOperation {
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    calls: Mutex<Vec<String>>,
}

#[async_trait]
impl Operation<String> for SlowOperation {
    async fn call(&self, id: &str) -> Result<String, BoxError> {
        self.calls.lock().unwrap().push(id.to_string());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(5)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(id.to_string())
    }
}

#[tokio::test(start_paused = true)]
async fn start_after_reset_waits_for_the_detached_call() {
    let op = Arc::new(SlowOperation::default());
    let exec =
        Executor::<String>::new(ExecutorConfig::default(), op.clone(), Arc::new(NoOpEventSink));
    let started = Instant::now();
    let first = exec.start(vec!["a".into(), "b".into()]).unwrap();

    tokio::time::sleep(Duration::from_millis(100)).await;
    exec.cancel();
    exec.reset();
    let second = exec.start(vec!["c".into()]).unwrap();
    assert!(exec.is_running());

    let results = second.wait().await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].value(), Some(&"c".to_string()));
    assert!(exec.is_completed());
    assert!(started.elapsed() >= Duration::from_secs(10), "{:?}", started.elapsed());

    let detached = first.wait().await.unwrap();
    assert_eq!(detached.len(), 1);
    assert_eq!(op.max_in_flight.load(Ordering::SeqCst), 1);
    assert_eq!(*op.calls.lock().unwrap(), ["a", "c"]);
}

#[tokio::test(start_paused = true)]
async fn reset_without_cancel_still_serializes_calls() {
    let op = Arc::new(SlowOperation::default());
    let exec =
        Executor::<String>::new(ExecutorConfig::default(), op.clone(), Arc::new(NoOpEventSink));
    let first = exec.start(ids(3)).unwrap();

    tokio::time::sleep(Duration::from_secs(1)).await;
    exec.reset();
    exec.run(ids(2)).await.unwrap();

    first.wait().await.unwrap();
    assert_eq!(op.max_in_flight.load(Ordering::SeqCst), 1);
    assert_eq!(exec.state().processed, 2);
}

#[tokio::test(start_paused = true)]
async fn cancel_during_last_item_ends_cancelled() {
    let op = Arc::new(SlowOperation::default());
    let (sink, mut rx) = ChannelEventSink::<String>::channel();
    let exec = Executor::<String>::new(ExecutorConfig::default(), op.clone(), Arc::new(sink));
    let handle = exec.start(vec!["only".into()]).unwrap();

    tokio::time::sleep(Duration::from_millis(100)).await;
    exec.cancel();

    let results = handle.wait().await.unwrap();
    assert_eq!(results.len(), 1);
    assert!(results[0].is_success());

    let state = exec.state();
    assert_eq!(state.status, RunStatus::Cancelled);
    assert_eq!(state.processed, state.total);

    let mut finished = None;
    while let Ok(event) = rx.try_recv() {
        if let Event::RunFinished { status, .. } = event {
            finished = Some(status);
        }
    }
    assert_eq!(finished, Some(RunStatus::Cancelled));
}

#[tokio::test(start_paused = true)]
async fn callbacks_fire_in_order_and_complete_once() {
    let log = Arc::new(Mutex::new(Vec::<String>::new()));
    let (l1, l2, l3) = (log.clone(), log.clone(), log.clone());
    let callbacks = Callbacks::new()
        .on_item_complete(move |r: &ItemResult<String>| {
            l1.lock().unwrap().push(format!("item:{}:{}", r.id, r.status().as_str()));
        })
        .on_progress(move |processed, total| {
            l2.lock().unwrap().push(format!("progress:{processed}/{total}"));
        })
        .on_complete(move |results: &[ItemResult<String>]| {
            l3.lock().unwrap().push(format!("complete:{}", results.len()));
        });

    let op = ScriptedOperation::new(|id, _| {
        if id == "b" {
            Err("forbidden".into())
        } else {
            Ok(id.into())
        }
    });
    let exec = Executor::<String>::new(ExecutorConfig::default(), op, Arc::new(callbacks));
    exec.run(vec!["a".into(), "b".into(), "c".into()])
        .await
        .unwrap();

    assert_eq!(
        *log.lock().unwrap(),
        vec![
            "item:a:success",
            "progress:1/3",
            "item:b:failed",
            "progress:2/3",
            "item:c:success",
            "progress:3/3",
            "complete:3",
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn item_events_are_emitted_in_order() {
    let op = ScriptedOperation::new(|id, attempt| {
        if id == "b" && attempt == 1 {
            Err("rate limit hit, retry in 3 seconds".into())
        } else {
            Ok(id.into())
        }
    });
    let (exec, mut rx) = executor_with_events(op);
    exec.run(vec!["a".into(), "b".into()]).await.unwrap();

    let mut kinds = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if let Event::RetryScheduled { retry, delay, .. } = &event {
            assert_eq!(*retry, 1);
            assert_eq!(*delay, Duration::from_secs(3));
        }
        kinds.push(event.kind());
    }
    assert_eq!(
        kinds,
        vec![
            "run.started",
            "item.started",
            "item.completed",
            "run.progress",
            "item.started",
            "item.retry_scheduled",
            "item.completed",
            "run.progress",
            "run.finished",
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn progress_tracks_rounded_percentage() {
    let (exec, mut rx) = executor_with_events(ScriptedOperation::always_ok());
    let mut updates = exec.subscribe();
    let handle = exec.start(ids(3)).unwrap();

    let mut seen = HashMap::new();
    while let Some(event) = rx.recv().await {
        match event {
            Event::Progress { processed, total, .. } => {
                assert_eq!(total, 3);
                let state = exec.state();
                assert_eq!(state.succeeded + state.failed, state.processed);
                seen.insert(processed, state.progress);
            }
            Event::RunFinished { .. } => break,
            _ => {}
        }
    }
    handle.wait().await.unwrap();

    assert_eq!(seen.get(&1), Some(&33));
    assert_eq!(seen.get(&2), Some(&67));
    assert_eq!(seen.get(&3), Some(&100));
    assert!(updates.has_changed().unwrap());
    assert_eq!(updates.borrow_and_update().status, RunStatus::Completed);
}

#[tokio::test(start_paused = true)]
async fn panicking_operation_fails_only_its_item() {
    let op = OperationFn::new(|id: String| async move {
        if id == "boom" {
            panic!("exploded on {id}");
        }
        Ok::<_, String>(id)
    });
    let exec =
        Executor::<String>::new(ExecutorConfig::default(), Arc::new(op), Arc::new(NoOpEventSink));

    let results = exec
        .run(vec!["a".into(), "boom".into(), "c".into()])
        .await
        .unwrap();

    assert!(results[0].is_success());
    let err = results[1].error().unwrap();
    assert_eq!(err.kind, ItemErrorKind::Terminal);
    assert!(err.message.contains("operation panicked"));
    assert!(results[2].is_success());
}

#[tokio::test(start_paused = true)]
async fn retry_budget_comes_from_config() {
    let op = ScriptedOperation::new(|_, _| Err("rate limit".into()));
    let config = ExecutorConfig {
        retry: RetryConfig {
            max_retries: 1,
            default_delay: Duration::from_millis(250),
            max_delay: None,
        },
        ..ExecutorConfig::default()
    };
    let exec = Executor::<String>::new(config, op.clone(), Arc::new(NoOpEventSink));

    let started = Instant::now();
    let results = exec.run(vec!["q".into()]).await.unwrap();

    assert_eq!(op.calls_for("q"), 2);
    assert_eq!(results[0].error().unwrap().attempts, 2);
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(250), "{elapsed:?}");
    assert!(elapsed < Duration::from_millis(300), "{elapsed:?}");
}
