use std::any::Any;
use std::panic::AssertUnwindSafe;

use batchrun_core::{ItemError, ItemErrorKind, ItemResult};
use futures_util::FutureExt;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::executor::events::{Event, EventSink};
use crate::executor::operation::Operation;
use crate::retry::config::RetryConfig;
use crate::retry::decision::{decide_retry, RetryDecision, RetryReason};

/// Run `operation` for one id until it succeeds, fails terminally or runs out of retries.
///
/// Always returns a terminal result. Backoff sleeps happen inline, so a retried item
/// holds up the whole run for as long as it waits.
pub async fn run_with_retry<T>(
    operation: &dyn Operation<T>,
    id: &str,
    cfg: &RetryConfig,
    run_id: Uuid,
    event_sink: &dyn EventSink<T>,
) -> ItemResult<T>
where
    T: Send + 'static,
{
    let mut retries_done: u32 = 0;
    loop {
        let attempts = retries_done + 1;
        let err = match AssertUnwindSafe(operation.call(id)).catch_unwind().await {
            Ok(Ok(value)) => {
                debug!(%run_id, id, attempts, "item succeeded");
                return ItemResult::success(id, value);
            }
            Ok(Err(err)) => err,
            Err(panic) => {
                let message = panic_message(panic);
                warn!(%run_id, id, attempts, error = %message, "operation panicked");
                return ItemResult::failed(
                    id,
                    ItemError::new(message, ItemErrorKind::Terminal, attempts),
                );
            }
        };

        let message = err.to_string();
        match decide_retry(cfg, retries_done, &message) {
            RetryDecision::RetryAfter { delay, reason } => {
                retries_done += 1;
                warn!(
                    %run_id,
                    id,
                    retry = retries_done,
                    delay_ms = delay.as_millis() as u64,
                    reason = ?reason,
                    "rate limited, retry scheduled"
                );
                event_sink
                    .emit(Event::RetryScheduled {
                        run_id,
                        id: id.to_string(),
                        retry: retries_done,
                        delay,
                    })
                    .await;
                tokio::time::sleep(delay).await;
            }
            RetryDecision::Stop { reason } => {
                let kind = match reason {
                    RetryReason::AttemptsExhausted => ItemErrorKind::RetriesExhausted,
                    _ => ItemErrorKind::Terminal,
                };
                debug!(%run_id, id, attempts, error = %message, reason = ?reason, "item failed");
                return ItemResult::failed(
                    id,
                    ItemError::new(message, kind, attempts).with_source(err),
                );
            }
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("operation panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("operation panicked: {s}")
    } else {
        "operation panicked".to_string()
    }
}
