use async_trait::async_trait;
use batchrun_core::ItemResult;

use crate::executor::events::{Event, EventSink};

type ItemCallback<T> = Box<dyn Fn(&ItemResult<T>) + Send + Sync>;
type ProgressCallback = Box<dyn Fn(usize, usize) + Send + Sync>;
type CompleteCallback<T> = Box<dyn Fn(&[ItemResult<T>]) + Send + Sync>;

/// Plain-closure observers for the common notifications.
///
/// Per item, `on_item_complete` fires before `on_progress`; `on_complete` fires
/// once with the final ordered results, whether the run completed or was cancelled.
/// Unset callbacks are no-ops.
pub struct Callbacks<T> {
    on_item_complete: Option<ItemCallback<T>>,
    on_progress: Option<ProgressCallback>,
    on_complete: Option<CompleteCallback<T>>,
}

impl<T> Default for Callbacks<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Callbacks<T> {
    pub fn new() -> Self {
        Self {
            on_item_complete: None,
            on_progress: None,
            on_complete: None,
        }
    }

    pub fn on_item_complete(mut self, f: impl Fn(&ItemResult<T>) + Send + Sync + 'static) -> Self {
        self.on_item_complete = Some(Box::new(f));
        self
    }

    pub fn on_progress(mut self, f: impl Fn(usize, usize) + Send + Sync + 'static) -> Self {
        self.on_progress = Some(Box::new(f));
        self
    }

    pub fn on_complete(mut self, f: impl Fn(&[ItemResult<T>]) + Send + Sync + 'static) -> Self {
        self.on_complete = Some(Box::new(f));
        self
    }
}

#[async_trait]
impl<T> EventSink<T> for Callbacks<T>
where
    T: Send + Sync + 'static,
{
    async fn emit(&self, event: Event<T>) {
        match &event {
            Event::ItemCompleted { result, .. } => {
                if let Some(f) = &self.on_item_complete {
                    f(result);
                }
            }
            Event::Progress {
                processed, total, ..
            } => {
                if let Some(f) = &self.on_progress {
                    f(*processed, *total);
                }
            }
            Event::RunFinished { results, .. } => {
                if let Some(f) = &self.on_complete {
                    f(results);
                }
            }
            _ => {}
        }
    }
}
