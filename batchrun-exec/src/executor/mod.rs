pub mod callbacks;
pub mod config;
pub mod control;
pub mod events;
pub mod metrics;
pub mod operation;
pub mod pacing;
mod result;
mod run_loop;
mod scheduler;
pub(crate) mod serde_ms;

pub use callbacks::Callbacks;
pub use config::{ConfigError, ExecutorConfig};
pub use control::{Control, ControlState};
pub use events::{
    ChannelEventSink, CompositeEventSink, Event, EventSink, NoOpEventSink, StdoutEventSink,
};
pub use metrics::{MetricsCollector, MetricsEventSink, RunMetrics};
pub use operation::{BoxError, Operation, OperationFn};
pub use pacing::BatchPlan;
pub use result::{ExecutorError, StartError};
pub use scheduler::{Executor, RunHandle};
