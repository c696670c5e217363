mod item;
mod run;
mod status;
mod summary;

pub use item::{ItemError, ItemErrorKind, ItemOutcome, ItemResult};
pub use run::RunState;
pub use status::{ItemStatus, RunStatus};
pub use summary::RunSummary;
