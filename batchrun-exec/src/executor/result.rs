use uuid::Uuid;

/// Why `start` refused to begin a run. State is left untouched in both cases.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StartError {
    #[error("no ids to process")]
    EmptyIds,
    #[error("run {run_id} is still active; cancel and reset it first")]
    AlreadyActive { run_id: Uuid },
}

#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
    #[error(transparent)]
    Start(#[from] StartError),
    #[error("task join error: {0}")]
    TaskJoin(String),
}
