use batchrun_core::RunStatus;

/// How `batchrun` reports the outcome of a command to the calling shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    Success,
    /// Bad flags, ids or config; nothing was run.
    InvalidInput,
    /// The run completed but some items failed.
    ItemsFailed,
    Runtime,
    Cancelled,
}

impl Exit {
    pub fn for_run(status: RunStatus, failed: usize) -> Self {
        match status {
            RunStatus::Cancelled => Exit::Cancelled,
            _ if failed > 0 => Exit::ItemsFailed,
            _ => Exit::Success,
        }
    }

    pub fn code(self) -> i32 {
        match self {
            Exit::Success => 0,
            Exit::InvalidInput => 2,
            Exit::ItemsFailed => 3,
            Exit::Runtime => 4,
            Exit::Cancelled => 5,
        }
    }
}
