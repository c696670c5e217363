use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

use crate::types::status::ItemStatus;

/// Why an item ended up failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemErrorKind {
    /// The operation failed with an error that is never retried.
    Terminal,
    /// The operation kept hitting the rate limit until the retry budget ran out.
    RetriesExhausted,
}

/// The final, non-retried error recorded against one item.
#[derive(Debug, Clone)]
pub struct ItemError {
    pub message: String,
    pub kind: ItemErrorKind,
    /// Number of times the operation was invoked for this item.
    pub attempts: u32,
    source: Option<Arc<dyn StdError + Send + Sync>>,
}

impl ItemError {
    pub fn new(message: impl Into<String>, kind: ItemErrorKind, attempts: u32) -> Self {
        Self {
            message: message.into(),
            kind,
            attempts,
            source: None,
        }
    }

    pub fn with_source(mut self, source: Box<dyn StdError + Send + Sync>) -> Self {
        self.source = Some(Arc::from(source));
        self
    }

    /// The error returned by the operation, if it was kept.
    pub fn cause(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        self.source.as_deref()
    }
}

impl fmt::Display for ItemError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl StdError for ItemError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn StdError + 'static))
    }
}

// The boxed cause is not comparable; two errors are equal when they report the same thing.
impl PartialEq for ItemError {
    fn eq(&self, other: &Self) -> bool {
        self.message == other.message && self.kind == other.kind && self.attempts == other.attempts
    }
}

impl Serialize for ItemError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("ItemError", 3)?;
        s.serialize_field("message", &self.message)?;
        s.serialize_field("kind", &self.kind)?;
        s.serialize_field("attempts", &self.attempts)?;
        s.end()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ItemOutcome<T> {
    Success(T),
    Failed(ItemError),
}

/// Terminal outcome of processing one identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemResult<T> {
    pub id: String,
    pub outcome: ItemOutcome<T>,
}

impl<T> ItemResult<T> {
    pub fn success(id: impl Into<String>, value: T) -> Self {
        Self {
            id: id.into(),
            outcome: ItemOutcome::Success(value),
        }
    }

    pub fn failed(id: impl Into<String>, error: ItemError) -> Self {
        Self {
            id: id.into(),
            outcome: ItemOutcome::Failed(error),
        }
    }

    pub fn status(&self) -> ItemStatus {
        match self.outcome {
            ItemOutcome::Success(_) => ItemStatus::Success,
            ItemOutcome::Failed(_) => ItemStatus::Failed,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, ItemOutcome::Success(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.outcome, ItemOutcome::Failed(_))
    }

    pub fn value(&self) -> Option<&T> {
        match &self.outcome {
            ItemOutcome::Success(v) => Some(v),
            ItemOutcome::Failed(_) => None,
        }
    }

    pub fn error(&self) -> Option<&ItemError> {
        match &self.outcome {
            ItemOutcome::Success(_) => None,
            ItemOutcome::Failed(e) => Some(e),
        }
    }

    pub fn into_value(self) -> Option<T> {
        match self.outcome {
            ItemOutcome::Success(v) => Some(v),
            ItemOutcome::Failed(_) => None,
        }
    }
}

impl<T: Serialize> Serialize for ItemResult<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("ItemResult", 3)?;
        s.serialize_field("id", &self.id)?;
        s.serialize_field("status", &self.status())?;
        match &self.outcome {
            ItemOutcome::Success(v) => s.serialize_field("value", v)?,
            ItemOutcome::Failed(e) => s.serialize_field("error", e)?,
        }
        s.end()
    }
}
