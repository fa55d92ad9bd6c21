use std::path::PathBuf;

use crate::core::domain::Outcome;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SinkError {
    #[error("result sink I/O on {path}: {msg}")]
    Io { path: PathBuf, msg: String },
}

/// Append-only, category-partitioned store of outcomes.
///
/// `record` is called exactly once per target and may be called from many
/// tasks at the same time.
#[mockall::automock]
#[async_trait::async_trait]
pub trait ResultSink: std::fmt::Debug + Send + Sync {
    /// Creates the category collections. Safe to call more than once.
    async fn init(&self) -> Result<(), SinkError>;

    async fn record(&self, outcome: &Outcome) -> Result<(), SinkError>;
}
