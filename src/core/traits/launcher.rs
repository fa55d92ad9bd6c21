use crate::core::domain::{Completion, Invocation};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LaunchError {
    #[error("failed to launch `{program}`: {msg}")]
    FailedToLaunch { program: String, msg: String },
    #[error("failed to open tool log {path}: {msg}")]
    LogFile { path: String, msg: String },
    #[error("failed to wait for `{program}`: {msg}")]
    Wait { program: String, msg: String },
}

/// Starts the external tool and reports how it ended.
///
/// Hitting the invocation's time limit is not an error: implementations kill
/// the process and return [`Completion::TimedOut`].
#[mockall::automock]
#[async_trait::async_trait]
pub trait Launcher: std::fmt::Debug + Send + Sync {
    async fn launch(&self, invocation: &Invocation) -> Result<Completion, LaunchError>;
}
