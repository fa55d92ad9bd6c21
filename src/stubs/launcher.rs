use std::time::Duration;

use crate::core::{
    domain::{Completion, Invocation},
    traits::launcher::{LaunchError, Launcher},
};

/// Launcher that never starts a process: it waits `delay` and hands back
/// the configured result.
#[derive(Debug, Clone)]
pub struct LauncherStub {
    result: Result<Completion, LaunchError>,
    delay: Duration,
}

impl LauncherStub {
    pub fn new(result: Result<Completion, LaunchError>, delay: Duration) -> Self {
        Self { result, delay }
    }

    /// Every target finishes immediately with nothing found.
    pub fn dry_run() -> Self {
        Self::new(
            Ok(Completion::Exited {
                status: crate::constants::EXIT_NO_INVARIANT_BROKEN,
                stdout: String::new(),
                stderr: String::new(),
                execution_time_ms: 0,
            }),
            Duration::ZERO,
        )
    }
}

#[async_trait::async_trait]
impl Launcher for LauncherStub {
    #[tracing::instrument(skip_all)]
    async fn launch(&self, invocation: &Invocation) -> Result<Completion, LaunchError> {
        tracing::info!(
            "would run: {} {}",
            invocation.program.display(),
            invocation.args.join(" ")
        );
        tokio::time::sleep(self.delay).await;
        tracing::debug!("Launch result: {:?}", self.result);

        self.result.clone()
    }
}
