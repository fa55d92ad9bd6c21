use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use futures::TryStreamExt;
use uuid::Uuid;

use crate::{
    config::RunConfig,
    core::{
        domain::TargetRow,
        pipeline::running::run_target,
        traits::{
            launcher::{LaunchError, Launcher},
            sink::{ResultSink, SinkError},
        },
    },
};

/// Failures that stop the whole run. Per-target problems never show up here.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    #[error(transparent)]
    Launch(#[from] LaunchError),
    #[error(transparent)]
    Sink(#[from] SinkError),
}

#[derive(Debug)]
pub struct Dispatcher {
    config: Arc<RunConfig>,
    launcher: Arc<dyn Launcher>,
    sink: Arc<dyn ResultSink>,
}

impl Dispatcher {
    pub fn new(
        config: Arc<RunConfig>,
        launcher: Arc<dyn Launcher>,
        sink: Arc<dyn ResultSink>,
    ) -> Self {
        Self {
            config,
            launcher,
            sink,
        }
    }

    /// Initializes the sink, then runs every row with at most
    /// `worker_count` tool processes alive at once. Returns once all rows
    /// have been recorded, or on the first fatal error. Dropping the
    /// in-flight futures kills their processes.
    #[tracing::instrument(skip_all, fields(run_id = %Uuid::new_v4(), rows = rows.len()))]
    pub async fn dispatch(&self, rows: Vec<TargetRow>) -> Result<(), DispatchError> {
        self.sink.init().await?;

        let total = rows.len();
        let completed = AtomicUsize::new(0);
        let workers = self.config.worker_count.get();
        tracing::info!(total, workers, "dispatching targets");

        tokio_stream::iter(rows.into_iter().map(Ok::<_, DispatchError>))
            .try_for_each_concurrent(workers, |row| {
                let completed = &completed;
                async move {
                    let kind = run_target(row, &self.config, &self.launcher, &self.sink).await?;
                    let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
                    tracing::info!("[{}/{}] outcome: {:?}", done, total, kind);
                    Ok(())
                }
            })
            .await?;

        tracing::info!("completed all tasks");
        Ok(())
    }
}
