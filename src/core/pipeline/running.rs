use std::sync::Arc;

use crate::{
    config::RunConfig,
    core::{
        domain::{Completion, Outcome, OutcomeKind, TargetRow},
        pipeline::dispatching::DispatchError,
        traits::{launcher::Launcher, sink::ResultSink},
    },
};

/// Runs the tool against a single target and records the classified outcome.
///
/// Timeouts and odd exit codes end up as outcomes. Only a launcher failure or
/// a sink failure is returned as an error.
#[tracing::instrument(skip_all, fields(target = %row.target, chain = %row.chain))]
pub async fn run_target(
    row: TargetRow,
    config: &RunConfig,
    launcher: &Arc<dyn Launcher>,
    sink: &Arc<dyn ResultSink>,
) -> Result<OutcomeKind, DispatchError> {
    let invocation = config.invocation(&row);
    tracing::info!(
        "trying to generate exploit for {}, {}, {}...",
        row.target,
        row.base,
        row.pair
    );
    tracing::debug!("Invocation: {:?}", invocation);

    let completion = launcher.launch(&invocation).await?;
    match &completion {
        Completion::Exited {
            status,
            execution_time_ms,
            ..
        } => tracing::info!(status, execution_time_ms, "tool exited"),
        Completion::TimedOut { execution_time_ms } => {
            tracing::info!(execution_time_ms, "tool timed out")
        }
    }

    let outcome: Outcome = (row, completion).into();
    if let OutcomeKind::Unknown(code) = outcome.kind {
        tracing::warn!(code, "unclassified exit code");
    }

    sink.record(&outcome).await?;
    Ok(outcome.kind)
}
