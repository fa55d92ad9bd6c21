use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::time::Duration;

use crate::{
    constants::{SELF_TIMEOUT_GRACE_SECS, TARGET_LOG_SUFFIX},
    core::domain::{Chain, Invocation, TargetRow},
};

/// Node endpoint and block-explorer key for one chain.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Endpoint {
    pub rpc_url: String,
    pub api_key: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChainEndpoints {
    pub eth: Endpoint,
    pub bsc: Endpoint,
}

impl ChainEndpoints {
    pub fn for_chain(&self, chain: Chain) -> &Endpoint {
        match chain {
            Chain::Eth => &self.eth,
            Chain::Bsc => &self.bsc,
        }
    }
}

/// The external analysis tool and the wrapper that enforces its own timeout.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ToolCommand {
    pub forge_bin: PathBuf,
    pub timeout_bin: PathBuf,
}

impl Default for ToolCommand {
    fn default() -> Self {
        Self {
            forge_bin: PathBuf::from("forge"),
            timeout_bin: PathBuf::from("timeout"),
        }
    }
}

/// Immutable settings of one benchmark run, shared by every worker.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunConfig {
    pub time_limit: Duration,
    pub worker_count: NonZeroUsize,
    pub result_dir: PathBuf,
    pub endpoints: ChainEndpoints,
    pub tool: ToolCommand,
    /// Fork every target at this block instead of `blocknum - 1`.
    pub fork_block_override: Option<u64>,
}

impl RunConfig {
    pub fn log_path(&self, row: &TargetRow) -> PathBuf {
        self.result_dir
            .join(format!("{}{}", row.target, TARGET_LOG_SUFFIX))
    }

    /// Builds the `forge cage test` invocation for one target, wrapped in a
    /// self-timeout slightly longer than the outer deadline.
    pub fn invocation(&self, row: &TargetRow) -> Invocation {
        let endpoint = self.endpoints.for_chain(row.chain);
        let fork_block = self.fork_block_override.unwrap_or_else(|| row.fork_block());
        let self_timeout = self.time_limit.as_secs() + SELF_TIMEOUT_GRACE_SECS;

        let args = vec![
            self_timeout.to_string(),
            self.tool.forge_bin.display().to_string(),
            "cage".to_string(),
            "test".to_string(),
            row.target.clone(),
            row.base.clone(),
            row.pair.clone(),
            endpoint.api_key.clone(),
            "-f".to_string(),
            endpoint.rpc_url.clone(),
            "--fork-block-number".to_string(),
            fork_block.to_string(),
        ];

        Invocation {
            program: self.tool.timeout_bin.clone(),
            args,
            working_dir: None,
            log_path: self.log_path(row),
            time_limit: self.time_limit,
        }
    }
}
