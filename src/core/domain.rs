use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::constants::{
    ETC_CSV, INVARIANT_BROKEN_CSV, PANIC_FILE, PAIR_CSV_HEADER, SUCCESS_FILE, TIMEOUT_CSV,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Chain {
    Eth,
    Bsc,
}

impl FromStr for Chain {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "eth" => Ok(Chain::Eth),
            "bsc" => Ok(Chain::Bsc),
            other => Err(format!("unknown chain `{other}`, expected `eth` or `bsc`")),
        }
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Chain::Eth => f.write_str("eth"),
            Chain::Bsc => f.write_str("bsc"),
        }
    }
}

/// One token-pair benchmark case from the dataset file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TargetRow {
    pub target: String,
    pub base: String,
    pub pair: String,
    pub chain: Chain,
    pub block_number: u64,
}

impl TargetRow {
    /// Block the analysis tool forks from: one block before the exploit.
    pub fn fork_block(&self) -> u64 {
        self.block_number.saturating_sub(1)
    }
}

/// Everything needed to start the external tool for one target.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
    /// Standard output of the tool is redirected here.
    pub log_path: PathBuf,
    pub time_limit: Duration,
}

/// How a launched process ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Completion {
    Exited {
        status: i32,
        stdout: String,
        stderr: String,
        execution_time_ms: u64,
    },
    TimedOut {
        execution_time_ms: u64,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OutcomeKind {
    Success,
    Error,
    Panic,
    NoInvariantBroken,
    InvariantBrokenNotProfitable,
    TimedOut,
    Unknown(i32),
}

impl OutcomeKind {
    /// Category file the outcome is persisted to. `None` for outcomes that
    /// leave no artifact behind.
    pub fn category(&self) -> Option<Category> {
        match self {
            OutcomeKind::Success => Some(Category::Success),
            OutcomeKind::Panic => Some(Category::Panic),
            OutcomeKind::InvariantBrokenNotProfitable => Some(Category::InvariantBroken),
            OutcomeKind::TimedOut => Some(Category::Timeout),
            OutcomeKind::Unknown(_) => Some(Category::Etc),
            OutcomeKind::Error | OutcomeKind::NoInvariantBroken => None,
        }
    }
}

/// Classified result of one task run. Created once, never mutated.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Outcome {
    pub row: TargetRow,
    pub kind: OutcomeKind,
    pub stdout: String,
    pub stderr: String,
}

impl Outcome {
    /// Line (or block) appended to the outcome's category file.
    pub fn record(&self) -> Option<(Category, String)> {
        let category = self.kind.category()?;
        let TargetRow {
            target, base, pair, ..
        } = &self.row;
        let line = match category {
            Category::Success => format!(
                "Result for token: {target} base: {base} pair: {pair}\n{}\n",
                self.stdout
            ),
            Category::Panic => format!(
                "Result for token: {target}, base: {base}, pair: {pair}\n{}\n",
                self.stderr
            ),
            Category::Timeout | Category::Etc | Category::InvariantBroken => {
                format!("{target},{base},{pair}\n")
            }
        };
        Some((category, line))
    }
}

/// One append-only collection under the result directory.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Category {
    Success,
    Panic,
    InvariantBroken,
    Timeout,
    Etc,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Success,
        Category::Panic,
        Category::InvariantBroken,
        Category::Timeout,
        Category::Etc,
    ];

    pub fn file_name(&self) -> &'static str {
        match self {
            Category::Success => SUCCESS_FILE,
            Category::Panic => PANIC_FILE,
            Category::InvariantBroken => INVARIANT_BROKEN_CSV,
            Category::Timeout => TIMEOUT_CSV,
            Category::Etc => ETC_CSV,
        }
    }

    pub fn header(&self) -> Option<&'static str> {
        match self {
            Category::Timeout | Category::Etc | Category::InvariantBroken => Some(PAIR_CSV_HEADER),
            Category::Success | Category::Panic => None,
        }
    }
}
