//! Normalizes the raw logs of the benchmarked tools into one
//! `(detected, elapsed)` record.
//!
//! Every tool has its own [`LogGrammar`]. Grammars only scan lines and say
//! how the scan ended; the shared 20 minute horizon is applied here.

use std::{
    fmt,
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};

use crate::constants::HORIZON_SECS;

pub mod batch;
pub mod echidna;
pub mod ours;
pub mod runtime;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum ToolKind {
    Echidna,
    Ityfuzz,
    Midas,
    Ours,
}

impl ToolKind {
    pub fn grammar(&self) -> Box<dyn LogGrammar> {
        match self {
            ToolKind::Echidna => Box::new(echidna::EchidnaGrammar),
            ToolKind::Ityfuzz => Box::new(runtime::RunTimeGrammar::ityfuzz()),
            ToolKind::Midas => Box::new(runtime::RunTimeGrammar::midas()),
            ToolKind::Ours => Box::new(ours::OursGrammar),
        }
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ToolKind::Echidna => "echidna",
            ToolKind::Ityfuzz => "ityfuzz",
            ToolKind::Midas => "midas",
            ToolKind::Ours => "ours",
        };
        f.write_str(name)
    }
}

/// Normalized result of one tool log.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ParsedLog {
    pub detected: bool,
    /// `None` when an outcome marker appeared before any timing line.
    pub elapsed_secs: Option<f64>,
    /// The run reached the horizon.
    pub capped: bool,
}

/// Where a grammar's single forward pass stopped.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ScanEnd {
    /// An outcome marker settled the run.
    Concluded {
        detected: bool,
        elapsed_secs: Option<f64>,
    },
    /// Elapsed time hit the horizon before any outcome marker.
    Exhausted { elapsed_secs: f64 },
    /// The log ended without an outcome marker.
    Eof { elapsed_secs: Option<f64> },
}

#[derive(Debug, thiserror::Error)]
pub enum LogError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{path} is not a {tool} log, expected a name ending in `{suffix}`")]
    UnexpectedFileName {
        path: String,
        tool: ToolKind,
        suffix: &'static str,
    },
    #[error("{path} has no timing or outcome lines")]
    NoEvidence { path: String },
}

impl LogError {
    /// Malformed logs are a data-quality warning, the rest are real failures.
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            LogError::UnexpectedFileName { .. } | LogError::NoEvidence { .. }
        )
    }
}

pub trait LogGrammar: Send + Sync {
    /// File name suffix every log of this tool carries.
    fn file_suffix(&self) -> &'static str;

    /// Glob, relative to a batch directory, that finds this tool's logs.
    fn batch_pattern(&self) -> &'static str;

    fn scan(&self, reader: &mut dyn BufRead) -> std::io::Result<ScanEnd>;
}

/// Lines of `reader` with invalid UTF-8 replaced, so binary noise in a tool
/// log never fails the read.
pub fn lossy_lines(
    reader: &mut dyn BufRead,
) -> impl Iterator<Item = std::io::Result<String>> + '_ {
    let mut buf = Vec::new();
    std::iter::from_fn(move || {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => None,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf);
                Some(Ok(line.trim_end_matches(['\n', '\r']).to_string()))
            }
            Err(e) => Some(Err(e)),
        }
    })
}

/// True once `elapsed_secs` reaches the shared horizon.
pub fn past_horizon(elapsed_secs: f64) -> bool {
    elapsed_secs >= HORIZON_SECS
}

pub fn parse(tool: ToolKind, path: &Path) -> Result<ParsedLog, LogError> {
    let grammar = tool.grammar();
    let display = path.display().to_string();

    let suffix = grammar.file_suffix();
    if !display.ends_with(suffix) {
        return Err(LogError::UnexpectedFileName {
            path: display,
            tool,
            suffix,
        });
    }

    let io_error = |source: std::io::Error| LogError::Io {
        path: display.clone(),
        source,
    };
    let file = File::open(path).map_err(io_error)?;
    let end = grammar
        .scan(&mut BufReader::new(file))
        .map_err(io_error)?;

    conclude(end).ok_or_else(|| LogError::NoEvidence {
        path: display.clone(),
    })
}

/// Applies the horizon rule to a finished scan. `None` when the log held no
/// evidence at all.
pub fn conclude(end: ScanEnd) -> Option<ParsedLog> {
    match end {
        ScanEnd::Concluded {
            detected,
            elapsed_secs,
        } => {
            let capped = elapsed_secs.is_some_and(past_horizon);
            Some(ParsedLog {
                detected: detected && !capped,
                elapsed_secs,
                capped,
            })
        }
        ScanEnd::Exhausted { elapsed_secs } => Some(ParsedLog {
            detected: false,
            elapsed_secs: Some(elapsed_secs),
            capped: true,
        }),
        ScanEnd::Eof {
            elapsed_secs: Some(elapsed_secs),
        } => {
            let capped = past_horizon(elapsed_secs);
            if !capped {
                tracing::warn!(elapsed_secs, "log ended before the horizon");
            }
            Some(ParsedLog {
                detected: false,
                elapsed_secs: Some(elapsed_secs),
                capped,
            })
        }
        ScanEnd::Eof { elapsed_secs: None } => None,
    }
}
