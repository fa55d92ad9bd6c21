use std::path::{Path, PathBuf};

use itertools::Itertools;

use crate::{
    constants::{PANIC_FILE, SUCCESS_FILE},
    logparse::{LogError, ParsedLog, ToolKind, parse},
};

#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    #[error("invalid search pattern {pattern}: {msg}")]
    Pattern { pattern: String, msg: String },
}

#[derive(Debug)]
pub struct BatchEntry {
    pub path: PathBuf,
    pub result: Result<ParsedLog, LogError>,
}

/// Aggregate figures over one batch.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchSummary {
    pub parsed: usize,
    pub malformed: usize,
    pub failed: usize,
    pub detected: usize,
    /// Runs that reached the horizon.
    pub exhausted: usize,
    pub mean_secs_to_bug: Option<f64>,
    pub median_secs_to_bug: Option<f64>,
}

fn is_harness_file(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    // `success_file.*` and `panic_file.*`, whatever the extension.
    [SUCCESS_FILE, PANIC_FILE]
        .iter()
        .filter_map(|file| file.split_once('.'))
        .any(|(stem, _)| {
            name.strip_prefix(stem)
                .is_some_and(|rest| rest.starts_with('.'))
        })
}

/// Lists the tool's logs under `dir`, sorted case-insensitively, without the
/// harness' own success and panic files.
pub fn discover(tool: ToolKind, dir: &Path) -> Result<Vec<PathBuf>, BatchError> {
    let root = glob::Pattern::escape(&dir.display().to_string());
    let pattern = Path::new(&root)
        .join(tool.grammar().batch_pattern())
        .display()
        .to_string();
    let paths = glob::glob(&pattern).map_err(|e| BatchError::Pattern {
        pattern: pattern.clone(),
        msg: e.to_string(),
    })?;

    Ok(paths
        .filter_map(|entry| match entry {
            Ok(path) => Some(path),
            Err(e) => {
                tracing::warn!("skipping unreadable entry: {}", e);
                None
            }
        })
        .filter(|path| path.is_file() && !is_harness_file(path))
        .sorted_by_cached_key(|path| path.display().to_string().to_lowercase())
        .collect())
}

/// Parses every log in `dir`. A bad file is reported in its entry and does
/// not stop the rest.
#[tracing::instrument]
pub fn parse_dir(tool: ToolKind, dir: &Path) -> Result<Vec<BatchEntry>, BatchError> {
    let entries = discover(tool, dir)?
        .into_iter()
        .map(|path| {
            let result = parse(tool, &path);
            match &result {
                Err(e) if e.is_malformed() => tracing::warn!("{}", e),
                Err(e) => tracing::error!("{}", e),
                Ok(_) => {}
            }
            BatchEntry { path, result }
        })
        .collect();
    Ok(entries)
}

pub fn summarize(entries: &[BatchEntry]) -> BatchSummary {
    let (parsed, errors): (Vec<&ParsedLog>, Vec<&LogError>) = entries
        .iter()
        .map(|entry| entry.result.as_ref())
        .partition_result();
    let malformed = errors.iter().filter(|e| e.is_malformed()).count();

    let times: Vec<f64> = parsed
        .iter()
        .filter(|log| log.detected)
        .filter_map(|log| log.elapsed_secs)
        .sorted_by(|a, b| a.total_cmp(b))
        .collect();
    let detected = parsed.iter().filter(|log| log.detected).count();
    let exhausted = parsed.iter().filter(|log| log.capped).count();

    let mean_secs_to_bug =
        (!times.is_empty()).then(|| times.iter().sum::<f64>() / times.len() as f64);
    let median_secs_to_bug = match times.len() {
        0 => None,
        n if n % 2 == 1 => Some(times[n / 2]),
        n => Some((times[n / 2 - 1] + times[n / 2]) / 2.0),
    };

    BatchSummary {
        parsed: parsed.len(),
        malformed,
        failed: errors.len() - malformed,
        detected,
        exhausted,
        mean_secs_to_bug,
        median_secs_to_bug,
    }
}
