use std::path::Path;

use crate::core::domain::{Chain, TargetRow};

const REQUIRED_COLUMNS: [&str; 5] = ["target", "base", "pair", "chain", "blocknum"];

#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("cannot read dataset {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("dataset is empty, expected a header row")]
    MissingHeader,
    #[error("dataset header lacks column `{0}`")]
    MissingColumn(&'static str),
    #[error("line {line}: expected at least {expected} fields, found {found}")]
    ShortRow {
        line: usize,
        expected: usize,
        found: usize,
    },
    #[error("line {line}: {msg}")]
    BadChain { line: usize, msg: String },
    #[error("line {line}: invalid block number `{value}`")]
    BadBlockNumber { line: usize, value: String },
    #[error("line {line}: target `{value}` cannot name a log file")]
    BadTarget { line: usize, value: String },
}

/// The target becomes `<result_dir>/<target>.result`, so it must stay a
/// single path component.
fn is_valid_target(target: &str) -> bool {
    !target.is_empty()
        && target != "."
        && target != ".."
        && !target.contains(['/', '\\', '\0'])
}

pub async fn read_dataset(path: &Path) -> Result<Vec<TargetRow>, DatasetError> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| DatasetError::Io {
            path: path.display().to_string(),
            source,
        })?;
    parse_dataset(&text)
}

/// Parses the comma-separated target table. Columns are located by header
/// name, extra columns are ignored.
pub fn parse_dataset(text: &str) -> Result<Vec<TargetRow>, DatasetError> {
    let mut lines = text
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty());

    let (_, header) = lines.next().ok_or(DatasetError::MissingHeader)?;
    let header: Vec<&str> = header.split(',').map(str::trim).collect();

    let mut index = [0usize; REQUIRED_COLUMNS.len()];
    for (slot, column) in index.iter_mut().zip(REQUIRED_COLUMNS) {
        *slot = header
            .iter()
            .position(|name| *name == column)
            .ok_or(DatasetError::MissingColumn(column))?;
    }
    let [target, base, pair, chain, blocknum] = index;
    let width = index.iter().max().map_or(0, |max| max + 1);

    lines
        .map(|(idx, line)| {
            let line_no = idx + 1;
            let fields: Vec<&str> = line.split(',').map(str::trim).collect();
            if fields.len() < width {
                return Err(DatasetError::ShortRow {
                    line: line_no,
                    expected: width,
                    found: fields.len(),
                });
            }

            if !is_valid_target(fields[target]) {
                return Err(DatasetError::BadTarget {
                    line: line_no,
                    value: fields[target].to_string(),
                });
            }

            let chain = fields[chain]
                .parse::<Chain>()
                .map_err(|msg| DatasetError::BadChain { line: line_no, msg })?;
            let block_number =
                fields[blocknum]
                    .parse::<u64>()
                    .map_err(|_| DatasetError::BadBlockNumber {
                        line: line_no,
                        value: fields[blocknum].to_string(),
                    })?;

            Ok(TargetRow {
                target: fields[target].to_string(),
                base: fields[base].to_string(),
                pair: fields[pair].to_string(),
                chain,
                block_number,
            })
        })
        .collect()
}
